//! Milestone evaluation over a series.
//!
//! Milestones are fractional thresholds of a reference baseline (e.g.
//! 1% of M1). They are recomputed from scratch on every run: the
//! baseline comes from the single latest entry, so targets drift as the
//! baseline moves between runs, and a previously passed threshold flips
//! back to pending if the latest magnitude has dropped below it. That
//! recompute-from-scratch behavior is intended.

use crate::models::{ModelError, Observation, Period, Quantity, Unit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pass/pending state of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    Pending,
    Passed,
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilestoneStatus::Pending => write!(f, "pending"),
            MilestoneStatus::Passed => write!(f, "passed"),
        }
    }
}

/// Definition of one threshold to evaluate.
#[derive(Debug, Clone)]
pub struct MilestoneSpec {
    /// Display label, e.g. "1% of M1".
    pub label: &'static str,
    /// Fraction of the baseline, e.g. 0.01.
    pub fraction: f64,
    /// Interpretation note carried into the output.
    pub note: &'static str,
}

/// Thresholds tracked for stablecoin supply against M1.
pub const SUPPLY_THRESHOLDS: [MilestoneSpec; 4] = [
    MilestoneSpec {
        label: "1% of M1",
        fraction: 0.01,
        note: "Structurally noticeable",
    },
    MilestoneSpec {
        label: "2% of M1",
        fraction: 0.02,
        note: "Material monetary instrument",
    },
    MilestoneSpec {
        label: "5% of M1",
        fraction: 0.05,
        note: "Systemically significant",
    },
    MilestoneSpec {
        label: "10% of M1",
        fraction: 0.10,
        note: "Parallel monetary system",
    },
];

/// An evaluated milestone as persisted in the supply document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Threshold label, e.g. "1% of M1".
    pub threshold: String,
    /// Target in the magnitude's unit (USD billions for supply),
    /// rounded to a whole number.
    pub target_bn: f64,
    pub status: MilestoneStatus,
    pub note: String,
    /// Earliest period whose magnitude met the target, when passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Period>,
}

/// Evaluate thresholds over a series.
///
/// The baseline is read from the latest entry and converted to the
/// magnitude's unit before the fractional target is taken; each
/// threshold is then passed iff the latest magnitude meets its target.
/// For passed thresholds the series is scanned from the earliest
/// retained entry forward and the first period meeting the target is
/// recorded as the crossing date. No monotonicity is assumed: a later
/// dip below the target does not move an earlier crossing date, and the
/// next recomputation reflects whatever the latest entry says.
///
/// An empty series evaluates to no milestones.
pub fn evaluate<T, B, M>(
    series: &[T],
    specs: &[MilestoneSpec],
    baseline: B,
    magnitude: M,
) -> Result<Vec<Milestone>, ModelError>
where
    T: Observation,
    B: Fn(&T) -> Quantity,
    M: Fn(&T) -> Quantity,
{
    let Some(last) = series.last() else {
        return Ok(Vec::new());
    };

    let magnitude_unit = magnitude(last).unit;
    let baseline_value = baseline(last).convert_to(magnitude_unit)?;
    let latest_value = magnitude(last).value;

    let mut milestones = Vec::with_capacity(specs.len());
    for spec in specs {
        let target = (baseline_value * spec.fraction).round();

        let mut milestone = Milestone {
            threshold: spec.label.to_string(),
            target_bn: target,
            status: MilestoneStatus::Pending,
            note: spec.note.to_string(),
            date: None,
        };

        if latest_value >= target {
            milestone.status = MilestoneStatus::Passed;
            milestone.date = series
                .iter()
                .find(|e| magnitude(e).value >= target)
                .map(|e| e.period().clone());
        }

        milestones.push(milestone);
    }

    Ok(milestones)
}

/// Evaluate the standard supply-vs-M1 thresholds.
///
/// Supply totals are in USD billions; the M1 baseline rides on each
/// entry in USD trillions and is converted explicitly.
pub fn supply_milestones(
    series: &[crate::models::SupplyEntry],
) -> Result<Vec<Milestone>, ModelError> {
    evaluate(
        series,
        &SUPPLY_THRESHOLDS,
        |e| Quantity::new(e.m1_trillion, Unit::UsdTrillion),
        |e| Quantity::new(e.total, Unit::UsdBillion),
    )
}
