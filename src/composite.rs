//! Composite signal aggregation.
//!
//! Combines the latest snapshot of every tracked domain into one
//! normalized summary record. Missing domains degrade to documented
//! defaults; no single domain can block the others. The record fully
//! replaces any previously written signal.
//!
//! Layer and canary vocabularies are closed enums: input names that
//! match no variant are dropped instead of leaking through as new keys,
//! and adding an indicator is a code change.

use crate::metrics::days_until;
use crate::models::{
    AdoptionDocument, RegulatoryDocument, RemittanceEntry, SupplyEntry, TaxDocument,
    TreasuryEntry, VolumeEntry, WalletEntry,
};
use serde::{Deserialize, Serialize};

/// Status value used when a domain has no data.
const UNKNOWN: &str = "unknown";

/// The five adoption layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Hold,
    Earn,
    Spend,
    Borrow,
    Invisible,
}

impl Layer {
    /// Map a persisted layer number (1-5) to its variant.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Layer::Hold),
            2 => Some(Layer::Earn),
            3 => Some(Layer::Spend),
            4 => Some(Layer::Borrow),
            5 => Some(Layer::Invisible),
            _ => None,
        }
    }

    /// Fallback mapping by layer name for documents without numbers.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "hold" => Some(Layer::Hold),
            "earn" => Some(Layer::Earn),
            "spend" => Some(Layer::Spend),
            "borrow" => Some(Layer::Borrow),
            "invisible" => Some(Layer::Invisible),
            _ => None,
        }
    }
}

/// Named canary indicators surfaced in the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canary {
    Payroll,
    TaxEquivalence,
    WesternUnionSurpassed,
    OnePctAch,
    Top25BankCustody,
}

impl Canary {
    /// Map a persisted secondary-canary name to its variant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Tax equivalence" => Some(Canary::TaxEquivalence),
            "Stablecoin > Western Union" => Some(Canary::WesternUnionSurpassed),
            "1% of ACH" => Some(Canary::OnePctAch),
            "Top-25 bank custody" => Some(Canary::Top25BankCustody),
            _ => None,
        }
    }
}

/// Latest per-domain snapshots feeding one aggregation pass.
///
/// Held transiently; every field is optional and a `None` simply means
/// the domain's document was absent.
#[derive(Debug, Clone, Default)]
pub struct CompositeInputs {
    pub supply: Option<SupplyEntry>,
    pub volume: Option<VolumeEntry>,
    pub wallets: Option<WalletEntry>,
    pub remittance: Option<RemittanceEntry>,
    pub treasury: Option<TreasuryEntry>,
    pub adoption: Option<AdoptionDocument>,
    pub regulatory: Option<RegulatoryDocument>,
    pub tax: Option<TaxDocument>,
}

/// Metadata of the composite record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    /// UTC date of aggregation, `YYYY-MM-DD`.
    pub last_updated: String,
    /// Marker for what produced this record.
    pub computed_by: String,
}

/// Per-layer adoption statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayersSummary {
    pub hold: String,
    pub earn: String,
    pub spend: String,
    pub borrow: String,
    pub invisible: String,
}

impl Default for LayersSummary {
    fn default() -> Self {
        Self {
            hold: UNKNOWN.to_string(),
            earn: UNKNOWN.to_string(),
            spend: UNKNOWN.to_string(),
            borrow: UNKNOWN.to_string(),
            invisible: UNKNOWN.to_string(),
        }
    }
}

/// Cross-domain key metrics.
///
/// Numeric metrics default to `0` and the tax friction to `"unknown"`
/// when the source domain has no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub supply_pct_of_m1: f64,
    pub commercial_pct_of_ach: f64,
    pub remittance_pct_of_outbound: f64,
    pub treasury_pct_of_tbills: f64,
    pub tax_friction: String,
    pub active_wallets_m: f64,
    /// Omitted entirely when the effective date is absent or
    /// unparsable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genius_act_days_until_effective: Option<i64>,
}

impl Default for KeyMetrics {
    fn default() -> Self {
        Self {
            supply_pct_of_m1: 0.0,
            commercial_pct_of_ach: 0.0,
            remittance_pct_of_outbound: 0.0,
            treasury_pct_of_tbills: 0.0,
            tax_friction: UNKNOWN.to_string(),
            active_wallets_m: 0.0,
            genius_act_days_until_effective: None,
        }
    }
}

/// Canary indicator statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanaryStatus {
    pub payroll: String,
    pub tax_equivalence: String,
    pub western_union_surpassed: String,
    pub one_pct_ach: String,
    pub top25_bank_custody: String,
}

impl Default for CanaryStatus {
    fn default() -> Self {
        Self {
            payroll: UNKNOWN.to_string(),
            tax_equivalence: UNKNOWN.to_string(),
            western_union_surpassed: UNKNOWN.to_string(),
            one_pct_ach: UNKNOWN.to_string(),
            top25_bank_custody: UNKNOWN.to_string(),
        }
    }
}

/// The externally-visible cross-domain summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    pub metadata: CompositeMetadata,
    pub layers_summary: LayersSummary,
    pub key_metrics: KeyMetrics,
    pub canary_status: CanaryStatus,
}

/// Build the composite signal from the latest domain snapshots.
pub fn aggregate(inputs: &CompositeInputs) -> CompositeRecord {
    let layers_summary = inputs
        .adoption
        .as_ref()
        .map(layers_summary)
        .unwrap_or_default();

    let canary_status = inputs
        .adoption
        .as_ref()
        .map(canary_status)
        .unwrap_or_default();

    let mut key_metrics = KeyMetrics::default();
    if let Some(supply) = &inputs.supply {
        key_metrics.supply_pct_of_m1 = supply.pct_of_m1;
    }
    if let Some(volume) = &inputs.volume {
        key_metrics.commercial_pct_of_ach = volume.commercial_pct_of_ach;
    }
    if let Some(remittance) = &inputs.remittance {
        key_metrics.remittance_pct_of_outbound = remittance.stablecoin_pct;
    }
    if let Some(treasury) = &inputs.treasury {
        key_metrics.treasury_pct_of_tbills = treasury.pct_of_market;
    }
    if let Some(wallets) = &inputs.wallets {
        key_metrics.active_wallets_m = wallets.monthly_active_m;
    }
    if let Some(tax) = &inputs.tax {
        if let Some(friction) = &tax.current_friction {
            key_metrics.tax_friction = friction.clone();
        }
    }
    if let Some(regulatory) = &inputs.regulatory {
        key_metrics.genius_act_days_until_effective = days_until_effective(regulatory);
    }

    CompositeRecord {
        metadata: CompositeMetadata {
            last_updated: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            computed_by: "stablepulse::composite".to_string(),
        },
        layers_summary,
        key_metrics,
        canary_status,
    }
}

/// Days until the regulatory effective date.
///
/// A value precomputed by the regulatory command is trusted verbatim;
/// otherwise it is derived from the estimated effective date at
/// aggregation time. Absent or unparsable dates yield `None`.
pub fn days_until_effective(regulatory: &RegulatoryDocument) -> Option<i64> {
    if let Some(days) = regulatory.days_until_effective {
        return Some(days);
    }
    days_until(regulatory.effective_date_estimate.as_deref()?)
}

fn layers_summary(adoption: &AdoptionDocument) -> LayersSummary {
    let mut summary = LayersSummary::default();

    for entry in &adoption.layers {
        let layer = entry
            .number
            .and_then(Layer::from_number)
            .or_else(|| Layer::from_name(&entry.name));
        let Some(layer) = layer else {
            continue;
        };

        let status = entry.status.clone().unwrap_or_else(|| UNKNOWN.to_string());
        match layer {
            Layer::Hold => summary.hold = status,
            Layer::Earn => summary.earn = status,
            Layer::Spend => summary.spend = status,
            Layer::Borrow => summary.borrow = status,
            Layer::Invisible => summary.invisible = status,
        }
    }

    summary
}

fn canary_status(adoption: &AdoptionDocument) -> CanaryStatus {
    let mut status = CanaryStatus::default();

    if let Some(canary) = &adoption.canary {
        if let Some(payroll) = &canary.status {
            status.payroll = payroll.clone();
        }
    }

    for secondary in &adoption.secondary_canaries {
        let Some(canary) = Canary::from_name(&secondary.name) else {
            continue;
        };

        let value = secondary
            .status
            .clone()
            .unwrap_or_else(|| UNKNOWN.to_string());
        match canary {
            // The primary payroll canary has its own slot above.
            Canary::Payroll => status.payroll = value,
            Canary::TaxEquivalence => status.tax_equivalence = value,
            Canary::WesternUnionSurpassed => status.western_union_surpassed = value,
            Canary::OnePctAch => status.one_pct_ach = value,
            Canary::Top25BankCustody => status.top25_bank_custody = value,
        }
    }

    status
}
