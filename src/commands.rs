//! Pipeline stage commands.
//!
//! One `run_*` per subcommand. Every stage has a live path (fetch,
//! merge, persist) and a mock path that works from existing documents
//! without network calls. Persistence happens under the store's writer
//! lock so the read-modify-write window is covered.

use crate::composite::{self, CompositeInputs};
use crate::config::Config;
use crate::fetch::{DefiLlamaClient, FredClient};
use crate::metrics::{days_until, ratio_pct, round_to};
use crate::milestones::supply_milestones;
use crate::models::{
    DocumentMetadata, Domain, M1Document, M1Observation, Period, RegulatoryDocument, SupplyEntry,
};
use crate::series::{latest, upsert};
use crate::store::Store;
use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Statuses a regulatory milestone may carry.
const REGULATORY_STATUSES: [&str; 3] = ["done", "in_progress", "pending"];

fn store_for(config: &Config) -> Store {
    Store::new(&config.general.data_dir)
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn require_fred_key(config: &Config) -> Result<String> {
    config
        .fetch
        .fred_api_key
        .clone()
        .ok_or_else(|| anyhow!("FRED_API_KEY is not set (flag, env var, or config file)"))
}

/// Update the supply series: fetch DefiLlama and FRED, upsert the
/// current month, recompute milestones, persist.
pub async fn run_supply(config: &Config, mock: bool) -> Result<()> {
    let store = store_for(config);

    if mock {
        let doc = store
            .load_supply()?
            .ok_or_else(|| anyhow!("Mock data not found at {}", store.data_dir().display()))?;
        println!(
            "Mock mode: loaded {} monthly entries from {}",
            doc.monthly.len(),
            store.data_dir().display()
        );
        if let Some(entry) = latest(&doc.monthly) {
            println!(
                "  Latest: {} - Total: {}B - {}% of M1",
                entry.date, entry.total, entry.pct_of_m1
            );
        }
        return Ok(());
    }

    let fred_key = require_fred_key(config)?;
    let timeout = config.fetch.timeout_seconds;

    let bar = spinner("Fetching DefiLlama supply and FRED M1...");
    let defillama = DefiLlamaClient::new(timeout);
    let fred = FredClient::new(fred_key, timeout);
    let (breakdown, m1_observations) =
        futures::try_join!(defillama.fetch_supplies(), fred.fetch_m1())?;
    bar.finish_and_clear();

    let (usdc, usdt, others) = breakdown.to_billions()?;
    let total = round_to(usdc + usdt + others, 1);
    println!(
        "  USDC: {}B, USDT: {}B, Others: {}B, Total: {}B",
        usdc, usdt, others, total
    );

    let latest_m1 = m1_observations
        .last()
        .ok_or_else(|| anyhow!("No M1 observations returned from FRED"))?;
    println!(
        "  Latest M1: {}T ({})",
        latest_m1.value_trillion, latest_m1.date
    );

    let pct = ratio_pct(total, latest_m1.value_billion);
    println!("  Stablecoin as % of M1: {}%", pct);

    let entry = SupplyEntry::new(
        Period::current(),
        usdc,
        usdt,
        others,
        latest_m1.value_trillion,
        pct,
    );

    let _guard = store.lock()?;
    let mut doc = store.load_supply()?.unwrap_or_default();
    doc.monthly = upsert(doc.monthly, entry);
    doc.milestones = supply_milestones(&doc.monthly)?;
    doc.metadata = DocumentMetadata::stamped(
        "DefiLlama Stablecoins API, FRED M1SL series",
        "Supply in USD billions. M1 in USD trillions. Edit to add manual corrections.",
    );
    store.save_supply(&doc)?;

    println!(
        "Saved {} monthly entries to {}",
        doc.monthly.len(),
        store.domain_path(Domain::Supply).display()
    );
    Ok(())
}

/// Fetch M1 observations from FRED and persist them.
pub async fn run_money_supply(config: &Config, mock: bool) -> Result<()> {
    let store = store_for(config);

    if mock {
        return run_money_supply_mock(&store);
    }

    let fred_key = require_fred_key(config)?;
    let bar = spinner("Fetching M1 money supply from FRED...");
    let fred = FredClient::new(fred_key, config.fetch.timeout_seconds);
    let observations = fred.fetch_m1().await?;
    bar.finish_and_clear();

    let last = observations
        .last()
        .ok_or_else(|| anyhow!("No M1 observations returned from FRED"))?;
    println!("  {} observations fetched", observations.len());
    println!("  Latest: {} - {}T", last.date, last.value_trillion);

    let doc = M1Document {
        metadata: DocumentMetadata::stamped(
            "FRED M1SL series (Federal Reserve Economic Data)",
            "M1 includes currency in circulation, demand deposits, and other liquid deposits.",
        ),
        observations: observations
            .into_iter()
            .map(|obs| M1Observation {
                date: obs.date,
                value_trillion: obs.value_trillion,
            })
            .collect(),
    };

    let _guard = store.lock()?;
    store.save_m1(&doc)?;
    println!("Saved M1 observations to {}", store.data_dir().display());
    Ok(())
}

/// Mock money-supply: read the persisted document, or derive a
/// placeholder from the supply series when no M1 document exists yet.
fn run_money_supply_mock(store: &Store) -> Result<()> {
    if let Some(doc) = store.load_m1()? {
        println!(
            "Mock mode: loaded {} observations from {}",
            doc.observations.len(),
            store.data_dir().display()
        );
        if let Some(last) = doc.observations.last() {
            println!("  Latest: {} - {}T", last.date, last.value_trillion);
        }
        return Ok(());
    }

    info!("No M1 document; deriving placeholder from supply series");
    let supply = store
        .load_supply()?
        .ok_or_else(|| anyhow!("No supply document available for mock M1 generation"))?;

    let doc = M1Document {
        metadata: DocumentMetadata::stamped(
            "Derived from supply document (mock mode)",
            "M1 includes currency in circulation, demand deposits, and other liquid deposits.",
        ),
        observations: supply
            .monthly
            .iter()
            .map(|entry| M1Observation {
                date: entry.date.clone(),
                value_trillion: entry.m1_trillion,
            })
            .collect(),
    };

    let _guard = store.lock()?;
    store.save_m1(&doc)?;
    println!(
        "Generated mock M1 data with {} observations",
        doc.observations.len()
    );
    Ok(())
}

/// Validate the regulatory document and recompute its countdown
/// fields.
pub async fn run_regulatory(config: &Config, mock: bool) -> Result<()> {
    let store = store_for(config);
    let label = if mock { "Mock mode" } else { "Live mode" };
    println!("{}: processing regulatory tracker", label);

    let _guard = store.lock()?;
    let mut doc = store.load_regulatory()?.ok_or_else(|| {
        anyhow!(
            "Regulatory document not found at {}",
            store.domain_path(Domain::Regulatory).display()
        )
    })?;

    let warnings = validate_regulatory(&doc);
    if warnings.is_empty() {
        println!("  Validation: all checks passed");
    } else {
        println!("  Validation warnings:");
        for warning in &warnings {
            println!("    - {}", warning);
        }
    }

    process_regulatory(&mut doc);

    if let Some(days) = doc.days_until_effective {
        println!("  Days until effective: {}", days);
    }

    let mut statuses: BTreeMap<String, usize> = BTreeMap::new();
    for milestone in &doc.milestones {
        let status = milestone.status.clone().unwrap_or_else(|| "unknown".to_string());
        *statuses.entry(status).or_insert(0) += 1;
    }
    println!("  Milestones: {:?}", statuses);

    store.save_regulatory(&doc)?;
    println!("  Saved regulatory tracker");
    Ok(())
}

/// Integrity warnings for the regulatory document. Warnings never
/// block processing.
pub fn validate_regulatory(doc: &RegulatoryDocument) -> Vec<String> {
    let mut warnings = Vec::new();

    for milestone in &doc.milestones {
        if milestone.milestone.is_empty() {
            warnings.push("Milestone entry missing 'milestone' field".to_string());
        }
        match milestone.status.as_deref() {
            Some(status) if REGULATORY_STATUSES.contains(&status) => {}
            other => warnings.push(format!(
                "Invalid status {:?} for: {}",
                other.unwrap_or("none"),
                if milestone.milestone.is_empty() {
                    "unknown"
                } else {
                    &milestone.milestone
                }
            )),
        }
    }

    if doc.act_name.is_none() {
        warnings.push("Missing act_name field".to_string());
    }
    if doc.signed_date.is_none() {
        warnings.push("Missing signed_date field".to_string());
    }
    if doc.effective_date_estimate.is_none() {
        warnings.push("Missing effective_date_estimate field".to_string());
    }

    warnings
}

/// Recompute countdown fields and stamp the metadata.
pub fn process_regulatory(doc: &mut RegulatoryDocument) {
    match doc.effective_date_estimate.as_deref() {
        Some(date) => match days_until(date) {
            Some(days) => doc.days_until_effective = Some(days),
            None => warn!("Could not parse effective_date_estimate: {}", date),
        },
        None => warn!("No effective_date_estimate in regulatory document"),
    }

    for milestone in &mut doc.milestones {
        if milestone.status.as_deref() == Some("done") {
            continue;
        }
        let Some(deadline) = milestone.deadline.clone() else {
            continue;
        };
        // A YYYY-MM deadline counts to the first of that month
        let full = if deadline.len() == 7 {
            format!("{deadline}-01")
        } else {
            deadline
        };
        if let Some(days) = days_until(&full) {
            milestone.days_remaining = Some(days);
        }
    }

    doc.metadata.last_updated = chrono::Utc::now().format("%Y-%m-%d").to_string();
}

/// Aggregate the latest snapshot of every domain into the composite
/// signal.
pub async fn run_signal(config: &Config, mock: bool) -> Result<()> {
    let store = store_for(config);
    let label = if mock { "Mock mode" } else { "Live mode" };
    println!("{}: computing signal from data documents", label);

    // Lock covers the loads too, so a writer mid-save cannot hand the
    // aggregation a truncated document
    let _guard = store.lock()?;
    let inputs = load_composite_inputs(&store)?;
    let record = composite::aggregate(&inputs);

    println!("  Supply % of M1: {}", record.key_metrics.supply_pct_of_m1);
    println!(
        "  Commercial % of ACH: {}",
        record.key_metrics.commercial_pct_of_ach
    );
    println!("  Active wallets (M): {}", record.key_metrics.active_wallets_m);
    println!("  Tax friction: {}", record.key_metrics.tax_friction);
    if let Some(days) = record.key_metrics.genius_act_days_until_effective {
        println!("  Days until GENIUS Act effective: {}", days);
    }

    store.save_signal(&record)?;
    println!("Saved composite signal to {}", store.data_dir().display());
    Ok(())
}

/// Gather the latest entry of every domain. A missing document leaves
/// its slot empty; it never fails the aggregation.
fn load_composite_inputs(store: &Store) -> Result<CompositeInputs> {
    let supply = store.load_supply()?;
    let volume = store.load_volume()?;
    let wallets = store.load_wallets()?;
    let remittance = store.load_remittance()?;
    let treasury = store.load_treasury()?;

    Ok(CompositeInputs {
        supply: supply.and_then(|d| d.monthly.last().cloned()),
        volume: volume.and_then(|d| d.monthly.last().cloned()),
        wallets: wallets.and_then(|d| d.monthly.last().cloned()),
        remittance: remittance.and_then(|d| d.quarterly.last().cloned()),
        treasury: treasury.and_then(|d| d.monthly.last().cloned()),
        adoption: store.load_adoption()?,
        regulatory: store.load_regulatory()?,
        tax: store.load_tax()?,
    })
}

/// Run every stage in pipeline order.
pub async fn run_all(config: &Config, mock: bool) -> Result<()> {
    println!("[1/4] supply");
    run_supply(config, mock).await.context("supply stage failed")?;
    println!("\n[2/4] money-supply");
    run_money_supply(config, mock)
        .await
        .context("money-supply stage failed")?;
    println!("\n[3/4] regulatory");
    run_regulatory(config, mock)
        .await
        .context("regulatory stage failed")?;
    println!("\n[4/4] signal");
    run_signal(config, mock).await.context("signal stage failed")?;
    Ok(())
}
