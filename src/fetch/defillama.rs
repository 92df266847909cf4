//! DefiLlama stablecoin supply client.
//!
//! Fetches the stablecoins listing, sums per-chain circulating amounts
//! and buckets them into USDC / USDT / everything else. Amounts arrive
//! as raw USD and stay unit-tagged until the caller converts them.

use crate::models::{ModelError, Quantity, Unit};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const DEFILLAMA_URL: &str = "https://stablecoins.llama.fi/stablecoins?includePrices=true";

/// Current circulating supply split by issuer bucket, in raw USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupplyBreakdown {
    pub usdc: Quantity,
    pub usdt: Quantity,
    pub others: Quantity,
}

impl SupplyBreakdown {
    /// Convert each bucket to USD billions, rounded to one decimal.
    pub fn to_billions(&self) -> Result<(f64, f64, f64), ModelError> {
        let round = |v: f64| crate::metrics::round_to(v, 1);
        Ok((
            round(self.usdc.convert_to(Unit::UsdBillion)?),
            round(self.usdt.convert_to(Unit::UsdBillion)?),
            round(self.others.convert_to(Unit::UsdBillion)?),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct StablecoinListing {
    #[serde(default, rename = "peggedAssets")]
    pegged_assets: Vec<PeggedAsset>,
}

#[derive(Debug, Deserialize)]
struct PeggedAsset {
    #[serde(default)]
    symbol: String,
    #[serde(default, rename = "chainCirculating")]
    chain_circulating: HashMap<String, ChainCirculating>,
}

#[derive(Debug, Deserialize)]
struct ChainCirculating {
    #[serde(default)]
    current: Option<PeggedAmount>,
}

#[derive(Debug, Deserialize)]
struct PeggedAmount {
    #[serde(default, rename = "peggedUSD")]
    pegged_usd: Option<f64>,
}

/// Client for the DefiLlama stablecoins API.
pub struct DefiLlamaClient {
    http_client: reqwest::Client,
    url: String,
    timeout_seconds: u64,
}

impl DefiLlamaClient {
    pub fn new(timeout_seconds: u64) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            url: DEFILLAMA_URL.to_string(),
            timeout_seconds,
        }
    }

    /// Fetch current stablecoin supplies.
    pub async fn fetch_supplies(&self) -> Result<SupplyBreakdown> {
        info!("Fetching stablecoin supply from DefiLlama");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("DefiLlama request timed out after {}s", self.timeout_seconds)
                } else {
                    anyhow::anyhow!("Failed to reach DefiLlama: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("DefiLlama API error {}: {}", status, body));
        }

        let listing: StablecoinListing = response
            .json()
            .await
            .context("Failed to parse DefiLlama response")?;

        Ok(sum_supplies(&listing))
    }
}

/// Sum per-chain circulating amounts into issuer buckets.
fn sum_supplies(listing: &StablecoinListing) -> SupplyBreakdown {
    let mut usdc = 0.0;
    let mut usdt = 0.0;
    let mut others = 0.0;

    for asset in &listing.pegged_assets {
        let total: f64 = asset
            .chain_circulating
            .values()
            .filter_map(|chain| chain.current.as_ref())
            .filter_map(|current| current.pegged_usd)
            .sum();

        match asset.symbol.to_uppercase().as_str() {
            "USDC" => usdc = total,
            "USDT" => usdt = total,
            _ => others += total,
        }
    }

    debug!(
        "DefiLlama totals: usdc={:.0} usdt={:.0} others={:.0} (raw USD)",
        usdc, usdt, others
    );

    SupplyBreakdown {
        usdc: Quantity::new(usdc, Unit::Usd),
        usdt: Quantity::new(usdt, Unit::Usd),
        others: Quantity::new(others, Unit::Usd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_from(json: &str) -> StablecoinListing {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_sum_supplies_buckets_by_symbol() {
        let listing = listing_from(
            r#"{
                "peggedAssets": [
                    {
                        "symbol": "USDC",
                        "chainCirculating": {
                            "Ethereum": {"current": {"peggedUSD": 70000000000.0}},
                            "Solana": {"current": {"peggedUSD": 50000000000.0}}
                        }
                    },
                    {
                        "symbol": "usdt",
                        "chainCirculating": {
                            "Tron": {"current": {"peggedUSD": 80000000000.0}}
                        }
                    },
                    {
                        "symbol": "DAI",
                        "chainCirculating": {
                            "Ethereum": {"current": {"peggedUSD": 6000000000.0}}
                        }
                    },
                    {
                        "symbol": "FRAX",
                        "chainCirculating": {
                            "Ethereum": {"current": {"peggedUSD": 4000000000.0}}
                        }
                    }
                ]
            }"#,
        );

        let breakdown = sum_supplies(&listing);
        assert_eq!(breakdown.usdc.value, 120e9);
        assert_eq!(breakdown.usdt.value, 80e9);
        assert_eq!(breakdown.others.value, 10e9);
        assert_eq!(breakdown.usdc.unit, Unit::Usd);
    }

    #[test]
    fn test_sum_supplies_skips_missing_amounts() {
        let listing = listing_from(
            r#"{
                "peggedAssets": [
                    {
                        "symbol": "USDC",
                        "chainCirculating": {
                            "Ethereum": {"current": {"peggedUSD": 1000000000.0}},
                            "Dead chain": {"current": {}},
                            "Deader chain": {}
                        }
                    }
                ]
            }"#,
        );

        let breakdown = sum_supplies(&listing);
        assert_eq!(breakdown.usdc.value, 1e9);
    }

    #[test]
    fn test_empty_listing() {
        let breakdown = sum_supplies(&listing_from("{}"));
        assert_eq!(breakdown.usdc.value, 0.0);
        assert_eq!(breakdown.usdt.value, 0.0);
        assert_eq!(breakdown.others.value, 0.0);
    }

    #[test]
    fn test_to_billions_converts_and_rounds() {
        let breakdown = SupplyBreakdown {
            usdc: Quantity::new(120.04e9, Unit::Usd),
            usdt: Quantity::new(79.96e9, Unit::Usd),
            others: Quantity::new(10.0e9, Unit::Usd),
        };

        let (usdc, usdt, others) = breakdown.to_billions().unwrap();
        assert_eq!(usdc, 120.0);
        assert_eq!(usdt, 80.0);
        assert_eq!(others, 10.0);
    }
}
