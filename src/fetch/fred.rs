//! FRED M1 money supply client.
//!
//! Fetches the last 24 M1SL observations (monthly, billions of
//! dollars), skips placeholder values and returns them in
//! chronological order with a derived trillions value.

use crate::models::{Period, Quantity, Unit};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const FRED_OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// How many monthly observations to request, matching the series
/// retention window.
const OBSERVATION_LIMIT: usize = 24;

/// FRED reports missing values as a literal dot.
const MISSING_VALUE: &str = ".";

/// One M1 observation, unit-converted.
#[derive(Debug, Clone, PartialEq)]
pub struct FredObservation {
    /// Month the observation covers.
    pub date: Period,
    /// M1, USD billions (FRED native unit).
    pub value_billion: f64,
    /// M1, USD trillions, rounded to two decimals.
    pub value_trillion: f64,
}

#[derive(Debug, Deserialize)]
struct FredResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    #[serde(default)]
    date: String,
    #[serde(default)]
    value: String,
}

/// Client for the FRED observations API.
pub struct FredClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_seconds: u64,
}

impl FredClient {
    pub fn new(api_key: String, timeout_seconds: u64) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url: FRED_OBSERVATIONS_URL.to_string(),
            api_key,
            timeout_seconds,
        }
    }

    /// Fetch M1SL observations, newest-first from the API, returned
    /// oldest-first.
    pub async fn fetch_m1(&self) -> Result<Vec<FredObservation>> {
        info!("Fetching M1 money supply from FRED");

        let limit = OBSERVATION_LIMIT.to_string();
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("series_id", "M1SL"),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("FRED request timed out after {}s", self.timeout_seconds)
                } else {
                    anyhow::anyhow!("Failed to reach FRED: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("FRED API error {}: {}", status, body));
        }

        let parsed: FredResponse = response
            .json()
            .await
            .context("Failed to parse FRED response")?;

        Ok(convert_observations(&parsed))
    }
}

/// Convert raw observations: skip placeholders, truncate dates to
/// months, derive trillions, reverse to chronological order.
fn convert_observations(response: &FredResponse) -> Vec<FredObservation> {
    let mut observations: Vec<FredObservation> = response
        .observations
        .iter()
        .filter_map(|raw| {
            if raw.value == MISSING_VALUE {
                return None;
            }
            let value_billion: f64 = match raw.value.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!("Skipping unparsable M1 value {:?} for {}", raw.value, raw.date);
                    return None;
                }
            };
            let date = match Period::from_date_str(&raw.date) {
                Ok(d) => d,
                Err(e) => {
                    warn!("Skipping M1 observation: {}", e);
                    return None;
                }
            };

            // M1SL is billions; conversion to trillions cannot fail
            let trillions = Quantity::new(value_billion, Unit::UsdBillion)
                .convert_to(Unit::UsdTrillion)
                .unwrap_or(value_billion / 1000.0);

            Some(FredObservation {
                date,
                value_billion,
                value_trillion: crate::metrics::round_to(trillions, 2),
            })
        })
        .collect();

    // FRED returns desc order; flip to chronological
    observations.reverse();
    observations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_from(json: &str) -> FredResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_convert_observations_chronological() {
        let response = response_from(
            r#"{
                "observations": [
                    {"date": "2025-06-01", "value": "18620.4"},
                    {"date": "2025-05-01", "value": "18570.1"},
                    {"date": "2025-04-01", "value": "18500.0"}
                ]
            }"#,
        );

        let observations = convert_observations(&response);
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].date.as_str(), "2025-04");
        assert_eq!(observations[2].date.as_str(), "2025-06");
        assert_eq!(observations[2].value_billion, 18620.4);
        assert_eq!(observations[2].value_trillion, 18.62);
    }

    #[test]
    fn test_convert_observations_skips_placeholders() {
        let response = response_from(
            r#"{
                "observations": [
                    {"date": "2025-06-01", "value": "."},
                    {"date": "2025-05-01", "value": "18570.1"},
                    {"date": "2025-04-01", "value": "garbage"},
                    {"date": "bad-date", "value": "18000.0"}
                ]
            }"#,
        );

        let observations = convert_observations(&response);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].date.as_str(), "2025-05");
    }

    #[test]
    fn test_convert_observations_skips_multibyte_date() {
        let response = response_from(
            r#"{
                "observations": [
                    {"date": "202506€01", "value": "18500.0"},
                    {"date": "2025-05-01", "value": "18570.1"}
                ]
            }"#,
        );

        let observations = convert_observations(&response);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].date.as_str(), "2025-05");
    }

    #[test]
    fn test_convert_observations_empty_response() {
        assert!(convert_observations(&response_from("{}")).is_empty());
    }

    #[test]
    fn test_trillion_rounding() {
        let response = response_from(
            r#"{"observations": [{"date": "2025-06-01", "value": "18555.5"}]}"#,
        );
        let observations = convert_observations(&response);
        assert_eq!(observations[0].value_trillion, 18.56);
    }
}
