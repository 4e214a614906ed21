//! Lookup-and-transform over the public pool feed.

use std::time::Duration;

use aprwatch_http::{HttpClient, HttpError};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::record::json_number;

/// Fixed-point scale of `totalSupply`.
const SUPPLY_SCALE: f64 = 1e18;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] HttpError),
}

/// One pool entry of the feed. Unknown fields are ignored.
///
/// Older feeds spell the primary rate `totalRewardRate`; when a record
/// carries both spellings, `apr` wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    pub pool_id: u64,
    #[serde(default)]
    pub apr: Option<f64>,
    #[serde(default)]
    pub total_reward_rate: Option<f64>,
    #[serde(rename = "apr2", default)]
    pub secondary_reward_rate: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub total_supply: f64,
}

impl FeedRecord {
    /// Decode one feed entry. Records without any primary rate are rejected.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let record: FeedRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;
        if record.reward_rate().is_none() {
            return Err("neither apr nor totalRewardRate is set".into());
        }
        Ok(record)
    }

    /// Primary reward rate, `apr` first.
    pub fn reward_rate(&self) -> Option<f64> {
        self.apr.or(self.total_reward_rate)
    }

    /// Combined reward rate of both reward tokens.
    pub fn combined_apr(&self) -> f64 {
        self.reward_rate().unwrap_or(0.0) + self.secondary_reward_rate.unwrap_or(0.0)
    }

    /// Total supply scaled down from 18 decimals, rendered with two places.
    pub fn supply(&self) -> String {
        format!("{:.2}", self.total_supply / SUPPLY_SCALE)
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Single-GET client for the feed.
#[derive(Debug, Clone)]
pub struct FeedExtractor {
    http: HttpClient,
}

impl FeedExtractor {
    pub fn new(url: &Url, timeout: Duration) -> Result<Self, FeedError> {
        let http = HttpClient::new(url.as_str())?.with_timeout(timeout);
        Ok(Self { http })
    }

    /// Fetch the feed once. Entries that fail to decode are skipped.
    pub async fn fetch_all(&self) -> Result<Vec<FeedRecord>, FeedError> {
        let raw: Vec<Value> = self.http.get_json().await?;
        let total = raw.len();
        let records = decode_records(raw);
        info!(
            target: "scrape.feed",
            url = %self.http.url(),
            records = records.len(),
            skipped = total - records.len(),
            "feed fetched"
        );
        Ok(records)
    }

    /// Write `{name}_apr` and `{name}_supply` for the first record with
    /// `pool_id`. A missing pool leaves `acc` untouched.
    pub fn extract_one(
        records: &[FeedRecord],
        pool_id: u64,
        name: &str,
        acc: &mut Map<String, Value>,
    ) {
        let Some(record) = records.iter().find(|r| r.pool_id == pool_id) else {
            debug!(target: "scrape.feed", pool_id, name, "pool absent from feed");
            return;
        };
        acc.insert(format!("{name}_apr"), json_number(record.combined_apr()));
        acc.insert(format!("{name}_supply"), Value::String(record.supply()));
    }
}

fn decode_records(raw: Vec<Value>) -> Vec<FeedRecord> {
    raw.into_iter()
        .filter_map(|item| {
            let pool_id = item.get("poolId").cloned().unwrap_or(Value::Null);
            match FeedRecord::from_value(item) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(target: "scrape.feed", pool_id = %pool_id, %error, "skipping malformed feed record");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<FeedRecord> {
        let raw = json!([
            { "poolId": 11, "apr": 3.0, "apr2": 2.0, "totalSupply": 2.5e18, "lpAddress": "0xabc" },
            { "poolId": 5, "totalRewardRate": 7.5, "totalSupply": "1234567890000000000000" },
            { "poolId": 11, "apr": 99.0, "totalSupply": 0 }
        ]);
        decode_records(serde_json::from_value(raw).unwrap())
    }

    #[test]
    fn decodes_both_rate_spellings_and_supply_forms() {
        let rs = records();
        assert_eq!(rs[0].secondary_reward_rate, Some(2.0));
        assert_eq!(rs[1].reward_rate(), Some(7.5));
        assert_eq!(rs[1].secondary_reward_rate, None);
        assert_eq!(rs[1].supply(), "1234.57");
    }

    #[test]
    fn apr_wins_when_both_rate_spellings_are_present() {
        let record = FeedRecord::from_value(json!({
            "poolId": 11, "apr": 4.0, "totalRewardRate": 40.0, "totalSupply": 0
        }))
        .unwrap();
        assert_eq!(record.reward_rate(), Some(4.0));
        assert_eq!(record.combined_apr(), 4.0);
    }

    #[test]
    fn records_without_a_rate_are_rejected() {
        let err = FeedRecord::from_value(json!({ "poolId": 3, "apr": null, "totalSupply": 1 }))
            .unwrap_err();
        assert!(err.contains("totalRewardRate"));
    }

    #[test]
    fn malformed_records_are_skipped_individually() {
        let raw = vec![
            json!({ "poolId": 99, "apr": "high", "totalSupply": 1 }),
            json!({ "poolId": 11, "apr": 1.0, "totalSupply": 0 }),
            json!({ "poolId": 98, "apr": 2.0 }),
            json!("not an object"),
            json!({ "poolId": 5, "totalRewardRate": 2.0, "totalSupply": "abc" }),
        ];
        let ids: Vec<u64> = decode_records(raw).iter().map(|r| r.pool_id).collect();
        assert_eq!(ids, [11]);
    }

    #[test]
    fn first_matching_record_wins() {
        let mut acc = Map::new();
        FeedExtractor::extract_one(&records(), 11, "xTRI_stNEAR", &mut acc);
        assert_eq!(acc["xTRI_stNEAR_apr"], json!(5));
        assert_eq!(acc["xTRI_stNEAR_supply"], json!("2.50"));
    }

    #[test]
    fn missing_pool_is_a_no_op() {
        let mut acc = Map::new();
        acc.insert("keep".into(), json!(1));
        FeedExtractor::extract_one(&records(), 12, "stNEAR_wNear", &mut acc);
        assert_eq!(acc.len(), 1);
    }
}
