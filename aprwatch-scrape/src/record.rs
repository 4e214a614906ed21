use std::path::Path;

use aprwatch_common::{AprError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::info;

/// JSON number for `value`, written without a fraction when it is integral.
pub fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Value::from(value as i64);
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Flat key/value output of one pipeline plus its capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "lastObtainedTimeMs")]
    pub captured_at_millis: i64,
}

impl ResultRecord {
    /// Stamp `fields` with the current wall-clock time.
    pub fn capture(fields: Map<String, Value>) -> Self {
        Self::at(fields, Utc::now().timestamp_millis())
    }

    pub fn at(fields: Map<String, Value>, captured_at_millis: i64) -> Self {
        Self {
            fields,
            captured_at_millis,
        }
    }
}

/// Serializes records to their artifact files.
pub struct ResultWriter;

impl ResultWriter {
    /// Overwrite `path` with the compact JSON form of `record`.
    pub async fn write(path: &Path, record: &ResultRecord) -> Result<()> {
        let body = serde_json::to_vec(record)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AprError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, &body)
            .await
            .map_err(|source| AprError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            target: "scrape.writer",
            path = %path.display(),
            fields = record.fields.len(),
            bytes = body.len(),
            "artifact written"
        );
        Ok(())
    }
}
