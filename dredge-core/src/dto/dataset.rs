//! Dataset API DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One item of a batch request: plain key/value parameters
pub type Record = Map<String, Value>;

/// Ordered list of records sent as the body of a trigger call
///
/// Built by platform-specific code; the workflow only needs its length and
/// its JSON form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestPayload(Vec<Record>);

impl RequestPayload {
    /// Payload with one `{"url": ...}` record per URL
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            urls.into_iter()
                .map(|url| {
                    let mut record = Record::new();
                    record.insert("url".to_string(), Value::String(url.into()));
                    record
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

}

impl From<Vec<Record>> for RequestPayload {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl TryFrom<Value> for RequestPayload {
    type Error = serde_json::Error;

    /// Accepts either a JSON array of objects or a single object
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(record) => Ok(Self(vec![record])),
            other => serde_json::from_value(other),
        }
    }
}

/// Format requested from the snapshot endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Json,
    Raw,
}

impl ResultFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "raw" => Ok(Self::Raw),
            other => Err(format!("unknown result format '{other}' (expected json or raw)")),
        }
    }
}

/// Body of a successful trigger call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

/// Body of a progress call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_urls_builds_url_records() {
        let payload = RequestPayload::from_urls(["https://a.example", "https://b.example"]);
        assert_eq!(payload.len(), 2);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!([{"url": "https://a.example"}, {"url": "https://b.example"}])
        );
    }

    #[test]
    fn test_try_from_value() {
        let single = RequestPayload::try_from(json!({"keyword": "shoes"})).unwrap();
        assert_eq!(single.len(), 1);

        let many = RequestPayload::try_from(json!([{"a": 1}, {"b": 2}])).unwrap();
        assert_eq!(many.len(), 2);

        assert!(RequestPayload::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn test_result_format_parsing() {
        assert_eq!("JSON".parse::<ResultFormat>().unwrap(), ResultFormat::Json);
        assert_eq!("raw".parse::<ResultFormat>().unwrap(), ResultFormat::Raw);
        assert!("csv".parse::<ResultFormat>().is_err());
    }

    #[test]
    fn test_trigger_response_missing_id() {
        let body: TriggerResponse = serde_json::from_str("{}").unwrap();
        assert!(body.snapshot_id.is_none());
    }
}
