//! # Result Envelope
//!
//! Every action invocation produces exactly one envelope. It is the only shape
//! ever recorded in memory as an action result, embedded as JSON text, so it
//! must survive a serialize/parse round trip unchanged.
//!
//! Wire format:
//!
//! ```json
//! {"tool_executed": true, "result": <any>, "timestamp": "2026-01-31T12:00:00+0000"}
//! {"tool_executed": false, "error": "...", "traceback": "..."}
//! ```

use crate::error::{self, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Timestamp format for successful envelopes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Outcome of one action execution
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEnvelope {
    Success { result: Value, timestamp: String },
    Failure { error: String, traceback: String },
}

impl ResultEnvelope {
    /// Wrap a returned value, stamped with the current local time
    pub fn success(result: Value) -> Self {
        Self::Success {
            result,
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn failure(error: impl Into<String>, traceback: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            traceback: traceback.into(),
        }
    }

    pub fn tool_executed(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The returned value of a successful execution
    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error, .. } => Some(error),
            Self::Success { .. } => None,
        }
    }

    /// Serialize to the text stored in memory
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            error::serialization_error(format!("Failed to serialize envelope: {}", e))
                .with_operation("envelope::to_json")
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            error::parse_error(format!("Invalid result envelope: {}", e))
                .with_operation("envelope::from_json")
        })
    }

    /// Human-readable rendering of the result: strings are shown as-is,
    /// everything else as pretty JSON
    pub fn display_result(&self) -> String {
        match self {
            Self::Success {
                result: Value::String(s),
                ..
            } => s.clone(),
            Self::Success { result, .. } => {
                serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
            }
            Self::Failure { error, .. } => error.clone(),
        }
    }
}

// =============================================================================
// Wire representation
// =============================================================================

#[derive(Serialize, Deserialize)]
struct EnvelopeRepr {
    tool_executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    traceback: Option<String>,
}

impl Serialize for ResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let repr = match self {
            Self::Success { result, timestamp } => EnvelopeRepr {
                tool_executed: true,
                // A null result is written explicitly so the key is always present
                result: Some(result.clone()),
                timestamp: Some(timestamp.clone()),
                error: None,
                traceback: None,
            },
            Self::Failure { error, traceback } => EnvelopeRepr {
                tool_executed: false,
                result: None,
                timestamp: None,
                error: Some(error.clone()),
                traceback: Some(traceback.clone()),
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResultEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = EnvelopeRepr::deserialize(deserializer)?;
        if repr.tool_executed {
            Ok(Self::Success {
                result: repr.result.unwrap_or(Value::Null),
                timestamp: repr.timestamp.unwrap_or_default(),
            })
        } else {
            Ok(Self::Failure {
                error: repr.error.unwrap_or_default(),
                traceback: repr.traceback.unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::{Cell, Series};
    use serde_json::json;

    fn round_trip(result: Value) {
        let envelope = ResultEnvelope::success(result.clone());
        let text = envelope.to_json().unwrap();
        let parsed = ResultEnvelope::from_json(&text).unwrap();
        assert_eq!(parsed.result(), Some(&result));
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_round_trip_representative_values() {
        round_trip(json!(42.5));
        round_trip(json!([
            {"sbti_id": 1, "company": "Acme"},
            {"sbti_id": 2, "company": null}
        ]));
        round_trip(json!({"shape": [3, 2], "columns": {"a": {"mean": 1.5}}}));
        round_trip(Value::Null);
    }

    #[test]
    fn test_round_trip_keeps_every_float_bit() {
        let mut floats = vec![985.6906946328695, 212.91890726713459, 479.60756426982596, 0.1 + 0.2];

        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..20_000 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            floats.push((state >> 11) as f64 / (1u64 << 53) as f64 * 1000.0);
        }

        let revenue = Series::new(
            "revenue",
            [12.7, 19.3, 4.05, 88.1, 37.42].into_iter().map(Cell::Float).collect(),
        );
        for stat in [revenue.mean().unwrap(), revenue.std().unwrap()] {
            floats.push(stat.as_f64().unwrap());
        }

        for f in floats {
            let envelope = ResultEnvelope::success(json!({"mean": f}));
            let parsed = ResultEnvelope::from_json(&envelope.to_json().unwrap()).unwrap();
            let back = parsed.result().unwrap()["mean"].as_f64().unwrap();
            assert_eq!(back.to_bits(), f.to_bits(), "{} came back as {}", f, back);
        }
    }

    #[test]
    fn test_success_wire_shape() {
        let envelope = ResultEnvelope::success(json!(["a.csv"]));
        let value: Value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["tool_executed"], true);
        assert_eq!(value["result"], json!(["a.csv"]));
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_null_result_key_present() {
        let value = serde_json::to_value(ResultEnvelope::success(Value::Null)).unwrap();
        assert!(value.as_object().unwrap().contains_key("result"));
    }

    #[test]
    fn test_failure_wire_shape() {
        let envelope = ResultEnvelope::failure("File not found at path: X", "trace");
        let value: Value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({"tool_executed": false, "error": "File not found at path: X", "traceback": "trace"})
        );
        assert!(!envelope.tool_executed());
        assert_eq!(envelope.error(), Some("File not found at path: X"));
    }

    #[test]
    fn test_display_result() {
        let text = ResultEnvelope::success(json!("done\nTerminating..."));
        assert_eq!(text.display_result(), "done\nTerminating...");

        let list = ResultEnvelope::success(json!([1, 2]));
        assert!(list.display_result().contains('1'));
    }

    #[test]
    fn test_invalid_envelope_text() {
        assert!(ResultEnvelope::from_json("not json").is_err());
    }
}
