//! Diagnostic-record envelope.
//!
//! The ledger does not care what a payload means, with one exception: a
//! payload tagged `"type": "diagnostic_record"` is a saved diagnosis, and
//! listing records means unwrapping those.
//!
//! ```text
//! { "type": "diagnostic_record", "record": { ...caller fields... }, "timestamp": 1712345678.12 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DIAGNOSTIC_RECORD_TYPE;

/// A diagnostic record wrapped for storage in a block payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEnvelope {
    /// Always [`DIAGNOSTIC_RECORD_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Caller-supplied fields, stored verbatim.
    pub record: Value,
    /// When the record was wrapped (Unix seconds).
    pub timestamp: f64,
}

impl DiagnosticEnvelope {
    pub fn new(record: Value, timestamp: f64) -> Self {
        Self {
            kind: DIAGNOSTIC_RECORD_TYPE.to_string(),
            record,
            timestamp,
        }
    }

    /// The envelope as a block payload.
    pub fn into_payload(self) -> Value {
        let mut map = Map::with_capacity(3);
        map.insert("type".into(), Value::String(self.kind));
        map.insert("record".into(), self.record);
        map.insert("timestamp".into(), Value::from(self.timestamp));
        Value::Object(map)
    }

    /// True if `payload` carries the diagnostic tag.
    pub fn is_diagnostic(payload: &Value) -> bool {
        payload
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == DIAGNOSTIC_RECORD_TYPE)
    }

    /// Unwrap the caller's record from a tagged payload.
    ///
    /// Returns `None` for untagged payloads. A tagged payload without a
    /// `record` field yields an empty object.
    pub fn unwrap_record(payload: &Value) -> Option<Value> {
        if !Self::is_diagnostic(payload) {
            return None;
        }
        Some(
            payload
                .get("record")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_payload_shape() {
        let payload = DiagnosticEnvelope::new(json!({ "patient": "A" }), 12.5).into_payload();
        assert_eq!(
            payload,
            json!({ "type": "diagnostic_record", "record": { "patient": "A" }, "timestamp": 12.5 })
        );
    }

    #[test]
    fn envelope_serde_matches_payload() {
        let envelope = DiagnosticEnvelope::new(json!({ "x": 1 }), 3.0);
        let via_serde = serde_json::to_value(&envelope).unwrap();
        assert_eq!(via_serde, envelope.into_payload());
    }

    #[test]
    fn unwrap_record_filters_untagged_payloads() {
        assert!(DiagnosticEnvelope::unwrap_record(&json!("Genesis")).is_none());
        assert!(DiagnosticEnvelope::unwrap_record(&json!({ "type": "other" })).is_none());
        assert!(DiagnosticEnvelope::unwrap_record(&json!({ "record": {} })).is_none());
        assert!(DiagnosticEnvelope::unwrap_record(&json!(7)).is_none());
    }

    #[test]
    fn unwrap_record_returns_inner_fields() {
        let payload = DiagnosticEnvelope::new(json!({ "patient": "B" }), 1.0).into_payload();
        assert_eq!(
            DiagnosticEnvelope::unwrap_record(&payload),
            Some(json!({ "patient": "B" }))
        );
    }

    #[test]
    fn tagged_payload_without_record_yields_empty_object() {
        let payload = json!({ "type": "diagnostic_record" });
        assert_eq!(DiagnosticEnvelope::unwrap_record(&payload), Some(json!({})));
    }
}
