//! Ping classifier: decides whether an event is a warming ping and what it asks for
//!
//! Events are schema-less JSON. Field values are read leniently: anything
//! that is not a usable number collapses to a safe default, so a malformed
//! ping can never trigger fan-out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WarmerConfig;

/// Event key carrying a sibling's invocation index
pub const INVOCATION_FIELD: &str = "__WARMER_INVOCATION__";
/// Event key carrying the total invocation count of a fan-out round
pub const CONCURRENCY_FIELD: &str = "__WARMER_CONCURRENCY__";
/// Event key carrying the round's correlation id
pub const CORRELATION_FIELD: &str = "__WARMER_CORRELATIONID__";

/// Parameters extracted from a warming ping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPing {
    /// Number of concurrent environments requested (>= 1)
    pub concurrency: u32,
    /// Position of this invocation within the round (>= 1)
    pub invocation_index: u32,
    /// Size of the round this invocation belongs to (>= 1)
    pub invocation_total: u32,
    /// Correlation id shared by every invocation of the round
    pub correlation_id: String,
}

/// Classify an event. Returns `None` when it is not a warming ping.
pub fn classify(event: &Value, config: &WarmerConfig) -> Option<ClassifiedPing> {
    if !is_truthy(event.get(&config.flag)) {
        return None;
    }

    let concurrency = positive_count(event.get(&config.concurrency_field)).unwrap_or(1);
    let invocation_index = positive_count(event.get(INVOCATION_FIELD)).unwrap_or(1);
    let invocation_total = positive_count(event.get(CONCURRENCY_FIELD)).unwrap_or(concurrency);

    let correlation_id = match event.get(CORRELATION_FIELD) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(v) if is_truthy(Some(v)) => v.to_string(),
        _ => config.correlation_id.clone(),
    };

    Some(ClassifiedPing {
        concurrency,
        invocation_index,
        invocation_total,
        correlation_id,
    })
}

/// Whether a field should count as "set": absent, `null`, `false`, `0`,
/// `NaN` and `""` do not; everything else does.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Read a numeric field as a whole count. Numbers and numeric strings are
/// accepted and floored; values below 1 and non-numeric values yield `None`.
fn positive_count(value: Option<&Value>) -> Option<u32> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() || n < 1.0 {
        return None;
    }
    Some(n.floor().min(u32::MAX as f64) as u32)
}
