//! Environment metadata: read-only view of the process state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::ProcessState;

/// Metadata about this execution environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Process identity
    pub identity: String,
    /// Whether any event has been observed
    pub warm: bool,
    /// Last observed event, epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_access: Option<DateTime<Utc>>,
    /// Seconds since `last_access`, rounded to one decimal
    pub seconds_since_last_access: Option<f64>,
    /// Function this environment belongs to
    pub function_name: Option<String>,
}

/// Report metadata for a process. Never modifies the state.
pub fn report(state: &ProcessState, function_name: Option<&str>) -> Metadata {
    let snapshot = state.snapshot();
    Metadata {
        identity: snapshot.identity,
        warm: snapshot.warm,
        last_access: snapshot.last_access,
        seconds_since_last_access: snapshot.seconds_since_last_access,
        function_name: function_name.map(str::to_string),
    }
}
