//! Invoker configuration: where sibling invocations are sent

use serde::{Deserialize, Serialize};

/// Environment variable holding the invoke endpoint
pub const ENDPOINT_ENV: &str = "WARMER_INVOKE_ENDPOINT";

/// HTTP invoker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokerConfig {
    /// Base URL of a Lambda-compatible invoke API (e.g., "http://127.0.0.1:3001")
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Target function name; falls back to `AWS_LAMBDA_FUNCTION_NAME` when unset
    #[serde(default)]
    pub function_name: Option<String>,

    /// Request timeout in milliseconds (default: 30000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            function_name: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl InvokerConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| default_endpoint()),
            ..Default::default()
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}
