//! Configuration types for the warmer
//!
//! Ping options are merged over built-in defaults; the file form adds the
//! invoke endpoint used by the CLI. Uses HCL (HashiCorp Configuration
//! Language) as the file format.

mod invoker;
mod warmer;

pub use invoker::{InvokerConfig, ENDPOINT_ENV};
pub use warmer::{
    WarmerConfig, WarmerOptions, DEFAULT_CONCURRENCY_FIELD, DEFAULT_DELAY_MS, DEFAULT_FLAG,
    DEFAULT_TEST_FIELD,
};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, WarmerError};

/// Top-level file configuration
///
/// # HCL Example
///
/// ```hcl
/// warmer {
///   flag  = "warmer"
///   delay = 75
/// }
///
/// invoker {
///   endpoint      = "http://127.0.0.1:3001"
///   function_name = "my-function"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Ping classification options
    #[serde(default)]
    pub warmer: WarmerOptions,

    /// Invoke transport settings
    #[serde(default)]
    pub invoker: InvokerConfig,
}

impl FileConfig {
    /// Load configuration from an HCL file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            WarmerError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_hcl(&content)
    }

    /// Parse configuration from an HCL string
    pub fn from_hcl(content: &str) -> Result<Self> {
        hcl::from_str(content)
            .map_err(|e| WarmerError::Config(format!("Failed to parse HCL config: {}", e)))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("flag", &self.warmer.flag),
            ("concurrency", &self.warmer.concurrency),
            ("test", &self.warmer.test),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(WarmerError::Config(format!(
                    "warmer.{} must not be empty",
                    name
                )));
            }
        }

        if let (Some(flag), Some(test)) = (&self.warmer.flag, &self.warmer.test) {
            if flag == test {
                return Err(WarmerError::Config(format!(
                    "warmer.flag and warmer.test both use '{}'",
                    flag
                )));
            }
        }

        let endpoint = &self.invoker.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(WarmerError::Config(format!(
                "invoker.endpoint '{}' must start with http:// or https://",
                endpoint
            )));
        }

        if self.invoker.timeout_ms == 0 {
            return Err(WarmerError::Config(
                "invoker.timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
