//! Invoker: trait and implementations for sending sibling invocations
//!
//! Provides the `Invoker` async trait with two implementations:
//! - `HttpInvoker`: calls a Lambda-compatible invoke API over HTTP
//! - `MockInvoker`: records requests in memory (for tests)

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::InvokerConfig;
use crate::error::{Result, WarmerError};

/// How the target should be invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationType {
    /// Wait for the function to finish and return its response
    RequestResponse,
    /// Queue the invocation and return as soon as it is accepted
    Event,
}

impl InvocationType {
    /// Whether the caller waits for the function to complete
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::RequestResponse)
    }
}

impl std::fmt::Display for InvocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestResponse => write!(f, "RequestResponse"),
            Self::Event => write!(f, "Event"),
        }
    }
}

/// A single invocation to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Target function name
    pub function_name: String,
    /// Sync or async invocation
    pub invocation_type: InvocationType,
    /// Position in the warming round (1 for an externally sent ping)
    pub index: u32,
    /// Serialized JSON payload
    pub payload: Bytes,
}

/// What the invoker reported back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvokeOutcome {
    /// Status code returned by the invoke API
    pub status_code: u16,
    /// Response body (empty for `Event` invocations)
    pub payload: Bytes,
}

/// Async trait for invoking a function instance
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Send one invocation
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeOutcome>;

    /// Invoker name (for logging)
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// HttpInvoker: calls a Lambda-compatible invoke API over HTTP
// ---------------------------------------------------------------------------

/// Invoker that posts to `{endpoint}/2015-03-31/functions/{name}/invocations`
pub struct HttpInvoker {
    /// Base URL of the invoke API (e.g., "http://127.0.0.1:3001")
    endpoint: String,
    /// HTTP client
    client: reqwest::Client,
}

impl HttpInvoker {
    /// Create a new HTTP invoker with default client settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create an HTTP invoker from configuration
    pub fn from_config(config: &InvokerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Invoke URL for a function
    pub fn invoke_url(&self, function_name: &str) -> String {
        format!(
            "{}/2015-03-31/functions/{}/invocations",
            self.endpoint, function_name
        )
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeOutcome> {
        let url = self.invoke_url(&request.function_name);
        let failed = |message: String| WarmerError::Invoke {
            function: request.function_name.clone(),
            index: request.index,
            message,
        };

        let resp = self
            .client
            .post(&url)
            .header("X-Amz-Invocation-Type", request.invocation_type.to_string())
            .header("X-Amz-Log-Type", "None")
            .header("Content-Type", "application/json")
            .body(request.payload.clone())
            .send()
            .await
            .map_err(|e| failed(format!("invoke request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(failed(format!("invoke API returned {}: {}", status, body)));
        }

        // A function error still answers 200, flagged by this header
        if let Some(kind) = resp.headers().get("X-Amz-Function-Error") {
            let kind = kind.to_str().unwrap_or("Unhandled").to_string();
            return Err(failed(format!("function returned error: {}", kind)));
        }

        let payload = resp
            .bytes()
            .await
            .map_err(|e| failed(format!("reading invoke response failed: {}", e)))?;
        Ok(InvokeOutcome {
            status_code: status.as_u16(),
            payload,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// MockInvoker: records requests for testing
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) use mock::MockInvoker;
