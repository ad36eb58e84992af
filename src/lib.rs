//! # Lambda Warmer
//!
//! Keeps serverless functions warm. Recognizes synthetic warming pings and,
//! when a ping asks for more than one concurrent environment, fans out
//! self-invocations so that many execution environments stay initialized.
//!
//! ## Architecture
//!
//! ```text
//! event → ProcessState::touch → classify → FanOutCoordinator ─┬─► siblings 2..N (Event)
//!                                                             ├─► sibling N (RequestResponse)
//!                                                             └─► delay (when this is a sibling)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lambda_warmer::{HttpInvoker, Warmer, WarmerOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> lambda_warmer::Result<()> {
//!     let warmer = Warmer::from_env(Arc::new(HttpInvoker::new("http://127.0.0.1:3001")));
//!
//!     let event = serde_json::json!({ "warmer": true, "concurrency": 3 });
//!     if warmer.handle_ping(&event, &WarmerOptions::default()).await? {
//!         return Ok(()); // warming ping, skip the real handler
//!     }
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod delay;
pub mod error;
pub mod fanout;
pub mod invoker;
pub mod observability;
pub mod state;
pub mod warmer;

// Re-export main types
pub use classifier::{classify, ClassifiedPing};
pub use config::{FileConfig, InvokerConfig, WarmerConfig, WarmerOptions};
pub use error::{Result, WarmerError};
pub use fanout::{FanOutCoordinator, FanOutDecision, FanOutOutcome, SiblingPayload, SiblingPlan};
pub use invoker::{HttpInvoker, InvocationType, InvokeOutcome, InvokeRequest, Invoker};
pub use observability::Metadata;
pub use state::{Clock, ProcessState, StateSnapshot, SystemClock, WarmState};
pub use warmer::Warmer;
