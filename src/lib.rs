//! Smellcheck - code smell analysis client.
//!
//! Smellcheck submits source code to a remote code smell detection service
//! and reports what comes back: rule-based findings, aggregate metrics and
//! a binary "has code smell" prediction with its confidence.
//!
//! # Architecture
//!
//! - `buffer`: the source text and its language tag
//! - `session`: the analysis lifecycle state machine (idle, in flight,
//!   succeeded, failed) with generation-tagged dispatch
//! - `result`: response validation and the held result model
//! - `severity`: severity labels to display tiers and icons
//! - `client`: transport trait and the HTTP client for the service
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)

pub mod buffer;
pub mod cli;
pub mod client;
pub mod config;
pub mod report;
pub mod result;
pub mod session;
pub mod severity;

pub use buffer::{CodeBuffer, Language};
pub use client::{AnalysisRequest, ServiceClient, Transport, TransportError};
pub use config::Config;
pub use result::{Finding, MalformedResponse, MetricsSnapshot, MlPrediction, ResultModel};
pub use session::{AnalysisError, AnalysisSession, Completion, SessionState, Status};
pub use severity::{classify, Classification, Icon, Tier};
