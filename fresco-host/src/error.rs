//! Error types for the application host.
//!
//! None of these cross the custom-tag contract: fetch and parse failures
//! are contained and logged at the point of failure, and unmount is always
//! best-effort.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("markup fetch failed: {url}: {reason}")]
    MarkupFetch { url: String, reason: String },

    #[error("resource fetch failed: {url}: {reason}")]
    ResourceFetch { url: String, reason: String },

    #[error("malformed markup: no parseable root")]
    MalformedMarkup,

    #[error("application not found: {0}")]
    AppNotFound(String),

    #[error("script evaluation failed: {app}: {reason}")]
    ScriptEvaluation { app: String, reason: String },
}
