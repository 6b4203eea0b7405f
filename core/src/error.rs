//! Error types for the search engine client.
//!
//! # Design
//! The engine reports most problems as structured JSON, and a 404 is often
//! an answer rather than a failure (`found: false`, a missing alias). Only
//! statuses outside 2xx and 404 become `Engine` errors, and those keep the
//! raw body text so callers can inspect whatever the engine sent.

use thiserror::Error;

/// Errors returned by `EsClient` parse methods and `SearchClient` calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP round-trip itself failed (connection refused, DNS, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine answered with a status outside 2xx and 404.
    #[error("HTTP {status}: {body}")]
    Engine { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The configured endpoint is not a usable base URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Status code of an engine-reported failure, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Engine { status, .. } => Some(*status),
            _ => None,
        }
    }
}
