//! Error types shared across the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Configuration resolution errors, keyed by the offending variable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value '{key}'")]
    MissingValue { key: String },

    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by an analysis backend.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The backend did not respond within the configured deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },

    /// The backend rejected the request or returned an unusable response.
    #[error("analysis backend error: {message}")]
    Backend { message: String },

    #[error("analysis backend transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors surfaced by the synchronous service surface.
///
/// The pipeline itself never returns these to the uploader; upload always
/// succeeds and later failures land on the contract record as a
/// [`ProcessingFailure`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown contract '{id}'")]
    UnknownContract { id: Uuid },

    #[error("comparison requires at least two contracts, got {got}")]
    NotEnoughContracts { got: usize },

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// Which pipeline phase a contract failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Upload,
    Parse,
    Analysis,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Parse => "parse",
            Self::Analysis => "analysis",
        }
    }
}

/// Structured failure recorded on a contract when processing aborts.
///
/// Replaces the bare `error` status flag so failures stay diagnosable: the
/// terminal status still moves to `error`, but the phase and the backend
/// message survive on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingFailure {
    pub kind: FailureKind,
    pub message: String,
    pub failed_at: DateTime<Utc>,
}

impl ProcessingFailure {
    pub fn new(kind: FailureKind, source: &AnalyzerError) -> Self {
        Self {
            kind,
            message: source.to_string(),
            failed_at: Utc::now(),
        }
    }
}
