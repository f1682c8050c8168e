//! Contract domain records.
//!
//! These are the shared shapes every other module works over: contract
//! metadata with its processing lifecycle, and the derived records a parse
//! produces (clauses, obligations, milestones — see [`clause`]), risk
//! assessments ([`risk`]) and insights ([`insight`]).

pub mod clause;
pub mod insight;
pub mod risk;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProcessingFailure;

/// Infrastructure sub-domain a contract belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    #[default]
    Infrastructure,
    Renewables,
    Transmission,
    Roadways,
    Metro,
    Airport,
}

impl ContractType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Renewables => "renewables",
            Self::Transmission => "transmission",
            Self::Roadways => "roadways",
            Self::Metro => "metro",
            Self::Airport => "airport",
        }
    }

    /// Guess the sub-domain from an uploaded file name.
    ///
    /// Used when the uploader does not state a type. Matches are keyword
    /// based and case-insensitive: "solar-plant.pdf" lands in renewables,
    /// "metro-phase2.pdf" in metro, and anything unrecognized falls back to
    /// general infrastructure.
    pub fn infer_from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        let contains_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if contains_any(&["solar", "wind"]) {
            Self::Renewables
        } else if contains_any(&["metro", "rail"]) {
            Self::Metro
        } else if contains_any(&["road", "highway"]) {
            Self::Roadways
        } else if contains_any(&["airport"]) {
            Self::Airport
        } else if contains_any(&["transmission", "grid"]) {
            Self::Transmission
        } else {
            Self::Infrastructure
        }
    }
}

/// Processing lifecycle state of a contract.
///
/// Reachable transitions are exactly
/// `uploading → parsing → analyzing → completed`, with `error` reachable
/// from any non-terminal state. `completed` and `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Uploading,
    Parsing,
    Analyzing,
    Completed,
    Error,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Parsing => "parsing",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// The five categories clauses and risk buckets are filed under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContractCategory {
    Financial,
    Legal,
    Operational,
    Regulatory,
    External,
}

impl ContractCategory {
    pub const ALL: [Self; 5] = [
        Self::Financial,
        Self::Legal,
        Self::Operational,
        Self::Regulatory,
        Self::External,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Financial => "financial",
            Self::Legal => "legal",
            Self::Operational => "operational",
            Self::Regulatory => "regulatory",
            Self::External => "external",
        }
    }
}

/// A file handed to the service for processing.
///
/// The service never reads the bytes itself (extraction belongs to the
/// analysis backend), so only identity and size travel with the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractUpload {
    pub file_name: String,
    pub size_bytes: u64,
}

impl ContractUpload {
    pub fn new(file_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes,
        }
    }

    /// Build an upload descriptor from a file on disk.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            file_name,
            size_bytes: metadata.len(),
        })
    }

    /// Display name: the file name with its final extension stripped.
    pub fn display_name(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => self.file_name.clone(),
        }
    }
}

/// Registry entry for an uploaded contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    pub upload_date: DateTime<Utc>,
    pub file_size: u64,
    pub file_path: String,
    pub status: ContractStatus,
    pub total_pages: u32,
    pub parsing_progress: u8,
    pub analysis_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProcessingFailure>,
}

impl ContractMetadata {
    /// Fresh registry entry for a new upload, in `uploading` with zeroed
    /// progress.
    pub fn register(upload: &ContractUpload, contract_type: ContractType) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: upload.display_name(),
            contract_type,
            upload_date: Utc::now(),
            file_size: upload.size_bytes,
            file_path: format!("/uploads/{id}/{}", upload.file_name),
            status: ContractStatus::Uploading,
            total_pages: 0,
            parsing_progress: 0,
            analysis_progress: 0,
            failure: None,
        }
    }
}
