//! Progress events emitted by the pipeline.
//!
//! Observers subscribe once and receive every status/progress transition;
//! no external polling timer is required. Snapshot reads on the service
//! remain valid for consumers that prefer to poll.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::contract::{ContractMetadata, ContractStatus};

/// One pipeline transition, as observed on the contract record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEvent {
    pub contract_id: Uuid,
    pub status: ContractStatus,
    pub parsing_progress: u8,
    pub analysis_progress: u8,
    pub at: DateTime<Utc>,
}

impl ContractEvent {
    pub(crate) fn from_metadata(meta: &ContractMetadata) -> Self {
        Self {
            contract_id: meta.id,
            status: meta.status,
            parsing_progress: meta.parsing_progress,
            analysis_progress: meta.analysis_progress,
            at: Utc::now(),
        }
    }

    /// True once the contract can no longer change state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::ContractEvent;
    use crate::contract::{ContractMetadata, ContractStatus, ContractType, ContractUpload};

    #[test]
    fn event_mirrors_the_record_snapshot() {
        let mut meta = ContractMetadata::register(
            &ContractUpload::new("grid-upgrade.pdf", 64),
            ContractType::Transmission,
        );
        meta.status = ContractStatus::Analyzing;
        meta.parsing_progress = 100;

        let event = ContractEvent::from_metadata(&meta);
        assert_eq!(event.contract_id, meta.id);
        assert_eq!(event.status, ContractStatus::Analyzing);
        assert_eq!(event.parsing_progress, 100);
        assert_eq!(event.analysis_progress, 0);
        assert!(!event.is_terminal());
    }
}
