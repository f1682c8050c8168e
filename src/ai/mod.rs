//! The contract analysis capability.
//!
//! [`ContractAnalyzer`] is the seam between the service and whatever
//! actually reads documents: the pipeline only ever talks to
//! `Arc<dyn ContractAnalyzer>`, so swapping the fixture backend for a real
//! inference endpoint is a configuration change, not a code change.
//!
//! Two backends exist:
//!
//! - [`mock::MockAnalyzer`] (default): fixture data after simulated latency
//! - [`openai::OpenAiAnalyzer`]: HTTP backend speaking a JSON analysis API

pub mod mock;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AiConfig, AnalyzerBackend};
use crate::contract::clause::{ContractClause, ContractMilestone, ContractObligation, RiskLevel};
use crate::contract::insight::AiInsight;
use crate::contract::risk::RiskAssessment;
use crate::contract::{ContractType, ContractUpload};
use crate::error::{AnalyzerError, ConfigError};

/// Document-level facts a parse produces alongside the structured records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    pub total_pages: u32,
    pub document_type: String,
    pub extracted_at: DateTime<Utc>,
}

/// Everything a successful parse yields for one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedContract {
    pub clauses: Vec<ContractClause>,
    pub obligations: Vec<ContractObligation>,
    pub milestones: Vec<ContractMilestone>,
    pub metadata: ParseMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseSimilarity {
    pub clause_type: String,
    /// 0–100.
    pub similarity: u8,
    pub contracts: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseVariation {
    pub contract_id: Uuid,
    pub content: String,
    pub risk_implication: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseDifference {
    pub clause_type: String,
    pub variations: Vec<ClauseVariation>,
}

/// Similarity/difference report over two or more contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub similarities: Vec<ClauseSimilarity>,
    pub differences: Vec<ClauseDifference>,
    pub recommendations: Vec<String>,
}

/// Filters accompanying a search query. All fields are conjunctive; empty
/// lists mean "no restriction".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub contract_types: Vec<ContractType>,
    pub risk_levels: Vec<RiskLevel>,
    pub sections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedClause {
    pub clause_id: Uuid,
    pub title: String,
    pub snippet: String,
    /// 0–100.
    pub relevance: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub contract_id: Uuid,
    /// 0–100.
    pub relevance: u8,
    pub matched_clauses: Vec<MatchedClause>,
}

/// Relevance-ranked result set for a text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    pub total_results: usize,
    pub search_time_ms: u64,
}

/// The analysis backend the pipeline orchestrates against.
///
/// Every operation that derives records for a specific contract receives
/// the owning contract id, so derived rows are created with a valid
/// `contract_id` from the start.
#[async_trait]
pub trait ContractAnalyzer: Send + Sync {
    /// Extract structured data from an uploaded document.
    async fn parse(
        &self,
        contract_id: Uuid,
        upload: &ContractUpload,
    ) -> Result<ParsedContract, AnalyzerError>;

    /// Score a contract's risk exposure from its parsed clauses.
    async fn assess_risk(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<RiskAssessment, AnalyzerError>;

    /// Produce discrete observations about a contract.
    async fn generate_insights(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<Vec<AiInsight>, AnalyzerError>;

    /// Similarity/difference report across two or more contracts.
    async fn compare(&self, contract_ids: &[Uuid]) -> Result<ComparisonReport, AnalyzerError>;

    /// Relevance-ranked search over contract content.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResults, AnalyzerError>;
}

/// Build the analyzer selected by configuration.
pub fn analyzer_from_config(config: &AiConfig) -> Result<Arc<dyn ContractAnalyzer>, ConfigError> {
    match config.backend {
        AnalyzerBackend::Mock => Ok(Arc::new(mock::MockAnalyzer::new(config.mock_latency))),
        AnalyzerBackend::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| ConfigError::MissingValue {
                key: "INFRALENS_API_KEY".to_string(),
            })?;
            let backend = openai::OpenAiAnalyzer::new(
                config.base_url.clone(),
                api_key,
                config.request_timeout,
            )
            .map_err(|e| ConfigError::InvalidValue {
                key: "INFRALENS_BASE_URL".to_string(),
                message: e.to_string(),
            })?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::analyzer_from_config;
    use crate::config::{AiConfig, AnalyzerBackend};
    use crate::error::ConfigError;

    #[test]
    fn mock_backend_builds_without_credentials() {
        let config = AiConfig::default();
        assert!(analyzer_from_config(&config).is_ok());
    }

    #[test]
    fn openai_backend_requires_an_api_key() {
        let config = AiConfig {
            backend: AnalyzerBackend::OpenAi,
            ..AiConfig::default()
        };
        let err = analyzer_from_config(&config).err().expect("must require a key");
        let ConfigError::MissingValue { key } = err else {
            panic!("expected MissingValue");
        };
        assert_eq!(key, "INFRALENS_API_KEY");
    }
}
