//! AI-generated observations about a contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContractCategory;
use super::risk::Impact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Risk,
    Opportunity,
    Anomaly,
    Recommendation,
}

/// User triage state. No transition is enforced by the service; the field
/// exists so consumers can track acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    New,
    Acknowledged,
    Addressed,
    Dismissed,
}

/// A discrete, timestamped observation with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsight {
    pub id: Uuid,
    pub contract_id: Uuid,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    /// 0–100.
    pub confidence: u8,
    pub impact: Impact,
    pub category: ContractCategory,
    pub evidence: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: InsightStatus,
}
