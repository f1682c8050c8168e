//! Parsed contract structure: clauses, obligations, and milestones.
//!
//! All three belong to exactly one contract and are immutable once the parse
//! phase attaches them to the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContractCategory;

/// Severity bucket used for clauses and portfolio risk distribution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Bucket an overall 0–100 risk score.
    pub fn from_score(score: u8) -> Self {
        match score {
            75..=u8::MAX => Self::Critical,
            50..=74 => Self::High,
            25..=49 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// A monetary amount with the context it was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetaryAmount {
    pub value: f64,
    pub currency: String,
    pub context: String,
}

/// Bag of entities extracted from a clause's text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub dates: Vec<String>,
    pub amounts: Vec<MonetaryAmount>,
    pub parties: Vec<String>,
    pub locations: Vec<String>,
    pub percentages: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Backend analysis embedded in each clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseAnalysis {
    pub sentiment: Sentiment,
    pub complexity: Complexity,
    /// 0–100 readability score.
    pub clarity: u8,
    pub suggested_actions: Vec<String>,
    pub potential_issues: Vec<String>,
}

/// A titled, sectioned excerpt of contract text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractClause {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub title: String,
    pub content: String,
    pub section: String,
    pub page_number: u32,
    pub category: ContractCategory,
    pub risk_level: RiskLevel,
    pub extracted_entities: ExtractedEntities,
    pub ai_analysis: ClauseAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObligationType {
    Payment,
    Delivery,
    Performance,
    Compliance,
    Reporting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsibleParty {
    Contractor,
    Client,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyType {
    LiquidatedDamages,
    Penalty,
    Interest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    #[serde(rename = "type")]
    pub penalty_type: PenaltyType,
    pub amount: f64,
    pub currency: String,
    pub calculation: String,
}

/// A dated duty assigned to a responsible party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractObligation {
    pub id: Uuid,
    pub contract_id: Uuid,
    #[serde(rename = "type")]
    pub obligation_type: ObligationType,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub responsible: ResponsibleParty,
    pub status: ObligationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalties: Option<Penalty>,
    /// Weak reference: existence of the milestone is not enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<Uuid>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Upcoming,
    InProgress,
    Completed,
    Delayed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTrigger {
    pub amount: f64,
    pub currency: String,
    pub conditions: Vec<String>,
}

/// A project checkpoint with a target date and optional payment trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMilestone {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub name: String,
    pub description: String,
    pub target_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_date: Option<DateTime<Utc>>,
    pub status: MilestoneStatus,
    pub dependencies: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_trigger: Option<PaymentTrigger>,
    pub performance_guarantees: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::RiskLevel;

    #[test]
    fn score_bucketing_matches_portfolio_thresholds() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(24), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(49), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(74), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(75), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Critical);
    }
}
