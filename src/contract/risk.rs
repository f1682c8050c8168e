//! Risk assessments: one per contract, overwritten on re-analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContractCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFactorStatus {
    Identified,
    Monitoring,
    Mitigating,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Improving,
    Stable,
    Deteriorating,
}

/// A single identified exposure within a risk category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub impact: Impact,
    pub likelihood: Likelihood,
    /// 0–100.
    pub score: u8,
    pub evidence: Vec<String>,
    pub mitigation: Vec<String>,
    pub status: RiskFactorStatus,
}

/// One category bucket: a 0–100 score plus the factors behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: u8,
    pub factors: Vec<RiskFactor>,
}

/// The five fixed category buckets of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCategories {
    pub financial: CategoryScore,
    pub legal: CategoryScore,
    pub operational: CategoryScore,
    pub regulatory: CategoryScore,
    pub external: CategoryScore,
}

impl RiskCategories {
    pub fn get(&self, category: ContractCategory) -> &CategoryScore {
        match category {
            ContractCategory::Financial => &self.financial,
            ContractCategory::Legal => &self.legal,
            ContractCategory::Operational => &self.operational,
            ContractCategory::Regulatory => &self.regulatory,
            ContractCategory::External => &self.external,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContractCategory, &CategoryScore)> {
        ContractCategory::ALL.iter().map(|&c| (c, self.get(c)))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

/// Scored, categorized evaluation of a contract's exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub contract_id: Uuid,
    /// 0–100.
    pub overall_score: u8,
    pub last_assessed: DateTime<Utc>,
    pub trend: RiskTrend,
    pub categories: RiskCategories,
    pub recommendations: Recommendations,
}

impl RiskAssessment {
    /// True when the overall score and every category/factor score sit in
    /// [0, 100]. Scores are `u8`, so only the upper bound can be violated.
    pub fn scores_bounded(&self) -> bool {
        self.overall_score <= 100
            && self.categories.iter().all(|(_, bucket)| {
                bucket.score <= 100 && bucket.factors.iter().all(|f| f.score <= 100)
            })
    }
}
