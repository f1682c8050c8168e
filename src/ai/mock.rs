//! Fixture-returning analysis backend.
//!
//! Stands in for a real inference service: every operation sleeps for its
//! configured latency and returns hardcoded-but-structurally-complete data.
//! Nothing here consults the supplied document beyond echoing ids, which is
//! exactly the contract the orchestrator is tested against.

use chrono::{Duration as ChronoDuration, Utc};
use tracing::debug;
use uuid::Uuid;

use async_trait::async_trait;

use crate::config::MockLatency;
use crate::contract::clause::{
    ClauseAnalysis, Complexity, ContractClause, ContractMilestone, ContractObligation,
    ExtractedEntities, MilestoneStatus, MonetaryAmount, ObligationStatus, ObligationType,
    PaymentTrigger, Penalty, PenaltyType, ResponsibleParty, RiskLevel, Sentiment,
};
use crate::contract::insight::{AiInsight, InsightStatus, InsightType};
use crate::contract::risk::{
    CategoryScore, Impact, Likelihood, Recommendations, RiskAssessment, RiskCategories,
    RiskFactor, RiskFactorStatus, RiskTrend,
};
use crate::contract::{ContractCategory, ContractUpload};
use crate::error::AnalyzerError;

use super::{
    ClauseDifference, ClauseSimilarity, ClauseVariation, ComparisonReport, ContractAnalyzer,
    MatchedClause, ParseMetadata, ParsedContract, SearchFilters, SearchHit, SearchResults,
};

/// The default backend: simulated latency, fixed responses.
pub struct MockAnalyzer {
    latency: MockLatency,
}

impl MockAnalyzer {
    pub fn new(latency: MockLatency) -> Self {
        Self { latency }
    }

    /// Zero-latency instance for tests.
    pub fn instant() -> Self {
        Self::new(MockLatency::instant())
    }
}

#[async_trait]
impl ContractAnalyzer for MockAnalyzer {
    async fn parse(
        &self,
        contract_id: Uuid,
        upload: &ContractUpload,
    ) -> Result<ParsedContract, AnalyzerError> {
        tokio::time::sleep(self.latency.parse).await;
        debug!(%contract_id, file = %upload.file_name, "mock parse complete");

        let milestone_id = Uuid::new_v4();
        let now = Utc::now();

        let clauses = vec![
            ContractClause {
                id: Uuid::new_v4(),
                contract_id,
                title: "Payment Terms".to_string(),
                content: "Payment shall be made within 30 days of invoice receipt. Late \
                          payments will incur penalty of 1.5% per month."
                    .to_string(),
                section: "Financial Terms".to_string(),
                page_number: 12,
                category: ContractCategory::Financial,
                risk_level: RiskLevel::Medium,
                extracted_entities: ExtractedEntities {
                    dates: vec!["30 days".to_string()],
                    amounts: vec![MonetaryAmount {
                        value: 1.5,
                        currency: "%".to_string(),
                        context: "late payment penalty".to_string(),
                    }],
                    parties: vec!["Contractor".to_string(), "Client".to_string()],
                    locations: Vec::new(),
                    percentages: vec![1.5],
                },
                ai_analysis: ClauseAnalysis {
                    sentiment: Sentiment::Neutral,
                    complexity: Complexity::Medium,
                    clarity: 85,
                    suggested_actions: vec![
                        "Consider reducing payment term to 15 days".to_string(),
                        "Review penalty rate competitiveness".to_string(),
                    ],
                    potential_issues: vec![
                        "High penalty rate may deter contractors".to_string(),
                        "No grace period specified".to_string(),
                    ],
                },
            },
            ContractClause {
                id: Uuid::new_v4(),
                contract_id,
                title: "Force Majeure".to_string(),
                content: "Neither party shall be liable for delays caused by circumstances \
                          beyond their control including pandemics, natural disasters, and \
                          government actions."
                    .to_string(),
                section: "Risk Management".to_string(),
                page_number: 25,
                category: ContractCategory::Legal,
                risk_level: RiskLevel::High,
                extracted_entities: ExtractedEntities {
                    parties: vec!["Neither party".to_string()],
                    ..ExtractedEntities::default()
                },
                ai_analysis: ClauseAnalysis {
                    sentiment: Sentiment::Neutral,
                    complexity: Complexity::High,
                    clarity: 75,
                    suggested_actions: vec![
                        "Define specific force majeure events".to_string(),
                        "Add notification requirements".to_string(),
                    ],
                    potential_issues: vec![
                        "Broad interpretation possible".to_string(),
                        "No time limits specified".to_string(),
                    ],
                },
            },
        ];

        let obligations = vec![
            ContractObligation {
                id: Uuid::new_v4(),
                contract_id,
                obligation_type: ObligationType::Payment,
                description: "Monthly progress payment based on work completed".to_string(),
                due_date: now + ChronoDuration::days(30),
                responsible: ResponsibleParty::Client,
                status: ObligationStatus::Pending,
                penalties: Some(Penalty {
                    penalty_type: PenaltyType::Interest,
                    amount: 1.5,
                    currency: "%".to_string(),
                    calculation: "Per month on outstanding amount".to_string(),
                }),
                milestone_id: None,
            },
            ContractObligation {
                id: Uuid::new_v4(),
                contract_id,
                obligation_type: ObligationType::Performance,
                description: "Complete foundation work by milestone date".to_string(),
                due_date: now + ChronoDuration::days(60),
                responsible: ResponsibleParty::Contractor,
                status: ObligationStatus::InProgress,
                penalties: None,
                milestone_id: Some(milestone_id),
            },
        ];

        let milestones = vec![ContractMilestone {
            id: milestone_id,
            contract_id,
            name: "Foundation Completion".to_string(),
            description: "Complete all foundation work including pile driving and concrete \
                          pouring"
                .to_string(),
            target_date: now + ChronoDuration::days(60),
            actual_date: None,
            status: MilestoneStatus::InProgress,
            dependencies: Vec::new(),
            payment_trigger: Some(PaymentTrigger {
                amount: 5_000_000.0,
                currency: "INR".to_string(),
                conditions: vec![
                    "Foundation completion certificate".to_string(),
                    "Quality inspection passed".to_string(),
                ],
            }),
            performance_guarantees: vec![
                "Structural integrity for 25 years".to_string(),
                "Load bearing capacity as per design".to_string(),
            ],
        }];

        Ok(ParsedContract {
            clauses,
            obligations,
            milestones,
            metadata: ParseMetadata {
                total_pages: 150,
                document_type: "Infrastructure Contract".to_string(),
                extracted_at: now,
            },
        })
    }

    async fn assess_risk(
        &self,
        contract_id: Uuid,
        _clauses: &[ContractClause],
    ) -> Result<RiskAssessment, AnalyzerError> {
        tokio::time::sleep(self.latency.risk).await;
        debug!(%contract_id, "mock risk assessment complete");

        let factor = |id: &str,
                      name: &str,
                      description: &str,
                      impact: Impact,
                      likelihood: Likelihood,
                      score: u8,
                      evidence: &[&str],
                      mitigation: &[&str],
                      status: RiskFactorStatus| RiskFactor {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            impact,
            likelihood,
            score,
            evidence: evidence.iter().map(|s| s.to_string()).collect(),
            mitigation: mitigation.iter().map(|s| s.to_string()).collect(),
            status,
        };

        Ok(RiskAssessment {
            contract_id,
            overall_score: 72,
            last_assessed: Utc::now(),
            trend: RiskTrend::Deteriorating,
            categories: RiskCategories {
                financial: CategoryScore {
                    score: 75,
                    factors: vec![factor(
                        "risk-fin-1",
                        "Payment Default Risk",
                        "High risk of payment delays due to complex approval process",
                        Impact::Critical,
                        Likelihood::Medium,
                        75,
                        &["30-day payment terms", "No penalty for early payment"],
                        &["Implement milestone-based payments", "Require bank guarantees"],
                        RiskFactorStatus::Identified,
                    )],
                },
                legal: CategoryScore {
                    score: 65,
                    factors: vec![factor(
                        "risk-leg-1",
                        "Dispute Resolution Gaps",
                        "Unclear arbitration process may lead to lengthy disputes",
                        Impact::High,
                        Likelihood::Medium,
                        65,
                        &["Vague arbitration clause", "No mediation requirement"],
                        &["Specify arbitration rules", "Add mediation step"],
                        RiskFactorStatus::Monitoring,
                    )],
                },
                operational: CategoryScore {
                    score: 70,
                    factors: vec![factor(
                        "risk-op-1",
                        "Performance Penalty Exposure",
                        "High liquidated damages for delays",
                        Impact::High,
                        Likelihood::Medium,
                        70,
                        &["0.5% per week delay penalty", "Tight completion timeline"],
                        &["Negotiate penalty caps", "Build buffer in timeline"],
                        RiskFactorStatus::Mitigating,
                    )],
                },
                regulatory: CategoryScore {
                    score: 55,
                    factors: vec![factor(
                        "risk-reg-1",
                        "Environmental Compliance",
                        "Complex environmental clearance requirements",
                        Impact::Medium,
                        Likelihood::Medium,
                        55,
                        &["Multiple clearances required", "Changing regulations"],
                        &["Early engagement with authorities", "Compliance monitoring"],
                        RiskFactorStatus::Monitoring,
                    )],
                },
                external: CategoryScore {
                    score: 80,
                    factors: vec![factor(
                        "risk-ext-1",
                        "Force Majeure Exposure",
                        "High exposure to external events",
                        Impact::Critical,
                        Likelihood::High,
                        80,
                        &["Broad force majeure definition", "Recent pandemic impact"],
                        &["Comprehensive insurance", "Contingency planning"],
                        RiskFactorStatus::Identified,
                    )],
                },
            },
            recommendations: Recommendations {
                immediate: vec![
                    "Review and tighten force majeure clauses".to_string(),
                    "Implement payment guarantees".to_string(),
                    "Establish clear dispute resolution process".to_string(),
                ],
                short_term: vec![
                    "Negotiate penalty caps".to_string(),
                    "Improve timeline buffers".to_string(),
                    "Enhanced compliance monitoring".to_string(),
                ],
                long_term: vec![
                    "Develop risk-based pricing models".to_string(),
                    "Build strategic partnerships".to_string(),
                    "Invest in compliance automation".to_string(),
                ],
            },
        })
    }

    async fn generate_insights(
        &self,
        contract_id: Uuid,
        _clauses: &[ContractClause],
    ) -> Result<Vec<AiInsight>, AnalyzerError> {
        tokio::time::sleep(self.latency.insights).await;
        debug!(%contract_id, "mock insight generation complete");

        let now = Utc::now();
        let insight = |insight_type: InsightType,
                       title: &str,
                       description: &str,
                       confidence: u8,
                       impact: Impact,
                       category: ContractCategory,
                       evidence: &[&str],
                       actions: &[&str]| AiInsight {
            id: Uuid::new_v4(),
            contract_id,
            insight_type,
            title: title.to_string(),
            description: description.to_string(),
            confidence,
            impact,
            category,
            evidence: evidence.iter().map(|s| s.to_string()).collect(),
            suggested_actions: actions.iter().map(|s| s.to_string()).collect(),
            created_at: now,
            status: InsightStatus::New,
        };

        Ok(vec![
            insight(
                InsightType::Risk,
                "High Payment Default Risk Detected",
                "Analysis indicates elevated risk of payment delays based on contract terms \
                 and historical patterns.",
                87,
                Impact::High,
                ContractCategory::Financial,
                &[
                    "30-day payment terms exceed industry average of 21 days",
                    "No early payment incentives",
                    "Complex approval workflow identified",
                ],
                &[
                    "Negotiate shorter payment terms",
                    "Implement milestone-based payments",
                    "Require bank guarantee for amounts over \u{20b9}1 Cr",
                ],
            ),
            insight(
                InsightType::Opportunity,
                "Cost Optimization Opportunity",
                "Performance bonus structure could be enhanced to incentivize early \
                 completion.",
                72,
                Impact::Medium,
                ContractCategory::Operational,
                &[
                    "No early completion bonuses defined",
                    "Standard penalty structure only",
                    "Historical data shows 15% of projects complete early",
                ],
                &[
                    "Add early completion bonus clause",
                    "Implement tiered incentive structure",
                    "Negotiate shared savings model",
                ],
            ),
            insight(
                InsightType::Anomaly,
                "Unusual Liability Cap Structure",
                "Liability cap is significantly lower than industry standards for this \
                 project size.",
                91,
                Impact::Critical,
                ContractCategory::Legal,
                &[
                    "Liability cap at 10% of contract value vs industry standard 25%",
                    "No distinction between different types of damages",
                    "Similar projects typically have higher caps",
                ],
                &[
                    "Review liability cap adequacy",
                    "Consider separate caps for different damage types",
                    "Evaluate insurance coverage implications",
                ],
            ),
        ])
    }

    async fn compare(&self, contract_ids: &[Uuid]) -> Result<ComparisonReport, AnalyzerError> {
        tokio::time::sleep(self.latency.compare).await;
        debug!(count = contract_ids.len(), "mock comparison complete");

        Ok(ComparisonReport {
            similarities: vec![ClauseSimilarity {
                clause_type: "Payment Terms".to_string(),
                similarity: 85,
                contracts: contract_ids.to_vec(),
            }],
            differences: vec![ClauseDifference {
                clause_type: "Force Majeure".to_string(),
                variations: contract_ids
                    .iter()
                    .map(|&id| ClauseVariation {
                        contract_id: id,
                        content: "Different force majeure definitions".to_string(),
                        risk_implication: "Varying levels of protection".to_string(),
                    })
                    .collect(),
            }],
            recommendations: vec![
                "Standardize force majeure clauses across contracts".to_string(),
                "Align payment terms for consistency".to_string(),
            ],
        })
    }

    async fn search(
        &self,
        query: &str,
        _filters: &SearchFilters,
    ) -> Result<SearchResults, AnalyzerError> {
        tokio::time::sleep(self.latency.search).await;
        debug!(%query, "mock search complete");

        Ok(SearchResults {
            results: vec![SearchHit {
                contract_id: Uuid::new_v4(),
                relevance: 95,
                matched_clauses: vec![MatchedClause {
                    clause_id: Uuid::new_v4(),
                    title: "Payment Terms".to_string(),
                    snippet: "Payment shall be made within 30 days...".to_string(),
                    relevance: 95,
                }],
            }],
            total_results: 15,
            search_time_ms: 120,
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::MockAnalyzer;
    use crate::ai::{ContractAnalyzer, SearchFilters};
    use crate::contract::ContractUpload;

    #[tokio::test]
    async fn parse_output_is_owned_by_the_requested_contract() {
        let analyzer = MockAnalyzer::instant();
        let contract_id = Uuid::new_v4();
        let upload = ContractUpload::new("metro-rail.pdf", 1024);

        let parsed = analyzer.parse(contract_id, &upload).await.expect("parse");

        assert_eq!(parsed.clauses.len(), 2);
        assert_eq!(parsed.obligations.len(), 2);
        assert_eq!(parsed.milestones.len(), 1);
        assert_eq!(parsed.metadata.total_pages, 150);
        assert!(parsed.clauses.iter().all(|c| c.contract_id == contract_id));
        assert!(parsed.obligations.iter().all(|o| o.contract_id == contract_id));
        assert!(parsed.milestones.iter().all(|m| m.contract_id == contract_id));
    }

    #[tokio::test]
    async fn obligation_milestone_reference_resolves_within_the_parse() {
        let analyzer = MockAnalyzer::instant();
        let parsed = analyzer
            .parse(Uuid::new_v4(), &ContractUpload::new("a.pdf", 1))
            .await
            .expect("parse");

        let referenced = parsed
            .obligations
            .iter()
            .filter_map(|o| o.milestone_id)
            .collect::<Vec<_>>();
        assert_eq!(referenced.len(), 1);
        assert!(
            parsed.milestones.iter().any(|m| m.id == referenced[0]),
            "the performance obligation should point at the produced milestone"
        );
    }

    #[tokio::test]
    async fn risk_assessment_scores_are_bounded() {
        let analyzer = MockAnalyzer::instant();
        let assessment = analyzer
            .assess_risk(Uuid::new_v4(), &[])
            .await
            .expect("assess");
        assert_eq!(assessment.overall_score, 72);
        assert!(assessment.scores_bounded());
    }

    #[tokio::test]
    async fn insights_start_in_new_status_with_bounded_confidence() {
        let analyzer = MockAnalyzer::instant();
        let insights = analyzer
            .generate_insights(Uuid::new_v4(), &[])
            .await
            .expect("insights");
        assert_eq!(insights.len(), 3);
        for insight in &insights {
            assert!(insight.confidence <= 100);
            assert_eq!(
                insight.status,
                crate::contract::insight::InsightStatus::New
            );
        }
    }

    #[tokio::test]
    async fn comparison_reports_one_variation_per_contract() {
        let analyzer = MockAnalyzer::instant();
        let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let report = analyzer.compare(&ids).await.expect("compare");
        assert_eq!(report.differences[0].variations.len(), ids.len());
        assert_eq!(report.similarities[0].contracts, ids);
    }

    #[tokio::test]
    async fn search_returns_ranked_hits() {
        let analyzer = MockAnalyzer::instant();
        let results = analyzer
            .search("payment terms", &SearchFilters::default())
            .await
            .expect("search");
        assert!(!results.results.is_empty());
        assert!(results.results[0].relevance <= 100);
    }
}
