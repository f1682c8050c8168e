//! Portfolio analytics and role-scoped views.
//!
//! Everything here is computed fresh from a registry snapshot on each call;
//! nothing is cached, so the numbers can never go stale relative to the
//! registry. Aggregation itself is pure functions over slices, with thin
//! service methods supplying the snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::alerts::{self, Alert, AlertPriority};
use crate::contract::clause::{
    ContractMilestone, ContractObligation, MilestoneStatus, ObligationStatus, ObligationType,
    RiskLevel,
};
use crate::contract::insight::{AiInsight, InsightStatus};
use crate::contract::risk::{RiskAssessment, RiskFactor};
use crate::contract::{ContractCategory, ContractMetadata, ContractType};

use super::ContractService;

/// Flattened registry snapshot the aggregations run over.
struct Snapshot {
    contracts: Vec<ContractMetadata>,
    obligations: Vec<ContractObligation>,
    milestones: Vec<ContractMilestone>,
    risk_assessments: Vec<RiskAssessment>,
    insights: Vec<AiInsight>,
}

/// Summary statistics over the whole registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAnalytics {
    pub total_contracts: usize,
    /// Sum of milestone payment triggers, keyed by currency.
    pub total_value_by_currency: BTreeMap<String, f64>,
    pub average_risk_score: u8,
    pub contracts_by_type: BTreeMap<ContractType, usize>,
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    pub upcoming_deadlines: Vec<UpcomingDeadline>,
    pub alert_counts: BTreeMap<AlertPriority, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    Payment,
    Delivery,
    Performance,
    Compliance,
    Reporting,
    Milestone,
}

impl From<ObligationType> for DeadlineKind {
    fn from(value: ObligationType) -> Self {
        match value {
            ObligationType::Payment => Self::Payment,
            ObligationType::Delivery => Self::Delivery,
            ObligationType::Performance => Self::Performance,
            ObligationType::Compliance => Self::Compliance,
            ObligationType::Reporting => Self::Reporting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadlineAmount {
    pub value: f64,
    pub currency: String,
}

/// An obligation or milestone falling due inside the configured window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingDeadline {
    pub contract_id: Uuid,
    pub kind: DeadlineKind,
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<DeadlineAmount>,
    pub priority: AlertPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Legal,
    Finance,
    Operations,
    Management,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Finance => "finance",
            Self::Operations => "operations",
            Self::Management => "management",
        }
    }
}

/// Per-contract legal exposure line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCategoryScore {
    pub contract_id: Uuid,
    pub contract_name: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalView {
    pub legal_scores: Vec<ContractCategoryScore>,
    pub critical_factors: Vec<RiskFactor>,
    pub open_legal_insights: Vec<AiInsight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceView {
    pub total_value_by_currency: BTreeMap<String, f64>,
    pub pending_payment_obligations: Vec<ContractObligation>,
    pub financial_risk_factors: Vec<RiskFactor>,
    pub upcoming_payment_milestones: Vec<UpcomingDeadline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsView {
    pub in_flight_contracts: Vec<ContractMetadata>,
    pub milestone_status_counts: BTreeMap<MilestoneStatus, usize>,
    pub overdue_obligations: Vec<ContractObligation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub total_contracts: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub average_risk_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementView {
    pub executive_summary: ExecutiveSummary,
    pub top_risks: Vec<RiskFactor>,
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    pub alert_counts: BTreeMap<AlertPriority, usize>,
}

/// A role-scoped aggregate over the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum UserView {
    Legal(LegalView),
    Finance(FinanceView),
    Operations(OperationsView),
    Management(ManagementView),
}

impl ContractService {
    fn snapshot(&self) -> Snapshot {
        fn flatten<T: Clone>(
            order: &[Uuid],
            map: &std::collections::HashMap<Uuid, Vec<T>>,
        ) -> Vec<T> {
            order
                .iter()
                .filter_map(|id| map.get(id))
                .flatten()
                .cloned()
                .collect()
        }

        let registry = self.lock();
        Snapshot {
            contracts: registry
                .order
                .iter()
                .filter_map(|id| registry.contracts.get(id).cloned())
                .collect(),
            obligations: flatten(&registry.order, &registry.obligations),
            milestones: flatten(&registry.order, &registry.milestones),
            insights: flatten(&registry.order, &registry.insights),
            risk_assessments: registry
                .order
                .iter()
                .filter_map(|id| registry.risk_assessments.get(id).cloned())
                .collect(),
        }
    }

    /// Summary statistics, recomputed from live state on every call.
    pub fn portfolio_analytics(&self) -> PortfolioAnalytics {
        let snapshot = self.snapshot();
        let now = Utc::now();
        let window = Duration::days(self.config.deadline_window_days);

        PortfolioAnalytics {
            total_contracts: snapshot.contracts.len(),
            total_value_by_currency: total_value_by_currency(&snapshot.milestones),
            average_risk_score: average_risk_score(&snapshot.risk_assessments),
            contracts_by_type: contracts_by_type(&snapshot.contracts),
            risk_distribution: risk_distribution(&snapshot.risk_assessments),
            upcoming_deadlines: upcoming_deadlines(
                &snapshot.obligations,
                &snapshot.milestones,
                now,
                window,
            ),
            alert_counts: alert_counts(&snapshot, now),
        }
    }

    /// Role-scoped aggregate for the requested role.
    pub fn user_view(&self, role: UserRole) -> UserView {
        let snapshot = self.snapshot();
        let now = Utc::now();
        let window = Duration::days(self.config.deadline_window_days);

        match role {
            UserRole::Legal => UserView::Legal(legal_view(&snapshot)),
            UserRole::Finance => UserView::Finance(finance_view(&snapshot, now, window)),
            UserRole::Operations => UserView::Operations(operations_view(&snapshot, now)),
            UserRole::Management => UserView::Management(management_view(&snapshot, now)),
        }
    }

    /// Alerts computed from the built-in rules against current state.
    pub fn alerts(&self) -> Vec<Alert> {
        let snapshot = self.snapshot();
        evaluate_alerts(&snapshot, Utc::now())
    }
}

fn evaluate_alerts(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
    let rules = match alerts::builtin_rules() {
        Ok(rules) => rules,
        Err(e) => {
            warn!("alert rules unavailable: {}", e);
            return Vec::new();
        }
    };
    alerts::evaluate(
        rules,
        &alerts::AlertInputs {
            contracts: &snapshot.contracts,
            obligations: &snapshot.obligations,
            milestones: &snapshot.milestones,
            risk_assessments: &snapshot.risk_assessments,
        },
        now,
    )
}

fn alert_counts(snapshot: &Snapshot, now: DateTime<Utc>) -> BTreeMap<AlertPriority, usize> {
    let mut counts = BTreeMap::new();
    for alert in evaluate_alerts(snapshot, now) {
        *counts.entry(alert.priority).or_insert(0) += 1;
    }
    counts
}

fn total_value_by_currency(milestones: &[ContractMilestone]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for trigger in milestones.iter().filter_map(|m| m.payment_trigger.as_ref()) {
        *totals.entry(trigger.currency.clone()).or_insert(0.0) += trigger.amount;
    }
    totals
}

fn average_risk_score(assessments: &[RiskAssessment]) -> u8 {
    if assessments.is_empty() {
        return 0;
    }
    let sum: u32 = assessments.iter().map(|a| u32::from(a.overall_score)).sum();
    (sum as f64 / assessments.len() as f64).round() as u8
}

fn contracts_by_type(contracts: &[ContractMetadata]) -> BTreeMap<ContractType, usize> {
    let mut counts = BTreeMap::new();
    for contract in contracts {
        *counts.entry(contract.contract_type).or_insert(0) += 1;
    }
    counts
}

fn risk_distribution(assessments: &[RiskAssessment]) -> BTreeMap<RiskLevel, usize> {
    let mut counts = BTreeMap::new();
    for assessment in assessments {
        *counts
            .entry(RiskLevel::from_score(assessment.overall_score))
            .or_insert(0) += 1;
    }
    counts
}

fn upcoming_deadlines(
    obligations: &[ContractObligation],
    milestones: &[ContractMilestone],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<UpcomingDeadline> {
    let horizon = now + window;
    let mut deadlines = Vec::new();

    for obligation in obligations {
        if obligation.status == ObligationStatus::Completed {
            continue;
        }
        if obligation.due_date > horizon {
            continue;
        }
        let days = (obligation.due_date - now).num_days();
        deadlines.push(UpcomingDeadline {
            contract_id: obligation.contract_id,
            kind: obligation.obligation_type.into(),
            description: obligation.description.clone(),
            due_date: obligation.due_date,
            amount: None,
            priority: AlertPriority::from_days_remaining(days),
        });
    }

    for milestone in milestones {
        if milestone.status == MilestoneStatus::Completed {
            continue;
        }
        if milestone.target_date > horizon {
            continue;
        }
        let days = (milestone.target_date - now).num_days();
        deadlines.push(UpcomingDeadline {
            contract_id: milestone.contract_id,
            kind: DeadlineKind::Milestone,
            description: milestone.name.clone(),
            due_date: milestone.target_date,
            amount: milestone.payment_trigger.as_ref().map(|t| DeadlineAmount {
                value: t.amount,
                currency: t.currency.clone(),
            }),
            priority: AlertPriority::from_days_remaining(days),
        });
    }

    deadlines.sort_by_key(|d| d.due_date);
    deadlines
}

fn legal_view(snapshot: &Snapshot) -> LegalView {
    let legal_scores = snapshot
        .risk_assessments
        .iter()
        .map(|a| ContractCategoryScore {
            contract_id: a.contract_id,
            contract_name: snapshot
                .contracts
                .iter()
                .find(|c| c.id == a.contract_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            score: a.categories.get(ContractCategory::Legal).score,
        })
        .collect();

    let mut critical_factors: Vec<RiskFactor> = snapshot
        .risk_assessments
        .iter()
        .flat_map(|a| a.categories.get(ContractCategory::Legal).factors.iter())
        .filter(|f| f.score >= 60)
        .cloned()
        .collect();
    critical_factors.sort_by(|a, b| b.score.cmp(&a.score));

    let open_legal_insights = snapshot
        .insights
        .iter()
        .filter(|i| i.category == ContractCategory::Legal && i.status == InsightStatus::New)
        .cloned()
        .collect();

    LegalView {
        legal_scores,
        critical_factors,
        open_legal_insights,
    }
}

fn finance_view(snapshot: &Snapshot, now: DateTime<Utc>, window: Duration) -> FinanceView {
    let pending_payment_obligations = snapshot
        .obligations
        .iter()
        .filter(|o| {
            o.obligation_type == ObligationType::Payment
                && o.status != ObligationStatus::Completed
        })
        .cloned()
        .collect();

    let mut financial_risk_factors: Vec<RiskFactor> = snapshot
        .risk_assessments
        .iter()
        .flat_map(|a| a.categories.get(ContractCategory::Financial).factors.iter())
        .cloned()
        .collect();
    financial_risk_factors.sort_by(|a, b| b.score.cmp(&a.score));

    let upcoming_payment_milestones = upcoming_deadlines(&[], &snapshot.milestones, now, window)
        .into_iter()
        .filter(|d| d.amount.is_some())
        .collect();

    FinanceView {
        total_value_by_currency: total_value_by_currency(&snapshot.milestones),
        pending_payment_obligations,
        financial_risk_factors,
        upcoming_payment_milestones,
    }
}

fn operations_view(snapshot: &Snapshot, now: DateTime<Utc>) -> OperationsView {
    let in_flight_contracts = snapshot
        .contracts
        .iter()
        .filter(|c| !c.status.is_terminal())
        .cloned()
        .collect();

    let mut milestone_status_counts = BTreeMap::new();
    for milestone in &snapshot.milestones {
        *milestone_status_counts.entry(milestone.status).or_insert(0) += 1;
    }

    let overdue_obligations = snapshot
        .obligations
        .iter()
        .filter(|o| {
            o.status == ObligationStatus::Overdue
                || (o.status != ObligationStatus::Completed && o.due_date < now)
        })
        .cloned()
        .collect();

    OperationsView {
        in_flight_contracts,
        milestone_status_counts,
        overdue_obligations,
    }
}

fn management_view(snapshot: &Snapshot, now: DateTime<Utc>) -> ManagementView {
    use crate::contract::ContractStatus;

    let completed = snapshot
        .contracts
        .iter()
        .filter(|c| c.status == ContractStatus::Completed)
        .count();
    let failed = snapshot
        .contracts
        .iter()
        .filter(|c| c.status == ContractStatus::Error)
        .count();

    let mut top_risks: Vec<RiskFactor> = snapshot
        .risk_assessments
        .iter()
        .flat_map(|a| a.categories.iter().flat_map(|(_, bucket)| bucket.factors.iter()))
        .cloned()
        .collect();
    top_risks.sort_by(|a, b| b.score.cmp(&a.score));
    top_risks.truncate(5);

    ManagementView {
        executive_summary: ExecutiveSummary {
            total_contracts: snapshot.contracts.len(),
            completed,
            failed,
            in_progress: snapshot.contracts.len() - completed - failed,
            average_risk_score: average_risk_score(&snapshot.risk_assessments),
        },
        top_risks,
        risk_distribution: risk_distribution(&snapshot.risk_assessments),
        alert_counts: alert_counts(snapshot, now),
    }
}
