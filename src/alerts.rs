//! Alert rules and alert evaluation.
//!
//! Rules are static configuration embedded at build time
//! (`alert_rules.toml`); alerts are computed views over registry snapshots
//! and are never stored. Rule types the data model cannot support yet
//! (renewal dates are not extracted by any backend) are carried in the
//! configuration but skipped at evaluation time.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::contract::ContractMetadata;
use crate::contract::clause::{
    ContractMilestone, ContractObligation, MilestoneStatus, ObligationStatus, ObligationType,
};
use crate::contract::risk::RiskAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Deadline,
    Payment,
    Renewal,
    Compliance,
    Risk,
    Milestone,
}

impl AlertType {
    fn from_config_value(value: &str) -> Option<Self> {
        match value {
            "deadline" => Some(Self::Deadline),
            "payment" => Some(Self::Payment),
            "renewal" => Some(Self::Renewal),
            "compliance" => Some(Self::Compliance),
            "risk" => Some(Self::Risk),
            "milestone" => Some(Self::Milestone),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::Payment => "payment",
            Self::Renewal => "renewal",
            Self::Compliance => "compliance",
            Self::Risk => "risk",
            Self::Milestone => "milestone",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Priority from deadline proximity; shared with the analytics
    /// deadline listing so both surfaces rank urgency identically.
    pub(crate) fn from_days_remaining(days: i64) -> Self {
        match days {
            d if d <= 3 => Self::Critical,
            d if d <= 7 => Self::High,
            d if d <= 14 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// One configured rule.
#[derive(Debug, Clone)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub alert_type: AlertType,
    pub description: String,
    pub enabled: bool,
    pub trigger_days: i64,
    pub risk_threshold: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct AlertRuleConfig {
    rules: Vec<RawAlertRule>,
}

#[derive(Debug, Deserialize)]
struct RawAlertRule {
    id: String,
    name: String,
    #[serde(rename = "type")]
    alert_type: String,
    description: String,
    enabled: bool,
    trigger_days: i64,
    #[serde(default)]
    risk_threshold: Option<u8>,
}

static BUILTIN_RULES: LazyLock<Result<Vec<AlertRule>, String>> =
    LazyLock::new(|| parse_rules(include_str!("alert_rules.toml")));

fn parse_rules(raw: &str) -> Result<Vec<AlertRule>, String> {
    let parsed: AlertRuleConfig =
        toml::from_str(raw).map_err(|e| format!("invalid alert rules TOML: {}", e))?;
    let mut out = Vec::with_capacity(parsed.rules.len());
    for rule in parsed.rules {
        let alert_type = AlertType::from_config_value(&rule.alert_type)
            .ok_or_else(|| format!("invalid alert type '{}' in alert rules", rule.alert_type))?;
        if let Some(threshold) = rule.risk_threshold
            && threshold > 100
        {
            return Err(format!(
                "risk threshold {} out of range in rule '{}'",
                threshold, rule.id
            ));
        }
        out.push(AlertRule {
            id: rule.id,
            name: rule.name,
            alert_type,
            description: rule.description,
            enabled: rule.enabled,
            trigger_days: rule.trigger_days,
            risk_threshold: rule.risk_threshold,
        });
    }
    Ok(out)
}

/// The embedded rule set.
pub fn builtin_rules() -> Result<&'static [AlertRule], String> {
    match &*BUILTIN_RULES {
        Ok(rules) => Ok(rules.as_slice()),
        Err(e) => Err(e.clone()),
    }
}

/// A computed alert. Never persisted; recomputed from live state on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub rule_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub contract_id: Uuid,
    pub contract_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

/// Snapshot inputs for one evaluation pass.
pub struct AlertInputs<'a> {
    pub contracts: &'a [ContractMetadata],
    pub obligations: &'a [ContractObligation],
    pub milestones: &'a [ContractMilestone],
    pub risk_assessments: &'a [RiskAssessment],
}

/// Evaluate every enabled rule against the snapshot.
pub fn evaluate(rules: &[AlertRule], inputs: &AlertInputs<'_>, now: DateTime<Utc>) -> Vec<Alert> {
    let mut alerts = Vec::new();
    for rule in rules.iter().filter(|r| r.enabled) {
        match rule.alert_type {
            AlertType::Payment => {
                evaluate_obligations(rule, inputs, now, &mut alerts, |o| {
                    o.obligation_type == ObligationType::Payment
                });
            }
            AlertType::Compliance => {
                evaluate_obligations(rule, inputs, now, &mut alerts, |o| {
                    o.obligation_type == ObligationType::Compliance
                });
            }
            AlertType::Deadline => {
                evaluate_obligations(rule, inputs, now, &mut alerts, |o| {
                    !matches!(
                        o.obligation_type,
                        ObligationType::Payment | ObligationType::Compliance
                    )
                });
            }
            AlertType::Milestone => evaluate_milestones(rule, inputs, now, &mut alerts),
            AlertType::Risk => evaluate_risk(rule, inputs, &mut alerts),
            AlertType::Renewal => {
                debug!(rule = %rule.id, "renewal rules need renewal metadata; skipped");
            }
        }
    }
    alerts.sort_by(|a, b| b.priority.cmp(&a.priority));
    alerts
}

fn contract_name(inputs: &AlertInputs<'_>, contract_id: Uuid) -> String {
    inputs
        .contracts
        .iter()
        .find(|c| c.id == contract_id)
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn evaluate_obligations(
    rule: &AlertRule,
    inputs: &AlertInputs<'_>,
    now: DateTime<Utc>,
    alerts: &mut Vec<Alert>,
    select: impl Fn(&ContractObligation) -> bool,
) {
    for obligation in inputs.obligations.iter().filter(|o| select(o)) {
        if matches!(
            obligation.status,
            ObligationStatus::Completed
        ) {
            continue;
        }
        let days_remaining = (obligation.due_date - now).num_days();
        let overdue = obligation.status == ObligationStatus::Overdue || days_remaining < 0;
        if !overdue && days_remaining > rule.trigger_days {
            continue;
        }
        let priority = if overdue {
            AlertPriority::Critical
        } else {
            AlertPriority::from_days_remaining(days_remaining)
        };
        alerts.push(Alert {
            rule_id: rule.id.clone(),
            title: rule.name.clone(),
            description: obligation.description.clone(),
            alert_type: rule.alert_type,
            priority,
            contract_id: obligation.contract_id,
            contract_name: contract_name(inputs, obligation.contract_id),
            due_date: Some(obligation.due_date),
            days_remaining: Some(days_remaining),
        });
    }
}

fn evaluate_milestones(
    rule: &AlertRule,
    inputs: &AlertInputs<'_>,
    now: DateTime<Utc>,
    alerts: &mut Vec<Alert>,
) {
    for milestone in inputs.milestones {
        if milestone.status == MilestoneStatus::Completed {
            continue;
        }
        let days_remaining = (milestone.target_date - now).num_days();
        let delayed = milestone.status == MilestoneStatus::Delayed || days_remaining < 0;
        if !delayed && days_remaining > rule.trigger_days {
            continue;
        }
        let priority = if delayed {
            AlertPriority::High
        } else {
            AlertPriority::from_days_remaining(days_remaining)
        };
        alerts.push(Alert {
            rule_id: rule.id.clone(),
            title: rule.name.clone(),
            description: format!("{} target approaching", milestone.name),
            alert_type: rule.alert_type,
            priority,
            contract_id: milestone.contract_id,
            contract_name: contract_name(inputs, milestone.contract_id),
            due_date: Some(milestone.target_date),
            days_remaining: Some(days_remaining),
        });
    }
}

fn evaluate_risk(rule: &AlertRule, inputs: &AlertInputs<'_>, alerts: &mut Vec<Alert>) {
    let threshold = rule.risk_threshold.unwrap_or(75);
    for assessment in inputs.risk_assessments {
        if assessment.overall_score < threshold {
            continue;
        }
        let priority = if assessment.overall_score >= 90 {
            AlertPriority::Critical
        } else {
            AlertPriority::High
        };
        alerts.push(Alert {
            rule_id: rule.id.clone(),
            title: rule.name.clone(),
            description: format!(
                "Contract risk score has increased to {} (threshold: {})",
                assessment.overall_score, threshold
            ),
            alert_type: rule.alert_type,
            priority,
            contract_id: assessment.contract_id,
            contract_name: contract_name(inputs, assessment.contract_id),
            due_date: None,
            days_remaining: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{
        AlertInputs, AlertPriority, AlertType, builtin_rules, evaluate, parse_rules,
    };
    use crate::contract::clause::{
        ContractMilestone, ContractObligation, MilestoneStatus, ObligationStatus, ObligationType,
        ResponsibleParty,
    };
    use crate::contract::risk::{
        CategoryScore, Recommendations, RiskAssessment, RiskCategories, RiskTrend,
    };
    use crate::contract::{ContractMetadata, ContractType, ContractUpload};

    fn obligation(
        contract_id: Uuid,
        obligation_type: ObligationType,
        due_in_days: i64,
        status: ObligationStatus,
    ) -> ContractObligation {
        ContractObligation {
            id: Uuid::new_v4(),
            contract_id,
            obligation_type,
            description: "test obligation".to_string(),
            due_date: Utc::now() + Duration::days(due_in_days),
            responsible: ResponsibleParty::Client,
            status,
            penalties: None,
            milestone_id: None,
        }
    }

    fn milestone(contract_id: Uuid, due_in_days: i64, status: MilestoneStatus) -> ContractMilestone {
        ContractMilestone {
            id: Uuid::new_v4(),
            contract_id,
            name: "Foundation Completion".to_string(),
            description: String::new(),
            target_date: Utc::now() + Duration::days(due_in_days),
            actual_date: None,
            status,
            dependencies: Vec::new(),
            payment_trigger: None,
            performance_guarantees: Vec::new(),
        }
    }

    fn assessment(contract_id: Uuid, score: u8) -> RiskAssessment {
        let bucket = || CategoryScore {
            score: 50,
            factors: Vec::new(),
        };
        RiskAssessment {
            contract_id,
            overall_score: score,
            last_assessed: Utc::now(),
            trend: RiskTrend::Stable,
            categories: RiskCategories {
                financial: bucket(),
                legal: bucket(),
                operational: bucket(),
                regulatory: bucket(),
                external: bucket(),
            },
            recommendations: Recommendations::default(),
        }
    }

    fn contract() -> ContractMetadata {
        ContractMetadata::register(
            &ContractUpload::new("metro-rail.pdf", 100),
            ContractType::Metro,
        )
    }

    #[test]
    fn builtin_rules_parse_and_include_the_risk_threshold() {
        let rules = builtin_rules().expect("embedded rules parse");
        assert_eq!(rules.len(), 6);
        let risk_rule = rules
            .iter()
            .find(|r| r.alert_type == AlertType::Risk)
            .expect("risk rule present");
        assert_eq!(risk_rule.risk_threshold, Some(75));
        assert!(
            rules.iter().any(|r| !r.enabled),
            "the auto-renewal warning ships disabled"
        );
    }

    #[test]
    fn priority_escalates_with_deadline_proximity() {
        assert_eq!(AlertPriority::from_days_remaining(1), AlertPriority::Critical);
        assert_eq!(AlertPriority::from_days_remaining(5), AlertPriority::High);
        assert_eq!(AlertPriority::from_days_remaining(10), AlertPriority::Medium);
        assert_eq!(AlertPriority::from_days_remaining(25), AlertPriority::Low);
    }

    #[test]
    fn parse_rejects_unknown_alert_type() {
        let err = parse_rules(
            "[[rules]]\nid='x'\nname='X'\ntype='weather'\ndescription=''\nenabled=true\ntrigger_days=1\n",
        )
        .expect_err("must reject");
        assert!(err.contains("weather"), "unexpected error: {err}");
    }

    #[test]
    fn payment_obligation_within_window_fires_payment_rule() {
        let rules = builtin_rules().expect("rules");
        let meta = contract();
        let obligations = vec![obligation(
            meta.id,
            ObligationType::Payment,
            2,
            ObligationStatus::Pending,
        )];
        let inputs = AlertInputs {
            contracts: std::slice::from_ref(&meta),
            obligations: &obligations,
            milestones: &[],
            risk_assessments: &[],
        };

        let alerts = evaluate(rules, &inputs, Utc::now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Payment);
        assert_eq!(alerts[0].priority, AlertPriority::Critical);
        assert_eq!(alerts[0].contract_name, meta.name);
    }

    #[test]
    fn far_future_obligations_stay_quiet() {
        let rules = builtin_rules().expect("rules");
        let meta = contract();
        let obligations = vec![obligation(
            meta.id,
            ObligationType::Payment,
            90,
            ObligationStatus::Pending,
        )];
        let inputs = AlertInputs {
            contracts: std::slice::from_ref(&meta),
            obligations: &obligations,
            milestones: &[],
            risk_assessments: &[],
        };

        assert!(evaluate(rules, &inputs, Utc::now()).is_empty());
    }

    #[test]
    fn delayed_milestone_raises_high_priority() {
        let rules = builtin_rules().expect("rules");
        let meta = contract();
        let milestones = vec![milestone(meta.id, 30, MilestoneStatus::Delayed)];
        let inputs = AlertInputs {
            contracts: std::slice::from_ref(&meta),
            obligations: &[],
            milestones: &milestones,
            risk_assessments: &[],
        };

        let alerts = evaluate(rules, &inputs, Utc::now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].priority, AlertPriority::High);
    }

    #[test]
    fn risk_threshold_crossing_fires_and_escalates_at_ninety() {
        let rules = builtin_rules().expect("rules");
        let meta = contract();
        let assessments = vec![assessment(meta.id, 92)];
        let inputs = AlertInputs {
            contracts: std::slice::from_ref(&meta),
            obligations: &[],
            milestones: &[],
            risk_assessments: &assessments,
        };

        let alerts = evaluate(rules, &inputs, Utc::now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Risk);
        assert_eq!(alerts[0].priority, AlertPriority::Critical);

        let calm = vec![assessment(meta.id, 60)];
        let calm_inputs = AlertInputs {
            contracts: std::slice::from_ref(&meta),
            obligations: &[],
            milestones: &[],
            risk_assessments: &calm,
        };
        assert!(evaluate(rules, &calm_inputs, Utc::now()).is_empty());
    }

    #[test]
    fn alerts_sort_highest_priority_first() {
        let rules = builtin_rules().expect("rules");
        let meta = contract();
        let obligations = vec![
            obligation(meta.id, ObligationType::Payment, 6, ObligationStatus::Pending),
            obligation(meta.id, ObligationType::Payment, 1, ObligationStatus::Pending),
        ];
        let inputs = AlertInputs {
            contracts: std::slice::from_ref(&meta),
            obligations: &obligations,
            milestones: &[],
            risk_assessments: &[],
        };

        let alerts = evaluate(rules, &inputs, Utc::now());
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].priority >= alerts[1].priority);
    }
}
