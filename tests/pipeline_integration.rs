//! End-to-end pipeline tests against the fixture backend.
//!
//! Run with:
//!   cargo test --test pipeline_integration

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use infralens::ai::mock::MockAnalyzer;
use infralens::ai::{
    ComparisonReport, ContractAnalyzer, ParsedContract, SearchFilters, SearchResults,
};
use infralens::config::{MockLatency, ServiceConfig};
use infralens::alerts::AlertPriority;
use infralens::contract::clause::{ContractClause, MilestoneStatus, RiskLevel};
use infralens::contract::insight::AiInsight;
use infralens::contract::risk::RiskAssessment;
use infralens::contract::{ContractStatus, ContractType, ContractUpload};
use infralens::error::{AnalyzerError, FailureKind, ServiceError};
use infralens::service::ContractService;
use infralens::service::analytics::{UserRole, UserView};
use infralens::service::events::ContractEvent;

fn instant_service() -> Arc<ContractService> {
    Arc::new(ContractService::new(
        Arc::new(MockAnalyzer::instant()),
        ServiceConfig::default(),
    ))
}

/// Collect every event for one contract until it reaches a terminal state.
async fn events_until_terminal(
    rx: &mut tokio::sync::broadcast::Receiver<ContractEvent>,
    contract_id: Uuid,
) -> Vec<ContractEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("pipeline should finish well within five seconds")
            .expect("event channel should stay open");
        if event.contract_id != contract_id {
            continue;
        }
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pipeline_walks_through_every_status_in_order() {
    let service = instant_service();
    let mut rx = service.subscribe();

    let id = service.upload_contract(ContractUpload::new("metro-rail-phase2.pdf", 2048), None);
    let events = events_until_terminal(&mut rx, id).await;

    let statuses: Vec<ContractStatus> = events.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            ContractStatus::Uploading,
            ContractStatus::Parsing,
            ContractStatus::Analyzing,
            ContractStatus::Completed,
        ]
    );

    // Progress is forced at each boundary, not interpolated.
    assert_eq!((events[1].parsing_progress, events[1].analysis_progress), (0, 0));
    assert_eq!((events[2].parsing_progress, events[2].analysis_progress), (100, 0));
    assert_eq!((events[3].parsing_progress, events[3].analysis_progress), (100, 100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn derived_records_appear_only_after_completion() {
    // Enough parse latency that the immediate read happens mid-pipeline.
    let latency = MockLatency {
        parse: Duration::from_millis(200),
        ..MockLatency::instant()
    };
    let service = Arc::new(ContractService::new(
        Arc::new(MockAnalyzer::new(latency)),
        ServiceConfig::default(),
    ));

    let id = service.upload_contract(ContractUpload::new("highway-bot.pdf", 512), None);

    assert!(service.clauses(id).is_empty());
    assert!(service.risk_assessment(id).is_none());
    assert!(service.insights(id).is_empty());

    let status = service.wait_until_terminal(id).await;
    assert_eq!(status, Some(ContractStatus::Completed));

    assert_eq!(service.clauses(id).len(), 2);
    assert_eq!(service.obligations(id).len(), 2);
    assert_eq!(service.milestones(id).len(), 1);
    assert!(service.risk_assessment(id).is_some());
    assert_eq!(service.insights(id).len(), 3);

    let meta = service.contract(id).expect("registered");
    assert_eq!(meta.total_pages, 150);
    assert_eq!(meta.parsing_progress, 100);
    assert_eq!(meta.analysis_progress, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uploads_get_distinct_ids_and_listing_preserves_order() {
    let service = instant_service();

    let a = service.upload_contract(ContractUpload::new("a.pdf", 1), None);
    let b = service.upload_contract(ContractUpload::new("b.pdf", 2), None);
    let c = service.upload_contract(ContractUpload::new("c.pdf", 3), None);
    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);

    let listed: Vec<Uuid> = service.contracts().iter().map(|m| m.id).collect();
    assert_eq!(listed, vec![a, b, c]);

    for id in [a, b, c] {
        service.wait_until_terminal(id).await;
    }
    // Terminal transitions never reorder the listing.
    let listed_after: Vec<Uuid> = service.contracts().iter().map(|m| m.id).collect();
    assert_eq!(listed_after, vec![a, b, c]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_name_inference_yields_renewables_for_solar_uploads() {
    let service = instant_service();

    let inferred = service.upload_contract(ContractUpload::new("solar-plant.pdf", 1024), None);
    let explicit = service.upload_contract(
        ContractUpload::new("solar-plant.pdf", 1024),
        Some(ContractType::Airport),
    );

    assert_eq!(
        service.contract(inferred).expect("registered").contract_type,
        ContractType::Renewables
    );
    assert_eq!(
        service.contract(explicit).expect("registered").contract_type,
        ContractType::Airport,
        "an explicit type overrides inference"
    );

    service.wait_until_terminal(inferred).await;
    service.wait_until_terminal(explicit).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_byte_upload_is_accepted_and_processed() {
    let service = instant_service();
    let id = service.upload_contract(ContractUpload::new("empty.pdf", 0), None);
    assert_eq!(
        service.wait_until_terminal(id).await,
        Some(ContractStatus::Completed)
    );
    assert_eq!(service.contract(id).expect("registered").file_size, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uploads_built_from_disk_carry_real_name_and_size() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wind-farm-ppa.pdf");
    let mut file = std::fs::File::create(&path).expect("create");
    file.write_all(&[0u8; 1234]).expect("write");

    let upload = ContractUpload::from_path(&path).expect("from_path");
    assert_eq!(upload.file_name, "wind-farm-ppa.pdf");
    assert_eq!(upload.size_bytes, 1234);

    let service = instant_service();
    let id = service.upload_contract(upload, None);
    assert_eq!(
        service.wait_until_terminal(id).await,
        Some(ContractStatus::Completed)
    );
    let meta = service.contract(id).expect("registered");
    assert_eq!(meta.contract_type, ContractType::Renewables);
    assert_eq!(meta.file_size, 1234);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_complete_independently() {
    let service = instant_service();

    let ids: Vec<Uuid> = (0..8)
        .map(|i| {
            service.upload_contract(ContractUpload::new(format!("contract-{i}.pdf"), 100), None)
        })
        .collect();

    let waits = ids.iter().map(|&id| {
        let service = Arc::clone(&service);
        async move { service.wait_until_terminal(id).await }
    });
    let outcomes = futures::future::join_all(waits).await;

    assert!(
        outcomes
            .iter()
            .all(|s| *s == Some(ContractStatus::Completed)),
        "every pipeline should complete: {outcomes:?}"
    );
    assert_eq!(service.contracts().len(), 8);
    for id in ids {
        assert!(service.risk_assessment(id).is_some());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn snapshot_reads_are_idempotent() {
    let service = instant_service();
    let id = service.upload_contract(ContractUpload::new("grid-upgrade.pdf", 64), None);
    service.wait_until_terminal(id).await;

    assert_eq!(service.contract(id), service.contract(id));
    assert_eq!(service.clauses(id), service.clauses(id));
    assert_eq!(service.risk_assessment(id), service.risk_assessment(id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiting_on_an_unknown_contract_returns_none() {
    let service = instant_service();
    assert_eq!(service.wait_until_terminal(Uuid::new_v4()).await, None);
}

// --- Failure paths ---

/// Backend that fails exactly one operation and otherwise behaves like the
/// fixture backend.
struct FailingAnalyzer {
    fail: FailureKind,
    inner: MockAnalyzer,
}

impl FailingAnalyzer {
    fn at(fail: FailureKind) -> Self {
        Self {
            fail,
            inner: MockAnalyzer::instant(),
        }
    }

    fn backend_error() -> AnalyzerError {
        AnalyzerError::Backend {
            message: "model unavailable".to_string(),
        }
    }
}

#[async_trait]
impl ContractAnalyzer for FailingAnalyzer {
    async fn parse(
        &self,
        contract_id: Uuid,
        upload: &ContractUpload,
    ) -> Result<ParsedContract, AnalyzerError> {
        if self.fail == FailureKind::Parse {
            return Err(Self::backend_error());
        }
        self.inner.parse(contract_id, upload).await
    }

    async fn assess_risk(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<RiskAssessment, AnalyzerError> {
        if self.fail == FailureKind::Analysis {
            return Err(Self::backend_error());
        }
        self.inner.assess_risk(contract_id, clauses).await
    }

    async fn generate_insights(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<Vec<AiInsight>, AnalyzerError> {
        self.inner.generate_insights(contract_id, clauses).await
    }

    async fn compare(&self, contract_ids: &[Uuid]) -> Result<ComparisonReport, AnalyzerError> {
        self.inner.compare(contract_ids).await
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResults, AnalyzerError> {
        self.inner.search(query, filters).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parse_failure_records_a_structured_error() {
    let service = Arc::new(ContractService::new(
        Arc::new(FailingAnalyzer::at(FailureKind::Parse)),
        ServiceConfig::default(),
    ));

    let id = service.upload_contract(ContractUpload::new("broken.pdf", 10), None);
    assert_eq!(
        service.wait_until_terminal(id).await,
        Some(ContractStatus::Error)
    );

    let meta = service.contract(id).expect("registered");
    let failure = meta.failure.expect("failure recorded");
    assert_eq!(failure.kind, FailureKind::Parse);
    assert!(
        failure.message.contains("model unavailable"),
        "backend message survives: {}",
        failure.message
    );

    // Nothing downstream of the failed phase is attached.
    assert!(service.clauses(id).is_empty());
    assert!(service.risk_assessment(id).is_none());
    assert!(service.insights(id).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn analysis_failure_keeps_the_parsed_records() {
    let service = Arc::new(ContractService::new(
        Arc::new(FailingAnalyzer::at(FailureKind::Analysis)),
        ServiceConfig::default(),
    ));

    let id = service.upload_contract(ContractUpload::new("metro-depot.pdf", 10), None);
    assert_eq!(
        service.wait_until_terminal(id).await,
        Some(ContractStatus::Error)
    );

    let meta = service.contract(id).expect("registered");
    assert_eq!(meta.failure.expect("failure recorded").kind, FailureKind::Analysis);

    // The parse phase succeeded, so its output stays queryable.
    assert_eq!(service.clauses(id).len(), 2);
    assert!(service.risk_assessment(id).is_none());
    assert!(service.insights(id).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_backend_hits_the_pipeline_deadline() {
    let latency = MockLatency {
        parse: Duration::from_secs(60),
        ..MockLatency::instant()
    };
    let config = ServiceConfig {
        pipeline_timeout: Duration::from_millis(50),
        ..ServiceConfig::default()
    };
    let service = Arc::new(ContractService::new(
        Arc::new(MockAnalyzer::new(latency)),
        config,
    ));

    let id = service.upload_contract(ContractUpload::new("stalled.pdf", 10), None);
    assert_eq!(
        service.wait_until_terminal(id).await,
        Some(ContractStatus::Error)
    );

    let failure = service
        .contract(id)
        .expect("registered")
        .failure
        .expect("failure recorded");
    assert_eq!(failure.kind, FailureKind::Parse);
    assert!(
        failure.message.contains("timed out"),
        "deadline failures name the timeout: {}",
        failure.message
    );
}

// --- Cross-contract operations ---

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn comparison_needs_at_least_two_registered_contracts() {
    let service = instant_service();
    let a = service.upload_contract(ContractUpload::new("a.pdf", 1), None);
    let b = service.upload_contract(ContractUpload::new("b.pdf", 1), None);
    service.wait_until_terminal(a).await;
    service.wait_until_terminal(b).await;

    match service.compare(&[a]).await {
        Err(ServiceError::NotEnoughContracts { got }) => assert_eq!(got, 1),
        other => panic!("expected NotEnoughContracts, got {other:?}"),
    }

    let ghost = Uuid::new_v4();
    match service.compare(&[a, ghost]).await {
        Err(ServiceError::UnknownContract { id }) => assert_eq!(id, ghost),
        other => panic!("expected UnknownContract, got {other:?}"),
    }

    let report = service.compare(&[a, b]).await.expect("comparison");
    assert!(!report.similarities.is_empty());
    assert_eq!(report.differences[0].variations.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn search_delegates_to_the_backend() {
    let service = instant_service();
    let results = service
        .search("force majeure", &SearchFilters::default())
        .await
        .expect("search");
    assert!(!results.results.is_empty());
}

// --- Analytics over processed contracts ---

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn analytics_reflect_the_processed_portfolio() {
    let service = instant_service();
    let a = service.upload_contract(ContractUpload::new("solar-plant.pdf", 1024), None);
    let b = service.upload_contract(ContractUpload::new("metro-rail.pdf", 2048), None);
    service.wait_until_terminal(a).await;
    service.wait_until_terminal(b).await;

    let analytics = service.portfolio_analytics();
    assert_eq!(analytics.total_contracts, service.contracts().len());
    assert_eq!(analytics.total_contracts, 2);

    // The fixture backend scores every contract 72 overall.
    assert_eq!(analytics.average_risk_score, 72);
    assert_eq!(analytics.risk_distribution.get(&RiskLevel::High), Some(&2));

    // One 5M INR milestone trigger per contract.
    assert_eq!(
        analytics.total_value_by_currency.get("INR"),
        Some(&10_000_000.0)
    );

    assert_eq!(
        analytics.contracts_by_type.get(&ContractType::Renewables),
        Some(&1)
    );
    assert_eq!(analytics.contracts_by_type.get(&ContractType::Metro), Some(&1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn role_views_reflect_a_processed_contract() {
    // A 90-day horizon so the fixture's 60-day milestone counts as upcoming.
    let config = ServiceConfig {
        deadline_window_days: 90,
        ..ServiceConfig::default()
    };
    let service = Arc::new(ContractService::new(
        Arc::new(MockAnalyzer::instant()),
        config,
    ));
    let id = service.upload_contract(ContractUpload::new("metro-rail-phase1.pdf", 2048), None);
    service.wait_until_terminal(id).await;

    let UserView::Legal(legal) = service.user_view(UserRole::Legal) else {
        panic!("expected the legal view");
    };
    assert_eq!(legal.legal_scores.len(), 1);
    assert_eq!(legal.legal_scores[0].contract_id, id);
    assert_eq!(legal.legal_scores[0].contract_name, "metro-rail-phase1");
    assert_eq!(legal.legal_scores[0].score, 65);
    assert_eq!(legal.critical_factors.len(), 1);
    assert_eq!(legal.critical_factors[0].name, "Dispute Resolution Gaps");
    assert_eq!(
        legal.open_legal_insights.len(),
        1,
        "only the liability cap insight is legal and still new"
    );

    let UserView::Finance(finance) = service.user_view(UserRole::Finance) else {
        panic!("expected the finance view");
    };
    assert_eq!(finance.total_value_by_currency.get("INR"), Some(&5_000_000.0));
    assert_eq!(finance.pending_payment_obligations.len(), 1);
    assert_eq!(finance.financial_risk_factors.len(), 1);
    assert_eq!(finance.financial_risk_factors[0].score, 75);
    assert_eq!(
        finance.upcoming_payment_milestones.len(),
        1,
        "the 60-day payment milestone sits inside the 90-day window"
    );
    assert!(finance.upcoming_payment_milestones[0].amount.is_some());

    let UserView::Operations(ops) = service.user_view(UserRole::Operations) else {
        panic!("expected the operations view");
    };
    assert!(ops.in_flight_contracts.is_empty(), "the pipeline finished");
    assert_eq!(
        ops.milestone_status_counts.get(&MilestoneStatus::InProgress),
        Some(&1)
    );
    assert!(ops.overdue_obligations.is_empty());

    let UserView::Management(mgmt) = service.user_view(UserRole::Management) else {
        panic!("expected the management view");
    };
    assert_eq!(mgmt.executive_summary.total_contracts, 1);
    assert_eq!(mgmt.executive_summary.completed, 1);
    assert_eq!(mgmt.executive_summary.failed, 0);
    assert_eq!(mgmt.executive_summary.in_progress, 0);
    assert_eq!(mgmt.executive_summary.average_risk_score, 72);
    assert_eq!(mgmt.top_risks.len(), 5);
    assert_eq!(
        mgmt.top_risks[0].name, "Force Majeure Exposure",
        "the 80-score external factor ranks first"
    );
    assert_eq!(mgmt.risk_distribution.get(&RiskLevel::High), Some(&1));
}

/// Backend returning the fixture data rewritten to be urgent: one payment
/// obligation already past due, one near-due obligation, and an overall
/// risk score above the alert threshold.
struct UrgentAnalyzer {
    inner: MockAnalyzer,
}

impl UrgentAnalyzer {
    fn new() -> Self {
        Self {
            inner: MockAnalyzer::instant(),
        }
    }
}

#[async_trait]
impl ContractAnalyzer for UrgentAnalyzer {
    async fn parse(
        &self,
        contract_id: Uuid,
        upload: &ContractUpload,
    ) -> Result<ParsedContract, AnalyzerError> {
        let mut parsed = self.inner.parse(contract_id, upload).await?;
        let now = chrono::Utc::now();
        parsed.obligations[0].due_date = now - chrono::Duration::days(1);
        parsed.obligations[1].due_date = now + chrono::Duration::days(2);
        Ok(parsed)
    }

    async fn assess_risk(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<RiskAssessment, AnalyzerError> {
        let mut assessment = self.inner.assess_risk(contract_id, clauses).await?;
        assessment.overall_score = 80;
        Ok(assessment)
    }

    async fn generate_insights(
        &self,
        contract_id: Uuid,
        clauses: &[ContractClause],
    ) -> Result<Vec<AiInsight>, AnalyzerError> {
        self.inner.generate_insights(contract_id, clauses).await
    }

    async fn compare(&self, contract_ids: &[Uuid]) -> Result<ComparisonReport, AnalyzerError> {
        self.inner.compare(contract_ids).await
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResults, AnalyzerError> {
        self.inner.search(query, filters).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn urgent_portfolio_raises_alerts_and_overdue_tracking() {
    let service = Arc::new(ContractService::new(
        Arc::new(UrgentAnalyzer::new()),
        ServiceConfig::default(),
    ));
    let id = service.upload_contract(ContractUpload::new("highway-bot.pdf", 512), None);
    service.wait_until_terminal(id).await;

    let alerts = service.alerts();
    assert_eq!(alerts.len(), 2, "overdue payment plus risk threshold: {alerts:?}");
    assert_eq!(alerts[0].priority, AlertPriority::Critical);
    assert_eq!(alerts[0].rule_id, "payment-due");
    assert_eq!(alerts[0].contract_id, id);
    assert!(
        alerts.iter().any(|a| a.rule_id == "high-risk-score"),
        "an 80 overall score crosses the 75 threshold"
    );

    let UserView::Operations(ops) = service.user_view(UserRole::Operations) else {
        panic!("expected the operations view");
    };
    assert_eq!(ops.overdue_obligations.len(), 1);
    assert_eq!(ops.overdue_obligations[0].contract_id, id);

    let UserView::Management(mgmt) = service.user_view(UserRole::Management) else {
        panic!("expected the management view");
    };
    assert_eq!(mgmt.alert_counts.get(&AlertPriority::Critical), Some(&1));
    assert_eq!(mgmt.alert_counts.get(&AlertPriority::High), Some(&1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn seeded_sample_contract_is_listed_as_completed() {
    let service = instant_service();
    let id = service.seed_sample_portfolio();

    let meta = service.contract(id).expect("seeded");
    assert_eq!(meta.status, ContractStatus::Completed);
    assert_eq!(meta.contract_type, ContractType::Metro);
    assert_eq!(service.contracts().len(), 1);
}
