//! The contract registry and pipeline orchestrator.
//!
//! [`ContractService`] owns all contract state for the life of the process
//! and drives each upload through
//! `uploading → parsing → analyzing → completed` (or `error`). It is an
//! explicitly constructed object — tests and embedders build isolated
//! instances — and follows single-writer discipline: only spawned pipeline
//! tasks mutate the registry, readers take full snapshots, and no lock is
//! held across an `.await`.

pub mod analytics;
pub mod events;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::ai::{ComparisonReport, ContractAnalyzer, SearchFilters, SearchResults};
use crate::config::ServiceConfig;
use crate::contract::clause::{ContractClause, ContractMilestone, ContractObligation};
use crate::contract::insight::AiInsight;
use crate::contract::risk::RiskAssessment;
use crate::contract::{
    ContractMetadata, ContractStatus, ContractType, ContractUpload,
};
use crate::error::{AnalyzerError, FailureKind, ProcessingFailure, ServiceError};

use events::ContractEvent;

#[derive(Default)]
struct Registry {
    contracts: HashMap<Uuid, ContractMetadata>,
    /// Insertion order, so listings are stable.
    order: Vec<Uuid>,
    clauses: HashMap<Uuid, Vec<ContractClause>>,
    obligations: HashMap<Uuid, Vec<ContractObligation>>,
    milestones: HashMap<Uuid, Vec<ContractMilestone>>,
    risk_assessments: HashMap<Uuid, RiskAssessment>,
    insights: HashMap<Uuid, Vec<AiInsight>>,
}

/// Process-lifetime contract registry plus the pipeline that feeds it.
pub struct ContractService {
    inner: Mutex<Registry>,
    analyzer: Arc<dyn ContractAnalyzer>,
    events: broadcast::Sender<ContractEvent>,
    config: ServiceConfig,
}

impl ContractService {
    pub fn new(analyzer: Arc<dyn ContractAnalyzer>, config: ServiceConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer);
        Self {
            inner: Mutex::new(Registry::default()),
            analyzer,
            events,
            config,
        }
    }

    /// Register an upload and start processing it in the background.
    ///
    /// Returns the new contract id immediately; this call never fails.
    /// Later failures surface on the record as status `error` with a
    /// structured [`ProcessingFailure`]. When no explicit type is given the
    /// sub-domain is inferred from the file name.
    pub fn upload_contract(
        self: &Arc<Self>,
        upload: ContractUpload,
        explicit_type: Option<ContractType>,
    ) -> Uuid {
        let contract_type = explicit_type
            .unwrap_or_else(|| ContractType::infer_from_file_name(&upload.file_name));

        if upload.size_bytes == 0 {
            warn!(file = %upload.file_name, "accepting zero-byte upload");
        }

        let meta = ContractMetadata::register(&upload, contract_type);
        let contract_id = meta.id;
        let event = ContractEvent::from_metadata(&meta);
        {
            let mut registry = self.lock();
            registry.contracts.insert(contract_id, meta);
            registry.order.push(contract_id);
        }
        info!(
            %contract_id,
            file = %upload.file_name,
            r#type = contract_type.as_str(),
            "contract registered"
        );
        let _ = self.events.send(event);

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.process_contract(contract_id, upload).await;
        });

        contract_id
    }

    /// The per-contract pipeline. Runs to a terminal state; each failure is
    /// caught here and converted to an `error` record, never propagated.
    async fn process_contract(self: Arc<Self>, contract_id: Uuid, upload: ContractUpload) {
        self.transition(contract_id, ContractStatus::Parsing, Some(0), Some(0));

        let parsed = match self
            .with_deadline("parse", self.analyzer.parse(contract_id, &upload))
            .await
        {
            Ok(parsed) => parsed,
            Err(e) => return self.fail(contract_id, FailureKind::Parse, &e),
        };

        let total_pages = parsed.metadata.total_pages;
        let clauses = parsed.clauses.clone();
        {
            let mut registry = self.lock();
            registry.clauses.insert(contract_id, parsed.clauses);
            registry.obligations.insert(contract_id, parsed.obligations);
            registry.milestones.insert(contract_id, parsed.milestones);
        }
        self.transition(contract_id, ContractStatus::Analyzing, Some(100), Some(0));

        let assessment = match self
            .with_deadline("risk assessment", self.analyzer.assess_risk(contract_id, &clauses))
            .await
        {
            Ok(assessment) => assessment,
            Err(e) => return self.fail(contract_id, FailureKind::Analysis, &e),
        };

        let insights = match self
            .with_deadline(
                "insight generation",
                self.analyzer.generate_insights(contract_id, &clauses),
            )
            .await
        {
            Ok(insights) => insights,
            Err(e) => return self.fail(contract_id, FailureKind::Analysis, &e),
        };

        let event = {
            let mut registry = self.lock();
            registry.risk_assessments.insert(contract_id, assessment);
            registry.insights.insert(contract_id, insights);
            let Some(meta) = registry.contracts.get_mut(&contract_id) else {
                return;
            };
            meta.status = ContractStatus::Completed;
            meta.parsing_progress = 100;
            meta.analysis_progress = 100;
            meta.total_pages = total_pages;
            ContractEvent::from_metadata(meta)
        };
        info!(%contract_id, "contract processing completed");
        let _ = self.events.send(event);
    }

    async fn with_deadline<T, F>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<T, AnalyzerError>
    where
        F: Future<Output = Result<T, AnalyzerError>>,
    {
        match tokio::time::timeout(self.config.pipeline_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AnalyzerError::Timeout {
                operation,
                seconds: self.config.pipeline_timeout.as_secs(),
            }),
        }
    }

    fn transition(
        &self,
        contract_id: Uuid,
        status: ContractStatus,
        parsing_progress: Option<u8>,
        analysis_progress: Option<u8>,
    ) {
        let event = {
            let mut registry = self.lock();
            let Some(meta) = registry.contracts.get_mut(&contract_id) else {
                return;
            };
            meta.status = status;
            if let Some(p) = parsing_progress {
                meta.parsing_progress = p;
            }
            if let Some(p) = analysis_progress {
                meta.analysis_progress = p;
            }
            ContractEvent::from_metadata(meta)
        };
        info!(%contract_id, status = status.as_str(), "contract transition");
        let _ = self.events.send(event);
    }

    /// Record a terminal failure. Progress is left where it was.
    fn fail(&self, contract_id: Uuid, kind: FailureKind, source: &AnalyzerError) {
        error!(
            %contract_id,
            phase = kind.as_str(),
            error = %source,
            "contract processing failed"
        );
        let event = {
            let mut registry = self.lock();
            let Some(meta) = registry.contracts.get_mut(&contract_id) else {
                return;
            };
            meta.status = ContractStatus::Error;
            meta.failure = Some(ProcessingFailure::new(kind, source));
            ContractEvent::from_metadata(meta)
        };
        let _ = self.events.send(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        // Registry mutations never panic while holding the guard, so a
        // poisoned mutex means a bug worth crashing on.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- Snapshot accessors ---

    /// All contracts in upload order.
    pub fn contracts(&self) -> Vec<ContractMetadata> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|id| registry.contracts.get(id).cloned())
            .collect()
    }

    pub fn contract(&self, contract_id: Uuid) -> Option<ContractMetadata> {
        self.lock().contracts.get(&contract_id).cloned()
    }

    /// Empty until the parse phase attaches clauses.
    pub fn clauses(&self, contract_id: Uuid) -> Vec<ContractClause> {
        self.lock().clauses.get(&contract_id).cloned().unwrap_or_default()
    }

    pub fn obligations(&self, contract_id: Uuid) -> Vec<ContractObligation> {
        self.lock()
            .obligations
            .get(&contract_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn milestones(&self, contract_id: Uuid) -> Vec<ContractMilestone> {
        self.lock()
            .milestones
            .get(&contract_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Absent until the analysis phase completes.
    pub fn risk_assessment(&self, contract_id: Uuid) -> Option<RiskAssessment> {
        self.lock().risk_assessments.get(&contract_id).cloned()
    }

    pub fn insights(&self, contract_id: Uuid) -> Vec<AiInsight> {
        self.lock().insights.get(&contract_id).cloned().unwrap_or_default()
    }

    /// Every stored assessment, in contract upload order.
    pub fn all_risk_assessments(&self) -> Vec<RiskAssessment> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|id| registry.risk_assessments.get(id).cloned())
            .collect()
    }

    // --- Events ---

    /// Subscribe to pipeline transitions. Every status or progress change
    /// on any contract is delivered as a [`ContractEvent`].
    pub fn subscribe(&self) -> broadcast::Receiver<ContractEvent> {
        self.events.subscribe()
    }

    /// Wait until the contract reaches `completed` or `error` and return
    /// that terminal status. Returns `None` for unknown ids.
    pub async fn wait_until_terminal(&self, contract_id: Uuid) -> Option<ContractStatus> {
        // Subscribe before the snapshot read so the terminal event cannot
        // slip between the two.
        let mut rx = self.subscribe();
        let current = self.contract(contract_id)?.status;
        if current.is_terminal() {
            return Some(current);
        }
        loop {
            match rx.recv().await {
                Ok(event) if event.contract_id == contract_id && event.is_terminal() => {
                    return Some(event.status);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Missed events; fall back to the snapshot.
                    let status = self.contract(contract_id)?.status;
                    if status.is_terminal() {
                        return Some(status);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return self.contract(contract_id).map(|m| m.status);
                }
            }
        }
    }

    // --- Delegated analysis operations ---

    /// Relevance-ranked search over contract content.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResults, ServiceError> {
        Ok(self.analyzer.search(query, filters).await?)
    }

    /// Similarity/difference report across registered contracts. Requires
    /// at least two ids, all of which must be registered.
    pub async fn compare(&self, contract_ids: &[Uuid]) -> Result<ComparisonReport, ServiceError> {
        if contract_ids.len() < 2 {
            return Err(ServiceError::NotEnoughContracts {
                got: contract_ids.len(),
            });
        }
        {
            let registry = self.lock();
            for &id in contract_ids {
                if !registry.contracts.contains_key(&id) {
                    return Err(ServiceError::UnknownContract { id });
                }
            }
        }
        Ok(self.analyzer.compare(contract_ids).await?)
    }

    // --- Demo seeding ---

    /// Seed one completed demo contract, as the original dashboard did on
    /// startup. Opt-in so embedders and tests start from an empty registry.
    pub fn seed_sample_portfolio(&self) -> Uuid {
        let id = Uuid::new_v4();
        let meta = ContractMetadata {
            id,
            name: "Metro Rail Project Agreement - Phase 1".to_string(),
            contract_type: ContractType::Metro,
            upload_date: chrono::Utc::now() - chrono::Duration::days(15),
            file_size: 2_400_000,
            file_path: "/uploads/sample/metro-rail-phase1.pdf".to_string(),
            status: ContractStatus::Completed,
            total_pages: 150,
            parsing_progress: 100,
            analysis_progress: 100,
            failure: None,
        };
        let mut registry = self.lock();
        registry.contracts.insert(id, meta);
        registry.order.push(id);
        id
    }
}
