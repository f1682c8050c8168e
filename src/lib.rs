//! Contract intelligence for infrastructure agreements.
//!
//! The crate takes uploaded contract documents through a staged pipeline
//! (`uploading → parsing → analyzing → completed`), storing the extracted
//! clauses, obligations, milestones, risk assessments, and insights in an
//! in-process registry. Analysis itself is delegated to a pluggable
//! [`ai::ContractAnalyzer`] backend: a deterministic fixture backend for
//! development and tests, or an HTTP backend for real analysis.
//!
//! [`service::ContractService`] is the entry point. Construct one with an
//! analyzer and a [`config::ServiceConfig`], upload files, then subscribe
//! to pipeline events or read snapshots:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use infralens::ai::mock::MockAnalyzer;
//! use infralens::config::ServiceConfig;
//! use infralens::contract::ContractUpload;
//! use infralens::service::ContractService;
//!
//! # async fn demo() {
//! let analyzer = Arc::new(MockAnalyzer::instant());
//! let service = Arc::new(ContractService::new(analyzer, ServiceConfig::default()));
//!
//! let id = service.upload_contract(ContractUpload::new("solar-plant.pdf", 1024), None);
//! service.wait_until_terminal(id).await;
//!
//! let assessment = service.risk_assessment(id);
//! # drop(assessment);
//! # }
//! ```

pub mod ai;
pub mod alerts;
pub mod config;
pub mod contract;
pub mod error;
pub mod service;

pub use ai::{ContractAnalyzer, analyzer_from_config};
pub use config::{AiConfig, ServiceConfig};
pub use contract::{ContractStatus, ContractType, ContractUpload};
pub use error::{AnalyzerError, ConfigError, ServiceError};
pub use service::ContractService;
