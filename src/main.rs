use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

use infralens::ai::{SearchFilters, analyzer_from_config};
use infralens::config::{AiConfig, MockLatency, ServiceConfig};
use infralens::contract::clause::{
    ContractClause, ContractMilestone, ContractObligation, RiskLevel,
};
use infralens::contract::insight::AiInsight;
use infralens::contract::risk::RiskAssessment;
use infralens::contract::{ContractMetadata, ContractType, ContractUpload};
use infralens::service::ContractService;
use infralens::service::analytics::UserRole;

#[derive(Parser)]
#[command(
    name = "infralens",
    version,
    about = "Upload, analyze, search, and compare infrastructure contracts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only log errors.
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug detail.
    #[arg(long, global = true)]
    verbose: bool,

    /// Skip the mock backend's simulated inference latency.
    #[arg(long, global = true)]
    instant: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process contract documents and print the resulting records.
    Process(ProcessArgs),
    /// Process documents, then print portfolio analytics and alerts.
    Portfolio(PortfolioArgs),
    /// Search contract content through the analysis backend.
    Search(SearchArgs),
    /// Process two or more documents, then compare them.
    Compare(CompareArgs),
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Contract documents to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Override type inference for every uploaded file.
    #[arg(long = "type", value_enum)]
    contract_type: Option<TypeArg>,
}

#[derive(clap::Args)]
struct PortfolioArgs {
    /// Contract documents to process before reporting.
    files: Vec<PathBuf>,

    /// Include the built-in demo contract.
    #[arg(long)]
    seed_sample: bool,

    /// Also print the view scoped to one role.
    #[arg(long, value_enum)]
    role: Option<RoleArg>,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Free-text query.
    query: String,

    /// Restrict to contract types (repeatable).
    #[arg(long = "type", value_enum)]
    contract_types: Vec<TypeArg>,

    /// Restrict to clause risk levels (repeatable).
    #[arg(long = "risk", value_enum)]
    risk_levels: Vec<RiskArg>,

    /// Restrict to contract sections (repeatable).
    #[arg(long = "section")]
    sections: Vec<String>,
}

#[derive(clap::Args)]
struct CompareArgs {
    /// Contract documents to process and compare.
    #[arg(required = true, num_args = 2..)]
    files: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    Infrastructure,
    Renewables,
    Transmission,
    Roadways,
    Metro,
    Airport,
}

impl From<TypeArg> for ContractType {
    fn from(value: TypeArg) -> Self {
        match value {
            TypeArg::Infrastructure => Self::Infrastructure,
            TypeArg::Renewables => Self::Renewables,
            TypeArg::Transmission => Self::Transmission,
            TypeArg::Roadways => Self::Roadways,
            TypeArg::Metro => Self::Metro,
            TypeArg::Airport => Self::Airport,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RiskArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<RiskArg> for RiskLevel {
    fn from(value: RiskArg) -> Self {
        match value {
            RiskArg::Low => Self::Low,
            RiskArg::Medium => Self::Medium,
            RiskArg::High => Self::High,
            RiskArg::Critical => Self::Critical,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Legal,
    Finance,
    Operations,
    Management,
}

impl From<RoleArg> for UserRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Legal => Self::Legal,
            RoleArg::Finance => Self::Finance,
            RoleArg::Operations => Self::Operations,
            RoleArg::Management => Self::Management,
        }
    }
}

/// Everything the service holds for one processed contract.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContractReport {
    #[serde(flatten)]
    metadata: ContractMetadata,
    clauses: Vec<ContractClause>,
    obligations: Vec<ContractObligation>,
    milestones: Vec<ContractMilestone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_assessment: Option<RiskAssessment>,
    insights: Vec<AiInsight>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("infralens error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let service = build_service(cli.instant)?;

    match cli.command {
        Commands::Process(args) => {
            let ids =
                process_files(&service, &args.files, args.contract_type.map(Into::into)).await?;
            let mut failed = 0usize;
            for id in &ids {
                let report = report_for(&service, *id)
                    .context("processed contract vanished from the registry")?;
                if report.metadata.failure.is_some() {
                    failed += 1;
                }
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} contracts failed to process", ids.len());
            }
        }
        Commands::Portfolio(args) => {
            if args.seed_sample {
                service.seed_sample_portfolio();
            }
            process_files(&service, &args.files, None).await?;

            println!(
                "{}",
                serde_json::to_string_pretty(&service.portfolio_analytics())?
            );
            println!("{}", serde_json::to_string_pretty(&service.alerts())?);
            if let Some(role) = args.role {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&service.user_view(role.into()))?
                );
            }
        }
        Commands::Search(args) => {
            let filters = SearchFilters {
                contract_types: args.contract_types.into_iter().map(Into::into).collect(),
                risk_levels: args.risk_levels.into_iter().map(Into::into).collect(),
                sections: args.sections,
                date_range: None,
            };
            let results = service.search(&args.query, &filters).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Compare(args) => {
            let ids = process_files(&service, &args.files, None).await?;
            let report = service.compare(&ids).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("INFRALENS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn build_service(instant: bool) -> anyhow::Result<Arc<ContractService>> {
    let mut ai_config = AiConfig::resolve().context("invalid analyzer configuration")?;
    if instant {
        ai_config.mock_latency = MockLatency::instant();
    }
    let analyzer = analyzer_from_config(&ai_config)?;
    let service_config = ServiceConfig::resolve().context("invalid service configuration")?;
    Ok(Arc::new(ContractService::new(analyzer, service_config)))
}

/// Upload every file and drain pipeline events until all of them reach a
/// terminal state. Transitions are echoed to stderr as they happen.
async fn process_files(
    service: &Arc<ContractService>,
    files: &[PathBuf],
    explicit_type: Option<ContractType>,
) -> anyhow::Result<Vec<Uuid>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    // Subscribe before uploading so no transition can be missed.
    let mut events = BroadcastStream::new(service.subscribe());

    let mut ids = Vec::with_capacity(files.len());
    for path in files {
        let upload = ContractUpload::from_path(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        ids.push(service.upload_contract(upload, explicit_type));
    }

    let mut pending: HashSet<Uuid> = ids.iter().copied().collect();
    while !pending.is_empty() {
        match events.next().await {
            Some(Ok(event)) => {
                if !pending.contains(&event.contract_id) {
                    continue;
                }
                eprintln!(
                    "{} {} (parse {}%, analysis {}%)",
                    event.contract_id,
                    event.status.as_str(),
                    event.parsing_progress,
                    event.analysis_progress
                );
                if event.is_terminal() {
                    pending.remove(&event.contract_id);
                }
            }
            Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                tracing::warn!(missed, "event stream lagged; re-reading snapshots");
                pending.retain(|id| {
                    service
                        .contract(*id)
                        .is_some_and(|meta| !meta.status.is_terminal())
                });
            }
            None => break,
        }
    }

    Ok(ids)
}

fn report_for(service: &ContractService, id: Uuid) -> Option<ContractReport> {
    Some(ContractReport {
        metadata: service.contract(id)?,
        clauses: service.clauses(id),
        obligations: service.obligations(id),
        milestones: service.milestones(id),
        risk_assessment: service.risk_assessment(id),
        insights: service.insights(id),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use infralens::ai::mock::MockAnalyzer;
    use infralens::config::ServiceConfig;
    use infralens::contract::ContractUpload;
    use infralens::service::ContractService;

    use super::report_for;

    #[tokio::test]
    async fn report_carries_every_record_the_pipeline_produced() {
        let service = Arc::new(ContractService::new(
            Arc::new(MockAnalyzer::instant()),
            ServiceConfig::default(),
        ));
        let id = service.upload_contract(ContractUpload::new("metro-rail.pdf", 2048), None);
        service.wait_until_terminal(id).await;

        let report = report_for(&service, id).expect("report");
        let json = serde_json::to_value(&report).expect("serialize");

        let array_len = |key: &str| {
            json.get(key)
                .and_then(|v| v.as_array())
                .map(|a| a.len())
                .unwrap_or(0)
        };
        assert_eq!(array_len("clauses"), 2);
        assert_eq!(array_len("obligations"), 2);
        assert_eq!(array_len("milestones"), 1);
        assert_eq!(array_len("insights"), 3);
        assert!(json.get("riskAssessment").is_some());
        assert_eq!(json.get("status").and_then(|s| s.as_str()), Some("completed"));
    }
}
