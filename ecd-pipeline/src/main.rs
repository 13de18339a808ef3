//! ecd-pipeline - ECD assessment pipeline runner
//!
//! Loads a project file, runs the four pipeline steps and prints one line per
//! entity. Exit status is 0 only when the session reached COMPLETED.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ecd_common::config::{resolve_project_path, AlgorithmKind, ProjectConfig, PROJECT_ENV_VAR};
use ecd_common::events::EventBus;
use ecd_pipeline::models::{EntityOutcome, LabelSource, PipelineResult};
use ecd_pipeline::{AssessmentSession, PipelineOrchestrator, SessionState};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    NaiveBayes,
    DecisionTrees,
}

impl From<AlgorithmArg> for AlgorithmKind {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::NaiveBayes => AlgorithmKind::NaiveBayes,
            AlgorithmArg::DecisionTrees => AlgorithmKind::DecisionTrees,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ecd-pipeline", version, about = "Evidence-Centered-Design assessment pipeline")]
struct Args {
    /// Project file (TOML)
    #[arg(short, long, env = PROJECT_ENV_VAR)]
    project: Option<PathBuf>,

    /// Output directory for instance files and reports
    #[arg(short, long, env = "ECD_OUTPUT")]
    output: Option<PathBuf>,

    /// Override the project's selected algorithm
    #[arg(short, long, value_enum)]
    algorithm: Option<AlgorithmArg>,

    /// Override the selected algorithm's percent split (0-100)
    #[arg(long)]
    percent_split: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_path = resolve_project_path(args.project.as_deref(), PROJECT_ENV_VAR)?;
    let mut project = ProjectConfig::load(&project_path)
        .with_context(|| format!("Failed to load project {}", project_path.display()))?;

    if let Some(algorithm) = args.algorithm {
        project.algorithm.selected = algorithm.into();
    }
    if let Some(percent) = args.percent_split {
        project.algorithm.set_percent_split(percent);
    }
    project.algorithm.validate()?;

    // RUST_LOG wins over the project's logging level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ecd_pipeline={level},ecd_common={level}",
            level = project.logging.level
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    info!("Starting ecd-pipeline v{}", env!("CARGO_PKG_VERSION"));
    info!("Project: {}", project_path.display());

    let output_dir = project.resolve_output_dir(args.output.as_deref());
    info!("Output: {}", output_dir.display());

    let event_bus = EventBus::new(256);
    let orchestrator = PipelineOrchestrator::new(event_bus);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling after the current step");
            ctrl_c_token.cancel();
        }
    });

    let session = AssessmentSession::new(project.project.name.clone());
    let (session, result) = orchestrator
        .execute(session, project, output_dir, &cancel_token)
        .await?;

    print_results(&session, &result);

    if session.state != SessionState::Completed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_results(session: &AssessmentSession, result: &PipelineResult) {
    println!();
    println!("{:<32} {:<10} {:>9} {:>7}  {}", "ENTITY", "STATUS", "ACCURACY", "KAPPA", "NOTE");
    for entity in &result.entities {
        let name = entity.key.to_string();
        match &entity.outcome {
            EntityOutcome::Trained => {
                if let Some(report) = &entity.performance {
                    println!(
                        "{:<32} {:<10} {:>8.2}% {:>7.3}  {}",
                        name,
                        "trained",
                        report.accuracy * 100.0,
                        report.kappa,
                        match entity.label_source {
                            Some(LabelSource::GroundTruth) => "ground-truth labels",
                            Some(LabelSource::Clustered) => "k-means labels",
                            None => "",
                        }
                    );
                }
            }
            EntityOutcome::Skipped { reason, .. } => {
                println!("{:<32} {:<10} {:>9} {:>7}  {}", name, "skipped", "-", "-", reason);
            }
            EntityOutcome::Failed { error, .. } => {
                println!("{:<32} {:<10} {:>9} {:>7}  {}", name, "failed", "-", "-", error);
            }
            EntityOutcome::Pending | EntityOutcome::Labelled => {
                println!("{:<32} {:<10} {:>9} {:>7}", name, "incomplete", "-", "-");
            }
        }
    }
    println!();
    println!(
        "Session {}: {} ({} trained, {} skipped, {} failed, {} warnings, {} errors) in {} ms",
        session.session_id,
        session.state.as_str(),
        result.trained(),
        result.skipped(),
        result.failed(),
        session.count_by_severity(ecd_common::events::LogSeverity::Warning),
        session.count_by_severity(ecd_common::events::LogSeverity::Error),
        session.elapsed_ms()
    );
}
