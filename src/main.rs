use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

mod aggregate;
mod cohort;
mod config;
mod credit;
mod engine;
mod error;
mod forecast;
mod gap;
mod input;
mod metrics;
mod models;
mod report;
mod risk;
mod stats;

use config::EngineConfig;
use engine::{ScoringEngine, ScoringRun};

#[derive(Parser)]
#[command(name = "agent-scoring")]
#[command(about = "Risk, credit and revenue scoring for gambling agents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Activity records with normalized column names
    #[arg(long)]
    csv: PathBuf,
    /// JSON file overriding weights, category ladder or house margin
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank agents by combined score
    Score {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the full run as JSON
    Export {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, default_value = "profiles.json")]
        out: PathBuf,
    },
    /// Show the metric-by-metric breakdown of one agent
    Explain {
        #[command(flatten)]
        input: InputArgs,
        /// Agent name or numeric id
        #[arg(long)]
        agent: String,
    },
}

async fn score_input(args: &InputArgs) -> anyhow::Result<(Arc<ScoringEngine>, ScoringRun)> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = Arc::new(ScoringEngine::new(config).context("invalid engine configuration")?);
    let records = input::load_records(&args.csv)
        .with_context(|| format!("failed to read activity from {}", args.csv.display()))?;
    let run = Arc::clone(&engine).run(records).await;
    Ok((engine, run))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Score { input, limit } => {
            let (_, run) = score_input(&input).await?;

            if run.profiles.is_empty() {
                println!("No agents found in this input.");
                return Ok(());
            }

            println!("Top agents by score:");
            for profile in run.profiles.iter().take(limit) {
                println!(
                    "{:>3}. {} ({}) score {:.2} class {} credit {:.2} forecast {:.2}",
                    profile.rank,
                    profile.agent_name,
                    profile.agent_id,
                    profile.score,
                    profile.category,
                    profile.credit.amount,
                    profile.forecast_ggr
                );
            }
            if !run.failures.is_empty() {
                println!("{} agents rejected, see the report for details.", run.failures.len());
            }
        }
        Commands::Report { input, limit, out } => {
            let (_, run) = score_input(&input).await?;
            let report = report::build_report(&run, limit);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { input, out } => {
            let (_, run) = score_input(&input).await?;
            let json = serde_json::to_string_pretty(&run)?;
            std::fs::write(&out, json)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Exported {} agent profiles to {}.", run.profiles.len(), out.display());
        }
        Commands::Explain { input, agent } => {
            let (engine, run) = score_input(&input).await?;
            let profile = run
                .profile(&agent)
                .with_context(|| format!("agent '{agent}' not found"))?;
            print!("{}", report::build_breakdown(profile, engine.config()));
        }
    }

    Ok(())
}
