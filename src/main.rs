use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proofdrop::util::print_score_report;
use proofdrop::{ScoreHandler, ScoringConfig};

#[derive(Parser, Debug)]
#[command(name = "proofdrop", version, about = "Wallet trust score from on-chain activity")]
struct Cli {
    /// Wallet address to score
    address: String,

    /// Scoring configuration document
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Print the score report as JSON instead of the breakdown
    #[arg(long)]
    json: bool,

    /// Directory for daily rolling JSON logs
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "proofdrop.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // Console goes to stderr so `--json` output stays clean
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli.log_dir)?;

    let address = cli.address.trim();
    if address.is_empty() {
        error!("No wallet address given");
        anyhow::bail!("wallet address must not be empty");
    }

    info!("🪪 ProofDrop - wallet trust score");
    let config = ScoringConfig::load_or_default(&cli.config);
    let handler = ScoreHandler::from_config(config)?;

    let report = handler.score_address(address).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_score_report(&report);
    }

    Ok(())
}
