use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chess_analysis::{aggregate, analyze_batch, BatchConfig};
use chess_openings::OpeningBook;
use clap::{Parser, Subcommand};
use game_analyzer::report::{batch_summary, stats_table};
use game_analyzer::{AnalyzerConfig, ChessComSource, GameSource};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "game-analyzer")]
#[command(about = "Engine analysis and opening statistics for chess.com games")]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value_os_t = AnalyzerConfig::config_path())]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a player's games, analyse them and store the results
    Analyze {
        /// chess.com username
        username: String,
        /// Most recent games to fetch
        #[arg(short = 'n', long)]
        max_games: Option<usize>,
        /// Games analysed in parallel
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Print opening and color statistics from stored analyses
    Summarize {
        /// Player to summarise
        username: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AnalyzerConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Analyze {
            username,
            max_games,
            workers,
        } => analyze(&config, &username, max_games, workers).await,
        Commands::Summarize { username, json } => summarize(&config, &username, json),
    }
}

async fn analyze(
    config: &AnalyzerConfig,
    username: &str,
    max_games: Option<usize>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let book = OpeningBook::load(&config.eco_path).with_context(|| {
        format!(
            "failed to load opening book {}",
            config.eco_path.display()
        )
    })?;

    let source = ChessComSource::new(&config.user_agent)?;
    let max_games = max_games.unwrap_or(config.max_games);
    let games = source
        .fetch_games(username, max_games)
        .await
        .with_context(|| format!("failed to fetch games of {username}"))?;
    info!(username, games = games.len(), "analysing games");

    let store = config.store.open().context("failed to open store")?;
    let batch = BatchConfig {
        engine_path: config.engine_path.clone(),
        engine: config.engine_options(),
        analysis: config.analysis(),
        workers: workers.unwrap_or(config.workers),
    };
    let report = analyze_batch(games, Arc::new(book), store, batch).await;

    print!("{}", batch_summary(&report));
    Ok(())
}

fn summarize(config: &AnalyzerConfig, username: &str, json: bool) -> anyhow::Result<()> {
    let store = config.store.open().context("failed to open store")?;
    let stats = aggregate(store.as_ref(), username).context("failed to read stored analyses")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", stats_table(username, &stats));
    }
    Ok(())
}
