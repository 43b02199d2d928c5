use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytcomb::config::Config;
use ytcomb::extractor::{url, Extractor};
use ytcomb::storage::{CommentSink, JsonLinesSink};

#[derive(Parser)]
#[command(
    name = "ytcomb",
    version,
    about = "YouTube comment thread extractor with bounded-cost pagination",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract comments from one or more videos
    Extract {
        /// Video URLs or ids
        urls: Vec<String>,

        /// File with one video URL per line
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Maximum comments to collect per video
        #[arg(short, long)]
        limit: Option<usize>,

        /// Retry profile (safe, fast)
        #[arg(long)]
        profile: Option<String>,

        /// Append extracted comments to this JSON-lines file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate and canonicalize video URLs without fetching anything
    Check {
        /// Video URLs or ids
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Extract {
            urls,
            input,
            limit,
            profile,
            output,
        } => {
            extract(config, urls, input, limit, profile, output).await?;
        }
        Commands::Check { urls } => {
            check(&urls);
        }
    }

    Ok(())
}

async fn extract(
    mut config: Config,
    urls: Vec<String>,
    input: Option<PathBuf>,
    limit: Option<usize>,
    profile: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut targets = urls;
    if let Some(path) = input {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        targets.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    if targets.is_empty() {
        anyhow::bail!("no video URLs given; pass them as arguments or via --input");
    }

    if let Some(limit) = limit {
        config.limits.max_comments = Some(limit);
    }
    if let Some(profile) = profile {
        config.retry_profile = profile;
        config.validate()?;
    }

    let sink: Option<Box<dyn CommentSink>> = match output {
        Some(path) => Some(Box::new(JsonLinesSink::create(&path).await?)),
        None => None,
    };

    let extractor = Extractor::new(config)?;

    tracing::info!(videos = targets.len(), "Starting extraction run");

    let results = extractor.extract_batch(&targets, sink.as_deref()).await;

    let mut total_comments = 0usize;
    let mut failures = 0usize;

    for result in &results {
        total_comments += result.comment_count();

        let status = if result.completed {
            "completed".to_string()
        } else {
            match result.error_category {
                Some(category) => format!("partial ({category})"),
                None => "partial".to_string(),
            }
        };

        println!(
            "{}  {}  {} comments  [{}]",
            result.metadata.video_id,
            status,
            result.comment_count(),
            result.error.as_deref().unwrap_or("-"),
        );

        if !result.completed && result.comments.is_empty() {
            failures += 1;
        }
    }

    println!(
        "\n{} videos, {} comments, {} failed with no output",
        results.len(),
        total_comments,
        failures
    );

    Ok(())
}

fn check(urls: &[String]) {
    let (valid, invalid) = url::normalize_batch(urls);

    for normalized in &valid {
        println!(
            "ok       {}  {}",
            normalized.video_id.as_deref().unwrap_or("-"),
            normalized.canonical_url.as_deref().unwrap_or("-"),
        );
    }
    for normalized in &invalid {
        println!(
            "invalid  {}",
            normalized.error.as_deref().unwrap_or("unknown error"),
        );
    }

    println!("\n{} valid, {} invalid", valid.len(), invalid.len());
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("ytcomb=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("ytcomb=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
