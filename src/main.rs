use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use section_rag::{AnalyzeRequest, Config, RagClient, SearchRequest};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "section-rag")]
#[command(about = "Structural section indexing and semantic search for source trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "SECTION_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and index a local source tree
    Analyze {
        /// Root directory of the source tree
        path: PathBuf,

        /// Repository identity, e.g. owner/repo or owner/repo@branch
        #[arg(short, long)]
        repo: String,

        /// Purge the repository's existing sections first
        #[arg(short, long)]
        force: bool,
    },

    /// Semantic search over indexed sections
    Search {
        query: String,

        /// Restrict results to one repository
        #[arg(short, long)]
        repo: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum similarity score (0.0 to 1.0)
        #[arg(short, long)]
        min_score: Option<f32>,
    },

    /// List stored sections of a repository
    Sections {
        repo: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Structural overview of a repository
    Summary { repo: String },

    /// Delete every section of a repository
    Purge { repo: String },

    /// Remove every section from the collection
    Clear,

    /// Collection statistics
    Stats,

    /// Build and version information
    Version,
}

#[derive(Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    build_timestamp: &'static str,
    git_commit: &'static str,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => Config::new()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON output
    let level = if cli.quiet {
        tracing::Level::WARN
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    if let Commands::Version = cli.command {
        return print_json(&VersionInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
            git_commit: env!("GIT_COMMIT_HASH"),
        });
    }

    let config = load_config(cli.config.as_ref())?;
    let defaults = config.search.clone();
    let client = RagClient::with_config(config)
        .await
        .context("Failed to initialize section-rag client")?;

    match cli.command {
        Commands::Analyze { path, repo, force } => {
            let response = client
                .analyze_repository(AnalyzeRequest {
                    repo,
                    path: path.to_string_lossy().to_string(),
                    force_refresh: force,
                })
                .await?;
            print_json(&response)
        }
        Commands::Search {
            query,
            repo,
            limit,
            min_score,
        } => {
            let response = client
                .search_sections(SearchRequest {
                    query,
                    repo,
                    limit: limit.unwrap_or(defaults.limit),
                    min_score: min_score.unwrap_or(defaults.min_score),
                })
                .await?;
            print_json(&response)
        }
        Commands::Sections { repo, limit } => {
            print_json(&client.repository_sections(&repo, limit).await?)
        }
        Commands::Summary { repo } => print_json(&client.repository_summary(&repo).await?),
        Commands::Purge { repo } => print_json(&client.delete_repository(&repo).await?),
        Commands::Clear => print_json(&client.clear_all().await),
        Commands::Stats => print_json(&client.statistics().await?),
        Commands::Version => Ok(()),
    }
}
