//! # Newsletter RAG CLI (`nrag`)
//!
//! ## Usage
//!
//! ```bash
//! nrag --config ./config/nrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nrag serve` | Start the HTTP API |
//! | `nrag search "<query>"` | Print ranked search hits |
//! | `nrag ask "<query>"` | Print the composed answer |
//! | `nrag months` | List newsletter months |
//! | `nrag stats` | Show index statistics |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use newsletter_rag::{answer, config, llm, loader, search, server};
use newsletter_rag_core::Backend;

/// Newsletter RAG: question answering over monthly newsletter records.
#[derive(Parser)]
#[command(
    name = "nrag",
    about = "Newsletter RAG — question answering over monthly education newsletter records",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/nrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Search the corpus and print ranked hits.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        limit: Option<usize>,

        /// Override the search backend: `auto`, `brute_force`, or `flat_index`.
        #[arg(long)]
        backend: Option<Backend>,
    },

    /// Answer a question the way `POST /api/chat` does.
    Ask {
        /// The question.
        query: String,
    },

    /// List newsletter months in file order.
    Months,

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config)?;

    if let Commands::Search {
        backend: Some(backend),
        ..
    } = &cli.command
    {
        cfg.retrieval.backend = *backend;
    }

    let index = loader::load_index(&cfg)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg, index).await?;
        }
        Commands::Search { query, limit, .. } => {
            let limit = limit.unwrap_or(cfg.retrieval.top_k);
            if limit < 1 {
                anyhow::bail!("--limit must be >= 1");
            }
            search::run_search(&index, &query, limit);
        }
        Commands::Ask { query } => {
            let narrator = llm::NarrativeClient::new(&cfg.llm)?;
            let narrator = narrator.is_enabled().then_some(&narrator);
            let out = answer::answer_query(
                &index,
                narrator,
                &query,
                cfg.retrieval.top_k,
                cfg.retrieval.context_results,
            )
            .await;
            println!("{}", out.answer);
            if !out.sources.is_empty() {
                println!();
                println!("Sources: {}", out.sources.join(", "));
            }
            println!("Mode: {}", out.mode);
        }
        Commands::Months => {
            for month in index.list_months() {
                println!("{}", month);
            }
        }
        Commands::Stats => {
            println!("months: {}", index.month_count());
            println!("chunks: {}", index.chunk_count());
            println!("vocabulary: {}", index.vocabulary_size());
            println!("backend: {}", index.backend_name());
            println!("ready: {}", index.is_ready());
        }
    }

    Ok(())
}
