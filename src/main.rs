mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vitalis::core::config::Config;
use vitalis::core::logging::init_logging;

#[derive(Parser)]
#[command(name = "vitalis")]
#[command(about = "Hybrid BM25 + semantic retrieval for grounded health Q&A", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Config file (default: vitalis.json)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hybrid search over the corpus snapshot
    Search {
        query: String,
        #[arg(
            long = "filter",
            short,
            value_name = "KEY=VALUE",
            value_parser = vitalis::search::MetadataFilter::parse_pair,
            help = "Metadata equality filter (repeatable)"
        )]
        filters: Vec<(String, serde_json::Value)>,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "Print the formatted answer context")]
        context: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Build the corpus snapshot from the knowledge base
    Ingest {
        #[arg(long, help = "Knowledge base JSON (default: from config)")]
        knowledge: Option<PathBuf>,
        #[arg(long, help = "Corpus snapshot to write (default: from config)")]
        out: Option<PathBuf>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Check a critic verdict against the revision budget
    Critique {
        #[arg(help = "Critic output JSON (default: read stdin)")]
        text: Option<String>,
        #[arg(long, default_value = "0", help = "Revisions already made")]
        iteration: u32,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show configuration and index statistics
    Status {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let outcome = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    init_logging(&outcome.value().log_level);
    if let Some(reason) = outcome.reason() {
        tracing::warn!(reason = %reason, "malformed config file, using defaults");
    }
    let config = outcome.into_value();

    match cli.command {
        Commands::Search {
            query,
            filters,
            limit,
            context,
            json,
        } => commands::search::run(&config, &query, filters, limit, context, json),
        Commands::Ingest {
            knowledge,
            out,
            json,
        } => commands::ingest::run(&config, knowledge, out, json),
        Commands::Critique {
            text,
            iteration,
            json,
        } => commands::critique::run(&config, text, iteration, json),
        Commands::Status { json } => commands::status::run(&config, json),
    }
}
