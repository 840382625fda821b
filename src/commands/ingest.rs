//! Ingest command - build the corpus snapshot from the knowledge base

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Instant;

use vitalis::core::config::Config;
use vitalis::core::knowledge;

pub fn run(
    config: &Config,
    knowledge_path: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let knowledge_path = knowledge_path.unwrap_or_else(|| config.paths.knowledge_base.clone());
    let corpus_path = out.unwrap_or_else(|| config.paths.corpus.clone());

    if !json {
        println!(
            "{} Ingesting {}...",
            "→".dimmed(),
            knowledge_path.display()
        );
    }

    let start = Instant::now();
    let stats = knowledge::ingest(&knowledge_path, &corpus_path, &config.ingest)?;
    let duration_ms = start.elapsed().as_millis();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "knowledge_base": knowledge_path,
                "corpus": corpus_path,
                "stats": stats,
                "duration_ms": duration_ms,
            })
        );
    } else {
        println!(
            "{} Wrote {} documents ({} recommendations from {} entries) in {:.2}s",
            "✓".green().bold(),
            stats.documents.to_string().cyan(),
            stats.recommendations,
            stats.entries,
            duration_ms as f64 / 1000.0
        );
        println!("   {}", corpus_path.display().to_string().dimmed());
    }

    Ok(())
}
