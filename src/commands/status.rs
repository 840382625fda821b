//! Status command - configuration and index statistics

use anyhow::Result;
use colored::*;
use serde::Serialize;

use vitalis::core::config::{Config, RetrievalConfig};
use vitalis::search::{IndexStats, RetrievalEngine};

#[derive(Serialize)]
struct Status<'a> {
    corpus_path: String,
    retrieval: &'a RetrievalConfig,
    semantic_backend: String,
    index: Option<IndexStats>,
    error: Option<String>,
}

pub fn run(config: &Config, json: bool) -> Result<()> {
    let (index, error) = match RetrievalEngine::from_config(config) {
        Ok(engine) => (Some(engine.stats()), None),
        Err(e) => (None, Some(format!("{:#}", e))),
    };

    let status = Status {
        corpus_path: config.paths.corpus.display().to_string(),
        retrieval: &config.retrieval,
        semantic_backend: format!("{:?}", config.semantic.backend).to_lowercase(),
        index,
        error,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    if status.error.is_some() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_status(status: &Status) {
    println!("{}", "Retrieval Status".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("Corpus: {}", status.corpus_path);
    println!("Semantic backend: {}", status.semantic_backend);
    println!();

    let r = status.retrieval;
    println!("{}", "Retrieval".cyan());
    println!("{}", "-".repeat(30));
    println!("   {:<16} {:>6}", "lexical_top_k", r.lexical_top_k);
    println!("   {:<16} {:>6}", "semantic_top_k", r.semantic_top_k);
    println!("   {:<16} {:>6}", "fusion_k", r.fusion_k);
    println!("   {:<16} {:>6}", "rrf_k", r.rrf_k);
    println!("   {:<16} {:>6}", "max_contexts", r.max_contexts);
    println!();

    match (&status.index, &status.error) {
        (Some(index), _) => {
            println!("{}", "Index".cyan());
            println!("{}", "-".repeat(30));
            println!("   {:<16} {:>6}", "documents", index.documents);
            println!("   {:<16} {:>6}", "vocabulary", index.vocabulary);
            println!(
                "   {:<16} {}",
                "semantic",
                index.semantic_backend.as_deref().unwrap_or("disabled")
            );
            println!("   {:<16} {}", "built", index.built_at.to_rfc3339());
        }
        (None, Some(error)) => {
            println!("{}", "⚠️  Index unavailable".yellow());
            println!("   {}", error);
        }
        (None, None) => {}
    }

    println!();
    println!("{}", "=".repeat(50));
}
