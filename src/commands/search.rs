//! Search command - hybrid retrieval over the corpus snapshot

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use vitalis::core::config::Config;
use vitalis::qa::format_context;
use vitalis::search::{
    FilterStatus, MetadataFilter, RetrievalEngine, RetrievalOutcome, SemanticStatus,
};

pub fn run(
    config: &Config,
    query: &str,
    filters: Vec<(String, Value)>,
    limit: Option<usize>,
    context: bool,
    json: bool,
) -> Result<()> {
    let engine = RetrievalEngine::from_config(config)?;

    let filter: MetadataFilter = filters.into_iter().collect();
    let filter = (!filter.is_empty()).then_some(&filter);

    let mut outcome = if context {
        engine.contexts(query, filter)?
    } else {
        engine.search(query, filter)?
    };
    if let Some(limit) = limit {
        outcome.results.truncate(limit);
    }

    if json {
        let output = if context {
            serde_json::json!({
                "query": query,
                "outcome": outcome,
                "context": format_context(&outcome.results),
            })
        } else {
            serde_json::json!({
                "query": query,
                "outcome": outcome,
            })
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_notices(&outcome);

    if outcome.is_empty() {
        println!("{} No grounding context found for: {}", "→".dimmed(), query.cyan());
        return Ok(());
    }

    if context {
        println!("{}", format_context(&outcome.results));
        return Ok(());
    }

    println!(
        "{} {} results for: {}",
        "→".dimmed(),
        outcome.len(),
        query.cyan()
    );
    println!();

    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. [{}] {}",
            (i + 1).to_string().bold(),
            format!("{:.4}", result.fused_score).dimmed(),
            result.id.cyan()
        );

        let first_line = result.text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let display = if first_line.chars().count() > 100 {
            format!("{}...", first_line.chars().take(100).collect::<String>())
        } else {
            first_line.to_string()
        };
        println!("   {}", display.dimmed());

        if let Some(Value::String(category)) = result.metadata.get("category") {
            println!("   {}", category);
        }
        println!();
    }

    Ok(())
}

fn print_notices(outcome: &RetrievalOutcome) {
    if let SemanticStatus::Failed { reason } = &outcome.semantic {
        println!("{} Semantic search unavailable ({}), using keyword results only", "!".yellow(), reason);
    }
    if outcome.filter == FilterStatus::FellBack {
        println!("{} Filter matched nothing, showing unfiltered results", "!".yellow());
    }
}
