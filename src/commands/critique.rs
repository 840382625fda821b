//! Critique command - decide whether a drafted answer goes back for revision

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Read;

use vitalis::core::config::Config;
use vitalis::qa::{parse_critique, should_revise};

pub fn run(config: &Config, text: Option<String>, iteration: u32, json: bool) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read critique from stdin")?;
            buf
        }
    };

    let outcome = parse_critique(&text);
    let revise = should_revise(outcome.value(), iteration, config.qa.max_revisions);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "critique": outcome.value(),
                "defaulted": outcome.reason(),
                "iteration": iteration,
                "max_revisions": config.qa.max_revisions,
                "revise": revise,
            })
        );
        return Ok(());
    }

    if let Some(reason) = outcome.reason() {
        println!("{} Unparseable critique ({}), accepting draft", "!".yellow(), reason);
    }

    let critique = outcome.value();
    if revise {
        println!(
            "{} Revise (iteration {} of {})",
            "→".yellow().bold(),
            iteration + 1,
            config.qa.max_revisions
        );
    } else {
        println!("{} Final", "✓".green().bold());
    }
    if !critique.reasons.is_empty() {
        println!("   {}", critique.reasons.dimmed());
    }

    Ok(())
}
