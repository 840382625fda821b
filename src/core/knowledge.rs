//! Knowledge base ingestion
//!
//! Turns the curated knowledge base (symptoms, each with recommendations)
//! into corpus documents, one per recommendation or per chunk of one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::config::IngestConfig;
use super::corpus::{Corpus, CorpusDocument};

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeEntry {
    #[serde(default)]
    pub symptom: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recommendation {
    pub recommendation_id: String,
    #[serde(default)]
    pub recommendation_text: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Ingestion summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub entries: usize,
    pub recommendations: usize,
    pub documents: usize,
}

pub fn load_knowledge_base(path: &Path) -> Result<Vec<KnowledgeEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge base: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse knowledge base: {}", path.display()))
}

/// Build corpus documents from knowledge-base entries
///
/// Metadata carries `symptom`, `category` and `recommendation_id`.
/// A recommendation longer than `chunk_size` characters is split into
/// chunks with ids `<recommendation_id>#<n>`.
pub fn build_documents(entries: &[KnowledgeEntry], config: &IngestConfig) -> Vec<CorpusDocument> {
    let mut docs = Vec::new();

    for entry in entries {
        let symptom = entry.symptom.as_deref().unwrap_or("");
        let category = entry.category.as_deref().unwrap_or("");

        for rec in &entry.recommendations {
            let base_text = format!(
                "Symptom: {}\nCategory: {}\nRecommendation: {}\nExplanation: {}\n",
                symptom,
                category,
                rec.recommendation_text.as_deref().unwrap_or(""),
                rec.explanation.as_deref().unwrap_or(""),
            );

            let make_doc = |id: String, text: String| {
                CorpusDocument::new(id, text)
                    .with_metadata("symptom", symptom)
                    .with_metadata("category", category)
                    .with_metadata("recommendation_id", rec.recommendation_id.as_str())
            };

            let chunks = chunk_text(&base_text, config.chunk_size, config.chunk_overlap);
            if chunks.len() == 1 {
                docs.push(make_doc(rec.recommendation_id.clone(), base_text));
            } else {
                for (n, chunk) in chunks.into_iter().enumerate() {
                    docs.push(make_doc(format!("{}#{}", rec.recommendation_id, n + 1), chunk));
                }
            }
        }
    }

    docs
}

/// Ingest a knowledge base file and write the corpus snapshot
pub fn ingest(knowledge_path: &Path, corpus_path: &Path, config: &IngestConfig) -> Result<IngestStats> {
    let entries = load_knowledge_base(knowledge_path)?;
    let docs = build_documents(&entries, config);

    let stats = IngestStats {
        entries: entries.len(),
        recommendations: entries.iter().map(|e| e.recommendations.len()).sum(),
        documents: docs.len(),
    };

    let corpus = Corpus::new(docs).context("Knowledge base produced an invalid corpus")?;
    corpus.save(corpus_path)?;

    tracing::info!(
        documents = stats.documents,
        path = %corpus_path.display(),
        "corpus snapshot written"
    );

    Ok(stats)
}

/// Split by characters; `chunk_size == 0` or short text gives one chunk
fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chunk_size == 0 || chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = if overlap == 0 || overlap >= chunk_size {
            end
        } else {
            end - overlap
        };
    }
    chunks
}
