//! Retrieval Engine - owns the serving generation and rebuilds it atomically
//!
//! A generation bundles the corpus, its BM25 index and the semantic backend
//! built over the same corpus. Queries clone the current `Arc` once and run
//! against that generation only; `reindex` builds the next one off-lock and
//! swaps the pointer, so readers never see a half-built index.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::embedder::{create_embedder, Embedder};
use super::hybrid::{HybridRetriever, MetadataFilter, RetrievalOutcome};
use super::semantic::SemanticBackend;
use super::vectordb::VectorStore;
use crate::core::config::{Config, RetrievalConfig};
use crate::core::corpus::Corpus;

/// Where semantic candidates come from
#[derive(Clone)]
pub enum SemanticSource {
    /// Lexical-only retrieval
    Disabled,
    /// Embed the corpus in-process on every build
    Embedded(Arc<dyn Embedder>),
    /// Externally maintained store, keyed by the same document ids
    ///
    /// The same backend serves every generation: the caller must bring the
    /// store in line with a corpus before passing that corpus to `reindex`.
    /// A hit whose id the new corpus lacks fails the query as an integrity
    /// error.
    External(Arc<dyn SemanticBackend>),
}

impl SemanticSource {
    fn backend_for(&self, corpus: &Corpus) -> crate::Result<Option<Arc<dyn SemanticBackend>>> {
        match self {
            Self::Disabled => Ok(None),
            Self::Embedded(embedder) => {
                let store = VectorStore::build(corpus, Arc::clone(embedder))?;
                Ok(Some(Arc::new(store)))
            }
            Self::External(backend) => Ok(Some(Arc::clone(backend))),
        }
    }
}

/// Statistics of the serving generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub generation: u64,
    pub documents: usize,
    pub vocabulary: usize,
    pub semantic_backend: Option<String>,
    pub built_at: DateTime<Utc>,
}

struct Generation {
    retriever: Arc<HybridRetriever>,
    stats: IndexStats,
}

pub struct RetrievalEngine {
    config: RetrievalConfig,
    semantic: SemanticSource,
    corpus_path: Option<PathBuf>,
    current: RwLock<Arc<Generation>>,
    /// Serializes builds; holds the last generation number handed out
    build_lock: Mutex<u64>,
}

impl RetrievalEngine {
    /// Build the first generation over `corpus`
    pub fn new(
        config: RetrievalConfig,
        semantic: SemanticSource,
        corpus: Corpus,
    ) -> crate::Result<Self> {
        let first = build_generation(&config, &semantic, corpus, 1)?;

        Ok(Self {
            config,
            semantic,
            corpus_path: None,
            current: RwLock::new(Arc::new(first)),
            build_lock: Mutex::new(1),
        })
    }

    /// Load the configured corpus snapshot and embedder
    pub fn from_config(config: &Config) -> Result<Self> {
        let semantic = match create_embedder(&config.semantic)? {
            Some(embedder) => SemanticSource::Embedded(embedder),
            None => SemanticSource::Disabled,
        };

        let corpus = Corpus::load(&config.paths.corpus).with_context(|| {
            format!(
                "No corpus snapshot at {} (run `vitalis ingest` first)",
                config.paths.corpus.display()
            )
        })?;

        let engine = Self::new(config.retrieval.clone(), semantic, corpus)?;
        Ok(engine.with_corpus_path(&config.paths.corpus))
    }

    /// Snapshot file used by `reload`
    pub fn with_corpus_path(mut self, path: &Path) -> Self {
        self.corpus_path = Some(path.to_path_buf());
        self
    }

    /// The serving generation; stays valid across later reindexes
    pub fn snapshot(&self) -> Arc<HybridRetriever> {
        Arc::clone(&self.current.read().retriever)
    }

    pub fn search(&self, query: &str, filter: Option<&MetadataFilter>) -> crate::Result<RetrievalOutcome> {
        self.snapshot().search(query, filter)
    }

    pub fn contexts(&self, query: &str, filter: Option<&MetadataFilter>) -> crate::Result<RetrievalOutcome> {
        self.snapshot().contexts(query, filter)
    }

    /// Build a new generation and swap it in
    ///
    /// On failure the serving generation is left untouched.
    pub fn reindex(&self, corpus: Corpus) -> crate::Result<IndexStats> {
        let mut last = self.build_lock.lock();
        let next = build_generation(&self.config, &self.semantic, corpus, *last + 1)?;
        let stats = next.stats.clone();

        *self.current.write() = Arc::new(next);
        *last += 1;

        Ok(stats)
    }

    /// Re-read the corpus snapshot file and reindex
    pub fn reload(&self) -> Result<IndexStats> {
        let path = self
            .corpus_path
            .as_deref()
            .context("Engine has no corpus snapshot path to reload from")?;
        let corpus = Corpus::load(path)?;
        Ok(self.reindex(corpus)?)
    }

    pub fn stats(&self) -> IndexStats {
        self.current.read().stats.clone()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }
}

fn build_generation(
    config: &RetrievalConfig,
    semantic: &SemanticSource,
    corpus: Corpus,
    generation: u64,
) -> crate::Result<Generation> {
    let start = Instant::now();

    let backend = semantic.backend_for(&corpus)?;
    let retriever = HybridRetriever::new(corpus, backend, config.clone())?;

    let stats = IndexStats {
        generation,
        documents: retriever.corpus().len(),
        vocabulary: retriever.lexical_index().vocabulary_size(),
        semantic_backend: retriever.semantic_backend().map(str::to_string),
        built_at: Utc::now(),
    };

    info!(
        generation,
        documents = stats.documents,
        vocabulary = stats.vocabulary,
        semantic = stats.semantic_backend.as_deref().unwrap_or("disabled"),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index generation built"
    );

    Ok(Generation {
        retriever: Arc::new(retriever),
        stats,
    })
}
