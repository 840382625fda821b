//! Vitalis configuration module
//!
//! Config loading order:
//! 1. `vitalis.json` (or an explicit path), every field optional
//! 2. Environment overrides (`BM25_TOP_K`, `RRF_K`, ...)
//!
//! Settings are read once at process start and never mutated afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::outcome::ParseOutcome;
use crate::error::RetrievalError;

pub const CONFIG_FILE: &str = "vitalis.json";
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub qa: QaConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// Retrieval
// ============================================================================

/// Retrieval depths and fusion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates taken from the BM25 index (default: 25)
    #[serde(default = "default_lexical_top_k")]
    pub lexical_top_k: usize,

    /// Candidates taken from the semantic backend (default: 10)
    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,

    /// Fused results kept after RRF (default: 8)
    #[serde(default = "default_fusion_k")]
    pub fusion_k: usize,

    /// RRF smoothing constant (default: 60)
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Contexts handed to answer generation (default: 6)
    #[serde(default = "default_max_contexts")]
    pub max_contexts: usize,
}

fn default_lexical_top_k() -> usize {
    25
}

fn default_semantic_top_k() -> usize {
    10
}

fn default_fusion_k() -> usize {
    8
}

fn default_rrf_k() -> f32 {
    60.0
}

fn default_max_contexts() -> usize {
    6
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            lexical_top_k: default_lexical_top_k(),
            semantic_top_k: default_semantic_top_k(),
            fusion_k: default_fusion_k(),
            rrf_k: default_rrf_k(),
            max_contexts: default_max_contexts(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if !self.rrf_k.is_finite() || self.rrf_k < 0.0 {
            return Err(RetrievalError::InvalidConfig(format!(
                "rrf_k must be a finite value >= 0, got {}",
                self.rrf_k
            )));
        }

        if self.lexical_top_k == 0 && self.semantic_top_k == 0 {
            return Err(RetrievalError::InvalidConfig(
                "lexical_top_k and semantic_top_k cannot both be 0".to_string(),
            ));
        }

        if self.fusion_k == 0 {
            return Err(RetrievalError::InvalidConfig(
                "fusion_k must be > 0".to_string(),
            ));
        }

        if self.max_contexts == 0 {
            return Err(RetrievalError::InvalidConfig(
                "max_contexts must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Semantic backend
// ============================================================================

/// Embedding backend, selected explicitly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticBackendKind {
    /// Lexical-only retrieval
    None,
    /// Built-in feature hashing embedder (no model file)
    #[default]
    Hashing,
    /// Model2Vec static embeddings
    Model2Vec,
}

impl FromStr for SemanticBackendKind {
    type Err = RetrievalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "hashing" => Ok(Self::Hashing),
            "model2vec" => Ok(Self::Model2Vec),
            other => Err(RetrievalError::InvalidConfig(format!(
                "unknown semantic backend '{}' (expected none, hashing or model2vec)",
                other
            ))),
        }
    }
}

/// Default Model2Vec model ID
pub const DEFAULT_MODEL2VEC_MODEL: &str = "minishlab/potion-base-8M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticConfig {
    #[serde(default)]
    pub backend: SemanticBackendKind,

    /// Local model directory; takes precedence over `model_id`
    #[serde(default)]
    pub model_path: Option<String>,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Vector size of the hashing embedder
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_model_id() -> String {
    DEFAULT_MODEL2VEC_MODEL.to_string()
}

fn default_dimension() -> usize {
    256
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            backend: SemanticBackendKind::default(),
            model_path: None,
            model_id: default_model_id(),
            dimension: default_dimension(),
        }
    }
}

// ============================================================================
// Paths, ingestion, QA loop
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_corpus_path")]
    pub corpus: PathBuf,

    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base: PathBuf,
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/corpus.json")
}

fn default_knowledge_base_path() -> PathBuf {
    PathBuf::from("knowledge_base/knowledge_base.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus: default_corpus_path(),
            knowledge_base: default_knowledge_base_path(),
        }
    }
}

/// Character chunking of knowledge-base passages (0 disables)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub chunk_size: usize,

    #[serde(default)]
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaConfig {
    /// Upper bound on draft/critique iterations
    #[serde(default = "default_max_revisions")]
    pub max_revisions: u32,
}

fn default_max_revisions() -> u32 {
    2
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            max_revisions: default_max_revisions(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: default_log_level(),
            retrieval: RetrievalConfig::default(),
            semantic: SemanticConfig::default(),
            paths: PathsConfig::default(),
            ingest: IngestConfig::default(),
            qa: QaConfig::default(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load `vitalis.json` from the working directory
    pub fn load_default() -> Result<ParseOutcome<Self>> {
        Self::load(Path::new(CONFIG_FILE))
    }

    /// Load from file, then apply process environment overrides
    ///
    /// A missing file yields defaults as a normal parse. A malformed file
    /// yields `Defaulted` with the parse error as reason. Unparseable
    /// environment values and invalid settings are hard errors.
    pub fn load(path: &Path) -> Result<ParseOutcome<Self>> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<ParseOutcome<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let outcome = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            match serde_json::from_str::<Config>(&content) {
                Ok(config) => ParseOutcome::Parsed(config),
                Err(e) => ParseOutcome::Defaulted {
                    value: Config::default(),
                    reason: format!("{}: {}", path.display(), e),
                },
            }
        } else {
            ParseOutcome::Parsed(Config::default())
        };

        let (mut config, reason) = match outcome {
            ParseOutcome::Parsed(config) => (config, None),
            ParseOutcome::Defaulted { value, reason } => (value, Some(reason)),
        };

        if config.version > CONFIG_VERSION {
            tracing::warn!(
                version = config.version,
                supported = CONFIG_VERSION,
                "config version is newer than supported"
            );
        }

        config.apply_env(lookup)?;
        config.validate()?;

        Ok(match reason {
            None => ParseOutcome::Parsed(config),
            Some(reason) => ParseOutcome::Defaulted {
                value: config,
                reason,
            },
        })
    }

    /// Apply environment overrides
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env_value(&lookup, "BM25_TOP_K")? {
            self.retrieval.lexical_top_k = v;
        }
        if let Some(v) = env_value(&lookup, "VECTOR_TOP_K")? {
            self.retrieval.semantic_top_k = v;
        }
        if let Some(v) = env_value(&lookup, "FUSION_K")? {
            self.retrieval.fusion_k = v;
        }
        if let Some(v) = env_value(&lookup, "RRF_K")? {
            self.retrieval.rrf_k = v;
        }
        if let Some(v) = env_value(&lookup, "MAX_CONTEXT_CHUNKS")? {
            self.retrieval.max_contexts = v;
        }
        if let Some(v) = env_value(&lookup, "MAX_GRAPH_ITERS")? {
            self.qa.max_revisions = v;
        }
        if let Some(v) = env_value(&lookup, "CHUNK_SIZE")? {
            self.ingest.chunk_size = v;
        }
        if let Some(v) = env_value(&lookup, "CHUNK_OVERLAP")? {
            self.ingest.chunk_overlap = v;
        }
        if let Some(v) = env_value(&lookup, "SEMANTIC_BACKEND")? {
            self.semantic.backend = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("CORPUS_PATH") {
            self.paths.corpus = PathBuf::from(v);
        }
        if let Some(v) = lookup("KNOWLEDGE_JSON_PATH") {
            self.paths.knowledge_base = PathBuf::from(v);
        }
        if let Some(v) = lookup("MODEL_PATH") {
            self.semantic.model_path = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.retrieval.validate()?;

        if self.ingest.chunk_size > 0 && self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(RetrievalError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }

        if self.semantic.backend == SemanticBackendKind::Hashing && self.semantic.dimension == 0 {
            return Err(RetrievalError::InvalidConfig(
                "semantic.dimension must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate default config file content
    pub fn default_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&Config::default())?)
    }
}

fn env_value<T, F>(lookup: &F, name: &str) -> crate::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            RetrievalError::InvalidConfig(format!("{}={:?}: {}", name, raw, e))
        }),
    }
}
