//! Embedder trait and implementations for semantic search
//!
//! Provides abstraction over different embedding models:
//! - HashingEmbedder: feature hashing of search tokens (built-in, no model file)
//! - Model2VecEmbedder: static neural embeddings (requires model download)

use anyhow::{Context, Result};
use model2vec::Model2Vec;
use std::path::Path;
use std::sync::Arc;

use super::tokenizer::tokenize;
use crate::core::config::{SemanticBackendKind, SemanticConfig};

/// Embedding model abstraction
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Get model name/identifier
    fn name(&self) -> &str;
}

// ============================================================================
// Hashing Embedder
// ============================================================================

/// Signed feature hashing over tokenizer output, L2-normalized
///
/// Deterministic across runs and platforms (FNV-1a), so vectors built at
/// index time and query time always agree.
pub struct HashingEmbedder {
    dimension: usize,
    name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            name: format!("hashing-{}", dimension.max(1)),
        }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        bytes
            .iter()
            .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let hash = Self::fnv1a(token.as_bytes());
            let slot = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Model2Vec Embedder
// ============================================================================

/// Model2Vec based embedder
pub struct Model2VecEmbedder {
    model: Model2Vec,
    model_path: String,
    dimension: usize,
}

impl Model2VecEmbedder {
    /// Load model from local path
    pub fn from_path(path: &Path) -> Result<Self> {
        let model = Model2Vec::from_pretrained(path.to_string_lossy().as_ref(), None, None)
            .with_context(|| format!("Failed to load Model2Vec from: {}", path.display()))?;

        Self::with_model(model, path.to_string_lossy().to_string())
    }

    /// Load model from HuggingFace Hub
    pub fn from_pretrained(model_id: &str) -> Result<Self> {
        let model = Model2Vec::from_pretrained(model_id, None, None)
            .with_context(|| format!("Failed to load Model2Vec: {}", model_id))?;

        Self::with_model(model, model_id.to_string())
    }

    fn with_model(model: Model2Vec, model_path: String) -> Result<Self> {
        // Probe once; dimensions differ between potion variants
        let probe = model.encode(&["dimension probe"]).context("Failed to encode text")?;
        let dimension = probe.ncols();

        Ok(Self {
            model,
            model_path,
            dimension,
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text];
        let embeddings = self.model.encode(&texts).context("Failed to encode text")?;
        Ok(embeddings.row(0).to_vec())
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.model.encode(texts).context("Failed to encode texts")?;
        Ok(embeddings.rows().into_iter().map(|r| r.to_vec()).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "model2vec"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create the configured embedder; `None` means lexical-only retrieval
pub fn create_embedder(config: &SemanticConfig) -> Result<Option<Arc<dyn Embedder>>> {
    match config.backend {
        SemanticBackendKind::None => Ok(None),
        SemanticBackendKind::Hashing => Ok(Some(Arc::new(HashingEmbedder::new(config.dimension)))),
        SemanticBackendKind::Model2Vec => {
            let embedder = match &config.model_path {
                Some(path) => Model2VecEmbedder::from_path(Path::new(path))?,
                None => Model2VecEmbedder::from_pretrained(&config.model_id)?,
            };
            Ok(Some(Arc::new(embedder)))
        }
    }
}
