//! Semantic search adapter
//!
//! The backend reports nearest neighbours by distance (smaller = closer).
//! The adapter turns that into a similarity in (0, 1] and resolves each
//! neighbour to a corpus document id, so fusion never sees the backend's
//! native scale.

use serde_json::Value;
use std::sync::Arc;

use crate::core::corpus::{Corpus, Metadata};
use crate::error::{Result, RetrievalError};

/// Metadata keys carrying the document id, in lookup order
pub const ID_METADATA_KEYS: [&str; 2] = ["id", "recommendation_id"];

/// Nearest neighbour as reported by a vector backend
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub text: String,
    pub metadata: Metadata,
}

/// Nearest-neighbour service keyed by corpus document ids
pub trait SemanticBackend: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &str;

    /// Up to `k` neighbours, closest first. Failures must be returned, not
    /// reported as an empty result.
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Neighbor>>;
}

/// `1 / (1 + d)`: zero distance maps to 1, larger distances approach 0
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Wraps a backend and produces a ranked `(id, similarity)` list
#[derive(Clone)]
pub struct SemanticAdapter {
    backend: Arc<dyn SemanticBackend>,
}

impl SemanticAdapter {
    pub fn new(backend: Arc<dyn SemanticBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Ranked semantic candidates, backend order preserved
    pub fn search(&self, query: &str, k: usize, corpus: &Corpus) -> Result<Vec<(String, f32)>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let neighbors = self.backend.similarity_search(query, k)?;

        neighbors
            .into_iter()
            .map(|neighbor| {
                let id = resolve_id(&neighbor, corpus)?;
                Ok((id, distance_to_similarity(neighbor.distance)))
            })
            .collect()
    }
}

/// Corpus id from metadata, or by exact text match as a last resort
///
/// A metadata id the corpus does not know is an integrity error, whatever
/// its rank.
fn resolve_id(neighbor: &Neighbor, corpus: &Corpus) -> Result<String> {
    let from_metadata = ID_METADATA_KEYS.iter().find_map(|key| {
        match neighbor.metadata.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    });

    if let Some(id) = from_metadata {
        if !corpus.contains(&id) {
            tracing::error!(id = %id, "semantic hit references an id missing from the corpus");
            return Err(RetrievalError::Integrity(format!(
                "semantic hit id '{}' is not in the corpus",
                id
            )));
        }
        return Ok(id);
    }

    tracing::warn!("semantic hit without id metadata, falling back to text match");
    corpus
        .find_id_by_text(&neighbor.text)
        .map(str::to_string)
        .ok_or_else(|| {
            RetrievalError::Integrity(
                "semantic hit has no id metadata and matches no corpus text".to_string(),
            )
        })
}
