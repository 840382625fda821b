//! In-process vector store
//!
//! Embeds every corpus document once per generation and answers
//! nearest-neighbour queries by exhaustive squared L2 distance. Each stored
//! entry carries the document id in its metadata, like an external store
//! populated by ingestion would.

use std::sync::Arc;

use super::embedder::Embedder;
use super::semantic::{Neighbor, SemanticBackend};
use crate::core::corpus::{Corpus, Metadata};
use crate::error::{Result, RetrievalError};

struct Entry {
    vector: Vec<f32>,
    text: String,
    metadata: Metadata,
}

pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    entries: Vec<Entry>,
}

impl VectorStore {
    /// Embed the whole corpus in one batch
    pub fn build(corpus: &Corpus, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let texts: Vec<&str> = corpus.iter().map(|doc| doc.text.as_str()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| RetrievalError::Embedding(format!("{:#}", e)))?;

        if vectors.len() != corpus.len() {
            return Err(RetrievalError::Embedding(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                corpus.len()
            )));
        }

        let entries = corpus
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| {
                let mut metadata = doc.metadata.clone();
                metadata.insert("id".to_string(), doc.id.clone().into());
                Entry {
                    vector,
                    text: doc.text.clone(),
                    metadata,
                }
            })
            .collect();

        Ok(Self { embedder, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

impl SemanticBackend for VectorStore {
    fn name(&self) -> &str {
        self.embedder.name()
    }

    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Neighbor>> {
        let query_vec = self
            .embedder
            .embed(query)
            .map_err(|e| RetrievalError::Embedding(format!("{:#}", e)))?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, Self::squared_l2(&query_vec, &entry.vector)))
            .collect();

        // stable: equal distances stay in corpus order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(idx, distance)| {
                let entry = &self.entries[idx];
                Neighbor {
                    distance,
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corpus::CorpusDocument;
    use crate::search::embedder::HashingEmbedder;

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("model not loaded")
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn dimension(&self) -> usize {
            4
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(vec![
            CorpusDocument::new("A", "hot flashes reduce with vitamin e supplement")
                .with_metadata("category", "vasomotor"),
            CorpusDocument::new("B", "sleep schedule insomnia consistent bedtime"),
        ])
        .unwrap()
    }

    #[test]
    fn test_nearest_neighbor_carries_id() {
        let store = VectorStore::build(&corpus(), Arc::new(HashingEmbedder::new(128))).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), 128);

        let hits = store.similarity_search("insomnia bedtime", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata["id"], "B");
        assert!(hits[0].distance <= hits[1].distance);
        assert_eq!(hits[1].metadata["category"], "vasomotor");
    }

    #[test]
    fn test_exact_text_has_zero_distance() {
        let store = VectorStore::build(&corpus(), Arc::new(HashingEmbedder::new(64))).unwrap();
        let hits = store
            .similarity_search("hot flashes reduce with vitamin e supplement", 1)
            .unwrap();
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_embedding_failure_surfaces_as_backend_failure() {
        let store = VectorStore::build(&corpus(), Arc::new(BrokenEmbedder)).unwrap();
        let err = store.similarity_search("anything", 2).unwrap_err();
        assert!(err.is_backend_failure());
    }
}
