//! Hybrid retrieval for the health Q&A corpus
//!
//! BM25 keyword search and embedding search run side by side and are merged
//! with Reciprocal Rank Fusion.

pub mod bm25;
pub mod embedder;
pub mod engine;
pub mod hybrid;
pub mod semantic;
pub mod tokenizer;
pub mod vectordb;

pub use bm25::{Bm25Config, Bm25Index};
pub use embedder::{create_embedder, Embedder, HashingEmbedder, Model2VecEmbedder};
pub use engine::{IndexStats, RetrievalEngine, SemanticSource};
pub use hybrid::{
    fuse_rrf, FilterStatus, FusedResult, HybridRetriever, MetadataFilter, RetrievalOutcome,
    SemanticStatus,
};
pub use semantic::{distance_to_similarity, Neighbor, SemanticAdapter, SemanticBackend};
pub use tokenizer::tokenize;
pub use vectordb::VectorStore;
