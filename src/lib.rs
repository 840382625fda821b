//! Vitalis - hybrid retrieval for grounded health Q&A
//!
//! Lexical (BM25) and semantic (embedding) search over a fixed corpus of
//! recommendation passages, fused with Reciprocal Rank Fusion into one
//! deterministic ranking.

pub mod core;
pub mod error;
pub mod qa;
pub mod search;

pub use error::{Result, RetrievalError};
