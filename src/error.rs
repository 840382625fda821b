use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Duplicate document id in corpus: {0}")]
    DuplicateId(String),

    #[error("Document '{id}' has a non-scalar metadata value for key '{key}'")]
    NonScalarMetadata { id: String, key: String },

    /// Corpus and indexes disagree. Never degraded around.
    #[error("Corpus integrity violation: {0}")]
    Integrity(String),

    #[error("Semantic backend failed: {0}")]
    Backend(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RetrievalError {
    /// Failures the orchestrator may degrade around (lexical-only results)
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Embedding(_))
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_failures_are_degradable() {
        assert!(RetrievalError::Backend("down".into()).is_backend_failure());
        assert!(RetrievalError::Embedding("oom".into()).is_backend_failure());
        assert!(!RetrievalError::Integrity("missing".into()).is_backend_failure());
        assert!(!RetrievalError::DuplicateId("A".into()).is_backend_failure());
    }
}
