//! Corpus snapshot - the single source of truth for text and metadata
//!
//! Written wholesale by ingestion, read wholesale at startup or reindex.
//! On disk it is a JSON array of `{id, text, metadata}` records.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::RetrievalError;

/// Scalar metadata attached to a document (string, number, bool or null)
pub type Metadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CorpusDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Immutable, id-addressable set of documents for one serving generation
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<CorpusDocument>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    /// Build a corpus, rejecting duplicate ids and non-scalar metadata
    pub fn new(documents: Vec<CorpusDocument>) -> crate::Result<Self> {
        let mut by_id = HashMap::with_capacity(documents.len());

        for (idx, doc) in documents.iter().enumerate() {
            if let Some((key, _)) = doc
                .metadata
                .iter()
                .find(|(_, v)| v.is_array() || v.is_object())
            {
                return Err(RetrievalError::NonScalarMetadata {
                    id: doc.id.clone(),
                    key: key.clone(),
                });
            }
            if by_id.insert(doc.id.clone(), idx).is_some() {
                return Err(RetrievalError::DuplicateId(doc.id.clone()));
            }
        }

        Ok(Self { documents, by_id })
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus snapshot: {}", path.display()))?;
        let documents: Vec<CorpusDocument> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse corpus snapshot: {}", path.display()))?;

        Ok(Self::new(documents)?)
    }

    /// Write the snapshot wholesale (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        let content = serde_json::to_string_pretty(&self.documents)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CorpusDocument> {
        self.by_id.get(id).map(|&idx| &self.documents[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    pub fn iter(&self) -> impl Iterator<Item = &CorpusDocument> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Resolve an id by exact text match. Linear scan, rare fallback only.
    pub fn find_id_by_text(&self, text: &str) -> Option<&str> {
        self.documents
            .iter()
            .find(|doc| doc.text == text)
            .map(|doc| doc.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_docs() -> Vec<CorpusDocument> {
        vec![
            CorpusDocument::new("A", "hot flashes reduce with vitamin e supplement")
                .with_metadata("recommendation_id", "VASO_002"),
            CorpusDocument::new("B", "sleep schedule insomnia consistent bedtime")
                .with_metadata("recommendation_id", "SLEEP_001"),
        ]
    }

    #[test]
    fn test_lookup_by_id() {
        let corpus = Corpus::new(sample_docs()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(
            corpus.get("B").map(|d| d.text.as_str()),
            Some("sleep schedule insomnia consistent bedtime")
        );
        assert!(corpus.get("C").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut docs = sample_docs();
        docs.push(CorpusDocument::new("A", "another text"));
        let err = Corpus::new(docs).unwrap_err();
        assert!(matches!(err, RetrievalError::DuplicateId(id) if id == "A"));
    }

    #[test]
    fn test_non_scalar_metadata_rejected() {
        let docs = vec![CorpusDocument::new("A", "text").with_metadata("tags", json!(["x"]))];
        let err = Corpus::new(docs).unwrap_err();
        assert!(matches!(err, RetrievalError::NonScalarMetadata { key, .. } if key == "tags"));
    }

    #[test]
    fn test_find_id_by_text() {
        let corpus = Corpus::new(sample_docs()).unwrap();
        assert_eq!(
            corpus.find_id_by_text("sleep schedule insomnia consistent bedtime"),
            Some("B")
        );
        assert_eq!(corpus.find_id_by_text("sleep"), None);
    }

    #[test]
    fn test_save_and_load_snapshot() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("data/corpus.json");

        let corpus = Corpus::new(sample_docs())?;
        corpus.save(&path)?;

        let loaded = Corpus::load(&path)?;
        assert_eq!(loaded.documents(), corpus.documents());
        assert!(!path.with_extension("json.tmp").exists());

        Ok(())
    }

    #[test]
    fn test_load_missing_metadata_defaults_empty() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("corpus.json");
        fs::write(&path, r#"[{"id": "X", "text": "plain"}]"#)?;

        let corpus = Corpus::load(&path)?;
        assert!(corpus.get("X").unwrap().metadata.is_empty());

        Ok(())
    }
}
