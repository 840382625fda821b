//! Hybrid Search - combines semantic and keyword (BM25) search
//!
//! Both searches run against the same query text with their own depth, and
//! their rankings are merged with Reciprocal Rank Fusion. Fusion looks at
//! rank positions only, so BM25 scores and similarities never need to be put
//! on a common scale.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::bm25::Bm25Index;
use super::semantic::{SemanticAdapter, SemanticBackend};
use super::tokenizer::tokenize;
use crate::core::config::RetrievalConfig;
use crate::core::corpus::{Corpus, Metadata};
use crate::error::{Result, RetrievalError};

// ============================================================================
// RRF Fusion
// ============================================================================

/// RRF (Reciprocal Rank Fusion) algorithm
///
/// Every id at 1-indexed rank `r` of a list gains `1 / (rrf_k + r)`;
/// contributions are summed across lists, results sorted by the sum
/// descending and truncated to `k`.
///
/// Equal sums keep first-seen order: lists are walked in input order, each
/// in rank order, and an id is placed where it was first encountered.
///
/// # Arguments
/// * `ranked_lists` - Ranked `(id, raw_score)` lists; raw scores are ignored
/// * `k` - Number of fused results to keep
/// * `rrf_k` - Smoothing constant, dampens the weight of top ranks
pub fn fuse_rrf(ranked_lists: &[Vec<(String, f32)>], k: usize, rrf_k: f32) -> Vec<(String, f32)> {
    let mut fused: Vec<(String, f32)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for list in ranked_lists {
        for (rank, (id, _score)) in list.iter().enumerate() {
            let contribution = 1.0 / (rrf_k + (rank + 1) as f32);
            match positions.get(id.as_str()) {
                Some(&pos) => fused[pos].1 += contribution,
                None => {
                    positions.insert(id.as_str(), fused.len());
                    fused.push((id.clone(), contribution));
                }
            }
        }
    }

    // stable sort: ties stay in first-seen order
    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused.truncate(k);
    fused
}

// ============================================================================
// Results
// ============================================================================

/// Fused result enriched with the stored document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedResult {
    pub id: String,
    pub fused_score: f32,
    pub text: String,
    pub metadata: Metadata,
}

/// What happened to the semantic half of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SemanticStatus {
    Used { hits: usize },
    /// No semantic backend configured
    Disabled,
    /// Backend failed; results are lexical-only
    Failed { reason: String },
}

/// What happened to the metadata post-filter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FilterStatus {
    NotRequested,
    Applied { kept: usize },
    /// Filter matched nothing; unfiltered results returned
    FellBack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalOutcome {
    pub results: Vec<FusedResult>,
    pub semantic: SemanticStatus,
    pub filter: FilterStatus,
}

impl RetrievalOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }
}

// ============================================================================
// Metadata filter
// ============================================================================

/// Equality filter: every pair must match the result metadata exactly
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(Metadata);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }

    /// Parse `key=value`; JSON scalars (numbers, booleans, null) keep their
    /// type, anything else is a string
    pub fn parse_pair(s: &str) -> std::result::Result<(String, Value), String> {
        let (key, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty filter key in '{}'", s));
        }

        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v) if !v.is_array() && !v.is_object() && !v.is_string() => v,
            _ => Value::String(raw.to_string()),
        };
        Ok((key.to_string(), value))
    }
}

impl FromIterator<(String, Value)> for MetadataFilter {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Hybrid Retriever
// ============================================================================

/// One generation of (corpus, lexical index, semantic backend)
///
/// Everything is immutable after construction; share it behind an `Arc`.
pub struct HybridRetriever {
    corpus: Corpus,
    lexical: Bm25Index,
    semantic: Option<SemanticAdapter>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    /// Build the lexical index over `corpus`
    ///
    /// `semantic` must be keyed by the same ids as `corpus`; `None` gives
    /// lexical-only retrieval.
    pub fn new(
        corpus: Corpus,
        semantic: Option<Arc<dyn SemanticBackend>>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let lexical = Bm25Index::from_corpus(&corpus);

        Ok(Self {
            corpus,
            lexical,
            semantic: semantic.map(SemanticAdapter::new),
            config,
        })
    }

    /// Hybrid search with optional metadata post-filter
    ///
    /// A semantic backend failure degrades to lexical-only results and is
    /// reported in `RetrievalOutcome::semantic`. A filter that would remove
    /// every result is dropped and reported as `FilterStatus::FellBack`.
    pub fn search(&self, query: &str, filter: Option<&MetadataFilter>) -> Result<RetrievalOutcome> {
        let (results, semantic) = self.fused_results(query)?;
        Ok(finish(results, semantic, filter))
    }

    /// Top `max_contexts` fused results for answer generation
    ///
    /// The cap comes first: the filter only narrows the capped slice, and
    /// falls back to that slice when nothing in it matches.
    pub fn contexts(&self, query: &str, filter: Option<&MetadataFilter>) -> Result<RetrievalOutcome> {
        let (mut results, semantic) = self.fused_results(query)?;
        results.truncate(self.config.max_contexts);
        Ok(finish(results, semantic, filter))
    }

    /// Both searches, fused and enriched, unfiltered
    fn fused_results(&self, query: &str) -> Result<(Vec<FusedResult>, SemanticStatus)> {
        let query_tokens = tokenize(query);

        let (lexical_hits, semantic_result) = rayon::join(
            || self.lexical.search(&query_tokens, self.config.lexical_top_k),
            || {
                self.semantic
                    .as_ref()
                    .map(|s| s.search(query, self.config.semantic_top_k, &self.corpus))
            },
        );

        let (semantic_hits, semantic_status) = match semantic_result {
            None => (Vec::new(), SemanticStatus::Disabled),
            Some(Ok(hits)) => {
                let count = hits.len();
                (hits, SemanticStatus::Used { hits: count })
            }
            Some(Err(e)) if e.is_backend_failure() => {
                warn!(error = %e, "semantic search failed, using lexical results only");
                (
                    Vec::new(),
                    SemanticStatus::Failed {
                        reason: e.to_string(),
                    },
                )
            }
            Some(Err(e)) => return Err(e),
        };

        debug!(
            lexical = lexical_hits.len(),
            semantic = semantic_hits.len(),
            "candidates retrieved"
        );

        let fused = fuse_rrf(
            &[semantic_hits, lexical_hits],
            self.config.fusion_k,
            self.config.rrf_k,
        );
        let results = self.enrich(fused)?;
        Ok((results, semantic_status))
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn lexical_index(&self) -> &Bm25Index {
        &self.lexical
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Name of the semantic backend, if any
    pub fn semantic_backend(&self) -> Option<&str> {
        self.semantic.as_ref().map(|s| s.backend_name())
    }

    /// Attach stored text and metadata, preserving fused order
    fn enrich(&self, fused: Vec<(String, f32)>) -> Result<Vec<FusedResult>> {
        fused
            .into_iter()
            .map(|(id, fused_score)| match self.corpus.get(&id) {
                Some(doc) => Ok(FusedResult {
                    id,
                    fused_score,
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                }),
                None => {
                    error!(id = %id, "fused id missing from corpus");
                    Err(RetrievalError::Integrity(format!(
                        "fused id '{}' is not in the corpus",
                        id
                    )))
                }
            })
            .collect()
    }
}

fn finish(
    results: Vec<FusedResult>,
    semantic: SemanticStatus,
    filter: Option<&MetadataFilter>,
) -> RetrievalOutcome {
    let (results, filter) = apply_filter(results, filter);
    debug!(results = results.len(), filter = ?filter, "fusion complete");

    RetrievalOutcome {
        results,
        semantic,
        filter,
    }
}

fn apply_filter(
    mut results: Vec<FusedResult>,
    filter: Option<&MetadataFilter>,
) -> (Vec<FusedResult>, FilterStatus) {
    let filter = match filter {
        Some(f) if !f.is_empty() => f,
        _ => return (results, FilterStatus::NotRequested),
    };

    if results.iter().any(|r| filter.matches(&r.metadata)) {
        results.retain(|r| filter.matches(&r.metadata));
        let kept = results.len();
        (results, FilterStatus::Applied { kept })
    } else {
        if !results.is_empty() {
            warn!("metadata filter matched no results, returning unfiltered set");
        }
        (results, FilterStatus::FellBack)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corpus::CorpusDocument;
    use crate::search::semantic::Neighbor;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn list(ids: &[(&str, f32)]) -> Vec<(String, f32)> {
        ids.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    struct FixedBackend(Vec<Neighbor>);

    impl SemanticBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn similarity_search(&self, _query: &str, k: usize) -> Result<Vec<Neighbor>> {
            Ok(self.0.iter().take(k).cloned().collect())
        }
    }

    struct DownBackend;

    impl SemanticBackend for DownBackend {
        fn name(&self) -> &str {
            "down"
        }

        fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<Neighbor>> {
            Err(RetrievalError::Backend("timeout".to_string()))
        }
    }

    fn hit(id: &str, distance: f32) -> Neighbor {
        let mut metadata = Metadata::new();
        metadata.insert("id".to_string(), id.into());
        Neighbor {
            distance,
            text: String::new(),
            metadata,
        }
    }

    fn health_corpus() -> Corpus {
        Corpus::new(vec![
            CorpusDocument::new("A", "hot flashes reduce with vitamin e supplement"),
            CorpusDocument::new("B", "sleep schedule insomnia consistent bedtime"),
        ])
        .unwrap()
    }

    // ------------------------------------------------------------------------
    // Fusion
    // ------------------------------------------------------------------------

    #[test]
    fn test_fuse_rrf_empty() {
        assert!(fuse_rrf(&[], 10, 60.0).is_empty());
        assert!(fuse_rrf(&[vec![], vec![]], 10, 60.0).is_empty());
    }

    #[test]
    fn test_fuse_rrf_is_rank_based() {
        let a = list(&[("X", 0.9), ("Y", 0.1)]);
        let b = list(&[("Y", 1000.0), ("X", 3.0)]);

        let fused = fuse_rrf(&[a, b], 10, 60.0);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].1, fused[1].1);
        // tie keeps first-seen order
        assert_eq!(fused[0].0, "X");
    }

    #[test]
    fn test_fuse_rrf_single_list_preserves_order() {
        let only = list(&[("doc1", 0.2), ("doc2", 0.9), ("doc3", 0.5)]);

        let fused = fuse_rrf(&[only, vec![]], 10, 60.0);
        let ids: Vec<&str> = fused.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["doc1", "doc2", "doc3"]);
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-7);
        assert!((fused[2].1 - 1.0 / 63.0).abs() < 1e-7);
    }

    #[test]
    fn test_fuse_rrf_combined() {
        let semantic = list(&[("doc1", 0.9), ("doc2", 0.8)]);
        let bm25 = list(&[("doc2", 5.0), ("doc3", 3.0)]);

        let fused = fuse_rrf(&[semantic, bm25], 10, 60.0);

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].0, "doc2");
        let expected = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[0].1 - expected).abs() < 1e-6);
        // doc1 = 1/61 beats doc3 = 1/62
        assert_eq!(fused[1].0, "doc1");
    }

    #[test]
    fn test_fuse_rrf_truncates() {
        let only = list(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        assert_eq!(fuse_rrf(&[only.clone()], 2, 60.0).len(), 2);
        assert!(fuse_rrf(&[only], 0, 60.0).is_empty());
    }

    #[test]
    fn test_fuse_rrf_smoothing_constant_matters() {
        // X tops one list, Y is second in both
        let a = list(&[("X", 0.0), ("Y", 0.0)]);
        let b = list(&[("Z", 0.0), ("Y", 0.0)]);

        // rrf_k = 0: X = 1, Y = 1/2 + 1/2, Z = 1; all tie, first seen wins
        let sharp = fuse_rrf(&[a.clone(), b.clone()], 3, 0.0);
        assert_eq!(sharp[0].0, "X");

        let smooth = fuse_rrf(&[a, b], 3, 60.0);
        assert_eq!(smooth[0].0, "Y");
    }

    // ------------------------------------------------------------------------
    // Retriever
    // ------------------------------------------------------------------------

    #[test]
    fn test_end_to_end_lexical_only_semantic() {
        let backend: Arc<dyn SemanticBackend> = Arc::new(FixedBackend(vec![]));
        let retriever =
            HybridRetriever::new(health_corpus(), Some(backend), RetrievalConfig::default())
                .unwrap();

        let outcome = retriever
            .search("how to reduce hot flashes with supplement?", None)
            .unwrap();

        assert_eq!(outcome.results[0].id, "A");
        assert_eq!(
            outcome.results[0].text,
            "hot flashes reduce with vitamin e supplement"
        );
        assert_eq!(outcome.semantic, SemanticStatus::Used { hits: 0 });
        assert_eq!(outcome.filter, FilterStatus::NotRequested);
    }

    #[test]
    fn test_semantic_and_lexical_are_fused() {
        let backend: Arc<dyn SemanticBackend> =
            Arc::new(FixedBackend(vec![hit("B", 0.1), hit("A", 0.9)]));
        let retriever =
            HybridRetriever::new(health_corpus(), Some(backend), RetrievalConfig::default())
                .unwrap();

        let outcome = retriever.search("insomnia", None).unwrap();
        assert_eq!(outcome.ids(), vec!["B", "A"]);
        assert!(outcome.results[0].fused_score > outcome.results[1].fused_score);
        assert_eq!(outcome.semantic, SemanticStatus::Used { hits: 2 });
    }

    #[test]
    fn test_semantic_failure_degrades_to_lexical() {
        let backend: Arc<dyn SemanticBackend> = Arc::new(DownBackend);
        let retriever =
            HybridRetriever::new(health_corpus(), Some(backend), RetrievalConfig::default())
                .unwrap();

        let outcome = retriever.search("bedtime", None).unwrap();
        assert_eq!(outcome.results[0].id, "B");
        assert!(matches!(outcome.semantic, SemanticStatus::Failed { .. }));
    }

    #[test]
    fn test_disabled_semantic() {
        let retriever =
            HybridRetriever::new(health_corpus(), None, RetrievalConfig::default()).unwrap();

        let outcome = retriever.search("bedtime", None).unwrap();
        assert_eq!(outcome.semantic, SemanticStatus::Disabled);
        assert_eq!(retriever.semantic_backend(), None);
    }

    #[test]
    fn test_unknown_semantic_id_is_integrity_error() {
        let backend: Arc<dyn SemanticBackend> = Arc::new(FixedBackend(vec![hit("Z", 0.0)]));
        let retriever =
            HybridRetriever::new(health_corpus(), Some(backend), RetrievalConfig::default())
                .unwrap();

        let err = retriever.search("bedtime", None).unwrap_err();
        assert!(matches!(err, RetrievalError::Integrity(_)));
    }

    #[test]
    fn test_unknown_semantic_id_below_cut_is_integrity_error() {
        let backend: Arc<dyn SemanticBackend> = Arc::new(FixedBackend(vec![
            hit("A", 0.0),
            hit("B", 0.1),
            hit("GHOST", 0.2),
        ]));
        let config = RetrievalConfig {
            fusion_k: 2,
            ..Default::default()
        };
        let retriever = HybridRetriever::new(health_corpus(), Some(backend), config).unwrap();

        let err = retriever.search("insomnia", None).unwrap_err();
        assert!(matches!(err, RetrievalError::Integrity(_)));
    }

    #[test]
    fn test_empty_corpus_returns_no_context() {
        let retriever =
            HybridRetriever::new(Corpus::default(), None, RetrievalConfig::default()).unwrap();
        let outcome = retriever.search("anything", None).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_fused_output_size_and_context_cap() {
        let docs = (0..10)
            .map(|i| CorpusDocument::new(format!("D{}", i), format!("sleep tip number {}", i)))
            .collect();
        let config = RetrievalConfig {
            fusion_k: 5,
            max_contexts: 3,
            ..Default::default()
        };
        let retriever = HybridRetriever::new(Corpus::new(docs).unwrap(), None, config).unwrap();

        assert_eq!(retriever.search("sleep", None).unwrap().len(), 5);
        assert_eq!(retriever.contexts("sleep", None).unwrap().len(), 3);
    }

    // ------------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------------

    fn categorized_retriever() -> HybridRetriever {
        let corpus = Corpus::new(vec![
            CorpusDocument::new("X", "night sweats and sleep").with_metadata("cat", "sleep"),
            CorpusDocument::new("Y", "joint pain at night").with_metadata("cat", "pain"),
        ])
        .unwrap();
        HybridRetriever::new(corpus, None, RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn test_filter_applied() {
        let retriever = categorized_retriever();
        let filter = MetadataFilter::new().with("cat", "pain");

        let outcome = retriever.search("night", Some(&filter)).unwrap();
        assert_eq!(outcome.ids(), vec!["Y"]);
        assert_eq!(outcome.filter, FilterStatus::Applied { kept: 1 });
    }

    #[test]
    fn test_filter_fallback_returns_unfiltered() {
        let retriever = categorized_retriever();
        let unfiltered = retriever.search("night", None).unwrap();
        let filter = MetadataFilter::new().with("cat", "cardio");

        let outcome = retriever.search("night", Some(&filter)).unwrap();
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.results, unfiltered.results);
        assert_eq!(outcome.filter, FilterStatus::FellBack);
    }

    #[test]
    fn test_contexts_filter_only_sees_capped_slice() {
        let mut docs: Vec<CorpusDocument> = (0..6)
            .map(|i| {
                CorpusDocument::new(format!("S{}", i), format!("night sleep sleep rest {}", i))
                    .with_metadata("cat", "sleep")
            })
            .collect();
        docs.push(CorpusDocument::new("P", "joint pain aches").with_metadata("cat", "pain"));
        let config = RetrievalConfig {
            max_contexts: 6,
            ..Default::default()
        };
        let retriever = HybridRetriever::new(Corpus::new(docs).unwrap(), None, config).unwrap();
        let filter = MetadataFilter::new().with("cat", "pain");

        // the whole fused set still reaches P
        let searched = retriever.search("night", Some(&filter)).unwrap();
        assert_eq!(searched.ids(), vec!["P"]);

        let outcome = retriever.contexts("night", Some(&filter)).unwrap();
        assert_eq!(outcome.ids(), vec!["S0", "S1", "S2", "S3", "S4", "S5"]);
        assert_eq!(outcome.filter, FilterStatus::FellBack);
    }

    #[test]
    fn test_contexts_filter_within_cap() {
        let retriever = categorized_retriever();
        let filter = MetadataFilter::new().with("cat", "sleep");

        let outcome = retriever.contexts("night", Some(&filter)).unwrap();
        assert_eq!(outcome.ids(), vec!["X"]);
        assert_eq!(outcome.filter, FilterStatus::Applied { kept: 1 });
    }

    #[test]
    fn test_filter_matching() {
        let mut metadata = Metadata::new();
        metadata.insert("cat".to_string(), json!("sleep"));
        metadata.insert("level".to_string(), json!(2));

        assert!(MetadataFilter::new().matches(&metadata));
        assert!(MetadataFilter::new().with("level", 2).matches(&metadata));
        assert!(!MetadataFilter::new().with("level", "2").matches(&metadata));
        assert!(!MetadataFilter::new()
            .with("cat", "sleep")
            .with("missing", true)
            .matches(&metadata));
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            MetadataFilter::parse_pair("category=sleep").unwrap(),
            ("category".to_string(), json!("sleep"))
        );
        assert_eq!(
            MetadataFilter::parse_pair("level=2").unwrap(),
            ("level".to_string(), json!(2))
        );
        assert_eq!(
            MetadataFilter::parse_pair("note=a=b").unwrap(),
            ("note".to_string(), json!("a=b"))
        );
        assert!(MetadataFilter::parse_pair("novalue").is_err());
        assert!(MetadataFilter::parse_pair("=x").is_err());
    }
}
