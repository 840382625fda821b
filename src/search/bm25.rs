//! BM25 lexical index
//!
//! In-memory Okapi BM25 over the tokenized corpus. Built wholesale from a
//! corpus snapshot and read-only afterwards, so it can be shared freely
//! between concurrent queries.

use std::collections::HashMap;

use super::tokenizer::tokenize;
use crate::core::corpus::Corpus;

// ============================================================================
// Configuration
// ============================================================================

/// BM25 scoring constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Config {
    /// Term frequency saturation (default: 1.5)
    pub k1: f32,
    /// Document length normalization (default: 0.75)
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

// ============================================================================
// BM25 Index
// ============================================================================

/// BM25 index over an ordered set of tokenized documents
#[derive(Debug, Clone)]
pub struct Bm25Index {
    ids: Vec<String>,
    doc_lens: Vec<f32>,
    term_freqs: Vec<HashMap<String, u32>>,
    idf: HashMap<String, f32>,
    avgdl: f32,
    config: Bm25Config,
}

impl Bm25Index {
    /// Build from `(id, tokens)` pairs; order is the tie-break order
    pub fn build<I, S>(docs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        Self::build_with_config(docs, Bm25Config::default())
    }

    pub fn build_with_config<I, S>(docs: I, config: Bm25Config) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        let mut ids = Vec::new();
        let mut doc_lens = Vec::new();
        let mut term_freqs = Vec::new();
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for (id, tokens) in docs {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }

            ids.push(id.into());
            doc_lens.push(tokens.len() as f32);
            term_freqs.push(freqs);
        }

        let n = ids.len() as f32;
        let avgdl = if ids.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / n
        };

        // Non-negative idf: a term in every document still scores above zero
        let idf = doc_freqs
            .into_iter()
            .map(|(term, df)| {
                let df = df as f32;
                (term, (1.0 + (n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        Self {
            ids,
            doc_lens,
            term_freqs,
            idf,
            avgdl,
            config,
        }
    }

    /// Tokenize and index every corpus document, in corpus order
    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self::build(corpus.iter().map(|doc| (doc.id.clone(), tokenize(&doc.text))))
    }

    /// BM25 score of every document for the query tokens
    pub fn score(&self, query_tokens: &[String]) -> HashMap<String, f32> {
        self.ids
            .iter()
            .cloned()
            .zip(self.scores(query_tokens))
            .collect()
    }

    /// Top `k` documents by score, ties in corpus order
    ///
    /// Returns `min(k, num_docs)` entries; documents without any query token
    /// score 0 and only fill the tail.
    pub fn search(&self, query_tokens: &[String], k: usize) -> Vec<(String, f32)> {
        if k == 0 {
            return Vec::new();
        }

        let scores = self.scores(query_tokens);
        let mut order: Vec<usize> = (0..self.ids.len()).collect();
        // stable sort keeps corpus order for equal scores
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order.truncate(k);

        order
            .into_iter()
            .map(|idx| (self.ids[idx].clone(), scores[idx]))
            .collect()
    }

    /// Number of indexed documents
    pub fn num_docs(&self) -> usize {
        self.ids.len()
    }

    /// Number of distinct terms
    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn config(&self) -> &Bm25Config {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Private helpers
    // ------------------------------------------------------------------------

    fn scores(&self, query_tokens: &[String]) -> Vec<f32> {
        let Bm25Config { k1, b } = self.config;

        (0..self.ids.len())
            .map(|idx| {
                let len_norm = if self.avgdl > 0.0 {
                    1.0 - b + b * self.doc_lens[idx] / self.avgdl
                } else {
                    1.0
                };
                let freqs = &self.term_freqs[idx];

                query_tokens
                    .iter()
                    .filter_map(|token| {
                        let tf = *freqs.get(token)? as f32;
                        let idf = self.idf.get(token).copied().unwrap_or(0.0);
                        Some(idf * tf * (k1 + 1.0) / (tf + k1 * len_norm))
                    })
                    .sum()
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
