use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{SimilarityError, SimilarityResult};

use super::stopwords::is_stop_word;

/// Sparse row: `(term_index, weight)` pairs sorted by term index
pub type SparseRow = Vec<(u32, f64)>;

/// TF-IDF feature matrix with one L2-normalised sparse row per document
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<SparseRow>,
    n_terms: usize,
}

impl FeatureMatrix {
    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &SparseRow {
        &self.rows[i]
    }

    /// Number of documents
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of vocabulary terms (columns)
    pub fn n_terms(&self) -> usize {
        self.n_terms
    }
}

/// Fitted vocabulary and IDF weights together with the transformed corpus
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSpaceModel {
    /// Vocabulary in lexicographic order; a term's position is its column
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub features: FeatureMatrix,
}

impl VectorSpaceModel {
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Runs of two or more word characters
    PATTERN.get_or_init(|| Regex::new(r"(?u)\b\w\w+\b").expect("valid token regex"))
}

/// Lowercases and splits a document, dropping English stop words
pub fn tokenize(document: &str) -> Vec<String> {
    let lowered = document.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// TF-IDF vectorizer with smooth IDF and L2 row normalisation
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    max_features: Option<usize>,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the `max_features` terms with the highest corpus frequency
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Learns the vocabulary over `documents` and transforms them
    ///
    /// Fails with `EmptyVocabulary` when the corpus is empty, every document
    /// reduces to zero tokens, or `max_features` leaves no terms.
    pub fn fit_transform<S: AsRef<str>>(&self, documents: &[S]) -> SimilarityResult<VectorSpaceModel> {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        // BTreeMap keeps the vocabulary in lexicographic order
        let mut corpus_freq: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for tokens in &tokenized {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in tokens {
                let entry = corpus_freq.entry(token.as_str()).or_insert((0, 0));
                entry.0 += 1;
                if seen.insert(token.as_str()) {
                    entry.1 += 1;
                }
            }
        }

        let mut kept: Vec<(&str, usize)> = corpus_freq.iter().map(|(t, (_, df))| (*t, *df)).collect();
        if let Some(limit) = self.max_features {
            if limit < kept.len() {
                let mut ranked: Vec<(&str, usize)> =
                    corpus_freq.iter().map(|(t, (tf, _))| (*t, *tf)).collect();
                ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                ranked.truncate(limit);
                let keep: HashSet<&str> = ranked.into_iter().map(|(t, _)| t).collect();
                kept.retain(|(t, _)| keep.contains(t));
            }
        }

        if kept.is_empty() {
            return Err(SimilarityError::EmptyVocabulary {
                documents: documents.len(),
            });
        }

        let n_docs = documents.len() as f64;
        let vocabulary: Vec<String> = kept.iter().map(|(t, _)| t.to_string()).collect();
        let idf: Vec<f64> = kept
            .iter()
            .map(|(_, df)| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();
        let columns: HashMap<&str, u32> = kept
            .iter()
            .enumerate()
            .map(|(i, (t, _))| (*t, i as u32))
            .collect();

        let rows: Vec<SparseRow> = tokenized
            .iter()
            .map(|tokens| weigh_row(tokens, &columns, &idf))
            .collect();

        tracing::info!(
            documents = rows.len(),
            vocabulary = vocabulary.len(),
            "Fitted TF-IDF vector space"
        );

        Ok(VectorSpaceModel {
            features: FeatureMatrix {
                rows,
                n_terms: vocabulary.len(),
            },
            vocabulary,
            idf,
        })
    }
}

fn weigh_row(tokens: &[String], columns: &HashMap<&str, u32>, idf: &[f64]) -> SparseRow {
    let mut counts: BTreeMap<u32, f64> = BTreeMap::new();
    for token in tokens {
        if let Some(&col) = columns.get(token.as_str()) {
            *counts.entry(col).or_insert(0.0) += 1.0;
        }
    }

    let mut row: SparseRow = counts
        .into_iter()
        .map(|(col, tf)| (col, tf * idf[col as usize]))
        .collect();

    let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
    row
}
