use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{SimilarityError, SimilarityResult};

use super::vectorizer::FeatureMatrix;

/// Dense, square, symmetric cosine similarity matrix in row-major order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    n: usize,
    data: Vec<f32>,
}

impl SimilarityMatrix {
    /// Rebuilds a matrix from raw row-major values, checking the shape
    pub fn from_raw(n: usize, data: Vec<f32>) -> SimilarityResult<Self> {
        if n.checked_mul(n) != Some(data.len()) {
            return Err(SimilarityError::ArtifactCorrupt(format!(
                "matrix holds {} values, expected {}x{}",
                data.len(),
                n,
                n
            )));
        }
        Ok(Self { n, data })
    }

    /// Side length (number of movies)
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Similarities of movie `i` against every movie, including itself
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    pub(crate) fn values(&self) -> &[f32] {
        &self.data
    }
}

/// Computes exact pairwise cosine similarity over every row of `features`
///
/// Rows are already L2-normalised, so cosine similarity is the dot product.
/// Only the upper triangle is computed, through an inverted index over terms,
/// and then mirrored.
pub fn cosine_similarity_matrix(features: &FeatureMatrix) -> SimilarityMatrix {
    let n = features.n_rows();
    let started = std::time::Instant::now();

    // term -> [(row, weight)] in ascending row order
    let mut postings: Vec<Vec<(u32, f64)>> = vec![Vec::new(); features.n_terms()];
    for (row, terms) in features.rows().iter().enumerate() {
        for &(term, weight) in terms {
            postings[term as usize].push((row as u32, weight));
        }
    }

    let upper: Vec<Vec<(usize, f32)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut acc = vec![0.0f64; n];
            for &(term, weight) in features.row(i) {
                let list = &postings[term as usize];
                let start = list.partition_point(|&(j, _)| (j as usize) <= i);
                for &(j, other) in &list[start..] {
                    acc[j as usize] += weight * other;
                }
            }
            acc.into_iter()
                .enumerate()
                .skip(i + 1)
                .filter(|(_, v)| *v != 0.0)
                .map(|(j, v)| (j, v.clamp(0.0, 1.0) as f32))
                .collect()
        })
        .collect();

    let mut data = vec![0.0f32; n * n];
    for (i, entries) in upper.into_iter().enumerate() {
        data[i * n + i] = if features.row(i).is_empty() { 0.0 } else { 1.0 };
        for (j, v) in entries {
            data[i * n + j] = v;
            data[j * n + i] = v;
        }
    }

    tracing::info!(
        rows = n,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Computed cosine similarity matrix"
    );

    SimilarityMatrix { n, data }
}
