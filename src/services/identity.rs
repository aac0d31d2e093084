use std::collections::HashMap;

use crate::{
    error::{SimilarityError, SimilarityResult},
    models::CatalogRecord,
};

/// Bidirectional mapping between titles and matrix row positions
///
/// `titles` holds one entry per catalog row, so positional lookups cover
/// `[0, n)` with no gaps. When a title occurs more than once the later row
/// wins the `title -> index` direction; the earlier row keeps its position
/// and can still be returned as a recommendation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityIndex {
    titles: Vec<String>,
    positions: HashMap<String, usize>,
}

impl IdentityIndex {
    /// Enumerates records in load order
    pub fn from_records(records: &[CatalogRecord]) -> Self {
        Self::from_titles(records.iter().map(|r| r.title.clone()).collect())
    }

    pub fn from_titles(titles: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(titles.len());
        for (idx, title) in titles.iter().enumerate() {
            if let Some(previous) = positions.insert(title.clone(), idx) {
                tracing::warn!(
                    title = %title,
                    previous,
                    current = idx,
                    "Duplicate title, later row wins"
                );
            }
        }
        Self { titles, positions }
    }

    /// Rebuilds an index from persisted parts, checking they agree
    pub fn from_parts(
        titles: Vec<String>,
        positions: Vec<(String, usize)>,
    ) -> SimilarityResult<Self> {
        let n = titles.len();
        let mut map = HashMap::with_capacity(positions.len());
        for (title, idx) in positions {
            if idx >= n || titles[idx] != title {
                return Err(SimilarityError::ArtifactCorrupt(format!(
                    "index entry {:?} -> {} does not match a row",
                    title, idx
                )));
            }
            map.insert(title, idx);
        }
        for title in &titles {
            if !map.contains_key(title) {
                return Err(SimilarityError::ArtifactCorrupt(format!(
                    "title {:?} has no index entry",
                    title
                )));
            }
        }
        Ok(Self {
            titles,
            positions: map,
        })
    }

    /// Resolves a title to its matrix row
    pub fn index_of(&self, title: &str) -> SimilarityResult<usize> {
        self.positions
            .get(title)
            .copied()
            .ok_or_else(|| SimilarityError::UnknownTitle(title.to_string()))
    }

    /// Title of the movie at row `idx`
    pub fn title_at(&self, idx: usize) -> &str {
        &self.titles[idx]
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// `(title, index)` entries sorted by index
    pub fn entries(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .positions
            .iter()
            .map(|(t, i)| (t.clone(), *i))
            .collect();
        entries.sort_by_key(|(_, i)| *i);
        entries
    }

    /// Number of rows covered
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Number of distinct resolvable titles
    pub fn distinct_titles(&self) -> usize {
        self.positions.len()
    }
}
