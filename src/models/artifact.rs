use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::{IdentityIndex, SimilarityMatrix};

/// Current on-disk / in-Redis layout of a persisted artifact
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Metadata describing one persisted similarity artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub artifact_id: Uuid,
    pub built_at: DateTime<Utc>,
    /// Number of catalog rows (matrix side length and index cardinality)
    pub rows: usize,
    pub vocabulary_size: usize,
    /// SHA-256 over the composite documents the artifact was built from
    pub catalog_fingerprint: String,
    /// SHA-256 of the encoded matrix blob, filled in on save
    #[serde(default)]
    pub matrix_checksum: String,
    /// SHA-256 of the encoded index blob, filled in on save
    #[serde(default)]
    pub index_checksum: String,
}

/// The similarity matrix and identity index, valid only as a pair
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityArtifact {
    pub manifest: ArtifactManifest,
    pub matrix: SimilarityMatrix,
    pub index: IdentityIndex,
}

impl SimilarityArtifact {
    /// Number of movies covered by the artifact
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
