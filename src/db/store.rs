use std::sync::Arc;

use crate::{
    error::SimilarityResult,
    models::{ArtifactManifest, SimilarityArtifact},
};

/// Persistence for the similarity matrix and identity index as one unit
///
/// `save` must be atomic: readers see either the previous artifact or the new
/// one, never a mix of blobs. Stores never rebuild an artifact themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists the artifact and makes it current, returning the stored manifest
    ///
    /// The artifact is shared so encoding can run on the blocking pool.
    async fn save(&self, artifact: Arc<SimilarityArtifact>) -> SimilarityResult<ArtifactManifest>;

    /// Loads the current artifact
    ///
    /// Fails with `ArtifactMissing` when nothing is stored and with
    /// `ArtifactCorrupt` when the blobs do not decode into a consistent pair.
    async fn load(&self) -> SimilarityResult<SimilarityArtifact>;

    /// Reads only the current manifest
    async fn manifest(&self) -> SimilarityResult<ArtifactManifest>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
