use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    db::ArtifactStore,
    error::{SimilarityError, SimilarityResult},
    models::{ArtifactManifest, CatalogRecord, Recommendation, SimilarityArtifact},
};

use super::{builder::fingerprint_records, catalog::CatalogSource, IndexBuilder};

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No artifact in memory; only loading is possible
    Unloaded,
    /// An artifact is installed and queries are served from it
    Ready,
}

/// Serves "more like this" queries from an immutable similarity artifact
///
/// The artifact is held behind an atomically swapped pointer: a reload or
/// rebuild constructs the new artifact off to the side and then replaces the
/// pointer, so in-flight queries see either the old or the new artifact whole.
/// Reloads and rebuilds share one lock, so swaps happen in completion order.
#[derive(Default)]
pub struct RecommendationEngine {
    artifact: ArcSwapOption<SimilarityArtifact>,
    builder: IndexBuilder,
    lifecycle_lock: Mutex<()>,
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: IndexBuilder) -> Self {
        Self {
            builder,
            ..Self::default()
        }
    }

    pub fn state(&self) -> EngineState {
        if self.artifact.load().is_some() {
            EngineState::Ready
        } else {
            EngineState::Unloaded
        }
    }

    /// Current artifact, if any; holding the `Arc` pins it across a swap
    pub fn snapshot(&self) -> Option<Arc<SimilarityArtifact>> {
        self.artifact.load_full()
    }

    pub fn manifest(&self) -> Option<ArtifactManifest> {
        self.snapshot().map(|a| a.manifest.clone())
    }

    /// Installs an already built artifact, replacing any previous one
    pub fn install(&self, artifact: SimilarityArtifact) {
        tracing::info!(
            artifact_id = %artifact.manifest.artifact_id,
            rows = artifact.len(),
            "Installing similarity artifact"
        );
        self.artifact.store(Some(Arc::new(artifact)));
    }

    /// Drops the in-memory artifact, returning to `Unloaded`
    pub fn unload(&self) {
        self.artifact.store(None);
        tracing::info!("Similarity artifact unloaded");
    }

    /// Loads the current artifact from `store` and swaps it in
    ///
    /// On failure the engine keeps whatever artifact it already had. An
    /// artifact built before the installed one is not swapped in; the
    /// installed manifest is returned instead.
    pub async fn load_from(&self, store: &dyn ArtifactStore) -> SimilarityResult<ArtifactManifest> {
        let _guard = self.lifecycle_lock.lock().await;

        let artifact = store.load().await.map_err(|e| {
            tracing::error!(error = %e, store = store.name(), "Failed to load artifact");
            e
        })?;
        if let Some(installed) = self.manifest() {
            if installed.built_at > artifact.manifest.built_at {
                tracing::warn!(
                    installed = %installed.artifact_id,
                    loaded = %artifact.manifest.artifact_id,
                    "Store returned an older artifact than the installed one, keeping it"
                );
                return Ok(installed);
            }
        }
        let manifest = artifact.manifest.clone();
        self.install(artifact);
        Ok(manifest)
    }

    /// Builds from `source`, saves to `store`, then swaps the new artifact in
    ///
    /// Rebuilds are serialised with each other and with reloads. The build
    /// runs on the blocking pool; a failed build or save leaves both the store
    /// and the engine untouched.
    pub async fn rebuild(
        &self,
        source: Arc<dyn CatalogSource>,
        store: &dyn ArtifactStore,
    ) -> SimilarityResult<ArtifactManifest> {
        let _guard = self.lifecycle_lock.lock().await;

        let builder = self.builder.clone();
        let artifact = tokio::task::spawn_blocking(move || builder.build_from_source(source.as_ref()))
            .await
            .map_err(|e| SimilarityError::Storage(format!("build task failed: {}", e)))??;

        let artifact = Arc::new(artifact);
        let manifest = store.save(artifact.clone()).await?;
        let mut artifact = Arc::try_unwrap(artifact).unwrap_or_else(|shared| (*shared).clone());
        artifact.manifest = manifest.clone();
        self.install(artifact);
        Ok(manifest)
    }

    /// Top `top_n` most similar titles; an unknown title yields an empty list
    pub fn recommend(&self, title: &str, top_n: usize) -> SimilarityResult<Vec<Recommendation>> {
        match self.try_recommend(title, top_n) {
            Err(SimilarityError::UnknownTitle(_)) => {
                tracing::debug!(title = %title, "Recommendation for unknown title");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Like [`recommend`](Self::recommend) but reports unknown titles as `UnknownTitle`
    pub fn try_recommend(&self, title: &str, top_n: usize) -> SimilarityResult<Vec<Recommendation>> {
        if top_n == 0 {
            return Err(SimilarityError::InvalidTopN(top_n));
        }
        let artifact = self.snapshot().ok_or(SimilarityError::NotReady)?;
        let idx = artifact.index.index_of(title)?;
        let ranked = rank_similar(&artifact, idx, top_n);
        tracing::debug!(title = %title, idx, returned = ranked.len(), "Recommendations ranked");
        Ok(ranked)
    }

    /// Whether the installed artifact was built from a different catalog
    ///
    /// `None` when no artifact is installed.
    pub fn is_stale(&self, records: &[CatalogRecord]) -> Option<bool> {
        let artifact = self.snapshot()?;
        let stale = artifact.manifest.catalog_fingerprint != fingerprint_records(records);
        if stale {
            tracing::warn!(
                artifact_id = %artifact.manifest.artifact_id,
                "Loaded artifact does not match the current catalog"
            );
        }
        Some(stale)
    }
}

/// Ranks every other row against row `idx`
///
/// Scores sort descending with ties broken by ascending row index. The query
/// row is removed by position rather than by dropping the first entry, so an
/// identical movie scoring a tie with the query is kept.
pub fn rank_similar(artifact: &SimilarityArtifact, idx: usize, top_n: usize) -> Vec<Recommendation> {
    let mut scored: Vec<(usize, f32)> = artifact
        .matrix
        .row(idx)
        .iter()
        .copied()
        .enumerate()
        .filter(|(other, _)| *other != idx)
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(top_n);

    scored
        .into_iter()
        .map(|(other, score)| Recommendation {
            title: artifact.index.title_at(other).to_string(),
            score,
        })
        .collect()
}
