use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::SimilarityResult,
    models::{ArtifactManifest, CatalogRecord, SimilarityArtifact, ARTIFACT_FORMAT_VERSION},
};

use super::{
    catalog::CatalogSource,
    features::{catalog_fingerprint, compose_documents},
    identity::IdentityIndex,
    similarity::cosine_similarity_matrix,
    vectorizer::TfidfVectorizer,
};

/// Offline build of the similarity matrix and identity index
///
/// Each stage takes explicit inputs and returns explicit outputs; nothing is
/// persisted here, so a failed build never leaves a partial artifact behind.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    vectorizer: TfidfVectorizer,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vectorizer(mut self, vectorizer: TfidfVectorizer) -> Self {
        self.vectorizer = vectorizer;
        self
    }

    /// Loads the catalog from `source` and builds from it
    pub fn build_from_source(&self, source: &dyn CatalogSource) -> SimilarityResult<SimilarityArtifact> {
        tracing::info!(source = %source.describe(), "Loading catalog for build");
        let records = source.load()?;
        self.build(&records)
    }

    /// Builds an artifact from catalog records in load order
    pub fn build(&self, records: &[CatalogRecord]) -> SimilarityResult<SimilarityArtifact> {
        let started = Instant::now();

        let documents = compose_documents(records);
        let fingerprint = catalog_fingerprint(&documents);

        let model = self.vectorizer.fit_transform(&documents)?;
        drop(documents);

        let matrix = cosine_similarity_matrix(&model.features);
        let index = IdentityIndex::from_records(records);

        let manifest = ArtifactManifest {
            format_version: ARTIFACT_FORMAT_VERSION,
            artifact_id: Uuid::new_v4(),
            built_at: Utc::now(),
            rows: matrix.len(),
            vocabulary_size: model.vocabulary_size(),
            catalog_fingerprint: fingerprint,
            matrix_checksum: String::new(),
            index_checksum: String::new(),
        };

        tracing::info!(
            artifact_id = %manifest.artifact_id,
            rows = manifest.rows,
            vocabulary = manifest.vocabulary_size,
            distinct_titles = index.distinct_titles(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Similarity index built"
        );

        Ok(SimilarityArtifact {
            manifest,
            matrix,
            index,
        })
    }
}

/// Fingerprint a catalog would have if built now
pub fn fingerprint_records(records: &[CatalogRecord]) -> String {
    catalog_fingerprint(&compose_documents(records))
}
