pub mod artifact;
pub mod catalog;
pub mod recommendation;

pub use artifact::{ArtifactManifest, SimilarityArtifact, ARTIFACT_FORMAT_VERSION};
pub use catalog::CatalogRecord;
pub use recommendation::{Recommendation, RecommendationResponse};
