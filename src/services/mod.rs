pub mod builder;
pub mod catalog;
pub mod engine;
pub mod features;
pub mod identity;
pub mod similarity;
pub mod stopwords;
pub mod vectorizer;

pub use builder::IndexBuilder;
pub use catalog::{CatalogSource, CsvCatalog, InMemoryCatalog};
pub use engine::{EngineState, RecommendationEngine};
pub use identity::IdentityIndex;
pub use similarity::SimilarityMatrix;
pub use vectorizer::{FeatureMatrix, TfidfVectorizer, VectorSpaceModel};
