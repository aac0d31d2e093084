use serde::{Deserialize, Serialize};

/// A single ranked "more like this" entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    /// Cosine similarity to the query title, in `[0, 1]`
    pub score: f32,
}

/// Response body for a recommendation query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    /// The title the recommendations were computed for
    pub title: String,
    pub recommendations: Vec<Recommendation>,
}
