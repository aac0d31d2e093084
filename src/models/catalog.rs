use serde::{Deserialize, Serialize};

/// One movie row of the catalog
///
/// `title` is the external identifier used at query time. The text fields
/// feed the composite document; `year`, `imdb_id`, `title_type` and `poster`
/// are passthrough metadata the similarity core never reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogRecord {
    #[serde(default)]
    pub title: String,
    /// Title in the original language, preferred over `title` for text features
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default, rename = "type")]
    pub title_type: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
}

impl CatalogRecord {
    /// Creates a record with only a title set
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    pub fn with_tagline(mut self, tagline: impl Into<String>) -> Self {
        self.tagline = Some(tagline.into());
        self
    }

    pub fn with_genres(mut self, genres: impl Into<String>) -> Self {
        self.genres = Some(genres.into());
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Text used for the title slot of the composite document
    pub fn title_text(&self) -> &str {
        self.original_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.title)
    }
}
