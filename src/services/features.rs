use sha2::{Digest, Sha256};

use crate::models::CatalogRecord;

/// Fallback text for a record without a tagline
pub const NO_TAGLINE: &str = "no tagline";
/// Fallback text for a record without an overview
pub const NO_OVERVIEW: &str = "no overview";

/// Builds the composite text document for one catalog record
///
/// Fields are joined with a single space in a fixed order: title, genres,
/// keywords, overview, tagline. Missing taglines and overviews become their
/// fallback sentences; missing genres and keywords become empty strings.
pub fn compose_document(record: &CatalogRecord) -> String {
    let genres = record.genres.as_deref().unwrap_or("");
    let keywords = record.keywords.as_deref().unwrap_or("");
    let overview = record.overview.as_deref().unwrap_or(NO_OVERVIEW);
    let tagline = record.tagline.as_deref().unwrap_or(NO_TAGLINE);

    [record.title_text(), genres, keywords, overview, tagline].join(" ")
}

/// Composes one document per record, in record order
pub fn compose_documents(records: &[CatalogRecord]) -> Vec<String> {
    records.iter().map(compose_document).collect()
}

/// SHA-256 over the composite documents, used to detect stale artifacts
///
/// Each document is length-prefixed so that moving text between adjacent
/// rows changes the fingerprint.
pub fn catalog_fingerprint(documents: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((documents.len() as u64).to_le_bytes());
    for doc in documents {
        hasher.update((doc.len() as u64).to_le_bytes());
        hasher.update(doc.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
