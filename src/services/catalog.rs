use std::io::Read;
use std::path::{Path, PathBuf};

use crate::{
    error::{SimilarityError, SimilarityResult},
    models::CatalogRecord,
};

/// Source of catalog rows for an index build
///
/// Row order is the implicit primary key of every downstream structure, so
/// implementations must return rows in a stable order and never mutate the
/// underlying storage.
pub trait CatalogSource: Send + Sync {
    /// Reads every catalog record in source order
    fn load(&self) -> SimilarityResult<Vec<CatalogRecord>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Catalog stored as a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvCatalog {
    path: PathBuf,
}

impl CsvCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for CsvCatalog {
    fn load(&self) -> SimilarityResult<Vec<CatalogRecord>> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            SimilarityError::CatalogUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let records = read_catalog(file)?;
        tracing::info!(
            path = %self.path.display(),
            records = records.len(),
            "Catalog loaded"
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Catalog held in memory, for tests and embedding callers
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    records: Vec<CatalogRecord>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }
}

impl CatalogSource for InMemoryCatalog {
    fn load(&self) -> SimilarityResult<Vec<CatalogRecord>> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{} records", self.records.len())
    }
}

/// Parses CSV catalog rows, matching columns by header name
///
/// Unknown columns are ignored and absent optional columns read as `None`.
/// A source without a `title` column or with a malformed row is rejected as a
/// whole: a partially read catalog would shift every row index after the bad
/// row.
pub fn read_catalog<R: Read>(reader: R) -> SimilarityResult<Vec<CatalogRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| SimilarityError::CatalogUnavailable(format!("unreadable header: {}", e)))?;
    if !headers.iter().any(|h| h == "title") {
        return Err(SimilarityError::CatalogUnavailable(
            "catalog has no `title` column".to_string(),
        ));
    }

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<CatalogRecord>().enumerate() {
        let record = result.map_err(|e| {
            SimilarityError::CatalogUnavailable(format!("row {}: {}", row + 1, e))
        })?;
        if record.title.trim().is_empty() {
            tracing::warn!(row, "Catalog record has an empty title");
        }
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
title,year,genres,keywords,overview,tagline,imdb_id,type,poster
Avatar,2009,Action Adventure,alien planet,A marine on an alien world,Enter the world.,tt0499549,movie,http://x/a.jpg
Spectre,2015,Action,spy,,,tt2379713,movie,
";

    #[test]
    fn test_read_catalog_preserves_order_and_nulls() {
        let records = read_catalog(CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Avatar");
        assert_eq!(records[0].tagline.as_deref(), Some("Enter the world."));
        assert_eq!(records[0].title_type.as_deref(), Some("movie"));
        assert_eq!(records[1].title, "Spectre");
        assert_eq!(records[1].overview, None);
        assert_eq!(records[1].tagline, None);
        assert_eq!(records[1].poster, None);
    }

    #[test]
    fn test_read_catalog_ignores_unknown_and_missing_columns() {
        let csv = "budget,title,overview\n100,Heat,A heist\n";
        let records = read_catalog(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Heat");
        assert_eq!(records[0].overview.as_deref(), Some("A heist"));
        assert_eq!(records[0].genres, None);
    }

    #[test]
    fn test_read_catalog_trims_header_names_only() {
        let csv = " title , overview\nHeat ,A heist\n";
        let records = read_catalog(csv.as_bytes()).unwrap();
        assert_eq!(records[0].title, "Heat ");
        assert_eq!(records[0].overview.as_deref(), Some("A heist"));
    }

    #[test]
    fn test_read_catalog_requires_title_column() {
        let csv = "name,overview\nHeat,A heist\n";
        let err = read_catalog(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, SimilarityError::CatalogUnavailable(_)));
    }

    #[test]
    fn test_read_catalog_rejects_ragged_rows() {
        let csv = "title,overview\nHeat,A heist,extra\n";
        let err = read_catalog(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, SimilarityError::CatalogUnavailable(_)));
    }

    #[test]
    fn test_csv_catalog_missing_file() {
        let catalog = CsvCatalog::new("/definitely/not/here/movies.csv");
        let err = catalog.load().unwrap_err();
        assert!(matches!(err, SimilarityError::CatalogUnavailable(_)));
        assert!(catalog.describe().starts_with("csv:"));
    }

    #[test]
    fn test_csv_catalog_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.csv");
        std::fs::write(&path, CSV).unwrap();

        let records = CsvCatalog::new(&path).load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].imdb_id.as_deref(), Some("tt2379713"));
    }

    #[test]
    fn test_in_memory_catalog() {
        let catalog = InMemoryCatalog::new(vec![CatalogRecord::new("A"), CatalogRecord::new("B")]);
        let records = catalog.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(catalog.describe(), "memory:2 records");
    }
}
