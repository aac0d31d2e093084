use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{SimilarityError, SimilarityResult},
    models::{ArtifactManifest, SimilarityArtifact},
};

use super::{codec, ArtifactStore};

const CURRENT_FILE: &str = "CURRENT";
const MANIFEST_FILE: &str = "manifest.json";
const MATRIX_FILE: &str = "similarity.bin";
const INDEX_FILE: &str = "index.bin";

/// Artifact store on the local filesystem
///
/// Layout:
/// ```text
/// <root>/CURRENT                 id of the current artifact
/// <root>/<id>/manifest.json
/// <root>/<id>/similarity.bin
/// <root>/<id>/index.bin
/// ```
/// A save writes a fresh `<id>` directory and then renames a new `CURRENT`
/// into place. The previous generation is kept so a load that already read
/// the old pointer can still finish; anything older is pruned.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn current_id(&self) -> SimilarityResult<String> {
        let path = self.root.join(CURRENT_FILE);
        let id = read_blob(&path).await?;
        let id = String::from_utf8(id)
            .map_err(|_| SimilarityError::ArtifactCorrupt("CURRENT is not utf-8".to_string()))?;
        let id = id.trim().to_string();
        Uuid::parse_str(&id)
            .map_err(|_| SimilarityError::ArtifactCorrupt(format!("CURRENT holds {:?}", id)))?;
        Ok(id)
    }

    /// Removes artifact directories not named in `keep`
    ///
    /// Runs after the pointer swap, so the new artifact is already committed
    /// and failures here are logged rather than returned.
    async fn prune(&self, keep: &[&str]) {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, root = %self.root.display(), "Failed to list artifact store");
                return;
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, root = %self.root.display(), "Failed to list artifact store");
                    break;
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            if keep.contains(&name.as_str()) || Uuid::parse_str(&name).is_err() {
                continue;
            }
            if !entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => tracing::debug!(artifact_id = %name, "Pruned old artifact"),
                Err(e) => tracing::warn!(error = %e, artifact_id = %name, "Failed to prune old artifact"),
            }
        }
    }
}

fn storage_err(err: std::io::Error) -> SimilarityError {
    SimilarityError::Storage(err.to_string())
}

async fn read_blob(path: &Path) -> SimilarityResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => SimilarityError::ArtifactMissing(path.display().to_string()),
        _ => storage_err(e),
    })
}

#[async_trait::async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save(&self, artifact: Arc<SimilarityArtifact>) -> SimilarityResult<ArtifactManifest> {
        let encoded = codec::encode_blocking(artifact).await?;
        let id = encoded.manifest.artifact_id.to_string();
        let dir = self.root.join(&id);
        let previous = self.current_id().await.ok();

        tokio::fs::create_dir_all(&dir).await.map_err(storage_err)?;
        tokio::fs::write(dir.join(MATRIX_FILE), &encoded.matrix)
            .await
            .map_err(storage_err)?;
        tokio::fs::write(dir.join(INDEX_FILE), &encoded.index)
            .await
            .map_err(storage_err)?;
        tokio::fs::write(dir.join(MANIFEST_FILE), &encoded.manifest_json)
            .await
            .map_err(storage_err)?;

        // Pointer swap: rename is atomic within one filesystem
        let tmp = self.root.join(format!("{}.tmp", CURRENT_FILE));
        tokio::fs::write(&tmp, id.as_bytes()).await.map_err(storage_err)?;
        tokio::fs::rename(&tmp, self.root.join(CURRENT_FILE))
            .await
            .map_err(storage_err)?;

        tracing::info!(
            root = %self.root.display(),
            artifact_id = %id,
            rows = encoded.manifest.rows,
            bytes = encoded.matrix.len() + encoded.index.len(),
            "Artifact saved"
        );

        let mut keep = vec![id.as_str()];
        keep.extend(previous.as_deref());
        self.prune(&keep).await;
        Ok(encoded.manifest)
    }

    async fn load(&self) -> SimilarityResult<SimilarityArtifact> {
        let id = self.current_id().await?;
        let dir = self.root.join(&id);

        let manifest = read_blob(&dir.join(MANIFEST_FILE)).await?;
        let matrix = read_blob(&dir.join(MATRIX_FILE)).await?;
        let index = read_blob(&dir.join(INDEX_FILE)).await?;

        let artifact = codec::decode_blocking(manifest, matrix, index).await?;
        tracing::info!(artifact_id = %id, rows = artifact.len(), "Artifact loaded from disk");
        Ok(artifact)
    }

    async fn manifest(&self) -> SimilarityResult<ArtifactManifest> {
        let id = self.current_id().await?;
        let bytes = read_blob(&self.root.join(&id).join(MANIFEST_FILE)).await?;
        codec::decode_manifest(&bytes)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogRecord;
    use crate::services::IndexBuilder;

    fn artifact(titles: &[&str]) -> Arc<SimilarityArtifact> {
        let records: Vec<CatalogRecord> = titles
            .iter()
            .map(|t| CatalogRecord::new(*t).with_overview(format!("{} space robots", t)))
            .collect();
        Arc::new(IndexBuilder::new().build(&records).unwrap())
    }

    fn artifact_dir(root: &Path, manifest: &ArtifactManifest) -> PathBuf {
        root.join(manifest.artifact_id.to_string())
    }

    #[tokio::test]
    async fn test_load_from_empty_store_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SimilarityError::ArtifactMissing(_)));
        assert!(matches!(
            store.manifest().await.unwrap_err(),
            SimilarityError::ArtifactMissing(_)
        ));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("model"));
        let original = artifact(&["Alien", "Aliens", "Heat"]);

        let manifest = store.save(original.clone()).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.matrix, original.matrix);
        assert_eq!(loaded.index, original.index);
        assert_eq!(loaded.manifest, manifest);
        assert_eq!(store.manifest().await.unwrap(), manifest);
    }

    #[tokio::test]
    async fn test_save_keeps_previous_generation_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let first = store.save(artifact(&["Alien", "Heat"])).await.unwrap();
        let second = store.save(artifact(&["Up", "Cars", "Heat"])).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.manifest.artifact_id, second.artifact_id);
        assert_eq!(loaded.len(), 3);
        assert!(artifact_dir(dir.path(), &first).exists());

        let third = store.save(artifact(&["Jaws", "Heat"])).await.unwrap();
        assert!(!artifact_dir(dir.path(), &first).exists());
        assert!(artifact_dir(dir.path(), &second).exists());
        assert!(artifact_dir(dir.path(), &third).exists());
    }

    #[tokio::test]
    async fn test_stale_pointer_still_loads_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let first = store.save(artifact(&["Alien", "Heat"])).await.unwrap();

        // A reader that resolved CURRENT before the next save finishes its reads
        let stale_id = store.current_id().await.unwrap();
        store.save(artifact(&["Up", "Cars"])).await.unwrap();

        let stale_dir = dir.path().join(&stale_id);
        let manifest = read_blob(&stale_dir.join(MANIFEST_FILE)).await.unwrap();
        let matrix = read_blob(&stale_dir.join(MATRIX_FILE)).await.unwrap();
        let index = read_blob(&stale_dir.join(INDEX_FILE)).await.unwrap();
        let loaded = codec::decode(&manifest, &matrix, &index).unwrap();
        assert_eq!(loaded.manifest.artifact_id, first.artifact_id);
    }

    #[tokio::test]
    async fn test_missing_blob_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let manifest = store.save(artifact(&["Alien", "Heat"])).await.unwrap();
        std::fs::remove_file(artifact_dir(dir.path(), &manifest).join(INDEX_FILE)).unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SimilarityError::ArtifactMissing(_)));
    }

    #[tokio::test]
    async fn test_truncated_blob_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let manifest = store.save(artifact(&["Alien", "Heat"])).await.unwrap();
        let path = artifact_dir(dir.path(), &manifest).join(MATRIX_FILE);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SimilarityError::ArtifactCorrupt(_)));
    }

    #[tokio::test]
    async fn test_garbage_pointer_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CURRENT_FILE), "not-a-uuid").unwrap();
        let store = FileArtifactStore::new(dir.path());
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SimilarityError::ArtifactCorrupt(_)));
    }
}
