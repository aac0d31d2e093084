use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::{SimilarityError, SimilarityResult},
    models::{ArtifactManifest, SimilarityArtifact, ARTIFACT_FORMAT_VERSION},
    services::{IdentityIndex, SimilarityMatrix},
};

/// The three blobs an artifact is persisted as
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub manifest: ArtifactManifest,
    pub manifest_json: Vec<u8>,
    pub matrix: Vec<u8>,
    pub index: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct IndexBlob {
    titles: Vec<String>,
    positions: Vec<(String, usize)>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Encodes an artifact, stamping blob checksums into its manifest
pub fn encode(artifact: &SimilarityArtifact) -> SimilarityResult<EncodedArtifact> {
    let matrix = bincode::serialize(&artifact.matrix)
        .map_err(|e| SimilarityError::Storage(format!("matrix encoding failed: {}", e)))?;
    let index = bincode::serialize(&IndexBlob {
        titles: artifact.index.titles().to_vec(),
        positions: artifact.index.entries(),
    })
    .map_err(|e| SimilarityError::Storage(format!("index encoding failed: {}", e)))?;

    let mut manifest = artifact.manifest.clone();
    manifest.rows = artifact.matrix.len();
    manifest.matrix_checksum = sha256_hex(&matrix);
    manifest.index_checksum = sha256_hex(&index);

    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| SimilarityError::Storage(format!("manifest encoding failed: {}", e)))?;

    Ok(EncodedArtifact {
        manifest,
        manifest_json,
        matrix,
        index,
    })
}

/// Parses a manifest blob
pub fn decode_manifest(bytes: &[u8]) -> SimilarityResult<ArtifactManifest> {
    let manifest: ArtifactManifest = serde_json::from_slice(bytes)
        .map_err(|e| SimilarityError::ArtifactCorrupt(format!("manifest: {}", e)))?;
    if manifest.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(SimilarityError::ArtifactCorrupt(format!(
            "unsupported format version {}",
            manifest.format_version
        )));
    }
    Ok(manifest)
}

/// Decodes and validates a matrix/index pair against its manifest
pub fn decode(manifest_json: &[u8], matrix: &[u8], index: &[u8]) -> SimilarityResult<SimilarityArtifact> {
    let manifest = decode_manifest(manifest_json)?;

    if sha256_hex(matrix) != manifest.matrix_checksum {
        return Err(SimilarityError::ArtifactCorrupt(
            "matrix checksum mismatch".to_string(),
        ));
    }
    if sha256_hex(index) != manifest.index_checksum {
        return Err(SimilarityError::ArtifactCorrupt(
            "index checksum mismatch".to_string(),
        ));
    }

    let decoded: SimilarityMatrix = bincode::deserialize(matrix)
        .map_err(|e| SimilarityError::ArtifactCorrupt(format!("matrix: {}", e)))?;
    // Re-check the shape, since deserialization bypasses the constructor
    let matrix = SimilarityMatrix::from_raw(decoded.len(), decoded.values().to_vec())?;

    let blob: IndexBlob = bincode::deserialize(index)
        .map_err(|e| SimilarityError::ArtifactCorrupt(format!("index: {}", e)))?;
    let index = IdentityIndex::from_parts(blob.titles, blob.positions)?;

    if matrix.len() != manifest.rows || index.len() != manifest.rows {
        return Err(SimilarityError::ArtifactCorrupt(format!(
            "shape mismatch: manifest {} rows, matrix {}, index {}",
            manifest.rows,
            matrix.len(),
            index.len()
        )));
    }

    Ok(SimilarityArtifact {
        manifest,
        matrix,
        index,
    })
}

fn join_err(err: tokio::task::JoinError) -> SimilarityError {
    SimilarityError::Storage(format!("codec task failed: {}", err))
}

/// [`encode`] on the blocking pool; hashing a large matrix stalls a runtime worker
pub async fn encode_blocking(artifact: Arc<SimilarityArtifact>) -> SimilarityResult<EncodedArtifact> {
    tokio::task::spawn_blocking(move || encode(&artifact))
        .await
        .map_err(join_err)?
}

/// [`decode`] on the blocking pool
pub async fn decode_blocking(
    manifest_json: Vec<u8>,
    matrix: Vec<u8>,
    index: Vec<u8>,
) -> SimilarityResult<SimilarityArtifact> {
    tokio::task::spawn_blocking(move || decode(&manifest_json, &matrix, &index))
        .await
        .map_err(join_err)?
}
