use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::{codec, ArtifactStore};
use crate::error::{SimilarityError, SimilarityResult};
use crate::models::{ArtifactManifest, SimilarityArtifact};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    Current,
    Previous,
    Manifest(String),
    Matrix(String),
    Index(String),
}

impl ArtifactKey {
    fn with_prefix(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self)
    }
}

impl Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKey::Current => write!(f, "current"),
            ArtifactKey::Previous => write!(f, "previous"),
            ArtifactKey::Manifest(id) => write!(f, "{}:manifest", id),
            ArtifactKey::Matrix(id) => write!(f, "{}:matrix", id),
            ArtifactKey::Index(id) => write!(f, "{}:index", id),
        }
    }
}

/// Creates a Redis client for artifact storage
pub fn create_redis_client(redis_url: &str) -> SimilarityResult<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Artifact store backed by Redis
///
/// The three blobs and the `current` pointer are written in one MULTI/EXEC
/// transaction. The generation it replaces stays readable under `previous`;
/// the one before that is deleted in the same transaction.
#[derive(Clone)]
pub struct RedisArtifactStore {
    redis_client: Client,
    prefix: String,
}

impl RedisArtifactStore {
    pub fn new(redis_client: Client, prefix: impl Into<String>) -> Self {
        Self {
            redis_client,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &ArtifactKey) -> String {
        key.with_prefix(&self.prefix)
    }

    async fn current_id(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
    ) -> SimilarityResult<String> {
        let current: Option<String> = conn.get(self.key(&ArtifactKey::Current)).await?;
        let id = current.ok_or_else(|| {
            SimilarityError::ArtifactMissing(self.key(&ArtifactKey::Current))
        })?;
        Uuid::parse_str(&id)
            .map_err(|_| SimilarityError::ArtifactCorrupt(format!("current pointer holds {:?}", id)))?;
        Ok(id)
    }

    /// Fetches the manifest, matrix and index of `id` in one MGET
    async fn get_blobs(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        id: &str,
    ) -> SimilarityResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        let keys = self.blob_keys(id);
        let blobs: Vec<Option<Vec<u8>>> = conn.mget(&keys).await?;
        let mut blobs = keys.into_iter().zip(blobs).map(|(key, blob)| {
            blob.ok_or(SimilarityError::ArtifactMissing(key))
        });
        match (blobs.next(), blobs.next(), blobs.next()) {
            (Some(manifest), Some(matrix), Some(index)) => Ok((manifest?, matrix?, index?)),
            _ => Err(SimilarityError::Storage(format!(
                "MGET returned fewer than 3 values for artifact {}",
                id
            ))),
        }
    }

    /// Manifest, matrix and index keys of `id`, in that order
    fn blob_keys(&self, id: &str) -> Vec<String> {
        vec![
            self.key(&ArtifactKey::Manifest(id.to_string())),
            self.key(&ArtifactKey::Matrix(id.to_string())),
            self.key(&ArtifactKey::Index(id.to_string())),
        ]
    }
}

#[async_trait::async_trait]
impl ArtifactStore for RedisArtifactStore {
    async fn save(&self, artifact: Arc<SimilarityArtifact>) -> SimilarityResult<ArtifactManifest> {
        let encoded = codec::encode_blocking(artifact).await?;
        let id = encoded.manifest.artifact_id.to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let pointers: Vec<Option<String>> = conn
            .mget(vec![
                self.key(&ArtifactKey::Current),
                self.key(&ArtifactKey::Previous),
            ])
            .await?;
        let mut pointers = pointers.into_iter();
        let current = pointers.next().flatten();
        let previous = pointers.next().flatten();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(self.key(&ArtifactKey::Matrix(id.clone())), &encoded.matrix)
            .ignore()
            .set(self.key(&ArtifactKey::Index(id.clone())), &encoded.index)
            .ignore()
            .set(self.key(&ArtifactKey::Manifest(id.clone())), &encoded.manifest_json)
            .ignore()
            .set(self.key(&ArtifactKey::Current), &id)
            .ignore();
        if let Some(current) = current.as_ref().filter(|c| **c != id) {
            pipe.set(self.key(&ArtifactKey::Previous), current).ignore();
        }
        if let Some(oldest) = previous.filter(|p| *p != id && Some(p) != current.as_ref()) {
            pipe.del(self.blob_keys(&oldest)).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        tracing::info!(
            prefix = %self.prefix,
            artifact_id = %id,
            rows = encoded.manifest.rows,
            "Artifact saved to Redis"
        );
        Ok(encoded.manifest)
    }

    async fn load(&self) -> SimilarityResult<SimilarityArtifact> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let id = self.current_id(&mut conn).await?;

        let (manifest, matrix, index) = self.get_blobs(&mut conn, &id).await?;
        let artifact = codec::decode_blocking(manifest, matrix, index).await?;
        tracing::info!(artifact_id = %id, rows = artifact.len(), "Artifact loaded from Redis");
        Ok(artifact)
    }

    async fn manifest(&self) -> SimilarityResult<ArtifactManifest> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let id = self.current_id(&mut conn).await?;
        let key = self.key(&ArtifactKey::Manifest(id));
        let bytes: Option<Vec<u8>> = conn.get(&key).await?;
        codec::decode_manifest(&bytes.ok_or(SimilarityError::ArtifactMissing(key))?)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
