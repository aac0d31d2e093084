pub mod codec;
pub mod file;
pub mod redis;
pub mod store;

pub use file::FileArtifactStore;
pub use self::redis::{create_redis_client, RedisArtifactStore};
pub use store::ArtifactStore;
#[cfg(test)]
pub use store::MockArtifactStore;
