use std::path::PathBuf;

use serde::Deserialize;

/// Which artifact store backend persists the similarity index
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactBackend {
    File,
    Redis,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// CSV catalog the index is built from
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Artifact store backend
    #[serde(default = "default_artifact_backend")]
    pub artifact_backend: ArtifactBackend,

    /// Root directory of the filesystem artifact store
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Redis connection URL (used by the redis backend)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Key namespace for artifacts stored in Redis
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of recommendations returned when the query omits `top_n`
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    /// Upper bound applied to `top_n` on the HTTP surface
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,

    /// Per-query timeout in milliseconds
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Cap on the TF-IDF vocabulary, keeping the most frequent terms
    #[serde(default)]
    pub max_features: Option<usize>,

    /// Build the index at startup when the store has no artifact
    #[serde(default)]
    pub build_on_startup: bool,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/movies.csv")
}

fn default_artifact_backend() -> ArtifactBackend {
    ArtifactBackend::File
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("recommender_model")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_key_prefix() -> String {
    "similarity".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_top_n() -> usize {
    10
}

fn default_max_top_n() -> usize {
    100
}

fn default_query_timeout_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            artifact_backend: default_artifact_backend(),
            artifact_dir: default_artifact_dir(),
            redis_url: default_redis_url(),
            redis_key_prefix: default_redis_key_prefix(),
            host: default_host(),
            port: default_port(),
            default_top_n: default_top_n(),
            max_top_n: default_max_top_n(),
            query_timeout_ms: default_query_timeout_ms(),
            max_features: None,
            build_on_startup: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        if config.default_top_n == 0 || config.max_top_n == 0 {
            anyhow::bail!("Failed to load config: top_n limits must be at least 1");
        }
        if config.max_features == Some(0) {
            anyhow::bail!("Failed to load config: max_features must be at least 1");
        }
        Ok(config)
    }

    /// Socket address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_iter(Vec::new()).unwrap();
        assert_eq!(config.catalog_path, PathBuf::from("data/movies.csv"));
        assert_eq!(config.artifact_backend, ArtifactBackend::File);
        assert_eq!(config.artifact_dir, PathBuf::from("recommender_model"));
        assert_eq!(config.default_top_n, 10);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert!(!config.build_on_startup);
        assert_eq!(config.max_features, None);
    }

    #[test]
    fn test_overrides_from_env() {
        let config = Config::from_iter(vars(&[
            ("ARTIFACT_BACKEND", "redis"),
            ("REDIS_KEY_PREFIX", "movies"),
            ("PORT", "8080"),
            ("DEFAULT_TOP_N", "5"),
            ("BUILD_ON_STARTUP", "true"),
        ]))
        .unwrap();
        assert_eq!(config.artifact_backend, ArtifactBackend::Redis);
        assert_eq!(config.redis_key_prefix, "movies");
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_top_n, 5);
        assert!(config.build_on_startup);
    }

    #[test]
    fn test_rejects_zero_top_n() {
        assert!(Config::from_iter(vars(&[("DEFAULT_TOP_N", "0")])).is_err());
    }

    #[test]
    fn test_max_features() {
        let config = Config::from_iter(vars(&[("MAX_FEATURES", "5000")])).unwrap();
        assert_eq!(config.max_features, Some(5000));
        assert!(Config::from_iter(vars(&[("MAX_FEATURES", "0")])).is_err());
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Config::from_iter(vars(&[("ARTIFACT_BACKEND", "s3")])).is_err());
    }
}
