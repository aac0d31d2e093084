use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movie_similarity::{
    api::{create_router, AppState},
    config::{ArtifactBackend, Config},
    db::{create_redis_client, ArtifactStore, FileArtifactStore, RedisArtifactStore},
    error::SimilarityError,
    services::{CatalogSource, CsvCatalog, IndexBuilder, RecommendationEngine, TfidfVectorizer},
};

#[derive(Debug, Parser)]
#[command(name = "movie-similarity", about = "Content-based movie similarity engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the similarity index from the catalog and save it
    Build {
        /// Catalog CSV, overriding CATALOG_PATH
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Load the saved index and serve recommendations over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_similarity=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Command::Build { catalog } => {
            if let Some(path) = catalog {
                config.catalog_path = path;
            }
            build(&config).await
        }
        Command::Serve => serve(config).await,
    }
}

fn create_store(config: &Config) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    let store: Arc<dyn ArtifactStore> = match config.artifact_backend {
        ArtifactBackend::File => Arc::new(FileArtifactStore::new(&config.artifact_dir)),
        ArtifactBackend::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            Arc::new(RedisArtifactStore::new(client, config.redis_key_prefix.clone()))
        }
    };
    tracing::info!(backend = store.name(), "Artifact store configured");
    Ok(store)
}

fn index_builder(config: &Config) -> IndexBuilder {
    let vectorizer = match config.max_features {
        Some(limit) => TfidfVectorizer::new().with_max_features(limit),
        None => TfidfVectorizer::new(),
    };
    IndexBuilder::new().with_vectorizer(vectorizer)
}

async fn build(config: &Config) -> anyhow::Result<()> {
    let store = create_store(config)?;
    let catalog = CsvCatalog::new(&config.catalog_path);
    let builder = index_builder(config);

    let artifact = tokio::task::spawn_blocking(move || builder.build_from_source(&catalog))
        .await
        .context("build task panicked")??;
    let manifest = store.save(Arc::new(artifact)).await?;

    tracing::info!(
        artifact_id = %manifest.artifact_id,
        rows = manifest.rows,
        vocabulary = manifest.vocabulary_size,
        "Build complete"
    );
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let store = create_store(&config)?;
    let catalog: Arc<dyn CatalogSource> = Arc::new(CsvCatalog::new(&config.catalog_path));
    let engine = Arc::new(RecommendationEngine::with_builder(index_builder(&config)));

    match engine.load_from(store.as_ref()).await {
        Ok(manifest) => {
            tracing::info!(artifact_id = %manifest.artifact_id, "Engine ready");
        }
        Err(SimilarityError::ArtifactMissing(_)) if config.build_on_startup => {
            tracing::warn!("No artifact found, building on startup");
            engine.rebuild(catalog.clone(), store.as_ref()).await?;
        }
        Err(e) => {
            // Serve anyway; /ready reports 503 until an admin reload or rebuild
            tracing::warn!(error = %e, "Starting without a loaded artifact");
        }
    }

    let addr = config.bind_addr();
    let state = AppState::new(engine, store, catalog, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
