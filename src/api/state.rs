use std::sync::Arc;

use crate::{
    config::Config,
    db::ArtifactStore,
    services::{CatalogSource, RecommendationEngine},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub store: Arc<dyn ArtifactStore>,
    pub catalog: Arc<dyn CatalogSource>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        engine: Arc<RecommendationEngine>,
        store: Arc<dyn ArtifactStore>,
        catalog: Arc<dyn CatalogSource>,
        config: Config,
    ) -> Self {
        Self {
            engine,
            store,
            catalog,
            config: Arc::new(config),
        }
    }
}
