use crate::core::{
    model::collection::{CollectionConfiguration, DistanceFunction},
    service::collection::{CollectionService, VectorStoreHandle},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    /// Vecgate services.
    pub services: ServiceState,

    /// The vector store every service talks to.
    pub store: VectorStoreHandle,
}

impl AppState {
    /// Load the application state using the provided configuration.
    pub async fn new(args: &crate::config::StartArgs) -> Self {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from(args.log()))
            .init();

        let store: VectorStoreHandle = Arc::new(crate::app::vector::qdrant::init(&args.qdrant_url()));

        let defaults = CollectionConfiguration {
            size: args.default_vector_size(),
            ..Default::default()
        };

        info!(
            "Using vector store '{}' with default vector size {}",
            store.id(),
            defaults.size
        );

        Self::with_store(store, defaults)
    }

    /// Build the state around an already connected store.
    pub fn with_store(store: VectorStoreHandle, defaults: CollectionConfiguration) -> Self {
        let collection = CollectionService::new(store.clone(), defaults);
        Self {
            services: ServiceState { collection },
            store,
        }
    }

    /// Used for metadata display.
    pub fn get_configuration(&self) -> AppConfig {
        let defaults = self.services.collection.defaults();
        AppConfig {
            vector_provider: self.store.id().to_string(),
            default_vector_size: defaults.size,
            default_distance: defaults.distance,
        }
    }
}

#[derive(Clone)]
pub struct ServiceState {
    pub collection: CollectionService,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// The vector store in use.
    pub vector_provider: String,

    /// Vector size of collections created without a configuration.
    pub default_vector_size: usize,

    /// Distance function of collections created without a configuration.
    pub default_distance: DistanceFunction,
}
