use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use ptmatch_core::config::{
    request_timeout_from_env_value, rest_addr_from_env_value, store_backend_from_env_values,
};
use ptmatch_core::{AppConfig, HttpTransport, MemoryStore, MongoStore, ResourceStore, StoreBackend};

/// Main entry point for the ptmatch harness
///
/// Serves the REST API: resource CRUD, job creation, response ingestion, metrics and links.
///
/// # Environment Variables
/// - `PTMATCH_REST_ADDR`: REST server address (default: "0.0.0.0:3001")
/// - `PTMATCH_MONGO_URI`: MongoDB connection string; the in-memory store is used when unset
/// - `PTMATCH_DATABASE`: MongoDB database name (default: "ptmatch")
/// - `PTMATCH_REQUEST_TIMEOUT_SECS`: timeout for requests sent to record matchers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ptmatch=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = AppConfig::new(
        rest_addr_from_env_value(std::env::var("PTMATCH_REST_ADDR").ok()),
        store_backend_from_env_values(
            std::env::var("PTMATCH_MONGO_URI").ok(),
            std::env::var("PTMATCH_DATABASE").ok(),
        )?,
        request_timeout_from_env_value(std::env::var("PTMATCH_REQUEST_TIMEOUT_SECS").ok())?,
    )?;

    let store: Arc<dyn ResourceStore> = match cfg.store() {
        StoreBackend::Memory => {
            tracing::warn!("PTMATCH_MONGO_URI not set, resources are kept in memory only");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Mongo { uri, database } => {
            tracing::info!("++ Connecting to MongoDB database '{}'", database);
            Arc::new(MongoStore::connect(uri, database).await?)
        }
    };
    let transport = Arc::new(HttpTransport::new(cfg.request_timeout())?);

    let app = api_rest::router(AppState::new(store, transport));

    tracing::info!("++ Starting ptmatch REST on {}", cfg.rest_addr());
    let listener = tokio::net::TcpListener::bind(cfg.rest_addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
