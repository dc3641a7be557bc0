use anyhow::{Context, Result};
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

use minlink::analytics::{GeoCacheConfig, GeoResolver, IpApiProvider};
use minlink::config::{Config, DatabaseBackend};
use minlink::redirect;
use minlink::storage::{PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(PostgresStorage::new(&config.database.url).await?)
        }
    };

    // Initialize database
    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    // Geolocation resolver with bounded cache
    let geo_timeout = Duration::from_millis(config.geo.timeout_ms);
    let provider = Arc::new(IpApiProvider::new(
        &config.geo.api_url,
        &config.geo.lang,
        geo_timeout,
    )?);
    let geo = Arc::new(GeoResolver::new(
        provider,
        geo_timeout,
        GeoCacheConfig {
            capacity: config.geo.cache_capacity,
            ..GeoCacheConfig::default()
        },
    ));
    info!(
        "🌍 Geolocation via {} (timeout {}ms, cache capacity {})",
        config.geo.api_url, config.geo.timeout_ms, config.geo.cache_capacity
    );

    if config.server.dev_geo_fallback {
        info!("🔧 Development mode: geolocation falls back to the service's view of this host");
    }

    let redirect_status = StatusCode::from_u16(config.server.redirect_status)
        .context("invalid redirect status code")?;

    let router = redirect::create_redirect_router(
        Arc::clone(&storage),
        geo,
        config.server.dev_geo_fallback,
        redirect_status,
    )
    .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Redirect server listening on http://{}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
