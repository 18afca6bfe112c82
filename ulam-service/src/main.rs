//! Ulam Service - HTTP microservice for antipodal climate queries.
//!
//! Serves temperature and pressure at any point and its antipode, blended
//! for the forecast snapshot that matches the wall clock.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ULAM_DATASET` | Dataset file (`.js`, `.json`, optionally gzipped) | Required unless `ULAM_POINTER_URL` is set |
//! | `ULAM_FALLBACK` | Fallback dataset file | None |
//! | `ULAM_POINTER_URL` | URL of a pointer file naming the latest dataset | None |
//! | `ULAM_FALLBACK_URL` | URL of the fallback dataset | None |
//! | `ULAM_CACHE_SIZE` | Maximum datasets in cache | 4 |
//! | `ULAM_PORT` | HTTP server port | 8080 |
//! | `ULAM_REFRESH_SECS` | Seconds between automatic timestep refreshes | 60 |
//! | `RUST_LOG` | Log filter (e.g., "info", "ulam=debug") | "ulam_service=info,ulam=info,tower_http=info" |
//!
//! ## Endpoints
//!
//! - `GET /sample?lat=X&lon=Y&zoom=Z` - Conditions at a point and its antipode
//! - `POST /sample` - Sample every vertex of a GeoJSON geometry
//! - `GET /antipode?lat=X&lon=Y` - Antipode of a point
//! - `GET /timestep` - Currently selected snapshot
//! - `POST /timestep` - Select the snapshot for a given instant
//! - `POST /dataset/reload` - Reload the primary dataset and resume automatic refresh
//! - `GET /markers` - Snapshot point, antipode and equator as GeoJSON
//! - `GET /health` - Health check
//! - `GET /stats` - Cache and session statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ulam::SessionBuilder;
use ulam_service::{router, spawn_refresh, AppState, DEFAULT_REFRESH_INTERVAL};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ulam_service=info,ulam=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Service-specific config
    let port: u16 = env_or("ULAM_PORT", 8080);
    let refresh = env_or("ULAM_REFRESH_SECS", DEFAULT_REFRESH_INTERVAL.as_secs())
        .max(1);

    // The library handles ULAM_DATASET, ULAM_FALLBACK, ULAM_CACHE_SIZE,
    // ULAM_POINTER_URL and ULAM_FALLBACK_URL
    let builder = SessionBuilder::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "No dataset configured");
    })?;

    tracing::info!(
        dataset = ?builder.dataset_source(),
        fallback = ?builder.fallback_source(),
        port = port,
        refresh_secs = refresh,
        "Starting Ulam service"
    );

    let source = builder
        .dataset_source()
        .cloned()
        .ok_or(ulam::UlamError::MissingConfig {
            name: "ULAM_DATASET",
        })?;

    // Initial load may hit the network
    let (session, cache) = tokio::task::spawn_blocking(move || -> ulam::Result<_> {
        let cache = Arc::new(builder.build_cache()?);
        let session = builder.build_with_cache(cache.clone(), Utc::now())?;
        Ok((session, cache))
    })
    .await??;

    let selected = session.selected();
    tracing::info!(
        reference_epoch = %session.dataset().reference_epoch(),
        snapshots = session.dataset().snapshots().len(),
        index = selected.index,
        degraded = session.is_degraded(),
        "Dataset loaded"
    );

    let state = Arc::new(AppState::new(session, cache, source));
    spawn_refresh(state.clone(), Duration::from_secs(refresh));

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
