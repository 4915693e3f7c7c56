//! REST API over the entity stores.
//!
//! Endpoints:
//! - `GET /health` health check
//! - one resource binding per entity, see [`resource`]

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::Stores;

pub mod error;
pub mod resource;

pub use error::ApiError;
pub use resource::resource_router;

/// Start the REST server on the given address.
///
/// When the port is 0, the OS assigns an ephemeral port. The actual bound
/// address is always logged so it can be discovered.
pub async fn serve(
    stores: &Stores,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(stores);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(address = %local, "orchestrix REST API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(stores: &Stores) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(resource_router(stores.tenants.clone()))
        .merge(resource_router(stores.hosts.clone()))
        .merge(resource_router(stores.oauth_clients.clone()))
        .merge(resource_router(stores.users.clone()))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
