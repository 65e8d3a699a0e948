// Inbound HTTP API

pub mod integrations;

pub use integrations::{create_integration_router, IntegrationAppState};

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the full application: integration routes, health check and CORS.
pub fn create_app(state: IntegrationAppState, server: &ServerConfig) -> Result<Router> {
    let origins = server
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid allowed origin '{}'", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(create_integration_router(state)
        .route("/health", get(health))
        .layer(cors))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
