use anyhow::{Context, Result};
use hubspot_connector::api::{create_app, IntegrationAppState};
use hubspot_connector::config;
use hubspot_connector::connector::Connector;
use hubspot_connector::connectors::{build_http_client, HubSpotConnector};
use hubspot_connector::oauth::AuthorizationFlow;
use hubspot_connector::store::create_store;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hubspot_connector=info".into()),
        )
        .init();

    info!("HubSpot connector starting...");

    let config = config::load_from_env().context("Failed to load configuration")?;
    info!(
        bind_addr = %config.server.bind_addr,
        redirect_uri = %config.hubspot.redirect_uri,
        redis_enabled = config.redis.enabled,
        "Configuration loaded"
    );

    let http_client = build_http_client(config.http.timeout(), &config.http.user_agent)?;
    let store = create_store(&config.redis).await;

    let connector = Arc::new(HubSpotConnector::new(
        config.hubspot.clone(),
        http_client.clone(),
    ));
    let flow = Arc::new(
        AuthorizationFlow::new(
            connector.name(),
            connector.oauth_config(),
            store,
            http_client,
        )
        .with_state_ttl(Duration::from_secs(config.hubspot.state_ttl_seconds))
        .with_state_secret(config.hubspot.state_signing_key()),
    );

    let state = IntegrationAppState { flow, connector };
    let router = create_app(state, &config.server)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(bind_addr = %config.server.bind_addr, "Connector API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Connector API server error")?;

    info!("HubSpot connector stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
