//! Built-in connectors.

pub mod hubspot;

pub use hubspot::HubSpotConnector;

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Build the outbound HTTP client shared by the flow and the connectors.
pub fn build_http_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}
