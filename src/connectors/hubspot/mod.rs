pub mod api;
pub mod config;
pub mod transformer;

use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::item::IntegrationItem;
use crate::oauth::{OAuthProviderConfig, TokenRecord};
use async_trait::async_trait;
use reqwest::Client;

use self::api::HubSpotClient;
use self::config::HubSpotConfig;
use self::transformer::contacts_to_items;

/// HubSpot connector: lists CRM contacts as integration items.
///
/// Reads a single page of contacts; HubSpot's `paging` cursor is ignored.
pub struct HubSpotConnector {
    config: HubSpotConfig,
    http_client: Client,
}

impl HubSpotConnector {
    pub fn new(config: HubSpotConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl Connector for HubSpotConnector {
    fn name(&self) -> &str {
        "hubspot"
    }

    fn oauth_config(&self) -> OAuthProviderConfig {
        self.config.oauth_config()
    }

    async fn fetch(
        &self,
        credentials: &TokenRecord,
    ) -> Result<Vec<IntegrationItem>, ConnectorError> {
        let access_token = credentials
            .access_token()
            .ok_or(ConnectorError::MissingAccessToken)?;

        let client = HubSpotClient::new(
            access_token.to_string(),
            self.http_client.clone(),
            self.config.contacts_url.clone(),
        );

        let contacts = client.fetch_contacts().await?;
        let items = contacts_to_items(&contacts)?;

        tracing::debug!(count = items.len(), "Fetched HubSpot contacts");
        Ok(items)
    }
}
