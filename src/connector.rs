use crate::error::ConnectorError;
use crate::item::IntegrationItem;
use crate::oauth::{OAuthProviderConfig, TokenRecord};
use async_trait::async_trait;

/// Connector interface for external API integrations.
///
/// Connectors are stateless: the OAuth flow and credential hand-off live in
/// [`crate::oauth::AuthorizationFlow`], and credentials are passed in on
/// every fetch.
///
/// # Lifecycle
/// 1. The host asks the flow for an authorization URL built from `oauth_config()`
/// 2. User authorizes; the flow stores the token record
/// 3. The host collects the token record and calls `fetch(credentials)`
/// 4. Connector returns normalized items
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the unique identifier for this connector.
    ///
    /// Lowercase alphanumeric (e.g., "hubspot"). Used for API routes,
    /// store keys and logging.
    fn name(&self) -> &str;

    /// Returns the OAuth endpoints, scopes and client credentials.
    fn oauth_config(&self) -> OAuthProviderConfig;

    /// Fetches records from the external API and normalizes them.
    ///
    /// All-or-nothing: any record that cannot be normalized fails the call.
    async fn fetch(&self, credentials: &TokenRecord)
        -> Result<Vec<IntegrationItem>, ConnectorError>;
}
