//! OAuth 2.0 authorization flow for external service connections.
//!
//! Implements the authorization code flow:
//! 1. Caller asks for an authorization URL → state stored (10-minute TTL)
//! 2. User authorizes on provider's site
//! 3. Provider redirects to the callback with `code` and `state`
//! 4. State checked against the stored copy and consumed, code exchanged,
//!    token record stored under the caller's key
//! 5. Caller collects the token record once; it is deleted on read
//!
//! The key-value store is the only shared state. Consuming the pending state
//! and collecting credentials both go through atomic store primitives, so a
//! replayed callback or a second collector never gets a token.

mod exchange;
mod provider;
pub mod state;

pub use exchange::{TokenExchangeClient, TokenRecord};
pub use provider::OAuthProviderConfig;
pub use state::StateCodec;

use crate::error::ConnectorError;
use crate::store::KvStore;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long a pending authorization stays valid.
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// Page returned to the provider's redirect; closes the popup window.
pub const CLOSE_WINDOW_HTML: &str = r#"<html>
    <script>
        window.close();
    </script>
</html>
"#;

/// OAuth callback query parameters
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Drives the authorization code flow for one connector.
pub struct AuthorizationFlow {
    connector: String,
    provider: OAuthProviderConfig,
    store: Arc<dyn KvStore>,
    exchange: TokenExchangeClient,
    state_codec: StateCodec,
    state_ttl: Duration,
}

impl AuthorizationFlow {
    /// Create a flow for `connector`, whose name prefixes every store key.
    ///
    /// State tokens are signed with the provider's client secret unless
    /// [`AuthorizationFlow::with_state_secret`] sets another key.
    pub fn new(
        connector: &str,
        provider: OAuthProviderConfig,
        store: Arc<dyn KvStore>,
        http_client: reqwest::Client,
    ) -> Self {
        let exchange = TokenExchangeClient::new(http_client, provider.clone());
        let state_codec = StateCodec::new(&provider.client_secret);
        Self {
            connector: connector.to_string(),
            provider,
            store,
            exchange,
            state_codec,
            state_ttl: STATE_TTL,
        }
    }

    /// Override how long pending states stay valid.
    pub fn with_state_ttl(mut self, state_ttl: Duration) -> Self {
        self.state_ttl = state_ttl;
        self
    }

    /// Sign state tokens with `secret`.
    pub fn with_state_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.state_codec = StateCodec::new(secret);
        self
    }

    /// Store key of the pending state for a caller.
    pub fn state_key(&self, caller_id: &str, tenant_id: &str) -> String {
        format!("{}_state:{}:{}", self.connector, tenant_id, caller_id)
    }

    /// Store key of the issued token record for a caller.
    pub fn token_key(&self, caller_id: &str, tenant_id: &str) -> String {
        format!("{}_token:{}:{}", self.connector, tenant_id, caller_id)
    }

    /// Start a flow and return the provider authorization URL.
    ///
    /// The pending state is written before the URL is returned, so the
    /// callback can never arrive ahead of it.
    pub async fn authorize(
        &self,
        caller_id: &str,
        tenant_id: &str,
    ) -> Result<String, ConnectorError> {
        let csrf_state = self.state_codec.encode(caller_id, tenant_id);

        self.store
            .set(
                &self.state_key(caller_id, tenant_id),
                &csrf_state,
                Some(self.state_ttl),
            )
            .await
            .map_err(|e| {
                error!(
                    connector = %self.connector,
                    caller_id = %caller_id,
                    tenant_id = %tenant_id,
                    error = %e,
                    "Failed to store OAuth state"
                );
                ConnectorError::from(e)
            })?;

        info!(
            connector = %self.connector,
            caller_id = %caller_id,
            tenant_id = %tenant_id,
            "Issued authorization URL"
        );

        Ok(self.provider.build_auth_url(&csrf_state))
    }

    /// Handle the provider redirect.
    ///
    /// On success the pending state is consumed and the token record is
    /// stored for [`AuthorizationFlow::take_credentials`].
    pub async fn complete(&self, callback: OAuthCallback) -> Result<(), ConnectorError> {
        debug!(connector = %self.connector, "OAuth callback received");

        // Providers usually omit `code` on denial, so the error goes first.
        if let Some(error) = callback.error {
            let description = callback
                .error_description
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(
                connector = %self.connector,
                error = %error,
                description = %description,
                "OAuth authorization failed"
            );
            return Err(ConnectorError::ProviderDenied(description));
        }

        let csrf_state = callback
            .state
            .filter(|v| !v.is_empty())
            .ok_or(ConnectorError::MissingParameter("state"))?;
        let code = callback
            .code
            .filter(|v| !v.is_empty())
            .ok_or(ConnectorError::MissingParameter("code"))?;

        let (caller_id, tenant_id) = self.state_codec.decode(&csrf_state).map_err(|e| {
            warn!(connector = %self.connector, "Rejected undecodable OAuth state");
            e
        })?;

        let state_key = self.state_key(&caller_id, &tenant_id);
        let stored = self.store.get(&state_key).await?;
        if stored.as_deref() != Some(csrf_state.as_str()) {
            warn!(
                connector = %self.connector,
                caller_id = %caller_id,
                tenant_id = %tenant_id,
                "Invalid or expired OAuth state"
            );
            return Err(ConnectorError::StateMismatch);
        }

        debug!(
            connector = %self.connector,
            caller_id = %caller_id,
            tenant_id = %tenant_id,
            "CSRF state validated"
        );

        let record = self.exchange.exchange(&code).await.map_err(|e| {
            error!(
                connector = %self.connector,
                caller_id = %caller_id,
                tenant_id = %tenant_id,
                error = %e,
                "Token exchange failed"
            );
            ConnectorError::TokenExchangeFailed(Box::new(e))
        })?;

        // Only the callback that actually removes the state may issue a token.
        if !self.store.delete_if_eq(&state_key, &csrf_state).await? {
            warn!(
                connector = %self.connector,
                caller_id = %caller_id,
                tenant_id = %tenant_id,
                "OAuth state consumed by a concurrent callback"
            );
            return Err(ConnectorError::StateMismatch);
        }

        self.store
            .set(
                &self.token_key(&caller_id, &tenant_id),
                &record.to_json(),
                record.ttl(),
            )
            .await?;

        info!(
            connector = %self.connector,
            caller_id = %caller_id,
            tenant_id = %tenant_id,
            expires_in = ?record.expires_in(),
            "OAuth flow completed successfully"
        );

        Ok(())
    }

    /// Collect the token record issued to a caller.
    ///
    /// Destructive: the record is removed as it is read, so it is handed out
    /// at most once.
    pub async fn take_credentials(
        &self,
        caller_id: &str,
        tenant_id: &str,
    ) -> Result<TokenRecord, ConnectorError> {
        let stored = self
            .store
            .take(&self.token_key(caller_id, tenant_id))
            .await?
            .ok_or(ConnectorError::NoCredentials)?;

        let record = TokenRecord::parse(&stored).map_err(|e| {
            error!(
                connector = %self.connector,
                caller_id = %caller_id,
                tenant_id = %tenant_id,
                error = %e,
                "Stored credentials are not valid JSON"
            );
            ConnectorError::MalformedCredentials(e.to_string())
        })?;

        if record.is_empty() {
            return Err(ConnectorError::NoCredentials);
        }

        info!(
            connector = %self.connector,
            caller_id = %caller_id,
            tenant_id = %tenant_id,
            "Credentials handed out"
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use mockito::{Mock, Server, ServerGuard};
    use std::collections::HashMap;

    fn provider(token_url: String) -> OAuthProviderConfig {
        OAuthProviderConfig {
            auth_url: "https://app.hubspot.com/oauth/authorize".to_string(),
            token_url,
            scopes: vec!["oauth".to_string(), "crm.objects.contacts.read".to_string()],
            client_id: "client-abc".to_string(),
            client_secret: "secret-xyz".to_string(),
            redirect_uri: "http://localhost:8000/integrations/hubspot/oauth2callback".to_string(),
        }
    }

    async fn setup() -> (AuthorizationFlow, Arc<MemoryStore>, ServerGuard) {
        let server = Server::new_async().await;
        let store = Arc::new(MemoryStore::new());
        let flow = AuthorizationFlow::new(
            "hubspot",
            provider(format!("{}/oauth/v1/token", server.url())),
            store.clone(),
            reqwest::Client::new(),
        );
        (flow, store, server)
    }

    async fn token_endpoint(server: &mut ServerGuard, body: &str) -> Mock {
        server
            .mock("POST", "/oauth/v1/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    fn state_param(url: &str) -> String {
        let query = url.split_once('?').unwrap().1;
        let params: HashMap<String, String> = serde_urlencoded::from_str(query).unwrap();
        params["state"].clone()
    }

    fn callback(code: &str, state: &str) -> OAuthCallback {
        OAuthCallback {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_oauth_callback_deserialization() {
        // Success case
        let query = "code=auth_code_123&state=csrf_state_456";
        let callback: OAuthCallback = serde_urlencoded::from_str(query).unwrap();
        assert_eq!(callback.code, Some("auth_code_123".to_string()));
        assert_eq!(callback.state, Some("csrf_state_456".to_string()));
        assert_eq!(callback.error, None);

        // Error case
        let query = "error=access_denied&error_description=User+cancelled";
        let callback: OAuthCallback = serde_urlencoded::from_str(query).unwrap();
        assert_eq!(callback.error, Some("access_denied".to_string()));
        assert_eq!(callback.error_description, Some("User cancelled".to_string()));
        assert_eq!(callback.code, None);
    }

    #[tokio::test]
    async fn test_authorize_stores_state() {
        let (flow, store, _server) = setup().await;

        let url = flow.authorize("u1", "o1").await.unwrap();

        assert!(url.starts_with("https://app.hubspot.com/oauth/authorize?"));
        assert!(url.contains("client_id=client-abc"));
        assert!(url.contains("scope=oauth%20crm.objects.contacts.read"));

        let csrf_state = state_param(&url);
        assert_eq!(
            store.get("hubspot_state:o1:u1").await.unwrap(),
            Some(csrf_state.clone())
        );
        assert_eq!(
            StateCodec::new("secret-xyz").decode(&csrf_state).unwrap(),
            ("u1".to_string(), "o1".to_string())
        );

        let ttl = store.ttl("hubspot_state:o1:u1").unwrap();
        assert!(ttl <= STATE_TTL && ttl > STATE_TTL - Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_full_flow() {
        let (flow, store, mut server) = setup().await;
        let _mock = token_endpoint(&mut server, r#"{"access_token":"tok1","expires_in":3600}"#).await;

        let url = flow.authorize("u1", "o1").await.unwrap();
        flow.complete(callback("abc", &state_param(&url)))
            .await
            .unwrap();

        assert!(!store.contains("hubspot_state:o1:u1"));
        let ttl = store.ttl("hubspot_token:o1:u1").unwrap();
        assert!(ttl <= Duration::from_secs(3600) && ttl > Duration::from_secs(3590));

        let record = flow.take_credentials("u1", "o1").await.unwrap();
        assert_eq!(record.access_token(), Some("tok1"));
        assert_eq!(record.expires_in(), Some(3600));
        assert!(!store.contains("hubspot_token:o1:u1"));
    }

    #[tokio::test]
    async fn test_replayed_callback_rejected() {
        let (flow, _store, mut server) = setup().await;
        let _mock = token_endpoint(&mut server, r#"{"access_token":"tok1","expires_in":3600}"#).await;

        let url = flow.authorize("u1", "o1").await.unwrap();
        let csrf_state = state_param(&url);

        flow.complete(callback("abc", &csrf_state)).await.unwrap();
        let err = flow.complete(callback("abc", &csrf_state)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::StateMismatch));
    }

    #[tokio::test]
    async fn test_credentials_single_use() {
        let (flow, _store, mut server) = setup().await;
        let _mock = token_endpoint(&mut server, r#"{"access_token":"tok1","expires_in":3600}"#).await;

        let url = flow.authorize("u1", "o1").await.unwrap();
        flow.complete(callback("abc", &state_param(&url))).await.unwrap();

        assert!(flow.take_credentials("u1", "o1").await.is_ok());
        assert!(matches!(
            flow.take_credentials("u1", "o1").await,
            Err(ConnectorError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_collection_yields_one_winner() {
        let (flow, store, _server) = setup().await;
        store
            .set("hubspot_token:o1:u1", r#"{"access_token":"tok1"}"#, None)
            .await
            .unwrap();

        let flow = Arc::new(flow);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let flow = Arc::clone(&flow);
            handles.push(tokio::spawn(async move {
                flow.take_credentials("u1", "o1").await
            }));
        }

        let mut issued = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => issued += 1,
                Err(ConnectorError::NoCredentials) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(issued, 1);
    }

    #[tokio::test]
    async fn test_missing_parameters() {
        let (flow, _store, _server) = setup().await;

        let err = flow
            .complete(OAuthCallback {
                code: Some("abc".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::MissingParameter("state")));

        let err = flow
            .complete(OAuthCallback {
                state: Some("test_state".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::MissingParameter("code")));
    }

    #[tokio::test]
    async fn test_empty_parameters_count_as_missing() {
        let (flow, store, mut server) = setup().await;
        let csrf_state = state_param(&flow.authorize("u1", "o1").await.unwrap());

        // No request may reach the token endpoint with an empty code
        let token_mock = server
            .mock("POST", "/oauth/v1/token")
            .expect(0)
            .create_async()
            .await;

        let err = flow.complete(callback("", &csrf_state)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::MissingParameter("code")));

        let err = flow.complete(callback("abc", "")).await.unwrap_err();
        assert!(matches!(err, ConnectorError::MissingParameter("state")));

        token_mock.assert_async().await;
        assert!(store.contains("hubspot_state:o1:u1"));
    }

    #[tokio::test]
    async fn test_state_signed_with_configured_secret() {
        let (flow, store, _server) = setup().await;
        let flow = flow.with_state_secret("state-key");

        let csrf_state = state_param(&flow.authorize("u1", "o1").await.unwrap());
        assert!(StateCodec::new("state-key").decode(&csrf_state).is_ok());
        assert!(StateCodec::new("secret-xyz").decode(&csrf_state).is_err());

        // A state signed with another key never reaches the store lookup
        let foreign = StateCodec::new("secret-xyz").encode("u1", "o1");
        store
            .set("hubspot_state:o1:u1", &foreign, None)
            .await
            .unwrap();
        let err = flow.complete(callback("abc", &foreign)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidState));
    }

    #[tokio::test]
    async fn test_provider_denied_leaves_store_untouched() {
        let (flow, store, _server) = setup().await;
        flow.authorize("u1", "o1").await.unwrap();
        let before = store.get("hubspot_state:o1:u1").await.unwrap();

        let err = flow
            .complete(OAuthCallback {
                code: Some("abc".to_string()),
                state: before.clone(),
                error: Some("access_denied".to_string()),
                error_description: None,
            })
            .await
            .unwrap_err();

        match err {
            ConnectorError::ProviderDenied(message) => assert_eq!(message, "Unknown error"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.get("hubspot_state:o1:u1").await.unwrap(), before);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_provider_denied_without_code() {
        let (flow, store, _server) = setup().await;
        let callback: OAuthCallback =
            serde_urlencoded::from_str("error=access_denied&state=abc").unwrap();

        let err = flow.complete(callback).await.unwrap_err();
        assert!(matches!(err, ConnectorError::ProviderDenied(_)));
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_provider_denied_carries_description() {
        let (flow, _store, _server) = setup().await;

        let err = flow
            .complete(OAuthCallback {
                code: Some("abc".to_string()),
                state: Some("s".to_string()),
                error: Some("access_denied".to_string()),
                error_description: Some("User cancelled".to_string()),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("User cancelled"));
    }

    #[tokio::test]
    async fn test_undecodable_state() {
        let (flow, _store, _server) = setup().await;

        let err = flow
            .complete(callback("abc", "%%%garbage"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidState));
    }

    #[tokio::test]
    async fn test_state_never_issued() {
        let (flow, _store, _server) = setup().await;

        // Well-formed, but this server never stored it
        let forged = StateCodec::new("secret-xyz").encode("u1", "o1");
        let err = flow.complete(callback("abc", &forged)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::StateMismatch));
    }

    #[tokio::test]
    async fn test_superseded_state_rejected() {
        let (flow, _store, _server) = setup().await;

        let first = state_param(&flow.authorize("u1", "o1").await.unwrap());
        flow.authorize("u1", "o1").await.unwrap();

        let err = flow.complete(callback("abc", &first)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::StateMismatch));
    }

    #[tokio::test]
    async fn test_expired_state_rejected() {
        let (flow, _store, _server) = setup().await;
        let flow = flow.with_state_ttl(Duration::from_millis(10));

        let csrf_state = state_param(&flow.authorize("u1", "o1").await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;

        let err = flow.complete(callback("abc", &csrf_state)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::StateMismatch));
    }

    #[tokio::test]
    async fn test_exchange_failure_keeps_state() {
        let (flow, store, mut server) = setup().await;
        let _mock = server
            .mock("POST", "/oauth/v1/token")
            .with_status(400)
            .with_body(r#"{"status":"BAD_AUTH_CODE"}"#)
            .create_async()
            .await;

        let csrf_state = state_param(&flow.authorize("u1", "o1").await.unwrap());
        let err = flow.complete(callback("bad", &csrf_state)).await.unwrap_err();

        match err {
            ConnectorError::TokenExchangeFailed(inner) => {
                assert!(matches!(*inner, ConnectorError::ProviderRejected { status: 400, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(store.contains("hubspot_state:o1:u1"));
        assert!(!store.contains("hubspot_token:o1:u1"));
    }

    #[tokio::test]
    async fn test_token_without_expiry_does_not_expire() {
        let (flow, store, mut server) = setup().await;
        let _mock = token_endpoint(&mut server, r#"{"access_token":"tok1"}"#).await;

        let csrf_state = state_param(&flow.authorize("u1", "o1").await.unwrap());
        flow.complete(callback("abc", &csrf_state)).await.unwrap();

        assert!(store.contains("hubspot_token:o1:u1"));
        assert_eq!(store.ttl("hubspot_token:o1:u1"), None);
    }

    #[tokio::test]
    async fn test_empty_stored_record_is_no_credentials() {
        let (flow, store, _server) = setup().await;
        store.set("hubspot_token:o1:u1", "{}", None).await.unwrap();

        assert!(matches!(
            flow.take_credentials("u1", "o1").await,
            Err(ConnectorError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_stored_record() {
        let (flow, store, _server) = setup().await;
        store.set("hubspot_token:o1:u1", "not json", None).await.unwrap();

        assert!(matches!(
            flow.take_credentials("u1", "o1").await,
            Err(ConnectorError::MalformedCredentials(_))
        ));
    }
}
