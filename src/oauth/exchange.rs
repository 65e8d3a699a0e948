//! OAuth token exchange logic.
//!
//! Handles exchanging authorization codes for access tokens.

use super::provider::OAuthProviderConfig;
use crate::error::ConnectorError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Token endpoint response, kept verbatim.
///
/// Besides `access_token` and `expires_in` the provider may return any
/// number of extra fields; they are preserved and handed back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRecord(Map<String, Value>);

impl TokenRecord {
    /// Wrap a parsed JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Parse a JSON object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize back to JSON text.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.0.get("access_token").and_then(Value::as_str)
    }

    /// Declared token lifetime in seconds, if any.
    pub fn expires_in(&self) -> Option<u64> {
        self.0.get("expires_in").and_then(Value::as_u64)
    }

    /// Store TTL for this record.
    ///
    /// A missing or zero `expires_in` yields `None`: the record does not expire.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_in()
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

/// Client for the provider's token endpoint.
#[derive(Clone)]
pub struct TokenExchangeClient {
    http_client: Client,
    provider: OAuthProviderConfig,
}

impl TokenExchangeClient {
    pub fn new(http_client: Client, provider: OAuthProviderConfig) -> Self {
        Self {
            http_client,
            provider,
        }
    }

    /// Exchange authorization code for access token
    ///
    /// # Returns
    /// * `Ok(TokenRecord)` - The full token response
    /// * `Err` - Transport failure, rejected request, or unusable body
    pub async fn exchange(&self, code: &str) -> Result<TokenRecord, ConnectorError> {
        // Build form data for token exchange
        let mut form_data = HashMap::new();
        form_data.insert("grant_type", "authorization_code");
        form_data.insert("code", code);
        form_data.insert("redirect_uri", self.provider.redirect_uri.as_str());
        form_data.insert("client_id", self.provider.client_id.as_str());
        form_data.insert("client_secret", self.provider.client_secret.as_str());

        tracing::debug!(
            token_url = %self.provider.token_url,
            "Exchanging authorization code for token"
        );

        let response = self
            .http_client
            .post(&self.provider.token_url)
            .header("Accept", "application/json")
            .form(&form_data)
            .send()
            .await
            .map_err(ConnectorError::ProviderHttp)?;

        let status = response.status();
        let body = response.text().await.map_err(ConnectorError::ProviderHttp)?;

        if !status.is_success() {
            return Err(ConnectorError::ProviderRejected {
                status: status.as_u16(),
                body,
            });
        }

        let fields: Map<String, Value> = serde_json::from_str(&body).map_err(|e| {
            ConnectorError::MalformedResponse(format!("token response: {}", e))
        })?;
        let record = TokenRecord::from_map(fields);

        if record.access_token().is_none() {
            return Err(ConnectorError::MissingAccessToken);
        }

        tracing::debug!(
            has_refresh_token = record.get("refresh_token").is_some(),
            expires_in = ?record.expires_in(),
            "Token exchange successful"
        );

        Ok(record)
    }
}
