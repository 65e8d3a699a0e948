use crate::oauth::OAuthProviderConfig;
use anyhow::{ensure, Result};
use serde::Deserialize;

pub const AUTH_URL: &str = "https://app.hubspot.com/oauth/authorize";
pub const TOKEN_URL: &str = "https://api.hubapi.com/oauth/v1/token";
pub const CONTACTS_URL: &str = "https://api.hubapi.com/crm/v3/objects/contacts";
pub const REDIRECT_URI: &str = "http://localhost:8000/integrations/hubspot/oauth2callback";
pub const SCOPES: &[&str] = &["oauth", "crm.objects.contacts.read"];

/// HubSpot app registration and endpoints.
///
/// Client ID and secret have no defaults; set them in the config file or via
/// `HUBSPOT_CLIENT_ID` / `HUBSPOT_CLIENT_SECRET`.
#[derive(Clone, Deserialize)]
pub struct HubSpotConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_contacts_url")]
    pub contacts_url: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// How long a started authorization stays valid (seconds)
    #[serde(default = "default_state_ttl_seconds")]
    pub state_ttl_seconds: u64,

    /// Key for signing OAuth state tokens; falls back to `client_secret`
    #[serde(default)]
    pub state_secret: String,
}

fn default_redirect_uri() -> String {
    REDIRECT_URI.to_string()
}

fn default_auth_url() -> String {
    AUTH_URL.to_string()
}

fn default_token_url() -> String {
    TOKEN_URL.to_string()
}

fn default_contacts_url() -> String {
    CONTACTS_URL.to_string()
}

fn default_scopes() -> Vec<String> {
    SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_state_ttl_seconds() -> u64 {
    600
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            contacts_url: default_contacts_url(),
            scopes: default_scopes(),
            state_ttl_seconds: default_state_ttl_seconds(),
            state_secret: String::new(),
        }
    }
}

impl HubSpotConfig {
    /// Apply `HUBSPOT_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("HUBSPOT_CLIENT_ID") {
            self.client_id = v;
        }
        if let Ok(v) = std::env::var("HUBSPOT_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Ok(v) = std::env::var("HUBSPOT_REDIRECT_URI") {
            self.redirect_uri = v;
        }
        if let Ok(v) = std::env::var("HUBSPOT_STATE_SECRET") {
            self.state_secret = v;
        }
    }

    /// Key used to sign OAuth state tokens.
    pub fn state_signing_key(&self) -> &str {
        if self.state_secret.is_empty() {
            &self.client_secret
        } else {
            &self.state_secret
        }
    }

    /// Fail if the app registration is incomplete.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.client_id.is_empty(),
            "HubSpot client_id not set (config [hubspot] or HUBSPOT_CLIENT_ID)"
        );
        ensure!(
            !self.client_secret.is_empty(),
            "HubSpot client_secret not set (config [hubspot] or HUBSPOT_CLIENT_SECRET)"
        );
        Ok(())
    }

    /// Returns the OAuthProviderConfig for HubSpot.
    pub fn oauth_config(&self) -> OAuthProviderConfig {
        OAuthProviderConfig {
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
            scopes: self.scopes.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
        }
    }
}

impl std::fmt::Debug for HubSpotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSpotConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("contacts_url", &self.contacts_url)
            .field("scopes", &self.scopes)
            .field("state_ttl_seconds", &self.state_ttl_seconds)
            .field("state_secret", &"<redacted>")
            .finish()
    }
}
