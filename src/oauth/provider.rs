//! OAuth provider configuration.

use serde::Deserialize;

/// Endpoints and client credentials for one OAuth provider.
#[derive(Clone, Deserialize)]
pub struct OAuthProviderConfig {
    /// OAuth authorization endpoint URL
    pub auth_url: String,

    /// OAuth token exchange endpoint URL
    pub token_url: String,

    /// Required OAuth scopes
    pub scopes: Vec<String>,

    /// Client ID registered with the provider
    pub client_id: String,

    /// Client secret registered with the provider
    pub client_secret: String,

    /// Callback URL the provider redirects back to
    pub redirect_uri: String,
}

impl OAuthProviderConfig {
    /// Build authorization URL carrying the given state
    pub fn build_auth_url(&self, state: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(state)
        )
    }
}

impl std::fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("scopes", &self.scopes)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthProviderConfig {
        OAuthProviderConfig {
            auth_url: "https://example.com/oauth/authorize".to_string(),
            token_url: "https://example.com/oauth/token".to_string(),
            scopes: vec!["oauth".to_string(), "crm.objects.contacts.read".to_string()],
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_uri: "http://localhost:8000/callback".to_string(),
        }
    }

    #[test]
    fn test_build_auth_url() {
        let url = test_config().build_auth_url("random_state=");

        assert!(url.starts_with("https://example.com/oauth/authorize?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fcallback"));
        // URL encoding converts spaces to %20
        assert!(url.contains("scope=oauth%20crm.objects.contacts.read"));
        assert!(url.contains("state=random_state%3D"));
        assert!(!url.contains("test_secret"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", test_config());
        assert!(debug.contains("test_client_id"));
        assert!(!debug.contains("test_secret"));
        assert!(debug.contains("<redacted>"));
    }
}
