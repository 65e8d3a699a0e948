//! OAuth state codec for CSRF protection.
//!
//! A state token is `{payload}.{tag}`: the payload is URL-safe base64 of a
//! small JSON document naming the caller and tenant that started the flow,
//! plus a random nonce; the tag is URL-safe base64 of an HMAC-SHA256 over the
//! payload text. Tokens that fail the tag check are never parsed.

use crate::error::ConnectorError;
use base64::{engine::general_purpose::URL_SAFE, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TAG_SEPARATOR: char = '.';

/// Identity carried through the user agent in the `state` parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthState {
    #[serde(rename = "user_id")]
    pub caller_id: String,

    #[serde(rename = "org_id")]
    pub tenant_id: String,

    nonce: String,
}

impl AuthState {
    /// New state for a caller/tenant pair with a fresh nonce.
    pub fn new(caller_id: &str, tenant_id: &str) -> Self {
        Self {
            caller_id: caller_id.to_string(),
            tenant_id: tenant_id.to_string(),
            nonce: Uuid::new_v4().simple().to_string(),
        }
    }

    fn to_payload(&self) -> String {
        // Serializing a struct of strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE.encode(json)
    }
}

/// Signs and verifies state tokens with a server-side key.
#[derive(Clone)]
pub struct StateCodec {
    key: Vec<u8>,
}

impl StateCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    /// Encode a new state token for `caller_id` in `tenant_id`.
    pub fn encode(&self, caller_id: &str, tenant_id: &str) -> String {
        self.encode_state(&AuthState::new(caller_id, tenant_id))
    }

    /// Decode a state token into `(caller_id, tenant_id)`.
    pub fn decode(&self, token: &str) -> Result<(String, String), ConnectorError> {
        let state = self.decode_state(token)?;
        Ok((state.caller_id, state.tenant_id))
    }

    pub fn encode_state(&self, state: &AuthState) -> String {
        let payload = state.to_payload();
        let tag = URL_SAFE.encode(self.mac(&payload).finalize().into_bytes());
        format!("{}{}{}", payload, TAG_SEPARATOR, tag)
    }

    /// Verify and parse a token.
    ///
    /// The tag is checked in constant time before the payload is decoded;
    /// only the canonical encoding of a well-formed payload is accepted.
    pub fn decode_state(&self, token: &str) -> Result<AuthState, ConnectorError> {
        let (payload, tag) = token.split_once(TAG_SEPARATOR).ok_or_else(|| {
            tracing::debug!("State has no tag");
            ConnectorError::InvalidState
        })?;

        let tag_bytes = URL_SAFE.decode(tag).map_err(|e| {
            tracing::debug!(error = %e, "State tag is not valid base64");
            ConnectorError::InvalidState
        })?;
        self.mac(payload).verify_slice(&tag_bytes).map_err(|_| {
            tracing::debug!("State tag does not match");
            ConnectorError::InvalidState
        })?;

        let bytes = URL_SAFE.decode(payload).map_err(|e| {
            tracing::debug!(error = %e, "State payload is not valid base64");
            ConnectorError::InvalidState
        })?;
        let state: AuthState = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "State payload is not a valid document");
            ConnectorError::InvalidState
        })?;

        if self.encode_state(&state) != token {
            tracing::debug!("State is not in canonical form");
            return Err(ConnectorError::InvalidState);
        }

        Ok(state)
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac
    }
}

impl std::fmt::Debug for StateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCodec")
            .field("key", &"<redacted>")
            .finish()
    }
}
