//! Integration endpoints for one connector.
//!
//! Routes, all under `/integrations/{connector}`:
//! - `POST /authorize` (form `user_id`, `org_id`) → authorization URL as a JSON string
//! - `GET  /oauth2callback` → provider redirect; answers with a page that closes the popup
//! - `POST /credentials` (form `user_id`, `org_id`) → token record, consumed on read
//! - `POST /load` (form `credentials`, JSON text) → normalized items

use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::item::IntegrationItem;
use crate::oauth::{AuthorizationFlow, OAuthCallback, TokenRecord, CLOSE_WINDOW_HTML};
use axum::{
    extract::{Form, Query, State},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Shared application state for integration API
#[derive(Clone)]
pub struct IntegrationAppState {
    pub flow: Arc<AuthorizationFlow>,
    pub connector: Arc<dyn Connector>,
}

/// Caller identity form (`user_id`, `org_id`)
#[derive(Debug, Deserialize)]
pub struct CallerForm {
    user_id: Option<String>,
    org_id: Option<String>,
}

impl CallerForm {
    fn into_ids(self) -> Result<(String, String), ConnectorError> {
        let caller_id = self
            .user_id
            .filter(|v| !v.is_empty())
            .ok_or(ConnectorError::MissingParameter("user_id"))?;
        let tenant_id = self
            .org_id
            .filter(|v| !v.is_empty())
            .ok_or(ConnectorError::MissingParameter("org_id"))?;
        Ok((caller_id, tenant_id))
    }
}

/// Item load form
#[derive(Debug, Deserialize)]
pub struct LoadForm {
    credentials: Option<String>,
}

/// Create integration API router for the connector in `state`
pub fn create_integration_router(state: IntegrationAppState) -> Router {
    let base = format!("/integrations/{}", state.connector.name());
    Router::new()
        .route(&format!("{}/authorize", base), post(authorize))
        .route(&format!("{}/oauth2callback", base), get(oauth_callback))
        .route(&format!("{}/credentials", base), post(credentials))
        .route(&format!("{}/load", base), post(load_items))
        .with_state(Arc::new(state))
}

async fn authorize(
    State(state): State<Arc<IntegrationAppState>>,
    Form(form): Form<CallerForm>,
) -> Result<Json<String>, ConnectorError> {
    let (caller_id, tenant_id) = form.into_ids()?;
    let url = state.flow.authorize(&caller_id, &tenant_id).await?;
    Ok(Json(url))
}

async fn oauth_callback(
    State(state): State<Arc<IntegrationAppState>>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Html<&'static str>, ConnectorError> {
    state.flow.complete(callback).await?;
    Ok(Html(CLOSE_WINDOW_HTML))
}

async fn credentials(
    State(state): State<Arc<IntegrationAppState>>,
    Form(form): Form<CallerForm>,
) -> Result<Json<TokenRecord>, ConnectorError> {
    let (caller_id, tenant_id) = form.into_ids()?;
    let record = state.flow.take_credentials(&caller_id, &tenant_id).await?;
    Ok(Json(record))
}

async fn load_items(
    State(state): State<Arc<IntegrationAppState>>,
    Form(form): Form<LoadForm>,
) -> Result<Json<Vec<IntegrationItem>>, ConnectorError> {
    let raw = form
        .credentials
        .ok_or(ConnectorError::MissingParameter("credentials"))?;
    let credentials =
        TokenRecord::parse(&raw).map_err(|e| ConnectorError::MalformedCredentials(e.to_string()))?;

    debug!(connector = %state.connector.name(), "Loading items");
    let items = state.connector.fetch(&credentials).await?;
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_form_requires_both_ids() {
        let form: CallerForm = serde_urlencoded::from_str("user_id=u1").unwrap();
        assert!(matches!(
            form.into_ids(),
            Err(ConnectorError::MissingParameter("org_id"))
        ));

        let form: CallerForm = serde_urlencoded::from_str("user_id=&org_id=o1").unwrap();
        assert!(matches!(
            form.into_ids(),
            Err(ConnectorError::MissingParameter("user_id"))
        ));

        let form: CallerForm = serde_urlencoded::from_str("user_id=u1&org_id=o1").unwrap();
        assert_eq!(
            form.into_ids().unwrap(),
            ("u1".to_string(), "o1".to_string())
        );
    }

    #[test]
    fn test_load_form_deserialization() {
        let form: LoadForm =
            serde_urlencoded::from_str("credentials=%7B%22access_token%22%3A%22t%22%7D").unwrap();
        assert_eq!(form.credentials.as_deref(), Some(r#"{"access_token":"t"}"#));
    }
}
