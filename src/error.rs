//! Error taxonomy for the connector.
//!
//! Every failure the flow or the fetcher can report is a [`ConnectorError`].
//! Each variant has a stable machine-readable kind (see [`ConnectorError::kind`])
//! and maps to an HTTP status when surfaced through the API.

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the authorization flow and the resource fetcher.
///
/// None of these are retried by the connector. State failures carry no
/// detail about which part of the state was wrong.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("Authorization denied by provider: {0}")]
    ProviderDenied(String),

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("State mismatch, possible CSRF attack")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(#[source] Box<ConnectorError>),

    #[error("No credentials found")]
    NoCredentials,

    #[error("Request to provider failed: {0}")]
    ProviderHttp(#[source] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    ProviderRejected { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Access token not found")]
    MissingAccessToken,

    #[error("Missing '{0}' in provider response")]
    MissingField(&'static str),

    #[error("Record {id} is missing {field}")]
    IncompleteRecord { id: String, field: &'static str },

    #[error("Malformed timestamp in {field}: '{value}'")]
    MalformedTimestamp { field: &'static str, value: String },

    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl ConnectorError {
    /// Machine-readable error kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "MissingParameter",
            Self::ProviderDenied(_) => "ProviderDenied",
            Self::InvalidState => "InvalidState",
            Self::StateMismatch => "StateMismatch",
            Self::TokenExchangeFailed(_) => "TokenExchangeFailed",
            Self::NoCredentials => "NoCredentials",
            Self::ProviderHttp(_) => "ProviderHttpError",
            Self::ProviderRejected { .. } => "ProviderRejected",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::MissingAccessToken => "MissingAccessToken",
            Self::MissingField(_) => "MissingField",
            Self::IncompleteRecord { .. } => "IncompleteRecord",
            Self::MalformedTimestamp { .. } => "MalformedTimestamp",
            Self::MalformedCredentials(_) => "MalformedCredentials",
            Self::StoreUnavailable(_) => "StoreUnavailable",
        }
    }

    /// HTTP status used when the error reaches the inbound API.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_)
            | Self::ProviderDenied(_)
            | Self::InvalidState
            | Self::StateMismatch
            | Self::NoCredentials
            | Self::MissingAccessToken
            | Self::MalformedCredentials(_) => StatusCode::BAD_REQUEST,
            Self::TokenExchangeFailed(_)
            | Self::ProviderHttp(_)
            | Self::ProviderRejected { .. }
            | Self::MalformedResponse(_)
            | Self::MissingField(_)
            | Self::IncompleteRecord { .. }
            | Self::MalformedTimestamp { .. } => StatusCode::BAD_GATEWAY,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
}

impl IntoResponse for ConnectorError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.kind(),
            detail: self.to_string(),
        });

        (self.status_code(), body).into_response()
    }
}
