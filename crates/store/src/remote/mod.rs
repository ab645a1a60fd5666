//! Clients for the hosted data/auth service.
//!
//! # Architecture
//!
//! - The hosted service is the source of truth - no local sync, direct calls
//! - [`TableClient`] speaks the table-query REST dialect
//!   (`/rest/v1/<table>` with `column=eq.value` filters)
//! - [`AuthClient`] speaks the auth dialect (`/auth/v1/signup`, `/token`,
//!   `/logout`, `/user`)
//!
//! Both clients are cheaply cloneable (`Arc` inner) and carry the
//! publishable API key; per-user calls additionally take the session's
//! access token as a bearer.

mod auth;
mod tables;

pub use auth::AuthClient;
pub use tables::TableClient;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the hosted service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connect, timeout, TLS).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("json parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Error body shapes the service uses, depending on the subsystem.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Turn a non-success response into an [`RemoteError::Api`], salvaging the
/// service's error message when the body is parseable.
pub(crate) async fn error_from_response(response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(|body| body.message.or(body.msg).or(body.error_description))
        .unwrap_or_else(|| text.chars().take(200).collect());

    RemoteError::Api { status, message }
}
