//! Auth client for the hosted service's authentication subsystem.
//!
//! Endpoints under `/auth/v1`: `signup`, `token?grant_type=password`,
//! `logout`, `user`. Sign-up attaches `{ username, admin: false }` as user
//! metadata; the admin flag is only ever granted server-side.

use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use quitanda_core::Email;

use crate::config::RemoteConfig;
use crate::models::{Session, SessionUser};
use crate::remote::{RemoteError, error_from_response};

/// Client for the hosted auth API.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
}

/// Body of a successful password grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
    user: SessionUser,
}

impl AuthClient {
    /// Create a new auth client.
    #[must_use]
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            inner: Arc::new(AuthClientInner {
                client: reqwest::Client::new(),
                auth_url: format!("{}/auth/v1", config.project_url),
                anon_key: config.anon_key.expose_secret().to_string(),
            }),
        }
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .post(format!("{}/{endpoint}", self.inner.auth_url))
            .header("apikey", &self.inner.anon_key)
    }

    /// Register a new account with `admin = false` metadata.
    ///
    /// Success means the service accepted the registration and sent a
    /// confirmation email; no session is established.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate email, rejected password, or transport
    /// failure.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        username: &str,
    ) -> Result<(), RemoteError> {
        let response = self
            .post("signup")
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": {
                    "username": username,
                    "admin": false,
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns an error on bad credentials, unconfirmed email, or transport
    /// failure.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Session, RemoteError> {
        let response = self
            .post("token")
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let text = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&text)?;

        Ok(Session {
            access_token: token.access_token.into(),
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            user: token.user,
        })
    }

    /// Invalidate a session on the service side.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the logout.
    #[instrument(skip(self, access_token))]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError> {
        let response = self
            .post("logout")
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Fetch the user behind an access token, validating the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    #[instrument(skip(self, access_token))]
    pub async fn get_user(&self, access_token: &str) -> Result<SessionUser, RemoteError> {
        let response = self
            .inner
            .client
            .get(format!("{}/user", self.inner.auth_url))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer) -> RemoteConfig {
        RemoteConfig {
            project_url: server.uri(),
            anon_key: SecretString::from("test-anon-key"),
        }
    }

    #[tokio::test]
    async fn test_sign_up_posts_non_admin_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_partial_json(
                serde_json::json!({"data": {"admin": false, "username": "ana"}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "5e2c937e-6a4a-44b8-bd9a-3bd4e1c20e37",
                "email": "ana@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AuthClient::new(&config(&server));
        let email = Email::parse("ana@example.com").unwrap();
        client.sign_up(&email, "hunter2hunter2", "ana").await.unwrap();
    }

    #[tokio::test]
    async fn test_sign_in_builds_session_with_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "jwt-token",
                "refresh_token": "refresh",
                "expires_in": 3600,
                "user": {
                    "id": "5e2c937e-6a4a-44b8-bd9a-3bd4e1c20e37",
                    "email": "ana@example.com",
                    "user_metadata": {"username": "ana", "admin": false}
                }
            })))
            .mount(&server)
            .await;

        let client = AuthClient::new(&config(&server));
        let email = Email::parse("ana@example.com").unwrap();
        let session = client
            .sign_in_with_password(&email, "hunter2hunter2")
            .await
            .unwrap();

        assert_eq!(session.access_token.expose_secret(), "jwt-token");
        assert!(!session.is_expired());
        assert_eq!(session.user.user_metadata.username.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_sign_in_error_surfaces_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"error_description": "Invalid login credentials"}),
            ))
            .mount(&server)
            .await;

        let client = AuthClient::new(&config(&server));
        let email = Email::parse("ana@example.com").unwrap();
        let err = client
            .sign_in_with_password(&email, "wrong")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid login credentials"));
    }
}
