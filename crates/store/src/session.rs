//! Session state: the current authenticated identity.
//!
//! Local state here is a cache of the auth subsystem's answers. The service
//! owns `Option<Session>` behind a `watch` channel; the store controller
//! subscribes to it and refetches on every change. The session is optionally
//! persisted to a JSON file between runs.

use std::path::PathBuf;

use secrecy::ExposeSecret;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use quitanda_core::Email;

use crate::error::AuthError;
use crate::models::{Identity, Session};
use crate::remote::{AuthClient, RemoteError};

/// Minimum password length, checked before calling out.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Message shown after a successful registration (accounts require email
/// confirmation before first sign-in).
pub const SIGN_UP_MESSAGE: &str = "Registration complete! Check your email to confirm the account.";

/// Owns the current session and exposes sign-up/sign-in/sign-out.
pub struct SessionService {
    auth: AuthClient,
    session_file: Option<PathBuf>,
    tx: watch::Sender<Option<Session>>,
}

impl SessionService {
    /// Create the service. No session is established until [`Self::restore`]
    /// or [`Self::sign_in`].
    #[must_use]
    pub fn new(auth: AuthClient, session_file: Option<PathBuf>) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            auth,
            session_file,
            tx,
        }
    }

    /// Subscribe to session changes (sign-in, sign-out, restore).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// The current session, if any.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// The current identity, fixed at session establishment.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::from_session(self.tx.borrow().as_ref())
    }

    /// Register a new account. Always registers a regular (non-admin)
    /// customer; the admin flag is only granted server-side.
    ///
    /// Returns the confirmation message to show the user. No session is
    /// established - the account must be confirmed by email first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on invalid email, weak password, duplicate
    /// registration, or network failure.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<String, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        self.auth
            .sign_up(&email, password, username)
            .await
            .map_err(map_auth_error)?;

        info!(%email, "account registered, confirmation email sent");
        Ok(SIGN_UP_MESSAGE.to_string())
    }

    /// Exchange credentials for a session, store it, and publish it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on bad credentials, unconfirmed email, or
    /// network failure.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;

        let session = self
            .auth
            .sign_in_with_password(&email, password)
            .await
            .map_err(map_auth_error)?;

        let identity = Identity::from_session(Some(&session));
        info!(user = %identity.display_name(), "signed in");

        self.persist(&session);
        self.tx.send_replace(Some(session));
        Ok(identity)
    }

    /// Invalidate the current session and clear local state.
    ///
    /// The remote logout is best-effort: a failure is logged and the local
    /// session is cleared regardless.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        if let Some(session) = self.current() {
            if let Err(e) = self.auth.sign_out(session.access_token.expose_secret()).await {
                warn!(error = %e, "remote sign-out failed, clearing local session anyway");
            }
        }

        self.discard_persisted();
        self.tx.send_replace(None);
        info!("signed out");
    }

    /// Restore a previously persisted session, revalidating it against the
    /// auth service. Yields the resulting identity; anything missing,
    /// expired, or rejected silently lands on `Anonymous`.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Identity {
        let Some(path) = &self.session_file else {
            return Identity::Anonymous;
        };

        let mut session: Session = match std::fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
        {
            Some(session) => session,
            None => return Identity::Anonymous,
        };

        if session.is_expired() {
            debug!("persisted session expired");
            self.discard_persisted();
            return Identity::Anonymous;
        }

        // Revalidate the token and refresh the user metadata.
        match self.auth.get_user(session.access_token.expose_secret()).await {
            Ok(user) => session.user = user,
            Err(e) => {
                debug!(error = %e, "persisted session rejected by auth service");
                self.discard_persisted();
                return Identity::Anonymous;
            }
        }

        let identity = Identity::from_session(Some(&session));
        info!(user = %identity.display_name(), "session restored");
        self.tx.send_replace(Some(session));
        identity
    }

    fn persist(&self, session: &Session) {
        let Some(path) = &self.session_file else {
            return;
        };
        let result = serde_json::to_string_pretty(session)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(path, json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session");
        }
    }

    fn discard_persisted(&self) {
        if let Some(path) = &self.session_file
            && let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(error = %e, "failed to remove session file");
        }
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Map an auth API failure onto the user-facing taxonomy, keying on the
/// service's error message.
fn map_auth_error(err: RemoteError) -> AuthError {
    match err {
        RemoteError::Api { message, .. } => {
            let lower = message.to_lowercase();
            if lower.contains("not confirmed") {
                AuthError::EmailNotConfirmed
            } else if lower.contains("invalid login credentials") {
                AuthError::InvalidCredentials
            } else if lower.contains("already registered") || lower.contains("already exists") {
                AuthError::AlreadyRegistered
            } else if lower.contains("password") {
                AuthError::WeakPassword(message)
            } else {
                AuthError::Service(message)
            }
        }
        other => AuthError::Transport(other),
    }
}
