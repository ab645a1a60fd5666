//! Session and identity types.
//!
//! The hosted auth service issues sessions with loosely-typed user metadata.
//! [`Identity`] pins that down once, at session establishment: a session is
//! anonymous, a customer, or an admin, and every permission check afterwards
//! matches on the sum type instead of re-reading metadata.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use quitanda_core::{CustomerId, Email};

/// Arbitrary metadata attached to an auth user at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Display name chosen at registration.
    #[serde(default)]
    pub username: Option<String>,
    /// Catalog-mutation rights. Only ever set server-side; sign-up always
    /// registers with `false`.
    #[serde(default)]
    pub admin: bool,
}

/// The authenticated user embedded in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: CustomerId,
    pub email: Email,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An authenticated session issued by the auth service.
///
/// Persisted to the session file between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Redacted in `Debug` output; written out in the clear only when the
    /// session is persisted.
    #[serde(serialize_with = "expose_token")]
    pub access_token: SecretString,
    #[serde(default)]
    pub refresh_token: String,
    /// Absolute expiry instant, if the service reported one.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: SessionUser,
}

fn expose_token<S: Serializer>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(token.expose_secret())
}

impl Session {
    /// Whether the session's access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Who the current session is, decided once when it is established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// No session: catalog is browsable, the cart is local-only.
    #[default]
    Anonymous,
    /// Signed-in shopper.
    Customer { id: CustomerId, username: String },
    /// Signed-in shopper with catalog-mutation rights.
    Admin { id: CustomerId, username: String },
}

impl Identity {
    /// Derive the identity from an optional session.
    ///
    /// The username falls back to the email address when no display name was
    /// registered.
    #[must_use]
    pub fn from_session(session: Option<&Session>) -> Self {
        session.map_or(Self::Anonymous, |s| {
            let username = s
                .user
                .user_metadata
                .username
                .clone()
                .unwrap_or_else(|| s.user.email.to_string());
            if s.user.user_metadata.admin {
                Self::Admin {
                    id: s.user.id,
                    username,
                }
            } else {
                Self::Customer {
                    id: s.user.id,
                    username,
                }
            }
        })
    }

    /// Whether this identity may mutate the catalog.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }

    /// The customer id, when signed in.
    #[must_use]
    pub const fn customer_id(&self) -> Option<CustomerId> {
        match self {
            Self::Anonymous => None,
            Self::Customer { id, .. } | Self::Admin { id, .. } => Some(*id),
        }
    }

    /// Display name for greeting views.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Anonymous => "guest",
            Self::Customer { username, .. } | Self::Admin { username, .. } => username,
        }
    }
}
