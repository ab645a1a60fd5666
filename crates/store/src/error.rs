//! Error taxonomy for the store engine.
//!
//! Four families, with deliberately different propagation policies:
//!
//! - [`AuthError`] - surfaced to the user as-is (sign-in/sign-up feedback);
//! - [`FetchError`] - sets the visible error flag, prior state is kept;
//! - [`PermissionError`] - sets the visible error flag, nothing is mutated;
//! - [`MutationError`] - logged and reflected as an `Unsynced` entry; the
//!   optimistic local state is never rolled back.

use thiserror::Error;

use quitanda_core::{EmailError, ProductId};

use crate::remote::RemoteError;

/// Umbrella error for engine operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Authentication operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Catalog or cart read failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Admin mutation attempted without admin rights.
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Remote write failed after the optimistic local update.
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// The controller task is gone.
    #[error("store controller is no longer running")]
    ControllerClosed,
}

/// Errors from sign-up, sign-in, sign-out, and session restore.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format (checked locally before calling out).
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password does not meet requirements (checked locally).
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account exists but the confirmation email was never acted on.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// Sign-up with an email that already has an account.
    #[error("an account with this email already exists")]
    AlreadyRegistered,

    /// Any other auth service response.
    #[error("auth service error: {0}")]
    Service(String),

    /// Transport-level failure talking to the auth service.
    #[error("auth request failed: {0}")]
    Transport(#[from] RemoteError),
}

/// What a failed read was trying to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Catalog,
    Cart,
}

impl std::fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::Cart => write!(f, "cart"),
        }
    }
}

/// A catalog or cart read failed.
#[derive(Debug, Error)]
#[error("failed to fetch {target}: {source}")]
pub struct FetchError {
    pub target: FetchTarget,
    #[source]
    pub source: RemoteError,
}

impl FetchError {
    #[must_use]
    pub const fn new(target: FetchTarget, source: RemoteError) -> Self {
        Self { target, source }
    }
}

/// A non-admin identity attempted an admin mutation.
#[derive(Debug, Error)]
#[error("only administrators can {action}")]
pub struct PermissionError {
    /// What was attempted, e.g. "add products".
    pub action: &'static str,
}

impl PermissionError {
    #[must_use]
    pub const fn new(action: &'static str) -> Self {
        Self { action }
    }
}

/// A remote write failed after the local state was already updated.
#[derive(Debug, Error)]
#[error("remote write for product {product_id} failed: {source}")]
pub struct MutationError {
    pub product_id: ProductId,
    #[source]
    pub source: RemoteError,
}

impl MutationError {
    #[must_use]
    pub const fn new(product_id: ProductId, source: RemoteError) -> Self {
        Self { product_id, source }
    }
}
