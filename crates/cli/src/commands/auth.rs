//! Session commands: sign-up, sign-in, sign-out, whoami.
//!
//! # Environment Variables
//!
//! - `QUITANDA_SESSION_FILE` - Where the session is kept between runs; with
//!   it unset, a sign-in lasts for one command only.

use quitanda_store::Identity;

use super::{CommandError, Store};

/// Register a new account. No session is established; the account must be
/// confirmed by email before the first sign-in.
pub async fn sign_up(email: &str, password: &str, username: &str) -> Result<(), CommandError> {
    let session = Store::session_only()?;
    let message = session.sign_up(email, password, username).await?;
    println!("{message}");
    Ok(())
}

/// Exchange credentials for a session and store it.
pub async fn sign_in(email: &str, password: &str) -> Result<(), CommandError> {
    let session = Store::session_only()?;
    let identity = session.sign_in(email, password).await?;
    match identity {
        Identity::Admin { .. } => {
            println!("signed in as {} (administrator)", identity.display_name());
        }
        _ => println!("signed in as {}", identity.display_name()),
    }
    Ok(())
}

/// Invalidate the stored session, remotely and locally.
pub async fn sign_out() -> Result<(), CommandError> {
    let session = Store::session_only()?;
    session.restore().await;
    session.sign_out().await;
    println!("signed out");
    Ok(())
}

/// Show who the stored session belongs to.
pub async fn whoami() -> Result<(), CommandError> {
    let session = Store::session_only()?;
    match session.restore().await {
        Identity::Anonymous => println!("not signed in"),
        Identity::Customer { id, username } => println!("customer {username} ({id})"),
        Identity::Admin { id, username } => println!("administrator {username} ({id})"),
    }
    Ok(())
}
