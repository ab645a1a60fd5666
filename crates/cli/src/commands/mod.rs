//! Command implementations, one module per subcommand family.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

use quitanda_store::config::StoreConfig;
use quitanda_store::controller::{StoreController, StoreHandle};
use quitanda_store::remote::{AuthClient, TableClient};
use quitanda_store::session::SessionService;

type CommandError = Box<dyn std::error::Error>;

/// A connected store: restored session plus a running controller.
pub struct Store {
    pub config: StoreConfig,
    pub session: SessionService,
    pub handle: StoreHandle,
}

impl Store {
    /// Load configuration, restore any persisted session, spawn the
    /// controller, and wait for the initial fetch to finish.
    pub async fn connect() -> Result<Self, CommandError> {
        let config = StoreConfig::from_env()?;
        let tables = TableClient::new(&config.remote);
        let auth = AuthClient::new(&config.remote);

        let session = SessionService::new(auth, config.session_file.clone());
        session.restore().await;

        let handle = StoreController::spawn(tables, &session, config.order_store());
        handle.settled().await?;

        // The session service must outlive the handle: dropping it closes
        // the session channel and stops the controller.
        let store = Self {
            config,
            session,
            handle,
        };
        tracing::debug!(identity = %store.session.identity().display_name(), "store connected");
        Ok(store)
    }

    /// Session service only, for auth commands that never touch the catalog.
    pub fn session_only() -> Result<SessionService, CommandError> {
        let config = StoreConfig::from_env()?;
        let auth = AuthClient::new(&config.remote);
        Ok(SessionService::new(auth, config.session_file.clone()))
    }
}
