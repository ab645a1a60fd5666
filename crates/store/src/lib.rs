//! Quitanda Store - Storefront state engine.
//!
//! This crate is the state layer of the Quitanda storefront: product catalog,
//! per-customer shopping cart, session state, and admin product management,
//! backed by a hosted data/auth service spoken to over HTTPS.
//!
//! # Architecture
//!
//! - All mutable state (catalog, cart, flags) is owned by a single
//!   [`controller::StoreController`] task: commands in over an `mpsc` channel,
//!   state snapshots out over a `watch` channel.
//! - The current identity is fixed once per session as a
//!   [`models::Identity`] sum type, not re-derived per call site.
//! - Cart mutations apply locally first and persist asynchronously; a failed
//!   remote write marks the affected entry [`models::SyncState::Unsynced`]
//!   in the snapshot instead of silently diverging.
//!
//! # Example
//!
//! ```rust,ignore
//! use quitanda_store::config::StoreConfig;
//! use quitanda_store::controller::{Command, StoreController};
//! use quitanda_store::remote::{AuthClient, TableClient};
//! use quitanda_store::session::SessionService;
//!
//! let config = StoreConfig::from_env()?;
//! let tables = TableClient::new(&config.remote);
//! let auth = AuthClient::new(&config.remote);
//!
//! let session = SessionService::new(auth, config.session_file.clone());
//! session.restore().await;
//!
//! let store = StoreController::spawn(tables, &session, config.order_store());
//! store.send(Command::AddToCart(product)).await?;
//! let snapshot = store.snapshot();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod order;
pub mod remote;
pub mod session;

pub use controller::{Command, StoreController, StoreHandle, StoreSnapshot};
pub use error::{AuthError, FetchError, MutationError, PermissionError, StoreError};
pub use models::{
    AggregatedCartItem, CartEntry, CartRow, Identity, NewProduct, Product, ProductPatch, Session,
    SyncState,
};
