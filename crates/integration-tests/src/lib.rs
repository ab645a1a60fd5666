//! End-to-end tests for the Quitanda store engine.
//!
//! Each test stands up a wiremock double of the hosted data/auth service,
//! points the real clients at it, and drives the store through the same
//! command and snapshot channels the CLI uses.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p quitanda-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart mutations and their remote writes
//! - `session_flow` - Sign-in/sign-out driving cart refetch and reset
//! - `admin_flow` - Catalog mutations and the admin gate
//! - `checkout_flow` - Checkout freezing the cart into the order record

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use secrecy::SecretString;
use serde_json::{Value, json};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quitanda_store::config::RemoteConfig;
use quitanda_store::controller::{StoreController, StoreHandle};
use quitanda_store::order::OrderStore;
use quitanda_store::remote::{AuthClient, TableClient};
use quitanda_store::session::SessionService;

/// Customer id every auth fixture signs sessions for.
pub const CUSTOMER_ID: &str = "5e2c937e-6a4a-44b8-bd9a-3bd4e1c20e37";
/// Access token every auth fixture issues.
pub const ACCESS_TOKEN: &str = "test-jwt";

/// A store wired against a mock hosted service.
pub struct TestStore {
    pub server: MockServer,
    pub sessions: SessionService,
    pub store: StoreHandle,
    order_file: PathBuf,
}

impl TestStore {
    /// Stand up the mock service and spawn a store against it.
    ///
    /// Mount the catalog and cart fixtures before calling [`Self::sign_in`]
    /// or sending commands; the initial fetch runs immediately.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = RemoteConfig {
            project_url: server.uri(),
            anon_key: SecretString::from("test-anon-key"),
        };
        let tables = TableClient::new(&config);
        let auth = AuthClient::new(&config);
        let sessions = SessionService::new(auth, None);
        let order_file =
            std::env::temp_dir().join(format!("quitanda-it-{}.json", Uuid::new_v4()));
        let store = StoreController::spawn(tables, &sessions, OrderStore::new(order_file.clone()));

        Self {
            server,
            sessions,
            store,
            order_file,
        }
    }

    /// Mount the catalog fixture.
    pub async fn mount_catalog(&self, products: Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/product_2v"))
            .respond_with(ResponseTemplate::new(200).set_body_json(products))
            .mount(&self.server)
            .await;
    }

    /// Mount the rows returned by the full per-customer cart fetch.
    pub async fn mount_cart(&self, rows: Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/cart"))
            .and(query_param("order", "added_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    /// Mount the rows returned by the single (customer, product) lookup.
    pub async fn mount_find(&self, product_id: i64, rows: Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/cart"))
            .and(query_param("product_id", format!("eq.{product_id}")))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    /// Sign in through the mocked password grant and wait for the store to
    /// pick the session up and finish refetching.
    pub async fn sign_in(&self, username: &str, admin: bool) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "refresh_token": "refresh",
                "expires_in": 3600,
                "user": {
                    "id": CUSTOMER_ID,
                    "email": "ana@example.com",
                    "user_metadata": {"username": username, "admin": admin}
                }
            })))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;

        self.sessions
            .sign_in("ana@example.com", "hunter2hunter2")
            .await
            .expect("sign-in fixture should succeed");
        self.store
            .wait_until(|s| {
                s.identity.customer_id().is_some() && !s.loading && s.pending_writes == 0
            })
            .await
            .expect("store should pick up the session");
    }

    /// Reader for the order file this store writes at checkout.
    #[must_use]
    pub fn order_store(&self) -> OrderStore {
        OrderStore::new(self.order_file.clone())
    }
}

impl Drop for TestStore {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.order_file);
    }
}

/// Catalog row fixture.
#[must_use]
pub fn product_json(id: i64, title: &str, price: f64) -> Value {
    json!({
        "id": id,
        "title": title,
        "price": price,
        "description": "",
        "thumbnail": "",
        "created_at": "2026-01-15T12:00:00Z",
        "updated_at": null
    })
}

/// Cart row fixture owned by [`CUSTOMER_ID`].
#[must_use]
pub fn cart_row_json(row_id: i64, product_id: i64, quantity: i64, title: &str, price: f64) -> Value {
    json!({
        "id": row_id,
        "customer_id": CUSTOMER_ID,
        "product_id": product_id,
        "quantity": quantity,
        "title": title,
        "price": price,
        "thumbnail": "",
        "description": "",
        "added_at": "2026-01-15T12:00:00Z"
    })
}
