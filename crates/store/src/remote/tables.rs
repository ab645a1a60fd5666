//! Table-query client for the hosted data service.
//!
//! Speaks the PostgREST dialect: one resource per table under `/rest/v1`,
//! `column=eq.value` filters, `Prefer: return=representation` when the
//! inserted row is needed back.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use quitanda_core::{CustomerId, ProductId};

use crate::config::RemoteConfig;
use crate::models::{CartRow, NewProduct, Product, ProductPatch};
use crate::remote::{RemoteError, error_from_response};

/// The catalog table.
const PRODUCTS_TABLE: &str = "product_2v";
/// The per-customer cart line table.
const CART_TABLE: &str = "cart";

/// Client for the hosted table-query API.
///
/// Cheaply cloneable; reads use the publishable key alone, per-user and
/// admin calls pass the session's access token.
#[derive(Clone)]
pub struct TableClient {
    inner: Arc<TableClientInner>,
}

struct TableClientInner {
    client: reqwest::Client,
    rest_url: String,
    anon_key: String,
}

impl TableClient {
    /// Create a new table-query client.
    #[must_use]
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            inner: Arc::new(TableClientInner {
                client: reqwest::Client::new(),
                rest_url: format!("{}/rest/v1", config.project_url),
                anon_key: config.anon_key.expose_secret().to_string(),
            }),
        }
    }

    /// Build a request against a table, authorized with `token` when given
    /// and the publishable key otherwise.
    fn request(&self, method: Method, table: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        let url = format!("{}/{table}", self.inner.rest_url);
        self.inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token.unwrap_or(&self.inner.anon_key))
    }

    /// Send a request and parse the JSON body of a success response.
    async fn fetch_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a request and discard the body of a success response.
    async fn execute(request: reqwest::RequestBuilder) -> Result<(), RemoteError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the full product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a product list.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, RemoteError> {
        let request = self
            .request(Method::GET, PRODUCTS_TABLE, None)
            .query(&[("select", "*"), ("order", "id.asc")]);
        Self::fetch_json(request).await
    }

    /// Insert a product and return the row the service created.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails or no representation comes back.
    #[instrument(skip(self, token, product), fields(title = %product.title))]
    pub async fn insert_product(
        &self,
        token: &str,
        product: &NewProduct,
    ) -> Result<Product, RemoteError> {
        let mut payload = serde_json::to_value(product)?;
        if let Some(map) = payload.as_object_mut() {
            map.insert(
                "created_at".to_string(),
                serde_json::to_value(Utc::now())?,
            );
        }

        let request = self
            .request(Method::POST, PRODUCTS_TABLE, Some(token))
            .header("Prefer", "return=representation")
            .json(&payload);

        let rows: Vec<Product> = Self::fetch_json(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound("inserted product".to_string()))
    }

    /// Patch a product row, refreshing its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    #[instrument(skip(self, token, patch), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &str,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<(), RemoteError> {
        let mut payload = serde_json::to_value(patch)?;
        if let Some(map) = payload.as_object_mut() {
            map.insert(
                "updated_at".to_string(),
                serde_json::to_value(Utc::now())?,
            );
        }

        let request = self
            .request(Method::PATCH, PRODUCTS_TABLE, Some(token))
            .query(&[("id", format!("eq.{id}"))])
            .json(&payload);
        Self::execute(request).await
    }

    /// Delete a product row.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, token: &str, id: ProductId) -> Result<(), RemoteError> {
        let request = self
            .request(Method::DELETE, PRODUCTS_TABLE, Some(token))
            .query(&[("id", format!("eq.{id}"))]);
        Self::execute(request).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch one customer's cart rows, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a row list.
    #[instrument(skip(self, token), fields(customer_id = %customer_id))]
    pub async fn cart_rows(
        &self,
        token: &str,
        customer_id: CustomerId,
    ) -> Result<Vec<CartRow>, RemoteError> {
        let request = self
            .request(Method::GET, CART_TABLE, Some(token))
            .query(&[
                ("select", "*".to_string()),
                ("customer_id", format!("eq.{customer_id}")),
                ("order", "added_at.desc".to_string()),
            ]);
        Self::fetch_json(request).await
    }

    /// Look up the customer's row for one product, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(customer_id = %customer_id, product_id = %product_id))]
    pub async fn find_cart_row(
        &self,
        token: &str,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<Option<CartRow>, RemoteError> {
        let request = self
            .request(Method::GET, CART_TABLE, Some(token))
            .query(&[
                ("select", "*".to_string()),
                ("customer_id", format!("eq.{customer_id}")),
                ("product_id", format!("eq.{product_id}")),
                ("limit", "1".to_string()),
            ]);
        let rows: Vec<CartRow> = Self::fetch_json(request).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a cart row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    #[instrument(skip(self, token, row), fields(product_id = %row.product_id))]
    pub async fn insert_cart_row(&self, token: &str, row: &CartRow) -> Result<(), RemoteError> {
        let request = self
            .request(Method::POST, CART_TABLE, Some(token))
            .json(row);
        Self::execute(request).await
    }

    /// Set the absolute quantity on a (customer, product) row, refreshing
    /// its `added_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    #[instrument(skip(self, token), fields(customer_id = %customer_id, product_id = %product_id, quantity))]
    pub async fn set_cart_row_quantity(
        &self,
        token: &str,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), RemoteError> {
        let request = self
            .request(Method::PATCH, CART_TABLE, Some(token))
            .query(&[
                ("customer_id", format!("eq.{customer_id}")),
                ("product_id", format!("eq.{product_id}")),
            ])
            .json(&serde_json::json!({
                "quantity": quantity,
                "added_at": Utc::now(),
            }));
        Self::execute(request).await
    }

    /// Delete a (customer, product) row.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    #[instrument(skip(self, token), fields(customer_id = %customer_id, product_id = %product_id))]
    pub async fn delete_cart_row(
        &self,
        token: &str,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<(), RemoteError> {
        let request = self
            .request(Method::DELETE, CART_TABLE, Some(token))
            .query(&[
                ("customer_id", format!("eq.{customer_id}")),
                ("product_id", format!("eq.{product_id}")),
            ]);
        Self::execute(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer) -> RemoteConfig {
        RemoteConfig {
            project_url: server.uri(),
            anon_key: SecretString::from("test-anon-key"),
        }
    }

    #[tokio::test]
    async fn test_list_products() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/product_2v"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 1,
                "title": "Bananas",
                "price": 5.5,
                "description": "a bunch",
                "thumbnail": "",
                "created_at": "2026-01-15T12:00:00Z",
                "updated_at": null
            }])))
            .mount(&server)
            .await;

        let client = TableClient::new(&config(&server));
        let products = client.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products.first().unwrap().title, "Bananas");
    }

    #[tokio::test]
    async fn test_list_products_error_carries_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/product_2v"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"message": "database on fire"})),
            )
            .mount(&server)
            .await;

        let client = TableClient::new(&config(&server));
        let err = client.list_products().await.unwrap_err();
        assert!(matches!(err, RemoteError::Api { status: 500, .. }));
        assert!(err.to_string().contains("database on fire"));
    }

    #[tokio::test]
    async fn test_find_cart_row_absent() {
        let server = MockServer::start().await;
        let customer_id = CustomerId::new(uuid::Uuid::new_v4());
        Mock::given(method("GET"))
            .and(path("/rest/v1/cart"))
            .and(query_param("product_id", "eq.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = TableClient::new(&config(&server));
        let row = client
            .find_cart_row("user-token", customer_id, ProductId::new(7))
            .await
            .unwrap();
        assert!(row.is_none());
    }
}
