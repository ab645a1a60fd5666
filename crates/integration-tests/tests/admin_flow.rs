//! Catalog mutations and the admin gate.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use quitanda_core::{Price, ProductId};
use quitanda_store::{Command, NewProduct, ProductPatch};

use quitanda_integration_tests::{ACCESS_TOKEN, TestStore, product_json};

#[tokio::test]
async fn test_admin_adds_product_with_session_token() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([])).await;
    ctx.mount_cart(json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/product_2v"))
        .and(header("Authorization", format!("Bearer {ACCESS_TOKEN}")))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({"title": "Abacaxi"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([product_json(99, "Abacaxi", 8.9)])),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("chefe", true).await;

    let snapshot = ctx
        .store
        .execute(Command::AddProduct(NewProduct {
            title: "Abacaxi".into(),
            price: Price::from_cents(890),
            description: String::new(),
            thumbnail: String::new(),
        }))
        .await
        .unwrap();

    assert!(snapshot.error.is_none());
    let added = snapshot.products.first().unwrap();
    assert_eq!(added.id, ProductId::new(99));
    assert_eq!(added.price, Price::from_cents(890));
}

#[tokio::test]
async fn test_admin_updates_product() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([])).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/product_2v"))
        .and(query_param("id", "eq.7"))
        .and(body_partial_json(json!({"title": "Bananas Prata"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("chefe", true).await;

    let snapshot = ctx
        .store
        .execute(Command::UpdateProduct(
            ProductId::new(7),
            ProductPatch {
                title: Some("Bananas Prata".into()),
                ..ProductPatch::default()
            },
        ))
        .await
        .unwrap();

    let product = snapshot.products.first().unwrap();
    assert_eq!(product.title, "Bananas Prata");
    assert_eq!(product.price, Price::from_cents(550));
    assert!(product.updated_at.is_some());
}

#[tokio::test]
async fn test_admin_removes_product() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([])).await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/product_2v"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("chefe", true).await;

    let snapshot = ctx
        .store
        .execute(Command::RemoveProduct(ProductId::new(7)))
        .await
        .unwrap();
    assert!(snapshot.products.is_empty());
}

#[tokio::test]
async fn test_customer_catalog_mutation_is_denied_without_remote_call() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([])).await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/product_2v"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("ana", false).await;

    let snapshot = ctx
        .store
        .execute(Command::RemoveProduct(ProductId::new(7)))
        .await
        .unwrap();

    assert!(snapshot.error.unwrap().contains("only administrators"));
    assert_eq!(snapshot.products.len(), 1);
}
