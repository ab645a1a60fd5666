//! Cart mutations and the remote writes they trigger.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use quitanda_core::ProductId;
use quitanda_store::{Command, Product, SyncState};

use quitanda_integration_tests::{TestStore, cart_row_json, product_json};

fn catalog_product(ctx: &TestStore, id: i64) -> Product {
    ctx.store
        .snapshot()
        .products
        .iter()
        .find(|p| p.id == ProductId::new(id))
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_first_add_inserts_remote_row() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([])).await;
    ctx.mount_find(7, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cart"))
        .and(body_partial_json(json!({"product_id": 7, "quantity": 1})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("ana", false).await;

    let product = catalog_product(&ctx, 7);
    let snapshot = ctx.store.execute(Command::AddToCart(product)).await.unwrap();

    let items = snapshot.aggregated();
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().unwrap().qty, 1);
    assert!(snapshot.cart.iter().all(|e| e.sync == SyncState::Synced));
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_add_to_existing_row_patches_remote_quantity() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    let row = cart_row_json(11, 7, 2, "Bananas", 5.5);
    ctx.mount_cart(json!([row.clone()])).await;
    ctx.mount_find(7, json!([row])).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/cart"))
        .and(query_param("product_id", "eq.7"))
        .and(body_partial_json(json!({"quantity": 3})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("ana", false).await;

    let product = catalog_product(&ctx, 7);
    let snapshot = ctx.store.execute(Command::AddToCart(product)).await.unwrap();
    assert_eq!(snapshot.aggregated().first().unwrap().qty, 3);
}

#[tokio::test]
async fn test_remove_last_unit_deletes_remote_row() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([cart_row_json(11, 7, 1, "Bananas", 5.5)]))
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/cart"))
        .and(query_param("product_id", "eq.7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("ana", false).await;

    let snapshot = ctx
        .store
        .execute(Command::RemoveFromCart(ProductId::new(7)))
        .await
        .unwrap();
    assert!(snapshot.cart.is_empty());
}

#[tokio::test]
async fn test_remove_above_one_patches_decremented_quantity() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([cart_row_json(11, 7, 3, "Bananas", 5.5)]))
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/cart"))
        .and(query_param("product_id", "eq.7"))
        .and(body_partial_json(json!({"quantity": 2})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("ana", false).await;

    let snapshot = ctx
        .store
        .execute(Command::RemoveFromCart(ProductId::new(7)))
        .await
        .unwrap();
    assert_eq!(snapshot.aggregated().first().unwrap().qty, 2);
}

#[tokio::test]
async fn test_update_qty_zero_deletes_remote_row() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([cart_row_json(11, 7, 3, "Bananas", 5.5)]))
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/cart"))
        .and(query_param("product_id", "eq.7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sign_in("ana", false).await;

    let snapshot = ctx
        .store
        .execute(Command::UpdateQty(ProductId::new(7), 0))
        .await
        .unwrap();
    assert!(snapshot.cart.is_empty());
}

#[tokio::test]
async fn test_failed_write_marks_entry_unsynced() {
    let ctx = TestStore::start().await;
    ctx.mount_catalog(json!([product_json(7, "Bananas", 5.5)]))
        .await;
    ctx.mount_cart(json!([])).await;
    ctx.mount_find(7, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cart"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "row level security"})),
        )
        .mount(&ctx.server)
        .await;

    ctx.sign_in("ana", false).await;

    let product = catalog_product(&ctx, 7);
    let snapshot = ctx.store.execute(Command::AddToCart(product)).await.unwrap();

    // Local state keeps the item, flagged as ahead of the remote. Cart
    // write failures are logged, not surfaced as a visible error.
    let entry = snapshot.cart.first().unwrap();
    assert_eq!(entry.row.quantity, 1);
    assert_eq!(entry.sync, SyncState::Unsynced);
    assert!(snapshot.error.is_none());
}
