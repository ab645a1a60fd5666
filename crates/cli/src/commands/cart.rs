//! Cart commands.
//!
//! Anonymous visitors get a cart that lives for one command only; sign in to
//! keep it across runs. Writes are confirmed before the process exits, and a
//! line whose remote write failed is flagged.

use quitanda_core::ProductId;
use quitanda_store::{Command, StoreSnapshot, SyncState};

use super::{CommandError, Store};

pub async fn show() -> Result<(), CommandError> {
    let store = Store::connect().await?;
    print_cart(&store.handle.snapshot());
    Ok(())
}

pub async fn add(product_id: i64) -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let product_id = ProductId::new(product_id);
    let product = store
        .handle
        .snapshot()
        .products
        .iter()
        .find(|p| p.id == product_id)
        .cloned()
        .ok_or_else(|| format!("no such product: {product_id}"))?;

    let snapshot = store.handle.execute(Command::AddToCart(product)).await?;
    print_cart(&snapshot);
    Ok(())
}

pub async fn remove(product_id: i64) -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let snapshot = store
        .handle
        .execute(Command::RemoveFromCart(ProductId::new(product_id)))
        .await?;
    print_cart(&snapshot);
    Ok(())
}

pub async fn set(product_id: i64, qty: i64) -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let snapshot = store
        .handle
        .execute(Command::UpdateQty(ProductId::new(product_id), qty))
        .await?;
    print_cart(&snapshot);
    Ok(())
}

pub async fn clear(product_id: i64) -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let snapshot = store
        .handle
        .execute(Command::ClearCart(ProductId::new(product_id)))
        .await?;
    print_cart(&snapshot);
    Ok(())
}

fn print_cart(snapshot: &StoreSnapshot) {
    let items = snapshot.aggregated();
    if items.is_empty() {
        println!("the cart is empty");
        return;
    }
    for item in &items {
        println!(
            "{:>6}  {:>4} x {:>10}  =  {:>10}  {}",
            item.id,
            item.qty,
            item.price.to_string(),
            item.line_total().to_string(),
            item.title
        );
    }
    println!("total: {}", snapshot.total());

    if snapshot
        .cart
        .iter()
        .any(|entry| entry.sync == SyncState::Unsynced)
    {
        tracing::warn!("some changes could not be saved remotely; they will revert on next sign-in");
    }
}
