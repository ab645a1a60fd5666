//! Catalog commands: list for everyone, mutations for admin accounts.
//!
//! The controller enforces the admin gate; a denied mutation comes back as a
//! visible error and the catalog is left untouched.

use rust_decimal::Decimal;

use quitanda_core::{Price, ProductId};
use quitanda_store::{Command, NewProduct, ProductPatch, StoreSnapshot};

use super::{CommandError, Store};

pub async fn list() -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let snapshot = store.handle.snapshot();
    print_catalog(&snapshot);
    Ok(())
}

pub async fn add(
    title: String,
    price: Decimal,
    description: String,
    thumbnail: String,
) -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let snapshot = store
        .handle
        .execute(Command::AddProduct(NewProduct {
            title,
            price: Price::new(price),
            description,
            thumbnail,
        }))
        .await?;
    if let Some(error) = snapshot.error {
        return Err(error.into());
    }
    if let Some(product) = snapshot.products.last() {
        println!("added product {} ({})", product.id, product.title);
    }
    Ok(())
}

pub async fn update(
    id: i64,
    title: Option<String>,
    price: Option<Decimal>,
    description: Option<String>,
    thumbnail: Option<String>,
) -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let patch = ProductPatch {
        title,
        price: price.map(Price::new),
        description,
        thumbnail,
    };
    let snapshot = store
        .handle
        .execute(Command::UpdateProduct(ProductId::new(id), patch))
        .await?;
    if let Some(error) = snapshot.error {
        return Err(error.into());
    }
    println!("updated product {id}");
    Ok(())
}

pub async fn remove(id: i64) -> Result<(), CommandError> {
    let store = Store::connect().await?;
    let snapshot = store
        .handle
        .execute(Command::RemoveProduct(ProductId::new(id)))
        .await?;
    if let Some(error) = snapshot.error {
        return Err(error.into());
    }
    println!("removed product {id}");
    Ok(())
}

fn print_catalog(snapshot: &StoreSnapshot) {
    if snapshot.products.is_empty() {
        println!("the catalog is empty");
        return;
    }
    println!("{:>6}  {:>12}  title", "id", "price");
    for product in &snapshot.products {
        println!("{:>6}  {:>12}  {}", product.id, product.price.to_string(), product.title);
    }
}
