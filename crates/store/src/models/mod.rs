//! Domain models for the catalog and cart.
//!
//! These types mirror the rows of the hosted tables (`product_2v` and
//! `cart`) plus the purely local derived and bookkeeping types.

mod identity;

pub use identity::{Identity, Session, SessionUser, UserMetadata};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quitanda_core::{CartRowId, CustomerId, Price, ProductId};

/// A catalog product, as stored in the `product_2v` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Remote-assigned row id.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Image URL.
    #[serde(default)]
    pub thumbnail: String,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last edited, if ever.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating a product. The remote assigns `id` and `created_at`
/// lands at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// Partial update for a product. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl ProductPatch {
    /// Apply this patch to a product in place, refreshing `updated_at`.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(title) = &self.title {
            product.title.clone_from(title);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(thumbnail) = &self.thumbnail {
            product.thumbnail.clone_from(thumbnail);
        }
        product.updated_at = Some(Utc::now());
    }
}

/// One customer's cart line for one product, as stored in the `cart` table.
///
/// Carries a denormalized snapshot of the product fields so the cart can be
/// rendered without joining the catalog. Invariant: at most one active row
/// per (customer, product) pair; two racing optimistic writes can violate
/// this transiently on the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRow {
    /// Remote-assigned row id. Locally created rows do not know theirs;
    /// remote operations key on (customer, product) instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CartRowId>,
    /// Owning customer, if the row is (to be) persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    /// Product this line is for.
    pub product_id: ProductId,
    /// Units of the product in the cart. Always positive; a line that would
    /// reach zero is deleted instead.
    pub quantity: i64,
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    /// When the line was added or last touched.
    pub added_at: DateTime<Utc>,
}

impl CartRow {
    /// Build the first local line for a product (quantity 1).
    #[must_use]
    pub fn first_of(customer_id: Option<CustomerId>, product: &Product) -> Self {
        Self {
            id: None,
            customer_id,
            product_id: product.id,
            quantity: 1,
            title: product.title.clone(),
            price: product.price,
            thumbnail: product.thumbnail.clone(),
            description: product.description.clone(),
            added_at: Utc::now(),
        }
    }
}

/// Fate of a cart entry's last remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Local and remote agree (or the entry is local-only for an anonymous
    /// visitor, which has nothing to diverge from).
    Synced,
    /// A remote write is in flight.
    Pending,
    /// The last remote write failed; local state is ahead of the remote
    /// until the next full refetch.
    Unsynced,
}

/// A cart row plus its local/remote sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub row: CartRow,
    pub sync: SyncState,
}

impl CartEntry {
    /// Wrap a row fetched from the remote (by definition in sync).
    #[must_use]
    pub const fn synced(row: CartRow) -> Self {
        Self {
            row,
            sync: SyncState::Synced,
        }
    }
}

/// Derived, display-only view of the cart: one item per product with summed
/// quantity. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCartItem {
    /// The product id, which doubles as the item id.
    pub id: ProductId,
    /// Total units across all rows for this product.
    pub qty: i64,
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
}

impl AggregatedCartItem {
    /// Price of this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.qty)
    }
}
