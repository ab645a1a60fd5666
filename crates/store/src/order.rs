//! The one-shot "last order" record.
//!
//! Checkout snapshots the aggregated cart into an [`Order`] and writes it to
//! a local JSON file; the order-confirmation view reads it back. This is the
//! only state the engine persists locally besides the session.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quitanda_core::Price;

use crate::cart::cart_total;
use crate::models::AggregatedCartItem;

/// Errors reading or writing the last-order file.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order file i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("order file parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the customer chose to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Debit,
    Credit { installments: u32 },
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pix => write!(f, "Pix"),
            Self::Debit => write!(f, "Debit"),
            Self::Credit { installments } => write!(f, "Credit ({installments}x)"),
        }
    }
}

/// A placed order: the aggregated cart frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub items: Vec<AggregatedCartItem>,
    pub total: Price,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Freeze the aggregated cart into an order.
    #[must_use]
    pub fn place(
        customer_name: String,
        payment_method: PaymentMethod,
        items: Vec<AggregatedCartItem>,
    ) -> Self {
        let total = cart_total(&items);
        Self {
            customer_name,
            payment_method,
            items,
            total,
            placed_at: Utc::now(),
        }
    }
}

/// Reads and writes the last-order file.
#[derive(Debug, Clone)]
pub struct OrderStore {
    path: PathBuf,
}

impl OrderStore {
    /// Create a store backed by the given path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Overwrite the last order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, order: &Order) -> Result<(), OrderError> {
        let json = serde_json::to_string_pretty(order)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Read the last order, `None` when no order was ever placed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Order>, OrderError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quitanda_core::ProductId;

    use super::*;

    fn item(id: i64, qty: i64, cents: i64) -> AggregatedCartItem {
        AggregatedCartItem {
            id: ProductId::new(id),
            qty,
            title: format!("product {id}"),
            price: Price::from_cents(cents),
            thumbnail: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_place_computes_total() {
        let order = Order::place(
            "Ana".to_string(),
            PaymentMethod::Credit { installments: 3 },
            vec![item(7, 2, 1000), item(3, 1, 250)],
        );
        assert_eq!(order.total, Price::from_cents(2250));
        assert_eq!(order.payment_method.to_string(), "Credit (3x)");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("quitanda-order-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = OrderStore::new(dir.join("last_order.json"));

        assert!(store.load().unwrap().is_none());

        let order = Order::place("Ana".to_string(), PaymentMethod::Pix, vec![item(7, 1, 500)]);
        store.save(&order).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, order);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
