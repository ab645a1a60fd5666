//! Pure cart logic: local line transitions and the aggregated view.
//!
//! A cart line moves `absent -> 1 -> n -> absent`; it is deleted rather than
//! stored at zero. These functions mutate only the local collection - the
//! controller decides what, if anything, to persist remotely.

use quitanda_core::{CustomerId, Price, ProductId};

use crate::models::{AggregatedCartItem, CartEntry, CartRow, Product, SyncState};

/// Fold cart entries into one aggregated item per product, summing
/// quantities. First-seen row order is preserved, so the most recently added
/// product leads when rows arrive `added_at.desc`.
///
/// Pure and idempotent: never persisted, recomputed on demand.
#[must_use]
pub fn aggregate(entries: &[CartEntry]) -> Vec<AggregatedCartItem> {
    let mut items: Vec<AggregatedCartItem> = Vec::new();

    for entry in entries {
        let row = &entry.row;
        if let Some(item) = items.iter_mut().find(|item| item.id == row.product_id) {
            item.qty += row.quantity;
        } else {
            items.push(AggregatedCartItem {
                id: row.product_id,
                qty: row.quantity,
                title: row.title.clone(),
                price: row.price,
                thumbnail: row.thumbnail.clone(),
                description: row.description.clone(),
            });
        }
    }

    items
}

/// Sum of all line totals.
#[must_use]
pub fn cart_total(items: &[AggregatedCartItem]) -> Price {
    items.iter().map(AggregatedCartItem::line_total).sum()
}

/// Add one unit of `product`, creating a line at quantity 1 if absent.
/// Returns the line's new quantity.
pub fn apply_add(
    entries: &mut Vec<CartEntry>,
    customer_id: Option<CustomerId>,
    product: &Product,
) -> i64 {
    if let Some(entry) = find_mut(entries, product.id) {
        entry.row.quantity += 1;
        entry.row.quantity
    } else {
        entries.push(CartEntry::synced(CartRow::first_of(customer_id, product)));
        1
    }
}

/// Remove one unit; a line at quantity 1 is deleted. Returns the new
/// quantity (0 = deleted), or `None` when the product was not in the cart.
pub fn apply_remove(entries: &mut Vec<CartEntry>, product_id: ProductId) -> Option<i64> {
    let entry = find_mut(entries, product_id)?;
    if entry.row.quantity > 1 {
        entry.row.quantity -= 1;
        Some(entry.row.quantity)
    } else {
        entries.retain(|e| e.row.product_id != product_id);
        Some(0)
    }
}

/// Set an absolute quantity. `qty <= 0` deletes the line. Returns `false`
/// when the product was not in the cart (nothing to set).
pub fn apply_set_qty(entries: &mut Vec<CartEntry>, product_id: ProductId, qty: i64) -> bool {
    if qty <= 0 {
        return apply_clear(entries, product_id);
    }
    match find_mut(entries, product_id) {
        Some(entry) => {
            entry.row.quantity = qty;
            true
        }
        None => false,
    }
}

/// Delete a product's line outright, whatever its quantity. Returns whether
/// a line was removed.
pub fn apply_clear(entries: &mut Vec<CartEntry>, product_id: ProductId) -> bool {
    let before = entries.len();
    entries.retain(|e| e.row.product_id != product_id);
    entries.len() != before
}

/// Set the sync state of a product's line, if present.
pub fn mark(entries: &mut [CartEntry], product_id: ProductId, sync: SyncState) {
    if let Some(entry) = find_mut(entries, product_id) {
        entry.sync = sync;
    }
}

fn find_mut(entries: &mut [CartEntry], product_id: ProductId) -> Option<&mut CartEntry> {
    entries.iter_mut().find(|e| e.row.product_id == product_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i64, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("product {id}"),
            price: Price::from_cents(cents),
            description: String::new(),
            thumbnail: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn quantities(entries: &[CartEntry]) -> Vec<(i64, i64)> {
        entries
            .iter()
            .map(|e| (e.row.product_id.as_i64(), e.row.quantity))
            .collect()
    }

    #[test]
    fn test_add_to_empty_cart() {
        let mut cart = Vec::new();
        apply_add(&mut cart, None, &product(7, 1000));

        let items = aggregate(&cart);
        assert_eq!(items.len(), 1);
        let item = items.first().unwrap();
        assert_eq!(item.id, ProductId::new(7));
        assert_eq!(item.qty, 1);
        assert_eq!(item.price, Price::from_cents(1000));
    }

    #[test]
    fn test_add_twice_increments() {
        let mut cart = Vec::new();
        let p = product(7, 1000);
        apply_add(&mut cart, None, &p);
        apply_add(&mut cart, None, &p);

        assert_eq!(quantities(&cart), vec![(7, 2)]);
        assert_eq!(aggregate(&cart).first().unwrap().qty, 2);
    }

    #[test]
    fn test_remove_from_one_deletes_row() {
        let mut cart = Vec::new();
        apply_add(&mut cart, None, &product(7, 1000));
        assert_eq!(apply_remove(&mut cart, ProductId::new(7)), Some(0));

        assert!(cart.is_empty());
        assert!(aggregate(&cart).is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Vec::new();
        assert_eq!(apply_remove(&mut cart, ProductId::new(7)), None);
    }

    #[test]
    fn test_net_adds_minus_removes_floors_at_absence() {
        let mut cart = Vec::new();
        let p = product(7, 1000);

        // 3 adds, 1 remove -> 2; 2 more removes -> absent; extra removes no-op
        for _ in 0..3 {
            apply_add(&mut cart, None, &p);
        }
        apply_remove(&mut cart, p.id);
        assert_eq!(quantities(&cart), vec![(7, 2)]);

        apply_remove(&mut cart, p.id);
        apply_remove(&mut cart, p.id);
        assert!(cart.is_empty());

        assert_eq!(apply_remove(&mut cart, p.id), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_qty_zero_equals_delete() {
        let mut deleted = Vec::new();
        let mut cleared = Vec::new();
        let p = product(7, 1000);
        apply_add(&mut deleted, None, &p);
        apply_add(&mut cleared, None, &p);

        apply_set_qty(&mut deleted, p.id, 0);
        apply_clear(&mut cleared, p.id);

        assert_eq!(deleted, cleared);
        assert!(deleted.is_empty());
    }

    #[test]
    fn test_set_qty_absolute() {
        let mut cart = Vec::new();
        let p = product(7, 1000);
        apply_add(&mut cart, None, &p);
        assert!(apply_set_qty(&mut cart, p.id, 5));
        assert_eq!(quantities(&cart), vec![(7, 5)]);
    }

    #[test]
    fn test_set_qty_absent_is_noop() {
        let mut cart = Vec::new();
        assert!(!apply_set_qty(&mut cart, ProductId::new(9), 5));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_removes_whole_line() {
        let mut cart = Vec::new();
        let p = product(7, 1000);
        for _ in 0..4 {
            apply_add(&mut cart, None, &p);
        }
        assert!(apply_clear(&mut cart, p.id));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let mut cart = Vec::new();
        apply_add(&mut cart, None, &product(7, 1000));
        apply_add(&mut cart, None, &product(3, 250));
        apply_add(&mut cart, None, &product(7, 1000));

        let once = aggregate(&cart);
        let twice = aggregate(&cart);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_aggregate_sums_duplicate_rows_per_product() {
        // Two rows for the same product (the transient invariant violation):
        // aggregation still folds them into one item.
        let p = product(7, 1000);
        let mut row_a = CartRow::first_of(None, &p);
        row_a.quantity = 2;
        let mut row_b = CartRow::first_of(None, &p);
        row_b.quantity = 3;

        let cart = vec![CartEntry::synced(row_a), CartEntry::synced(row_b)];
        let items = aggregate(&cart);
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().qty, 5);
    }

    #[test]
    fn test_aggregate_preserves_first_seen_order() {
        let mut cart = Vec::new();
        apply_add(&mut cart, None, &product(3, 250));
        apply_add(&mut cart, None, &product(7, 1000));
        apply_add(&mut cart, None, &product(3, 250));

        let ids: Vec<i64> = aggregate(&cart).iter().map(|i| i.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn test_cart_total() {
        let mut cart = Vec::new();
        apply_add(&mut cart, None, &product(7, 1000));
        apply_add(&mut cart, None, &product(7, 1000));
        apply_add(&mut cart, None, &product(3, 250));

        let total = cart_total(&aggregate(&cart));
        assert_eq!(total, Price::from_cents(2250));
    }

    #[test]
    fn test_mark_sets_sync_state() {
        let mut cart = Vec::new();
        let p = product(7, 1000);
        apply_add(&mut cart, None, &p);

        mark(&mut cart, p.id, SyncState::Unsynced);
        assert_eq!(cart.first().unwrap().sync, SyncState::Unsynced);

        // Marking an absent product is a no-op
        mark(&mut cart, ProductId::new(99), SyncState::Pending);
    }
}
