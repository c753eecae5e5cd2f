//! Cart domain types.
//!
//! Stored carts only remember `(productId, qty)` pairs. Names, prices and
//! images are filled in from the live catalog every time a cart is read, so a
//! client can never influence what it is charged.

use serde::Serialize;

use veltr_core::{GuestCartKey, Price, ProductId, Quantity, UserId};

use crate::catalog::Catalog;

/// Identity a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    /// A signed-in customer.
    User(UserId),
    /// An anonymous visitor holding a server-issued guest key.
    Guest(GuestCartKey),
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Guest(key) => write!(f, "guest:{key}"),
        }
    }
}

/// A stored cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    pub product_id: ProductId,
    pub qty: Quantity,
}

impl CartEntry {
    #[must_use]
    pub const fn new(product_id: ProductId, qty: Quantity) -> Self {
        Self { product_id, qty }
    }
}

/// A mutation applied to a stored cart under the store's write lock.
#[derive(Debug, Clone)]
pub enum CartUpdate {
    /// Replace the whole cart. Duplicate product ids are summed.
    Replace(Vec<CartEntry>),
    /// Add quantities to matching lines, appending unknown products.
    Merge(Vec<CartEntry>),
    /// Set one line's quantity; `None` removes the line.
    SetQuantity {
        product_id: ProductId,
        qty: Option<Quantity>,
    },
}

impl CartUpdate {
    /// Apply this update to a list of stored entries.
    pub fn apply(self, entries: &mut Vec<CartEntry>) {
        match self {
            Self::Replace(incoming) => {
                entries.clear();
                merge_entries(entries, incoming);
            }
            Self::Merge(incoming) => merge_entries(entries, incoming),
            Self::SetQuantity {
                product_id,
                qty: None,
            } => entries.retain(|entry| entry.product_id != product_id),
            Self::SetQuantity {
                product_id,
                qty: Some(qty),
            } => match entries.iter_mut().find(|e| e.product_id == product_id) {
                Some(entry) => entry.qty = qty,
                None => entries.push(CartEntry::new(product_id, qty)),
            },
        }
    }
}

/// Sum `incoming` into `entries` by product id, keeping first-seen order.
fn merge_entries(entries: &mut Vec<CartEntry>, incoming: Vec<CartEntry>) {
    for item in incoming {
        match entries.iter_mut().find(|e| e.product_id == item.product_id) {
            Some(existing) => existing.qty = existing.qty.saturating_add(item.qty),
            None => entries.push(item),
        }
    }
}

/// A cart line priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub qty: Quantity,
    pub name: String,
    pub price: Price,
    pub image: String,
}

impl CartLine {
    /// `price × qty`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.qty.get())
    }
}

/// The priced cart returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub subtotal: Price,
}

impl CartView {
    /// Price stored entries against the catalog.
    ///
    /// Entries whose product has left the catalog are dropped.
    #[must_use]
    pub fn price(entries: &[CartEntry], catalog: &Catalog) -> Self {
        let items: Vec<CartLine> = entries
            .iter()
            .filter_map(|entry| {
                catalog.product(&entry.product_id).map(|product| CartLine {
                    product_id: product.id.clone(),
                    qty: entry.qty,
                    name: product.name.clone(),
                    price: product.price,
                    image: product.image.clone(),
                })
            })
            .collect();
        let subtotal = items.iter().map(CartLine::line_total).sum();

        Self { items, subtotal }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(id: &str, qty: i64) -> CartEntry {
        CartEntry::new(ProductId::new(id), Quantity::new(qty).unwrap())
    }

    #[test]
    fn test_merge_sums_matching_lines() {
        let mut entries = vec![entry("veltr-arc-stand", 1)];
        CartUpdate::Merge(vec![entry("veltr-arc-stand", 2), entry("veltr-lumen-case", 1)])
            .apply(&mut entries);

        assert_eq!(
            entries,
            vec![entry("veltr-arc-stand", 3), entry("veltr-lumen-case", 1)]
        );
    }

    #[test]
    fn test_replace_coalesces_duplicates() {
        let mut entries = vec![entry("veltr-nova-studio", 4)];
        CartUpdate::Replace(vec![
            entry("veltr-arc-stand", 1),
            entry("veltr-lumen-case", 1),
            entry("veltr-arc-stand", 2),
        ])
        .apply(&mut entries);

        assert_eq!(
            entries,
            vec![entry("veltr-arc-stand", 3), entry("veltr-lumen-case", 1)]
        );
    }

    #[test]
    fn test_set_quantity() {
        let mut entries = vec![entry("veltr-arc-stand", 1), entry("veltr-lumen-case", 2)];

        CartUpdate::SetQuantity {
            product_id: ProductId::new("veltr-arc-stand"),
            qty: Some(Quantity::new(5).unwrap()),
        }
        .apply(&mut entries);
        assert_eq!(entries[0], entry("veltr-arc-stand", 5));

        CartUpdate::SetQuantity {
            product_id: ProductId::new("veltr-lumen-case"),
            qty: None,
        }
        .apply(&mut entries);
        assert_eq!(entries, vec![entry("veltr-arc-stand", 5)]);

        CartUpdate::SetQuantity {
            product_id: ProductId::new("veltr-echo-earbuds"),
            qty: Some(Quantity::ONE),
        }
        .apply(&mut entries);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_price_uses_catalog_and_drops_missing() {
        let catalog = Catalog::seed().unwrap();
        let view = CartView::price(
            &[entry("veltr-echo-earbuds", 2), entry("discontinued", 1)],
            &catalog,
        );

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].name, "VELTR Echo Wireless Earbuds");
        assert_eq!(view.subtotal, Price::from_units(798));
    }

    #[test]
    fn test_owner_display() {
        let owner = CartOwner::Guest(GuestCartKey::new("abc"));
        assert_eq!(owner.to_string(), "guest:abc");
    }
}
