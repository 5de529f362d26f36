//! Cart Aggregate

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Quantity;

/// A user's pending purchase lines. Lines are unique per (product, color, size).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: Quantity,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl CartItem {
    pub fn new(product_id: Uuid, quantity: Quantity, color: Option<String>, size: Option<String>) -> Self {
        Self { id: Uuid::new_v4(), product_id, quantity, color, size }
    }

    fn matches(&self, product_id: Uuid, color: Option<&str>, size: Option<&str>) -> bool {
        self.product_id == product_id && self.color.as_deref() == color && self.size.as_deref() == size
    }
}

impl Cart {
    pub fn new() -> Self { Self::default() }
    pub fn from_items(items: Vec<CartItem>) -> Self { Self { items } }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn product_ids(&self) -> Vec<Uuid> { self.items.iter().map(|i| i.product_id).collect() }

    /// Merge a line into the cart. An existing line with the same product,
    /// color and size has its quantity incremented instead of being duplicated.
    pub fn add_item(&mut self, item: CartItem) -> &CartItem {
        let existing = self
            .items
            .iter()
            .position(|i| i.matches(item.product_id, item.color.as_deref(), item.size.as_deref()));
        let idx = match existing {
            Some(idx) => {
                let line = &mut self.items[idx];
                line.quantity = line.quantity.add(item.quantity);
                idx
            }
            None => {
                self.items.push(item);
                self.items.len() - 1
            }
        };
        &self.items[idx]
    }

    pub fn update_quantity(&mut self, item_id: Uuid, quantity: Quantity) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.id == item_id).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    /// Drop the line with `item_id`. Returns false if no line had that id.
    pub fn remove_item(&mut self, item_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) { self.items.clear(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Cart item not found") }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: u32) -> Quantity { Quantity::new(n).unwrap() }

    fn line(product: Uuid, n: u32, color: Option<&str>, size: Option<&str>) -> CartItem {
        CartItem::new(product, qty(n), color.map(str::to_owned), size.map(str::to_owned))
    }

    #[test]
    fn test_same_line_merges() {
        let mut cart = Cart::new();
        let product = Uuid::new_v4();
        let first = cart.add_item(line(product, 1, Some("red"), Some("M"))).id;
        let merged = cart.add_item(line(product, 1, Some("red"), Some("M"))).id;
        assert_eq!(first, merged);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 2); // Merged
    }

    #[test]
    fn test_variants_stay_separate() {
        let mut cart = Cart::new();
        let product = Uuid::new_v4();
        cart.add_item(line(product, 1, Some("red"), Some("M")));
        cart.add_item(line(product, 1, Some("blue"), Some("M")));
        cart.add_item(line(product, 1, Some("red"), None));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = Cart::new();
        let id = cart.add_item(line(Uuid::new_v4(), 1, None, None)).id;
        cart.update_quantity(id, qty(5)).unwrap();
        assert_eq!(cart.items()[0].quantity.value(), 5);
        assert_eq!(cart.update_quantity(Uuid::new_v4(), qty(2)), Err(CartError::ItemNotFound));

        assert!(!cart.remove_item(Uuid::new_v4()));
        assert_eq!(cart.item_count(), 1);
        assert!(cart.remove_item(id));
        assert!(cart.is_empty());
    }
}
