//! Cart operations for the signed-in user.
//!
//! Mutations touch one line at a time through the store and then return the
//! refreshed cart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::db::Store;
use crate::domain::aggregates::{Cart, CartError, CartItem, ProductSummary};
use crate::domain::pricing::{PriceBreakdown, PriceLine};
use crate::domain::value_objects::Quantity;
use crate::error::{AppError, Result};

/// A cart line with the current state of its product. `product` is `None`
/// once the product has been deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product: Option<ProductSummary>,
    pub quantity: Quantity,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: Quantity,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

fn one() -> Quantity {
    Quantity::ONE
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateQuantity {
    pub quantity: Quantity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub items: Vec<CartLineView>,
    #[serde(flatten)]
    pub breakdown: PriceBreakdown,
}

/// Attach product summaries to every line.
pub async fn populate(store: &dyn Store, cart: &Cart) -> Result<Vec<CartLineView>> {
    let products: HashMap<Uuid, ProductSummary> = store
        .find_products(&cart.product_ids())
        .await?
        .into_iter()
        .map(|p| (p.id, p.summary()))
        .collect();

    Ok(cart
        .items()
        .iter()
        .map(|item: &CartItem| CartLineView {
            id: item.id,
            product_id: item.product_id,
            product: products.get(&item.product_id).cloned(),
            quantity: item.quantity,
            color: item.color.clone(),
            size: item.size.clone(),
        })
        .collect())
}

pub async fn get_cart(store: &dyn Store, user_id: Uuid) -> Result<Vec<CartLineView>> {
    let cart = store.load_cart(user_id).await?;
    populate(store, &cart).await
}

#[instrument(skip(store))]
pub async fn add_to_cart(store: &dyn Store, user_id: Uuid, input: AddToCart) -> Result<Vec<CartLineView>> {
    if store.find_product(input.product_id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    let item = CartItem::new(input.product_id, input.quantity, non_blank(input.color), non_blank(input.size));
    store.add_cart_item(user_id, &item).await?;
    get_cart(store, user_id).await
}

#[instrument(skip(store))]
pub async fn update_item(store: &dyn Store, user_id: Uuid, item_id: Uuid, quantity: Quantity) -> Result<Vec<CartLineView>> {
    if !store.set_cart_item_quantity(user_id, item_id, quantity).await? {
        return Err(CartError::ItemNotFound.into());
    }
    get_cart(store, user_id).await
}

/// Unknown ids leave the cart untouched.
#[instrument(skip(store))]
pub async fn remove_item(store: &dyn Store, user_id: Uuid, item_id: Uuid) -> Result<Vec<CartLineView>> {
    if !store.remove_cart_item(user_id, item_id).await? {
        tracing::debug!(%item_id, "cart line already gone");
    }
    get_cart(store, user_id).await
}

pub async fn clear_cart(store: &dyn Store, user_id: Uuid) -> Result<()> {
    Ok(store.clear_cart(user_id).await?)
}

// An empty variant is the same line as no variant.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Price the cart at current product prices. Lines whose product no longer
/// exists are left out of the totals.
pub async fn summary(store: &dyn Store, user_id: Uuid, coupon: Option<&str>) -> Result<CartSummary> {
    let items = get_cart(store, user_id).await?;
    let lines: Vec<PriceLine> = items
        .iter()
        .filter_map(|line| line.product.as_ref().map(|p| PriceLine::new(p.price, line.quantity.value())))
        .collect();
    let breakdown = PriceBreakdown::compute(&lines, coupon.filter(|c| !c.is_empty()));
    Ok(CartSummary { items, breakdown })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::aggregates::{Category, NewProduct, Product};
    use rust_decimal::Decimal;

    async fn seeded(price: i64) -> (MemoryStore, Product) {
        let store = MemoryStore::new();
        let product = Product::create(NewProduct {
            name: "Lamp".into(), description: "desk lamp".into(), price: Decimal::new(price, 0), original_price: None,
            category: Category::HomeAndLiving, subcategory: String::new(), brand: String::new(), images: vec![],
            colors: vec![], sizes: vec![], stock: 10, featured: false, trending: false, tags: vec![],
        });
        store.insert_product(&product).await.unwrap();
        (store, product)
    }

    fn add(product_id: Uuid, qty: u32) -> AddToCart {
        AddToCart { product_id, quantity: Quantity::new(qty).unwrap(), color: Some("red".into()), size: None }
    }

    #[tokio::test]
    async fn test_add_merges_and_populates() {
        let (store, product) = seeded(300).await;
        let user = Uuid::new_v4();
        add_to_cart(&store, user, add(product.id, 1)).await.unwrap();
        let lines = add_to_cart(&store, user, add(product.id, 1)).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity.value(), 2);
        assert_eq!(lines[0].product.as_ref().unwrap().name, "Lamp");
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let (store, _) = seeded(300).await;
        let err = add_to_cart(&store, Uuid::new_v4(), add(Uuid::new_v4(), 1)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_summary_uses_live_prices() {
        let (store, product) = seeded(300).await;
        let user = Uuid::new_v4();
        add_to_cart(&store, user, add(product.id, 4)).await.unwrap();
        let summary = summary(&store, user, Some("FLAT100")).await.unwrap();
        assert_eq!(summary.breakdown.items_price, Decimal::new(1200, 0));
        assert_eq!(summary.breakdown.shipping_price, Decimal::ZERO);
        assert_eq!(summary.breakdown.discount, Decimal::new(100, 0));
        assert_eq!(summary.breakdown.total_price, Decimal::new(1316, 0));
    }

    #[tokio::test]
    async fn test_blank_variant_merges_with_none() {
        let (store, product) = seeded(300).await;
        let user = Uuid::new_v4();
        add_to_cart(&store, user, AddToCart { color: None, ..add(product.id, 1) }).await.unwrap();
        let lines = add_to_cart(&store, user, AddToCart { color: Some(" ".into()), ..add(product.id, 2) }).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity.value(), 3);
        assert_eq!(lines[0].color, None);
    }

    #[tokio::test]
    async fn test_update_missing_line() {
        let (store, _) = seeded(1).await;
        let err = update_item(&store, Uuid::new_v4(), Uuid::new_v4(), Quantity::ONE).await.unwrap_err();
        assert_eq!(err.to_string(), "Cart item not found");
    }
}
