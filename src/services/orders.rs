//! Checkout and order management.
//!
//! Placement trusts the prices the client submitted, except for the coupon
//! discount which is computed here from `itemsPrice`. The steps that follow
//! the insert (stock decrement, cart clear) are not transactional.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{Customer, OrderWithCustomer, Store};
use crate::domain::aggregates::{Order, OrderDraft, OrderStatus, PaymentResult, User};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::pricing::apply_coupon;
use crate::error::{AppError, Result};
use crate::services::events::EventPublisher;

pub const ORDER_NOT_FOUND: &str = "Order not found";
pub const NOT_AUTHORIZED: &str = "Not authorized";
pub const INVALID_COUPON: &str = "Invalid coupon code";

/// Payment receipt posted to `/pay`, in the provider's field names.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaymentUpdate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub payer: Option<Payer>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub email_address: Option<String>,
}

impl From<PaymentUpdate> for PaymentResult {
    fn from(u: PaymentUpdate) -> Self {
        Self {
            id: u.id,
            status: u.status,
            update_time: u.update_time,
            email_address: u.payer.and_then(|p| p.email_address),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub items_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponCheck {
    pub valid: bool,
    pub discount: Decimal,
    pub message: String,
}

/// Place an order for `user_id` from a checkout draft.
#[instrument(skip(store, events, draft), fields(items = draft.items.len()))]
pub async fn place_order(store: &dyn Store, events: &EventPublisher, user_id: Uuid, draft: OrderDraft) -> Result<Order> {
    let discount = apply_coupon(draft.coupon_code.as_deref(), draft.items_price).discount;

    let expected = draft.recomputed();
    if expected.items_price != draft.items_price || expected.total_price != draft.total_price - discount {
        tracing::warn!(
            submitted_items = %draft.items_price,
            submitted_total = %draft.total_price,
            computed_items = %expected.items_price,
            computed_total = %expected.total_price,
            "submitted order totals differ from item prices"
        );
    }

    let mut order = Order::place(user_id, draft, discount)?;
    store.insert_order(&order).await?;

    let mut published = order.take_events();
    for item in &order.items {
        let delta = -item.quantity.to_i32();
        if store.adjust_stock(item.product, delta).await? {
            published.push(DomainEvent::Product(ProductEvent::StockAdjusted { product_id: item.product, delta }));
        } else {
            tracing::debug!(product_id = %item.product, "ordered product no longer exists");
        }
    }

    store.clear_cart(user_id).await?;
    events.publish_all(published).await;

    tracing::info!(order_id = %order.id, total = %order.total_price, "order placed");
    Ok(order)
}

pub async fn my_orders(store: &dyn Store, user_id: Uuid) -> Result<Vec<Order>> {
    Ok(store.orders_for_user(user_id).await?)
}

async fn load_visible(store: &dyn Store, viewer: &User, order_id: Uuid) -> Result<Order> {
    let order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))?;
    if !order.belongs_to(viewer.id) && !viewer.is_admin() {
        return Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()));
    }
    Ok(order)
}

/// An order with its customer, visible to its owner and to admins.
pub async fn get_order(store: &dyn Store, viewer: &User, order_id: Uuid) -> Result<OrderWithCustomer> {
    let order = load_visible(store, viewer, order_id).await?;
    let user = store.find_user(order.user_id).await?.as_ref().map(Customer::from);
    Ok(OrderWithCustomer { order, user })
}

#[instrument(skip(store, events, viewer, update), fields(viewer = %viewer.id))]
pub async fn pay_order(
    store: &dyn Store,
    events: &EventPublisher,
    viewer: &User,
    order_id: Uuid,
    update: PaymentUpdate,
) -> Result<Order> {
    let mut order = load_visible(store, viewer, order_id).await?;
    order.mark_paid(update.into());
    store.save_order(&order).await?;
    events.publish_all(order.take_events()).await;
    Ok(order)
}

#[instrument(skip(store, events))]
pub async fn update_status(store: &dyn Store, events: &EventPublisher, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    let mut order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))?;
    order.set_status(status);
    store.save_order(&order).await?;
    events.publish_all(order.take_events()).await;
    Ok(order)
}

pub async fn all_orders(store: &dyn Store) -> Result<Vec<OrderWithCustomer>> {
    Ok(store.all_orders().await?)
}

/// Check a coupon code against `items_price`. `Err` carries the response
/// body for an unknown code.
pub fn validate_coupon(req: &CouponRequest) -> std::result::Result<CouponCheck, CouponCheck> {
    let outcome = apply_coupon(Some(req.code.as_str()), req.items_price);
    if outcome.valid {
        Ok(CouponCheck {
            valid: true,
            discount: outcome.discount,
            message: format!("Coupon applied! You saved ₹{}", outcome.discount.normalize()),
        })
    } else {
        Err(CouponCheck { valid: false, discount: Decimal::ZERO, message: INVALID_COUPON.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::aggregates::{CartItem, Category, NewProduct, OrderItem, Product, Role};
    use crate::domain::value_objects::Quantity;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    async fn setup() -> (MemoryStore, Product, User) {
        let store = MemoryStore::new();
        let product = Product::create(NewProduct {
            name: "Sneaker".into(), description: "running shoe".into(), price: dec(500), original_price: None,
            category: Category::Sports, subcategory: String::new(), brand: String::new(), images: vec![],
            colors: vec![], sizes: vec![], stock: 10, featured: false, trending: false, tags: vec![],
        });
        store.insert_product(&product).await.unwrap();
        let user = User::create("Sam", "sam@example.com", Role::User);
        store.insert_user(&user).await.unwrap();
        (store, product, user)
    }

    fn draft(product: &Product, coupon: Option<&str>) -> OrderDraft {
        OrderDraft {
            items: vec![OrderItem {
                product: product.id, name: product.name.clone(), image: None, quantity: Quantity::new(2).unwrap(),
                price: product.price, color: None, size: None,
            }],
            payment_method: "card".into(),
            items_price: dec(1000),
            tax_price: dec(180),
            shipping_price: dec(0),
            total_price: dec(1180),
            coupon_code: coupon.map(str::to_owned),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock_and_clears_cart() {
        let (store, product, user) = setup().await;
        store.add_cart_item(user.id, &CartItem::new(product.id, Quantity::ONE, None, None)).await.unwrap();

        let order = place_order(&store, &EventPublisher::default(), user.id, draft(&product, Some("WELCOME10")))
            .await
            .unwrap();
        assert_eq!(order.discount, dec(100));
        assert_eq!(order.total_price, dec(1080));
        assert_eq!(store.find_product(product.id).await.unwrap().unwrap().stock, 8);
        assert!(store.load_cart(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_order_touches_nothing() {
        let (store, product, user) = setup().await;
        let empty = OrderDraft { items: vec![], ..draft(&product, None) };
        let err = place_order(&store, &EventPublisher::default(), user.id, empty).await.unwrap_err();
        assert_eq!(err.to_string(), "No order items");
        assert!(store.orders_for_user(user.id).await.unwrap().is_empty());
        assert_eq!(store.find_product(product.id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_visibility() {
        let (store, product, owner) = setup().await;
        let events = EventPublisher::default();
        let order = place_order(&store, &events, owner.id, draft(&product, None)).await.unwrap();

        let stranger = User::create("Eve", "eve@example.com", Role::User);
        let err = get_order(&store, &stranger, order.id).await.unwrap_err();
        assert_eq!(err.to_string(), NOT_AUTHORIZED);

        let admin = User::create("Root", "root@example.com", Role::Admin);
        let seen = get_order(&store, &admin, order.id).await.unwrap();
        assert_eq!(seen.user.unwrap().email, "sam@example.com");

        let err = get_order(&store, &owner, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pay_keeps_status() {
        let (store, product, owner) = setup().await;
        let events = EventPublisher::default();
        let order = place_order(&store, &events, owner.id, draft(&product, None)).await.unwrap();
        let update = PaymentUpdate {
            id: Some("pi_1".into()),
            status: Some("succeeded".into()),
            update_time: None,
            payer: Some(Payer { email_address: Some("sam@example.com".into()) }),
        };
        let paid = pay_order(&store, &events, &owner, order.id, update).await.unwrap();
        assert!(paid.is_paid);
        assert_eq!(paid.status, OrderStatus::Created);
        assert_eq!(paid.payment_result.unwrap().email_address.as_deref(), Some("sam@example.com"));

        let delivered = update_status(&store, &events, order.id, OrderStatus::Delivered).await.unwrap();
        assert!(delivered.is_delivered);
    }

    #[test]
    fn test_validate_coupon() {
        let ok = validate_coupon(&CouponRequest { code: "WELCOME10".into(), items_price: dec(1000) }).unwrap();
        assert_eq!(ok.discount, dec(100));
        assert_eq!(ok.message, "Coupon applied! You saved ₹100");

        let flat = validate_coupon(&CouponRequest { code: "FLAT100".into(), items_price: dec(5) }).unwrap();
        assert_eq!(flat.discount, dec(100));

        let bad = validate_coupon(&CouponRequest { code: "welcome10".into(), items_price: dec(1000) }).unwrap_err();
        assert!(!bad.valid);
        assert_eq!(bad.message, INVALID_COUPON);
    }
}
