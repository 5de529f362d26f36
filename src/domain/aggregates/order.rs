//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::{PriceBreakdown, PriceLine};
use crate::domain::value_objects::Quantity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub discount: Decimal,
    pub coupon_code: Option<String>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    pub status: OrderStatus,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

/// Item snapshot copied at order time; later product edits do not affect it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: Uuid,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: Quantity,
    pub price: Decimal,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress { pub street: String, pub city: String, pub state: String, pub zip_code: String, pub country: String, pub phone: String }

/// Provider receipt recorded when an order is marked paid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult { pub id: Option<String>, pub status: Option<String>, pub update_time: Option<String>, pub email_address: Option<String> }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Created, Paid, Processing, Shipped, Delivered }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Checkout payload. Prices are those the client computed and displayed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub items_price: Decimal,
    #[serde(default)]
    pub tax_price: Decimal,
    #[serde(default)]
    pub shipping_price: Decimal,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl OrderDraft {
    pub fn price_lines(&self) -> Vec<PriceLine> {
        self.items.iter().map(|i| PriceLine::new(i.price, i.quantity.value())).collect()
    }

    /// Breakdown recomputed from the item snapshot prices, for comparison
    /// against what the client submitted.
    pub fn recomputed(&self) -> PriceBreakdown {
        PriceBreakdown::compute(&self.price_lines(), self.coupon_code.as_deref())
    }
}

impl Order {
    /// Create an order from a checkout draft. The submitted prices are kept
    /// as-is except that `discount` is taken off the total.
    pub fn place(user_id: Uuid, draft: OrderDraft, discount: Decimal) -> Result<Self, OrderError> {
        if draft.items.is_empty() { return Err(OrderError::NoItems); }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let total_price = draft.total_price - discount;
        let mut order = Self {
            id, user_id, items: draft.items, shipping_address: draft.shipping_address,
            payment_method: draft.payment_method, items_price: draft.items_price, tax_price: draft.tax_price,
            shipping_price: draft.shipping_price, total_price, discount, coupon_code: draft.coupon_code,
            is_paid: false, paid_at: None, payment_result: None, status: OrderStatus::Created,
            is_delivered: false, delivered_at: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, user_id, total: total_price }));
        Ok(order)
    }

    pub fn belongs_to(&self, user_id: Uuid) -> bool { self.user_id == user_id }

    /// Flag as paid. Status is left alone; it moves only through [`Order::set_status`].
    pub fn mark_paid(&mut self, result: PaymentResult) {
        self.is_paid = true;
        self.paid_at = Some(Utc::now());
        self.payment_result = Some(result);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id }));
    }

    /// Any status may be written; there is no transition table.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        if status == OrderStatus::Delivered {
            self.is_delivered = true;
            self.delivered_at = Some(Utc::now());
        }
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::NoItems => write!(f, "No order items") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft {
            items: vec![OrderItem { product: Uuid::new_v4(), name: "Widget".into(), image: None, quantity: Quantity::new(2).unwrap(), price: Decimal::new(500, 0), color: None, size: None }],
            payment_method: "card".into(),
            items_price: Decimal::new(1000, 0),
            tax_price: Decimal::new(180, 0),
            shipping_price: Decimal::new(50, 0),
            total_price: Decimal::new(1230, 0),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place(Uuid::new_v4(), draft(), Decimal::new(100, 0)).unwrap();
        assert_eq!(order.total_price, Decimal::new(1130, 0));
        assert_eq!(order.status, OrderStatus::Created);
        order.mark_paid(PaymentResult { id: Some("pi_1".into()), ..Default::default() });
        assert!(order.is_paid);
        assert_eq!(order.status, OrderStatus::Created);
        order.set_status(OrderStatus::Shipped);
        assert!(!order.is_delivered);
        order.set_status(OrderStatus::Delivered);
        assert!(order.is_delivered);
        assert!(order.delivered_at.is_some());
        assert_eq!(order.take_events().len(), 4);
    }

    #[test]
    fn test_empty_order_rejected() {
        let empty = OrderDraft { items: vec![], ..draft() };
        assert_eq!(Order::place(Uuid::new_v4(), empty, Decimal::ZERO), Err(OrderError::NoItems));
    }

    #[test]
    fn test_recomputed_breakdown() {
        let b = draft().recomputed();
        assert_eq!(b.items_price, Decimal::new(1000, 0));
        assert_eq!(b.shipping_price, Decimal::ZERO);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("delivered".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }
}
