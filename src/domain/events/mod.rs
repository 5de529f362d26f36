//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Order(OrderEvent),
    Product(ProductEvent),
    Payment(PaymentEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Decimal },
    Paid { order_id: Uuid },
    StatusChanged { order_id: Uuid, status: OrderStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    ReviewAdded { product_id: Uuid, review_id: Uuid, rating: f64, num_reviews: i32 },
    StockAdjusted { product_id: Uuid, delta: i32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaymentEvent {
    IntentSucceeded { payment_intent_id: String },
    IntentFailed { payment_intent_id: String },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "shophub.order.placed",
            Self::Order(OrderEvent::Paid { .. }) => "shophub.order.paid",
            Self::Order(OrderEvent::StatusChanged { .. }) => "shophub.order.status_changed",
            Self::Product(ProductEvent::ReviewAdded { .. }) => "shophub.product.review_added",
            Self::Product(ProductEvent::StockAdjusted { .. }) => "shophub.product.stock_adjusted",
            Self::Payment(PaymentEvent::IntentSucceeded { .. }) => "shophub.payment.succeeded",
            Self::Payment(PaymentEvent::IntentFailed { .. }) => "shophub.payment.failed",
        }
    }
}
