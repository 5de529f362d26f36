//! Price breakdown for carts and orders.
//!
//! Subtotal, tax, shipping and coupon discount are composed into a total:
//!
//! ```text
//! total = subtotal + subtotal * 0.18 + (0 if subtotal > 999 else 50) - discount
//! ```
//!
//! Coupons come from a fixed table compiled into the binary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat tax rate applied to every subtotal (18%).
pub const TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Subtotals strictly above this amount ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(999, 0, 0, false, 0);

/// Shipping fee charged at or below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind { Percentage, Fixed }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coupon {
    pub code: &'static str,
    pub kind: DiscountKind,
    pub value: Decimal,
}

static COUPONS: [Coupon; 3] = [
    Coupon { code: "WELCOME10", kind: DiscountKind::Percentage, value: Decimal::from_parts(10, 0, 0, false, 0) },
    Coupon { code: "SAVE20", kind: DiscountKind::Percentage, value: Decimal::from_parts(20, 0, 0, false, 0) },
    Coupon { code: "FLAT100", kind: DiscountKind::Fixed, value: Decimal::from_parts(100, 0, 0, false, 0) },
];

impl Coupon {
    /// Look up a coupon by its exact code. Codes are case-sensitive.
    pub fn lookup(code: &str) -> Option<&'static Coupon> {
        COUPONS.iter().find(|c| c.code == code)
    }

    /// Discount granted on `items_price`. Fixed coupons ignore the amount.
    pub fn discount_on(&self, items_price: Decimal) -> Decimal {
        match self.kind {
            DiscountKind::Percentage => items_price * self.value / Decimal::ONE_HUNDRED,
            DiscountKind::Fixed => self.value,
        }
    }
}

/// Result of applying an optional coupon code to an amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CouponOutcome {
    pub valid: bool,
    pub discount: Decimal,
}

/// Resolve `code` against the coupon table. Unknown or missing codes give no discount.
pub fn apply_coupon(code: Option<&str>, items_price: Decimal) -> CouponOutcome {
    match code.and_then(Coupon::lookup) {
        Some(coupon) => CouponOutcome { valid: true, discount: coupon.discount_on(items_price) },
        None => CouponOutcome { valid: false, discount: Decimal::ZERO },
    }
}

/// A (unit price, quantity) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceLine {
    pub price: Decimal,
    pub quantity: u32,
}

impl PriceLine {
    pub fn new(price: Decimal, quantity: u32) -> Self { Self { price, quantity } }
    pub fn total(&self) -> Decimal { self.price * Decimal::from(self.quantity) }
}

pub fn subtotal(lines: &[PriceLine]) -> Decimal {
    lines.iter().map(PriceLine::total).sum()
}

pub fn tax_for(subtotal: Decimal) -> Decimal { subtotal * TAX_RATE }

pub fn shipping_for(subtotal: Decimal) -> Decimal {
    if subtotal > FREE_SHIPPING_THRESHOLD { Decimal::ZERO } else { FLAT_SHIPPING_FEE }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub discount: Decimal,
    pub total_price: Decimal,
    pub coupon_code: Option<String>,
    pub coupon_valid: bool,
}

impl PriceBreakdown {
    /// Price `lines`, looking the discount up from the coupon table.
    pub fn compute(lines: &[PriceLine], coupon_code: Option<&str>) -> Self {
        let items_price = subtotal(lines);
        let outcome = apply_coupon(coupon_code, items_price);
        let mut breakdown = Self::with_discount(lines, outcome.discount);
        breakdown.coupon_code = coupon_code.map(str::to_owned);
        breakdown.coupon_valid = outcome.valid;
        breakdown
    }

    /// Price `lines` with an already-known discount amount.
    pub fn with_discount(lines: &[PriceLine], discount: Decimal) -> Self {
        let items_price = subtotal(lines);
        let tax_price = tax_for(items_price);
        let shipping_price = shipping_for(items_price);
        Self {
            items_price,
            tax_price,
            shipping_price,
            discount,
            total_price: items_price + tax_price + shipping_price - discount,
            coupon_code: None,
            coupon_valid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal { Decimal::new(n, 0) }

    #[test]
    fn test_shipping_threshold() {
        assert_eq!(shipping_for(dec(900)), dec(50));
        assert_eq!(shipping_for(dec(999)), dec(50));
        assert_eq!(shipping_for(dec(1200)), Decimal::ZERO);
        assert_eq!(shipping_for(Decimal::new(99901, 2)), Decimal::ZERO);
    }

    #[test]
    fn test_tax_is_eighteen_percent() {
        assert_eq!(tax_for(dec(1000)), dec(180));
        assert_eq!(tax_for(Decimal::new(1050, 1)), Decimal::new(1890, 2));
    }

    #[test]
    fn test_coupons() {
        assert_eq!(apply_coupon(Some("WELCOME10"), dec(1000)), CouponOutcome { valid: true, discount: dec(100) });
        assert_eq!(apply_coupon(Some("SAVE20"), dec(500)).discount, dec(100));
        assert_eq!(apply_coupon(Some("FLAT100"), dec(10)).discount, dec(100));
        assert_eq!(apply_coupon(Some("FLAT100"), dec(5000)).discount, dec(100));
        assert_eq!(apply_coupon(Some("welcome10"), dec(1000)), CouponOutcome { valid: false, discount: Decimal::ZERO });
        assert_eq!(apply_coupon(None, dec(1000)).valid, false);
    }

    #[test]
    fn test_fractional_prices_are_not_rounded() {
        let b = PriceBreakdown::compute(&[PriceLine::new(Decimal::new(1999, 2), 1)], None);
        assert_eq!(b.tax_price, Decimal::new(35982, 4));
        assert_eq!(b.total_price, Decimal::new(735882, 4));
    }

    #[test]
    fn test_breakdown_below_threshold() {
        let lines = [PriceLine::new(dec(300), 3)];
        let b = PriceBreakdown::compute(&lines, None);
        assert_eq!(b.items_price, dec(900));
        assert_eq!(b.tax_price, dec(162));
        assert_eq!(b.shipping_price, dec(50));
        assert_eq!(b.total_price, dec(1112));
    }

    #[test]
    fn test_breakdown_with_coupon() {
        let lines = [PriceLine::new(dec(400), 2), PriceLine::new(dec(200), 2)];
        let b = PriceBreakdown::compute(&lines, Some("WELCOME10"));
        assert_eq!(b.items_price, dec(1200));
        assert_eq!(b.shipping_price, Decimal::ZERO);
        assert_eq!(b.discount, dec(120));
        assert_eq!(b.total_price, dec(1200) + dec(216) - dec(120));
        assert!(b.coupon_valid);
        assert_eq!(b.coupon_code.as_deref(), Some("WELCOME10"));
    }

    #[test]
    fn test_unknown_coupon_keeps_code_but_not_discount() {
        let b = PriceBreakdown::compute(&[PriceLine::new(dec(100), 1)], Some("NOPE"));
        assert!(!b.coupon_valid);
        assert_eq!(b.discount, Decimal::ZERO);
        assert_eq!(b.total_price, dec(100) + dec(18) + dec(50));
    }
}
