//! Client-side state mirrors.
//!
//! Each slice owns the last data the API returned plus `loading`/`error`
//! flags. Async methods call the API through [`ShopClient`] and settle the
//! result into the slice; plain methods are local updates.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use uuid::Uuid;

use super::{ClientError, ShopClient};
use crate::domain::aggregates::{OrderDraft, OrderItem, Product, ProductFilter, ShippingAddress, User};
use crate::domain::pricing::{PriceBreakdown, PriceLine};
use crate::domain::value_objects::Quantity;
use crate::services::cart::{AddToCart, CartLineView};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartState {
    pub items: Vec<CartLineView>,
    pub loading: bool,
    pub error: Option<String>,
    pub coupon: Option<String>,
    pub discount: Decimal,
}

impl CartState {
    pub async fn fetch(&mut self, client: &ShopClient) {
        self.loading = true;
        let result = client.cart().await;
        self.loading = false;
        self.settle(result);
    }

    pub async fn add(&mut self, client: &ShopClient, item: AddToCart) {
        let result = client.add_to_cart(&item).await;
        self.settle(result);
    }

    pub async fn update(&mut self, client: &ShopClient, item_id: Uuid, quantity: Quantity) {
        let result = client.update_cart_item(item_id, quantity).await;
        self.settle(result);
    }

    pub async fn remove(&mut self, client: &ShopClient, item_id: Uuid) {
        let result = client.remove_from_cart(item_id).await;
        self.settle(result);
    }

    pub async fn clear(&mut self, client: &ShopClient) {
        match client.clear_cart().await {
            Ok(()) => self.items.clear(),
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Check `code` with the API and keep it if valid. Returns the API's message.
    pub async fn redeem_coupon(&mut self, client: &ShopClient, code: &str) -> Result<String, ClientError> {
        let check = client.validate_coupon(code, self.summary().items_price).await?;
        if check.valid {
            self.apply_coupon(code, check.discount);
        }
        Ok(check.message)
    }

    pub fn apply_coupon(&mut self, code: impl Into<String>, discount: Decimal) {
        self.coupon = Some(code.into());
        self.discount = discount;
    }

    pub fn remove_coupon(&mut self) {
        self.coupon = None;
        self.discount = Decimal::ZERO;
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity.value()).sum()
    }

    /// Totals for the lines whose product still exists, less the applied discount.
    pub fn summary(&self) -> PriceBreakdown {
        let lines: Vec<PriceLine> = self
            .items
            .iter()
            .filter_map(|line| line.product.as_ref().map(|p| PriceLine::new(p.price, line.quantity.value())))
            .collect();
        let mut breakdown = PriceBreakdown::with_discount(&lines, self.discount);
        breakdown.coupon_valid = self.coupon.is_some();
        breakdown.coupon_code = self.coupon.clone();
        breakdown
    }

    /// Checkout payload for the current cart. `totalPrice` excludes the
    /// coupon discount; the server subtracts it when the order is placed.
    pub fn order_draft(&self, shipping_address: ShippingAddress, payment_method: impl Into<String>) -> OrderDraft {
        let items = self
            .items
            .iter()
            .filter_map(|line| {
                line.product.as_ref().map(|p| OrderItem {
                    product: line.product_id,
                    name: p.name.clone(),
                    image: p.image.clone(),
                    quantity: line.quantity,
                    price: p.price,
                    color: line.color.clone(),
                    size: line.size.clone(),
                })
            })
            .collect();
        let totals = self.summary();
        OrderDraft {
            items,
            shipping_address,
            payment_method: payment_method.into(),
            items_price: totals.items_price,
            tax_price: totals.tax_price,
            shipping_price: totals.shipping_price,
            total_price: totals.items_price + totals.tax_price + totals.shipping_price,
            coupon_code: self.coupon.clone(),
        }
    }

    fn settle(&mut self, result: Result<Vec<CartLineView>, ClientError>) {
        match result {
            Ok(items) => {
                self.items = items;
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, pages: 1, total: 0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductState {
    pub products: Vec<Product>,
    pub trending: Vec<Product>,
    /// Detail view of the selected product, reviews populated.
    pub selected: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
    pub pagination: Pagination,
    pub filters: ProductFilter,
}

impl ProductState {
    /// Load the page described by the current filters.
    pub async fn fetch_products(&mut self, client: &ShopClient) {
        self.loading = true;
        self.error = None;
        let result = client.products(&self.filters).await;
        self.loading = false;
        match result {
            Ok(page) => {
                self.pagination = Pagination { page: page.page, pages: page.pages, total: page.total };
                self.products = page.products;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub async fn fetch_product(&mut self, client: &ShopClient, id: Uuid) {
        self.loading = true;
        self.error = None;
        let result = client.product(id).await;
        self.loading = false;
        match result {
            Ok(product) => self.selected = Some(product),
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub async fn fetch_trending(&mut self, client: &ShopClient) {
        match client.trending_products().await {
            Ok(products) => self.trending = products,
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Overlay the fields set in `patch` on the current filters.
    pub fn set_filters(&mut self, patch: ProductFilter) {
        let f = &mut self.filters;
        f.category = patch.category.or(f.category);
        f.subcategory = patch.subcategory.or(f.subcategory.take());
        f.min_price = patch.min_price.or(f.min_price);
        f.max_price = patch.max_price.or(f.max_price);
        f.rating = patch.rating.or(f.rating);
        f.sort = patch.sort.or(f.sort);
        f.search = patch.search.or(f.search.take());
        f.page = patch.page.or(f.page);
        f.limit = patch.limit.or(f.limit);
    }

    pub fn clear_filters(&mut self) {
        self.filters = ProductFilter::default();
    }

    pub fn clear_selected(&mut self) {
        self.selected = None;
    }
}

/// Session state. Token issuance happens outside this API; the token is
/// handed in and attached to the client.
#[derive(Clone, Debug, Default)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<SecretString>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    pub fn sign_in(&mut self, client: &mut ShopClient, token: SecretString, user: Option<User>) {
        client.set_token(Some(token.clone()));
        self.token = Some(token);
        self.user = user;
        self.error = None;
    }

    /// Load the signed-in user for the current token.
    pub async fn fetch_me(&mut self, client: &ShopClient) {
        self.loading = true;
        self.error = None;
        let result = client.me().await;
        self.loading = false;
        match result {
            Ok(user) => self.user = Some(user),
            Err(e) => {
                self.user = None;
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn logout(&mut self, client: &mut ShopClient) {
        client.set_token(None);
        self.user = None;
        self.token = None;
        self.error = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{ProductSort, ProductSummary, Role};

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn line(price: i64, quantity: u32) -> CartLineView {
        let product_id = Uuid::new_v4();
        CartLineView {
            id: Uuid::new_v4(),
            product_id,
            product: Some(ProductSummary {
                id: product_id,
                name: "Lamp".into(),
                price: dec(price),
                image: Some("lamp.jpg".into()),
                stock: 5,
                colors: vec![],
                sizes: vec![],
            }),
            quantity: Quantity::new(quantity).unwrap(),
            color: Some("red".into()),
            size: None,
        }
    }

    #[test]
    fn test_summary_applies_discount() {
        let mut cart = CartState { items: vec![line(400, 2), line(100, 1)], ..Default::default() };
        let totals = cart.summary();
        assert_eq!(totals.items_price, dec(900));
        assert_eq!(totals.shipping_price, dec(50));
        assert_eq!(totals.total_price, dec(900) + dec(162) + dec(50));
        assert_eq!(cart.item_count(), 3);

        cart.apply_coupon("FLAT100", dec(100));
        let discounted = cart.summary();
        assert_eq!(discounted.discount, dec(100));
        assert_eq!(discounted.total_price, totals.total_price - dec(100));
        assert_eq!(discounted.coupon_code.as_deref(), Some("FLAT100"));

        cart.remove_coupon();
        assert_eq!(cart.summary(), totals);
    }

    #[test]
    fn test_summary_skips_deleted_products() {
        let mut gone = line(500, 1);
        gone.product = None;
        let cart = CartState { items: vec![line(1000, 1), gone], ..Default::default() };
        assert_eq!(cart.summary().items_price, dec(1000));
    }

    #[test]
    fn test_order_draft_total_excludes_discount() {
        let mut cart = CartState { items: vec![line(1000, 1)], ..Default::default() };
        cart.apply_coupon("WELCOME10", dec(100));
        let draft = cart.order_draft(ShippingAddress::default(), "card");
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].name, "Lamp");
        assert_eq!(draft.items[0].color.as_deref(), Some("red"));
        assert_eq!(draft.items_price, dec(1000));
        assert_eq!(draft.shipping_price, Decimal::ZERO);
        assert_eq!(draft.total_price, dec(1180));
        assert_eq!(draft.coupon_code.as_deref(), Some("WELCOME10"));
    }

    #[test]
    fn test_set_filters_merges() {
        let mut state = ProductState::default();
        state.set_filters(ProductFilter { search: Some("lamp".into()), ..Default::default() });
        state.set_filters(ProductFilter { sort: Some(ProductSort::PriceAsc), ..Default::default() });
        assert_eq!(state.filters.search.as_deref(), Some("lamp"));
        assert_eq!(state.filters.sort, Some(ProductSort::PriceAsc));

        state.clear_filters();
        assert_eq!(state.filters, ProductFilter::default());
        assert_eq!(state.pagination, Pagination { page: 1, pages: 1, total: 0 });
    }

    #[test]
    fn test_logout_drops_token() {
        let mut client = ShopClient::new("http://localhost:5000").unwrap();
        let mut auth = AuthState::default();
        let admin = User::create("Admin", "admin@example.com", Role::Admin);
        auth.sign_in(&mut client, SecretString::from("tok".to_string()), Some(admin));
        assert!(auth.is_authenticated());
        assert!(auth.is_admin());
        assert!(client.has_token());

        auth.logout(&mut client);
        assert!(!auth.is_authenticated());
        assert!(!client.has_token());
        assert!(auth.user.is_none());
    }

    #[tokio::test]
    async fn test_failed_fetches_record_error() {
        // Nothing listens on port 1.
        let client = ShopClient::new("http://127.0.0.1:1").unwrap();

        let mut products = ProductState::default();
        products.fetch_trending(&client).await;
        assert!(products.trending.is_empty());
        assert!(products.error.as_deref().is_some_and(|e| e.starts_with("HTTP error")));

        let mut auth = AuthState::default();
        auth.fetch_me(&client).await;
        assert!(!auth.loading);
        assert!(auth.user.is_none());
        assert!(auth.error.is_some());
    }
}
