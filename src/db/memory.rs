//! In-process store backed by `tokio` locks.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Customer, OrderWithCustomer, RepoResult, RepositoryError, Store};
use crate::domain::aggregates::{
    Cart, CartItem, Order, Product, ProductFilter, ProductPage, ProductSort, ProductUpdate, ProfileUpdate,
    Review, ReviewAuthor, ReviewStats, ReviewWithAuthor, Role, ShippingAddress, User,
};
use crate::domain::value_objects::Quantity;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, Uuid>,
    products: HashMap<Uuid, Product>,
    reviews: Vec<Review>,
    carts: HashMap<Uuid, Cart>,
    orders: Vec<Order>,
}

/// Store that keeps everything in memory. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.inner.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_token(&self, token_digest: &str) -> RepoResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tokens
            .get(token_digest)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> RepoResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<()> {
        if let Some(user) = self.inner.write().await.users.get_mut(&id) {
            user.role = role;
        }
        Ok(())
    }

    async fn insert_token(&self, user_id: Uuid, token_digest: &str) -> RepoResult<()> {
        self.inner
            .write()
            .await
            .tokens
            .insert(token_digest.to_owned(), user_id);
        Ok(())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn update_user_profile(&self, id: Uuid, update: &ProfileUpdate) -> RepoResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if let Some(email) = &update.email {
            if inner.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepositoryError::Conflict("email already exists".to_owned()));
            }
        }
        Ok(inner.users.get_mut(&id).map(|user| {
            user.apply_profile(update.clone());
            user.clone()
        }))
    }

    async fn add_user_address(&self, id: Uuid, address: &ShippingAddress) -> RepoResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.add_address(address.clone());
            user.clone()
        }))
    }

    async fn add_to_wishlist(&self, id: Uuid, product_id: Uuid) -> RepoResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.add_to_wishlist(product_id);
            user.clone()
        }))
    }

    async fn remove_from_wishlist(&self, id: Uuid, product_id: Uuid) -> RepoResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.remove_from_wishlist(product_id);
            user.clone()
        }))
    }

    async fn list_products(&self, filter: &ProductFilter) -> RepoResult<ProductPage> {
        let inner = self.inner.read().await;
        let mut matching: Vec<&Product> =
            inner.products.values().filter(|p| filter.matches(p)).collect();
        let sort = filter.sort();
        matching.sort_by(|a, b| sort.compare(a, b));

        let total = matching.len() as u64;
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let products = matching
            .into_iter()
            .skip(offset)
            .take(filter.limit() as usize)
            .cloned()
            .collect();
        Ok(ProductPage::new(products, filter, total))
    }

    async fn trending_products(&self, limit: u32) -> RepoResult<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut trending: Vec<Product> =
            inner.products.values().filter(|p| p.trending).cloned().collect();
        trending.sort_by(|a, b| ProductSort::Newest.compare(a, b));
        trending.truncate(limit as usize);
        Ok(trending)
    }

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[Uuid]) -> RepoResult<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| inner.products.get(id)).cloned().collect())
    }

    async fn insert_product(&self, product: &Product) -> RepoResult<()> {
        self.inner
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, id: Uuid, update: &ProductUpdate) -> RepoResult<Option<Product>> {
        let mut inner = self.inner.write().await;
        Ok(inner.products.get_mut(&id).map(|product| {
            product.apply_update(update.clone());
            product.clone()
        }))
    }

    async fn refresh_review_stats(&self, product_id: Uuid) -> RepoResult<Option<Product>> {
        let mut inner = self.inner.write().await;
        let reviews: Vec<&Review> = inner.reviews.iter().filter(|r| r.product_id == product_id).collect();
        let ids = reviews.iter().map(|r| r.id).collect();
        let stats = ReviewStats::from_ratings(reviews.iter().map(|r| r.rating));
        Ok(inner.products.get_mut(&product_id).map(|product| {
            product.set_review_stats(ids, stats);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.inner.write().await.products.remove(&id).is_some())
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(false);
        };
        product.stock = product.stock.saturating_add(delta);
        product.updated_at = chrono::Utc::now();
        Ok(true)
    }

    async fn find_review(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<Option<Review>> {
        Ok(self
            .inner
            .read()
            .await
            .reviews
            .iter()
            .find(|r| r.user_id == user_id && r.product_id == product_id)
            .cloned())
    }

    async fn insert_review(&self, review: &Review) -> RepoResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .reviews
            .iter()
            .any(|r| r.user_id == review.user_id && r.product_id == review.product_id)
        {
            return Err(RepositoryError::Conflict("review already exists".to_owned()));
        }
        inner.reviews.push(review.clone());
        Ok(())
    }

    async fn reviews_with_authors(&self, product_id: Uuid) -> RepoResult<Vec<ReviewWithAuthor>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .map(|r| ReviewWithAuthor {
                review: r.clone(),
                user: ReviewAuthor {
                    id: r.user_id,
                    name: inner
                        .users
                        .get(&r.user_id)
                        .map(|u| u.name.clone())
                        .unwrap_or_default(),
                },
            })
            .collect())
    }

    async fn load_cart(&self, user_id: Uuid) -> RepoResult<Cart> {
        Ok(self
            .inner
            .read()
            .await
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_cart_item(&self, user_id: Uuid, item: &CartItem) -> RepoResult<()> {
        self.inner.write().await.carts.entry(user_id).or_default().add_item(item.clone());
        Ok(())
    }

    async fn set_cart_item_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: Quantity) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .carts
            .get_mut(&user_id)
            .is_some_and(|cart| cart.update_quantity(item_id, quantity).is_ok()))
    }

    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.carts.get_mut(&user_id).is_some_and(|cart| cart.remove_item(item_id)))
    }

    async fn clear_cart(&self, user_id: Uuid) -> RepoResult<()> {
        self.inner.write().await.carts.remove(&user_id);
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        self.inner.write().await.orders.push(order.clone());
        Ok(())
    }

    async fn save_order(&self, order: &Order) -> RepoResult<()> {
        let mut inner = self.inner.write().await;
        match inner.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order.clone(),
            None => inner.orders.push(order.clone()),
        }
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.inner.read().await.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .inner
            .read()
            .await
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn all_orders(&self) -> RepoResult<Vec<OrderWithCustomer>> {
        let inner = self.inner.read().await;
        let mut orders = inner.orders.clone();
        newest_first(&mut orders);
        Ok(orders
            .into_iter()
            .map(|order| {
                let user = inner.users.get(&order.user_id).map(Customer::from);
                OrderWithCustomer { order, user }
            })
            .collect())
    }

    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Category, NewProduct};
    use rust_decimal::Decimal;

    fn product(name: &str, price: i64, trending: bool) -> Product {
        Product::create(NewProduct {
            name: name.into(), description: "d".into(), price: Decimal::new(price, 0), original_price: None,
            category: Category::Books, subcategory: String::new(), brand: String::new(), images: vec![],
            colors: vec![], sizes: vec![], stock: 3, featured: false, trending, tags: vec![],
        })
    }

    #[tokio::test]
    async fn test_list_products_sorts_and_pages() {
        let store = MemoryStore::new();
        for (name, price) in [("a", 30), ("b", 10), ("c", 20)] {
            store.insert_product(&product(name, price, false)).await.unwrap();
        }
        let filter = ProductFilter { sort: Some(ProductSort::PriceAsc), limit: Some(2), ..Default::default() };
        let page = store.list_products(&filter).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_review_conflicts() {
        let store = MemoryStore::new();
        let p = product("a", 1, false);
        let input = || crate::domain::aggregates::NewReview { rating: crate::domain::value_objects::Rating::new(4).unwrap(), comment: "ok".into(), images: vec![] };
        let user = Uuid::new_v4();
        store.insert_review(&Review::create(user, p.id, input())).await.unwrap();
        let err = store.insert_review(&Review::create(user, p.id, input())).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_adjust_stock_missing_product() {
        let store = MemoryStore::new();
        assert!(!store.adjust_stock(Uuid::new_v4(), -1).await.unwrap());
        let p = product("a", 1, true);
        store.insert_product(&p).await.unwrap();
        assert!(store.adjust_stock(p.id, -5).await.unwrap());
        assert_eq!(store.find_product(p.id).await.unwrap().unwrap().stock, -2);
        assert_eq!(store.trending_products(8).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_cart_adds_merge() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let product = Uuid::new_v4();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let item = CartItem::new(product, Quantity::ONE, Some("red".into()), None);
                    store.add_cart_item(user, &item).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let cart = store.load_cart(user).await.unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 8);

        let id = cart.items()[0].id;
        assert!(!store.set_cart_item_quantity(Uuid::new_v4(), id, Quantity::ONE).await.unwrap());
        assert!(store.remove_cart_item(user, id).await.unwrap());
        assert!(store.load_cart(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_narrow_product_writes_keep_concurrent_stock() {
        let store = MemoryStore::new();
        let p = product("lamp", 40, false);
        store.insert_product(&p).await.unwrap();
        let stale = store.find_product(p.id).await.unwrap().unwrap();

        // A two-unit checkout lands after the copy above was read.
        assert!(store.adjust_stock(p.id, -2).await.unwrap());

        let input = crate::domain::aggregates::NewReview {
            rating: crate::domain::value_objects::Rating::new(5).unwrap(),
            comment: "bright".into(),
            images: vec![],
        };
        store.insert_review(&Review::create(Uuid::new_v4(), p.id, input)).await.unwrap();
        let reviewed = store.refresh_review_stats(p.id).await.unwrap().unwrap();
        assert_eq!(reviewed.stock, stale.stock - 2);
        assert_eq!(reviewed.num_reviews, 1);
        assert!((reviewed.rating - 5.0).abs() < f64::EPSILON);

        let update = ProductUpdate { name: Some(" Desk lamp ".into()), ..Default::default() };
        let updated = store.update_product(p.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.name, "Desk lamp");
        assert_eq!(updated.stock, 1);
        assert_eq!(updated.num_reviews, 1);
        assert!(store.update_product(Uuid::new_v4(), &update).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_price_ties_list_newest_first() {
        let store = MemoryStore::new();
        let older = product("older", 10, false);
        let mut newer = product("newer", 10, false);
        newer.created_at = older.created_at + chrono::Duration::seconds(1);
        store.insert_product(&older).await.unwrap();
        store.insert_product(&newer).await.unwrap();
        for sort in [ProductSort::PriceAsc, ProductSort::PriceDesc, ProductSort::Rating] {
            let filter = ProductFilter { sort: Some(sort), ..Default::default() };
            let page = store.list_products(&filter).await.unwrap();
            let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, ["newer", "older"]);
        }
    }
}
