//! Persistence for users, catalog, reviews, carts and orders.
//!
//! Handlers and services talk to the [`Store`] trait. Two implementations
//! exist:
//!
//! - [`PgStore`] - `PostgreSQL` via `sqlx`, schema in `migrations/`
//! - [`MemoryStore`] - in-process maps, for local development and tests
//!
//! Writes touch only the columns they own: stock moves by delta, review
//! stats are recomputed in place, admin edits set just the fields they carry,
//! and cart lines are upserted one at a time. Concurrent writers to the same
//! product or cart therefore do not overwrite each other.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, CartItem, Order, Product, ProductFilter, ProductPage, ProductUpdate, ProfileUpdate, Review,
    ReviewWithAuthor, Role, ShippingAddress, User,
};
use crate::domain::value_objects::Quantity;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back into the domain.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// An order together with the name and email of the customer who placed it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderWithCustomer {
    #[serde(flatten)]
    pub order: Order,
    pub user: Option<Customer>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for Customer {
    fn from(u: &User) -> Self {
        Self { id: u.id, name: u.name.clone(), email: u.email.clone() }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // Users and tokens
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_token(&self, token_digest: &str) -> RepoResult<Option<User>>;
    async fn insert_user(&self, user: &User) -> RepoResult<()>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<()>;
    async fn insert_token(&self, user_id: Uuid, token_digest: &str) -> RepoResult<()>;
    /// Every user, newest first.
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    /// Fails with [`RepositoryError::Conflict`] if the new email belongs to
    /// another user.
    async fn update_user_profile(&self, id: Uuid, update: &ProfileUpdate) -> RepoResult<Option<User>>;
    async fn add_user_address(&self, id: Uuid, address: &ShippingAddress) -> RepoResult<Option<User>>;
    /// Listing a product twice leaves the wishlist unchanged.
    async fn add_to_wishlist(&self, id: Uuid, product_id: Uuid) -> RepoResult<Option<User>>;
    async fn remove_from_wishlist(&self, id: Uuid, product_id: Uuid) -> RepoResult<Option<User>>;

    // Catalog
    async fn list_products(&self, filter: &ProductFilter) -> RepoResult<ProductPage>;
    async fn trending_products(&self, limit: u32) -> RepoResult<Vec<Product>>;
    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>>;
    async fn find_products(&self, ids: &[Uuid]) -> RepoResult<Vec<Product>>;
    async fn insert_product(&self, product: &Product) -> RepoResult<()>;
    /// Write only the fields set in `update`. Returns `None` if the product is gone.
    async fn update_product(&self, id: Uuid, update: &ProductUpdate) -> RepoResult<Option<Product>>;
    /// Recompute `rating` and `num_reviews` from the product's reviews,
    /// leaving every other column alone.
    async fn refresh_review_stats(&self, product_id: Uuid) -> RepoResult<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> RepoResult<bool>;
    /// Add `delta` to a product's stock. Returns false if the product is gone.
    /// No floor is applied.
    async fn adjust_stock(&self, id: Uuid, delta: i32) -> RepoResult<bool>;

    // Reviews
    async fn find_review(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<Option<Review>>;
    /// Fails with [`RepositoryError::Conflict`] if the user already reviewed the product.
    async fn insert_review(&self, review: &Review) -> RepoResult<()>;
    async fn reviews_with_authors(&self, product_id: Uuid) -> RepoResult<Vec<ReviewWithAuthor>>;

    // Carts
    async fn load_cart(&self, user_id: Uuid) -> RepoResult<Cart>;
    /// Upsert one line. A line with the same product, color and size has its
    /// quantity incremented atomically instead of being duplicated.
    async fn add_cart_item(&self, user_id: Uuid, item: &CartItem) -> RepoResult<()>;
    /// Returns false if the user has no line with `item_id`.
    async fn set_cart_item_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: Quantity) -> RepoResult<bool>;
    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<bool>;
    async fn clear_cart(&self, user_id: Uuid) -> RepoResult<()>;

    // Orders
    async fn insert_order(&self, order: &Order) -> RepoResult<()>;
    async fn save_order(&self, order: &Order) -> RepoResult<()>;
    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>>;
    /// A user's orders, newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Order>>;
    /// Every order with its customer, newest first.
    async fn all_orders(&self) -> RepoResult<Vec<OrderWithCustomer>>;

    /// Cheap connectivity check for the readiness route.
    async fn ping(&self) -> RepoResult<()>;
}
