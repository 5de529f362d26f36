//! `PostgreSQL` store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Customer, OrderWithCustomer, RepoResult, RepositoryError, Store};
use crate::domain::aggregates::{
    Cart, CartItem, Order, OrderItem, PaymentResult, Product, ProductFilter, ProductImage, ProductPage,
    ProductSort, ProductUpdate, ProfileUpdate, Review, ReviewAuthor, ReviewWithAuthor, Role, ShippingAddress, User,
};
use crate::domain::value_objects::{Quantity, Rating};

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.role, u.phone, u.addresses, u.wishlist, u.created_at";

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.original_price, p.category, \
     p.subcategory, p.brand, p.images, p.colors, p.sizes, p.stock, p.rating, p.num_reviews, \
     p.featured, p.trending, p.tags, p.created_at, p.updated_at, \
     ARRAY(SELECT r.id FROM reviews r WHERE r.product_id = p.id ORDER BY r.created_at) AS review_ids";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn conflict_or(err: sqlx::Error, what: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(format!("{what} already exists"))
        }
        _ => RepositoryError::Database(err),
    }
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::DataCorruption(format!("{what}: {e}"))
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    phone: String,
    addresses: Json<Vec<ShippingAddress>>,
    wishlist: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;
    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id,
            name: r.name,
            email: r.email,
            role: r.role.parse().map_err(|e| corrupt("users.role", e))?,
            phone: r.phone,
            addresses: r.addresses.0,
            wishlist: r.wishlist,
            created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    original_price: Decimal,
    category: String,
    subcategory: String,
    brand: String,
    images: Json<Vec<ProductImage>>,
    colors: Vec<String>,
    sizes: Vec<String>,
    stock: i32,
    rating: f64,
    num_reviews: i32,
    featured: bool,
    trending: bool,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    review_ids: Vec<Uuid>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;
    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            original_price: r.original_price,
            category: r.category.parse().map_err(|e| corrupt("products.category", e))?,
            subcategory: r.subcategory,
            brand: r.brand,
            images: r.images.0,
            colors: r.colors,
            sizes: r.sizes,
            stock: r.stock,
            rating: r.rating,
            num_reviews: r.num_reviews,
            reviews: r.review_ids,
            featured: r.featured,
            trending: r.trending,
            tags: r.tags,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    rating: i16,
    comment: String,
    images: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;
    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            id: r.id,
            user_id: r.user_id,
            product_id: r.product_id,
            rating: Rating::try_from(i64::from(r.rating)).map_err(|e| corrupt("reviews.rating", e))?,
            comment: r.comment,
            images: r.images,
            created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct ReviewAuthorRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    author_name: Option<String>,
}

#[derive(FromRow)]
struct CartItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
    color: Option<String>,
    size: Option<String>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;
    fn try_from(r: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(i64::from(r.quantity)).map_err(|e| corrupt("cart_items.quantity", e))?;
        Ok(CartItem { id: r.id, product_id: r.product_id, quantity, color: r.color, size: r.size })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    discount: Decimal,
    coupon_code: Option<String>,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_result: Option<Json<PaymentResult>>,
    status: String,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: r.id,
            user_id: r.user_id,
            items: r.items.0,
            shipping_address: r.shipping_address.0,
            payment_method: r.payment_method,
            items_price: r.items_price,
            tax_price: r.tax_price,
            shipping_price: r.shipping_price,
            total_price: r.total_price,
            discount: r.discount,
            coupon_code: r.coupon_code,
            is_paid: r.is_paid,
            paid_at: r.paid_at,
            payment_result: r.payment_result.map(|j| j.0),
            status: r.status.parse().map_err(|e| corrupt("orders.status", e))?,
            is_delivered: r.is_delivered,
            delivered_at: r.delivered_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
            events: Vec::new(),
        })
    }
}

#[derive(FromRow)]
struct OrderCustomerRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: Option<String>,
    customer_email: Option<String>,
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = filter.category {
        qb.push(" AND p.category = ").push_bind(category.as_str());
    }
    if let Some(sub) = filter.subcategory.clone().filter(|s| !s.is_empty()) {
        qb.push(" AND p.subcategory = ").push_bind(sub);
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(rating) = filter.rating {
        qb.push(" AND p.rating >= ").push_bind(rating);
    }
    if let Some(term) = filter.search_term() {
        let pattern = format!("%{term}%");
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(p.tags) t WHERE t ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

fn order_clause(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::PriceAsc => " ORDER BY p.price ASC, p.created_at DESC, p.id DESC",
        ProductSort::PriceDesc => " ORDER BY p.price DESC, p.created_at DESC, p.id DESC",
        ProductSort::Rating => " ORDER BY p.rating DESC, p.created_at DESC, p.id DESC",
        ProductSort::Newest => " ORDER BY p.created_at DESC, p.id DESC",
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_token(&self, token_digest: &str) -> RepoResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN user_tokens t ON t.user_id = u.id WHERE t.token_digest = $1"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(token_digest)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert_user(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, phone, addresses, wishlist, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(Json(&user.addresses))
        .bind(&user.wishlist)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "email"))?;
        Ok(())
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<()> {
        sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_token(&self, user_id: Uuid, token_digest: &str) -> RepoResult<()> {
        sqlx::query("INSERT INTO user_tokens (token_digest, user_id) VALUES ($1, $2)")
            .bind(token_digest)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "token"))?;
        Ok(())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.created_at DESC, u.id DESC");
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update_user_profile(&self, id: Uuid, update: &ProfileUpdate) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users AS u SET name = COALESCE($2, u.name), email = COALESCE($3, u.email), \
             phone = COALESCE($4, u.phone) WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.email.as_deref())
            .bind(update.phone.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "email"))?
            .map(User::try_from)
            .transpose()
    }

    async fn add_user_address(&self, id: Uuid, address: &ShippingAddress) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users AS u SET addresses = u.addresses || jsonb_build_array($2::JSONB) \
             WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(Json(address))
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn add_to_wishlist(&self, id: Uuid, product_id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users AS u SET wishlist = CASE WHEN $2 = ANY(u.wishlist) THEN u.wishlist \
             ELSE array_append(u.wishlist, $2) END WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn remove_from_wishlist(&self, id: Uuid, product_id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users AS u SET wishlist = array_remove(u.wishlist, $2) WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> RepoResult<ProductPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_product_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        push_product_filters(&mut qb, filter);
        qb.push(order_clause(filter.sort()));
        qb.push(" LIMIT ").push_bind(i64::from(filter.limit()));
        qb.push(" OFFSET ").push_bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX));
        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let products = rows.into_iter().map(Product::try_from).collect::<RepoResult<Vec<_>>>()?;
        Ok(ProductPage::new(products, filter, u64::try_from(total).unwrap_or(0)))
    }

    async fn trending_products(&self, limit: u32) -> RepoResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.trending ORDER BY p.created_at DESC, p.id DESC LIMIT $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn find_products(&self, ids: &[Uuid]) -> RepoResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn insert_product(&self, p: &Product) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, original_price, category, subcategory, brand, \
             images, colors, sizes, stock, rating, num_reviews, featured, trending, tags, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.description)
        .bind(p.price)
        .bind(p.original_price)
        .bind(p.category.as_str())
        .bind(&p.subcategory)
        .bind(&p.brand)
        .bind(Json(&p.images))
        .bind(&p.colors)
        .bind(&p.sizes)
        .bind(p.stock)
        .bind(p.rating)
        .bind(p.num_reviews)
        .bind(p.featured)
        .bind(p.trending)
        .bind(&p.tags)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "product"))?;
        Ok(())
    }

    async fn update_product(&self, id: Uuid, u: &ProductUpdate) -> RepoResult<Option<Product>> {
        let sql = format!(
            "UPDATE products AS p SET name = COALESCE($2, p.name), description = COALESCE($3, p.description), \
             price = COALESCE($4, p.price), original_price = COALESCE($5, p.original_price), \
             category = COALESCE($6, p.category), subcategory = COALESCE($7, p.subcategory), \
             brand = COALESCE($8, p.brand), images = COALESCE($9, p.images), colors = COALESCE($10, p.colors), \
             sizes = COALESCE($11, p.sizes), stock = COALESCE($12, p.stock), featured = COALESCE($13, p.featured), \
             trending = COALESCE($14, p.trending), tags = COALESCE($15, p.tags), updated_at = NOW() \
             WHERE p.id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(u.name.as_deref().map(str::trim))
            .bind(u.description.as_deref())
            .bind(u.price)
            .bind(u.original_price)
            .bind(u.category.map(|c| c.as_str()))
            .bind(u.subcategory.as_deref())
            .bind(u.brand.as_deref())
            .bind(u.images.as_ref().map(Json))
            .bind(u.colors.as_ref())
            .bind(u.sizes.as_ref())
            .bind(u.stock)
            .bind(u.featured)
            .bind(u.trending)
            .bind(u.tags.as_ref())
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn refresh_review_stats(&self, product_id: Uuid) -> RepoResult<Option<Product>> {
        let sql = format!(
            "UPDATE products AS p SET \
             rating = COALESCE((SELECT AVG(r.rating)::DOUBLE PRECISION FROM reviews r WHERE r.product_id = p.id), 0), \
             num_reviews = (SELECT COUNT(*)::INTEGER FROM reviews r WHERE r.product_id = p.id), \
             updated_at = NOW() \
             WHERE p.id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn delete_product(&self, id: Uuid) -> RepoResult<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> RepoResult<bool> {
        let done = sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn find_review(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>(
            "SELECT id, user_id, product_id, rating, comment, images, created_at FROM reviews \
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Review::try_from)
        .transpose()
    }

    async fn insert_review(&self, r: &Review) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO reviews (id, user_id, product_id, rating, comment, images, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(r.id)
        .bind(r.user_id)
        .bind(r.product_id)
        .bind(i16::from(r.rating.value()))
        .bind(&r.comment)
        .bind(&r.images)
        .bind(r.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "review"))?;
        Ok(())
    }

    async fn reviews_with_authors(&self, product_id: Uuid) -> RepoResult<Vec<ReviewWithAuthor>> {
        let rows = sqlx::query_as::<_, ReviewAuthorRow>(
            "SELECT r.id, r.user_id, r.product_id, r.rating, r.comment, r.images, r.created_at, \
             u.name AS author_name FROM reviews r LEFT JOIN users u ON u.id = r.user_id \
             WHERE r.product_id = $1 ORDER BY r.created_at",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let review = Review::try_from(row.review)?;
                let user = ReviewAuthor { id: review.user_id, name: row.author_name.unwrap_or_default() };
                Ok(ReviewWithAuthor { review, user })
            })
            .collect()
    }

    async fn load_cart(&self, user_id: Uuid) -> RepoResult<Cart> {
        let items = sqlx::query_as::<_, CartItemRow>(
            "SELECT id, product_id, quantity, color, size FROM cart_items WHERE user_id = $1 ORDER BY position",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CartItem::try_from)
        .collect::<RepoResult<Vec<_>>>()?;
        Ok(Cart::from_items(items))
    }

    async fn add_cart_item(&self, user_id: Uuid, item: &CartItem) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO cart_items (id, user_id, product_id, quantity, color, size) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id, product_id, (COALESCE(color, '')), (COALESCE(size, ''))) \
             DO UPDATE SET quantity = LEAST(cart_items.quantity::BIGINT + EXCLUDED.quantity, $7)::INTEGER",
        )
        .bind(item.id)
        .bind(user_id)
        .bind(item.product_id)
        .bind(item.quantity.to_i32())
        .bind(&item.color)
        .bind(&item.size)
        .bind(i64::from(Quantity::MAX.to_i32()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_cart_item_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: Quantity) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(item_id)
            .bind(quantity.to_i32())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: Uuid) -> RepoResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_order(&self, o: &Order) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, items, shipping_address, payment_method, items_price, tax_price, \
             shipping_price, total_price, discount, coupon_code, is_paid, paid_at, payment_result, status, \
             is_delivered, delivered_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
        )
        .bind(o.id)
        .bind(o.user_id)
        .bind(Json(&o.items))
        .bind(Json(&o.shipping_address))
        .bind(&o.payment_method)
        .bind(o.items_price)
        .bind(o.tax_price)
        .bind(o.shipping_price)
        .bind(o.total_price)
        .bind(o.discount)
        .bind(&o.coupon_code)
        .bind(o.is_paid)
        .bind(o.paid_at)
        .bind(o.payment_result.as_ref().map(Json))
        .bind(o.status.as_str())
        .bind(o.is_delivered)
        .bind(o.delivered_at)
        .bind(o.created_at)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "order"))?;
        Ok(())
    }

    async fn save_order(&self, o: &Order) -> RepoResult<()> {
        sqlx::query(
            "UPDATE orders SET is_paid = $2, paid_at = $3, payment_result = $4, status = $5, \
             is_delivered = $6, delivered_at = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(o.id)
        .bind(o.is_paid)
        .bind(o.paid_at)
        .bind(o.payment_result.as_ref().map(Json))
        .bind(o.status.as_str())
        .bind(o.is_delivered)
        .bind(o.delivered_at)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn orders_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn all_orders(&self) -> RepoResult<Vec<OrderWithCustomer>> {
        let rows = sqlx::query_as::<_, OrderCustomerRow>(
            "SELECT o.*, u.name AS customer_name, u.email AS customer_email \
             FROM orders o LEFT JOIN users u ON u.id = o.user_id ORDER BY o.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let order = Order::try_from(row.order)?;
                let user = match (row.customer_name, row.customer_email) {
                    (Some(name), Some(email)) => Some(Customer { id: order.user_id, name, email }),
                    _ => None,
                };
                Ok(OrderWithCustomer { order, user })
            })
            .collect()
    }

    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
