//! Product catalog reads and admin writes.

use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::db::Store;
use crate::domain::aggregates::{NewProduct, Product, ProductFilter, ProductPage, ProductUpdate};
use crate::domain::aggregates::product::TRENDING_LIMIT;
use crate::error::{AppError, Result};

pub const PRODUCT_NOT_FOUND: &str = "Product not found";

fn not_found() -> AppError {
    AppError::NotFound(PRODUCT_NOT_FOUND.to_string())
}

pub async fn list_products(store: &dyn Store, filter: &ProductFilter) -> Result<ProductPage> {
    Ok(store.list_products(filter).await?)
}

pub async fn trending_products(store: &dyn Store) -> Result<Vec<Product>> {
    Ok(store.trending_products(TRENDING_LIMIT).await?)
}

/// A product with its `reviews` id list replaced by the reviews themselves,
/// each carrying the reviewer's name.
pub async fn product_detail(store: &dyn Store, id: Uuid) -> Result<Value> {
    let product = store.find_product(id).await?.ok_or_else(not_found)?;
    let reviews = store.reviews_with_authors(id).await?;

    let mut body = serde_json::to_value(&product).map_err(|e| AppError::Internal(e.to_string()))?;
    body["reviews"] = serde_json::to_value(&reviews).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(body)
}

#[instrument(skip(store, input), fields(name = %input.name))]
pub async fn create_product(store: &dyn Store, input: NewProduct) -> Result<Product> {
    input.validate()?;
    let product = Product::create(input);
    store.insert_product(&product).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok(product)
}

#[instrument(skip(store, update))]
pub async fn update_product(store: &dyn Store, id: Uuid, update: ProductUpdate) -> Result<Product> {
    update.validate()?;
    store.update_product(id, &update).await?.ok_or_else(not_found)
}

#[instrument(skip(store))]
pub async fn delete_product(store: &dyn Store, id: Uuid) -> Result<()> {
    if store.delete_product(id).await? {
        Ok(())
    } else {
        Err(not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::aggregates::{Category, NewReview, Review, Role, User};
    use crate::domain::value_objects::Rating;
    use rust_decimal::Decimal;

    fn input(name: &str) -> NewProduct {
        NewProduct {
            name: name.into(), description: "thing".into(), price: Decimal::new(99, 0), original_price: None,
            category: Category::Toys, subcategory: String::new(), brand: String::new(), images: vec![],
            colors: vec![], sizes: vec![], stock: 1, featured: false, trending: true, tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_validates() {
        let store = MemoryStore::new();
        let err = create_product(&store, input("")).await.unwrap_err();
        assert_eq!(err.to_string(), "Please provide a product name");
        create_product(&store, input("Kite")).await.unwrap();
        assert_eq!(trending_products(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryStore::new();
        let product = create_product(&store, input("Yo-yo")).await.unwrap();
        let update = ProductUpdate { price: Some(Decimal::new(120, 0)), ..Default::default() };
        assert_eq!(update_product(&store, product.id, update).await.unwrap().price, Decimal::new(120, 0));

        delete_product(&store, product.id).await.unwrap();
        assert!(matches!(delete_product(&store, product.id).await, Err(AppError::NotFound(_))));
        assert!(update_product(&store, product.id, ProductUpdate::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_update_leaves_unset_fields_alone() {
        let store = MemoryStore::new();
        let product = create_product(&store, NewProduct { stock: 10, ..input("Drum") }).await.unwrap();
        store.adjust_stock(product.id, -2).await.unwrap();

        let update = ProductUpdate { trending: Some(false), ..Default::default() };
        let updated = update_product(&store, product.id, update).await.unwrap();
        assert!(!updated.trending);
        assert_eq!(updated.stock, 8);
        assert_eq!(updated.price, product.price);
    }

    #[tokio::test]
    async fn test_detail_populates_reviews() {
        let store = MemoryStore::new();
        let product = create_product(&store, input("Puzzle")).await.unwrap();
        let user = User::create("Kim", "kim@example.com", Role::User);
        store.insert_user(&user).await.unwrap();
        let review = Review::create(
            user.id,
            product.id,
            NewReview { rating: Rating::new(4).unwrap(), comment: "fun".into(), images: vec![] },
        );
        store.insert_review(&review).await.unwrap();

        let body = product_detail(&store, product.id).await.unwrap();
        assert_eq!(body["name"], "Puzzle");
        assert_eq!(body["reviews"][0]["user"]["name"], "Kim");
        assert_eq!(body["reviews"][0]["comment"], "fun");
    }
}
