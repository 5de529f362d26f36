//! Product reviews and rating aggregation.

use tracing::instrument;
use uuid::Uuid;

use crate::db::{RepositoryError, Store};
use crate::domain::aggregates::{NewReview, Review};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::error::{AppError, Result};
use crate::services::events::EventPublisher;

const ALREADY_REVIEWED: &str = "Product already reviewed";

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

/// Add a review by `user_id` and refresh the product's rating from its full
/// review set. Only the rating columns of the product are written.
#[instrument(skip(store, events, input))]
pub async fn add_review(
    store: &dyn Store,
    events: &EventPublisher,
    user_id: Uuid,
    product_id: Uuid,
    input: NewReview,
) -> Result<Review> {
    if store.find_product(product_id).await?.is_none() {
        return Err(product_not_found());
    }

    if store.find_review(user_id, product_id).await?.is_some() {
        return Err(AppError::BadRequest(ALREADY_REVIEWED.to_string()));
    }

    let review = Review::create(user_id, product_id, input);
    store.insert_review(&review).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => AppError::BadRequest(ALREADY_REVIEWED.to_string()),
        other => other.into(),
    })?;

    let product = store.refresh_review_stats(product_id).await?.ok_or_else(product_not_found)?;

    events
        .publish(&DomainEvent::Product(ProductEvent::ReviewAdded {
            product_id,
            review_id: review.id,
            rating: product.rating,
            num_reviews: product.num_reviews,
        }))
        .await;
    Ok(review)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::aggregates::{Category, NewProduct, Product};
    use crate::domain::value_objects::Rating;
    use rust_decimal::Decimal;

    fn review(stars: u8) -> NewReview {
        NewReview { rating: Rating::new(stars).unwrap(), comment: "fine".into(), images: vec![] }
    }

    #[tokio::test]
    async fn test_rating_recomputed_and_duplicates_rejected() {
        let store = MemoryStore::new();
        let events = EventPublisher::default();
        let product = Product::create(NewProduct {
            name: "Novel".into(), description: "paperback".into(), price: Decimal::new(250, 0), original_price: None,
            category: Category::Books, subcategory: String::new(), brand: String::new(), images: vec![],
            colors: vec![], sizes: vec![], stock: 5, featured: false, trending: false, tags: vec![],
        });
        store.insert_product(&product).await.unwrap();

        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        add_review(&store, &events, alice, product.id, review(5)).await.unwrap();
        add_review(&store, &events, bob, product.id, review(3)).await.unwrap();

        let saved = store.find_product(product.id).await.unwrap().unwrap();
        assert!((saved.rating - 4.0).abs() < f64::EPSILON);
        assert_eq!(saved.num_reviews, 2);
        assert_eq!(saved.reviews.len(), 2);

        let err = add_review(&store, &events, alice, product.id, review(1)).await.unwrap_err();
        assert_eq!(err.to_string(), ALREADY_REVIEWED);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let store = MemoryStore::new();
        let err = add_review(&store, &EventPublisher::default(), Uuid::new_v4(), Uuid::new_v4(), review(4))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
