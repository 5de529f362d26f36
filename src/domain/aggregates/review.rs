//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};
use crate::domain::value_objects::Rating;

/// A user's rating of a product. At most one per (user, product).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: Rating,
    pub comment: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewReview {
    pub rating: Rating,
    #[validate(custom = "not_blank")]
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Please provide a comment".into());
        return Err(err);
    }
    Ok(())
}

impl Review {
    pub fn create(user_id: Uuid, product_id: Uuid, input: NewReview) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            product_id,
            rating: input.rating,
            comment: input.comment.trim().to_string(),
            images: input.images,
            created_at: Utc::now(),
        }
    }
}

/// Reviewer shown alongside a review on the product page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub user: ReviewAuthor,
}

/// Mean rating and count over a product's full review set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReviewStats {
    pub rating: f64,
    pub num_reviews: usize,
}

impl ReviewStats {
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0usize), |(sum, count), r| (sum + u64::from(r.value()), count + 1));
        if count == 0 {
            return Self { rating: 0.0, num_reviews: 0 };
        }
        #[allow(clippy::cast_precision_loss)]
        let rating = sum as f64 / count as f64;
        Self { rating, num_reviews: count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: u8) -> Rating { Rating::new(n).unwrap() }

    #[test]
    fn test_mean_rating() {
        let stats = ReviewStats::from_ratings([r(5), r(3)]);
        assert!((stats.rating - 4.0).abs() < f64::EPSILON);
        assert_eq!(stats.num_reviews, 2);
    }

    #[test]
    fn test_no_reviews() {
        let stats = ReviewStats::from_ratings(Vec::new());
        assert_eq!(stats.num_reviews, 0);
        assert!(stats.rating.abs() < f64::EPSILON);
    }

    #[test]
    fn test_comment_required() {
        let input = NewReview { rating: r(4), comment: "   ".into(), images: vec![] };
        assert!(input.validate().is_err());
        let input = NewReview { rating: r(4), comment: " Solid build ".into(), images: vec![] };
        assert!(input.validate().is_ok());
        assert_eq!(Review::create(Uuid::new_v4(), Uuid::new_v4(), input).comment, "Solid build");
    }
}
