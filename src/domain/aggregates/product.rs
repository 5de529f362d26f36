//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};
use crate::domain::aggregates::review::ReviewStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Fashion,
    #[serde(rename = "Home & Living")]
    HomeAndLiving,
    Beauty,
    Sports,
    Books,
    Toys,
    Groceries,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Fashion => "Fashion",
            Self::HomeAndLiving => "Home & Living",
            Self::Beauty => "Beauty",
            Self::Sports => "Sports",
            Self::Books => "Books",
            Self::Toys => "Toys",
            Self::Groceries => "Groceries",
        }
    }
}

impl FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Electronics" => Ok(Self::Electronics),
            "Fashion" => Ok(Self::Fashion),
            "Home & Living" => Ok(Self::HomeAndLiving),
            "Beauty" => Ok(Self::Beauty),
            "Sports" => Ok(Self::Sports),
            "Books" => Ok(Self::Books),
            "Toys" => Ok(Self::Toys),
            "Groceries" => Ok(Self::Groceries),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub public_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Decimal,
    pub category: Category,
    pub subcategory: String,
    pub brand: String,
    pub images: Vec<ProductImage>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    /// Units on hand. Order placement decrements without a floor.
    pub stock: i32,
    pub rating: f64,
    pub num_reviews: i32,
    pub reviews: Vec<Uuid>,
    pub featured: bool,
    pub trending: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("range");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Admin payload for creating a product.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[validate(length(min = 1, message = "Please provide a product name"))]
    pub name: String,
    #[validate(length(min = 1, message = "Please provide a product description"))]
    pub description: String,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom = "non_negative")]
    pub original_price: Option<Decimal>,
    pub category: Category,
    #[serde(default)] pub subcategory: String,
    #[serde(default)] pub brand: String,
    #[serde(default)] pub images: Vec<ProductImage>,
    #[serde(default)] pub colors: Vec<String>,
    #[serde(default)] pub sizes: Vec<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    #[serde(default)] pub featured: bool,
    #[serde(default)] pub trending: bool,
    #[serde(default)] pub tags: Vec<String>,
}

/// Admin payload for a partial product update. Absent fields are left as they are.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[validate(length(min = 1, message = "Please provide a product name"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Please provide a product description"))]
    pub description: Option<String>,
    #[validate(custom = "non_negative")]
    pub price: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub original_price: Option<Decimal>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub images: Option<Vec<ProductImage>>,
    pub colors: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub featured: Option<bool>,
    pub trending: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl Product {
    pub fn create(input: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            original_price: input.original_price.unwrap_or(Decimal::ZERO),
            category: input.category,
            subcategory: input.subcategory,
            brand: input.brand,
            images: input.images,
            colors: input.colors,
            sizes: input.sizes,
            stock: input.stock,
            rating: 0.0,
            num_reviews: 0,
            reviews: vec![],
            featured: input.featured,
            trending: input.trending,
            tags: input.tags,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: ProductUpdate) {
        if let Some(v) = update.name { self.name = v.trim().to_string(); }
        if let Some(v) = update.description { self.description = v; }
        if let Some(v) = update.price { self.price = v; }
        if let Some(v) = update.original_price { self.original_price = v; }
        if let Some(v) = update.category { self.category = v; }
        if let Some(v) = update.subcategory { self.subcategory = v; }
        if let Some(v) = update.brand { self.brand = v; }
        if let Some(v) = update.images { self.images = v; }
        if let Some(v) = update.colors { self.colors = v; }
        if let Some(v) = update.sizes { self.sizes = v; }
        if let Some(v) = update.stock { self.stock = v; }
        if let Some(v) = update.featured { self.featured = v; }
        if let Some(v) = update.trending { self.trending = v; }
        if let Some(v) = update.tags { self.tags = v; }
        self.touch();
    }

    /// Replace the review list and the aggregate rating computed over it.
    pub fn set_review_stats(&mut self, review_ids: Vec<Uuid>, stats: ReviewStats) {
        self.reviews = review_ids;
        self.num_reviews = i32::try_from(stats.num_reviews).unwrap_or(i32::MAX);
        self.rating = stats.rating;
        self.touch();
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image: self.images.first().map(|i| i.url.clone()),
            stock: self.stock,
            colors: self.colors.clone(),
            sizes: self.sizes.clone(),
        }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// The slice of a product shown next to a cart line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub stock: i32,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductSort {
    #[serde(rename = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-desc")]
    PriceDesc,
    #[serde(rename = "rating")]
    Rating,
    #[default]
    #[serde(rename = "newest")]
    Newest,
}

impl FromStr for ProductSort {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "rating" => Ok(Self::Rating),
            "newest" => Ok(Self::Newest),
            other => Err(format!("unknown sort: {other}")),
        }
    }
}

impl ProductSort {
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::Rating => b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal),
            Self::Newest => Ordering::Equal,
        }
        .then_with(|| newest_first(a, b))
    }
}

// Ties on creation time fall back to the id, which is time-ordered too.
fn newest_first(a: &Product, b: &Product) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const TRENDING_LIMIT: u32 = 8;

/// Catalog query: filters, sort order and page window.
///
/// Query strings from browsers often carry empty values (`category=&page=2`);
/// those are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    /// Minimum average rating.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub sort: Option<ProductSort>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

impl ProductFilter {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn limit(&self) -> u32 { self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE) }
    pub fn offset(&self) -> u64 { u64::from(self.page() - 1) * u64::from(self.limit()) }
    pub fn sort(&self) -> ProductSort { self.sort.unwrap_or_default() }

    /// Search term with surrounding whitespace removed, if any is left.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, p: &Product) -> bool {
        if self.category.is_some_and(|c| c != p.category) { return false; }
        if let Some(sub) = self.subcategory.as_deref().filter(|s| !s.is_empty()) {
            if p.subcategory != sub { return false; }
        }
        if self.min_price.is_some_and(|min| p.price < min) { return false; }
        if self.max_price.is_some_and(|max| p.price > max) { return false; }
        if self.rating.is_some_and(|r| p.rating < r) { return false; }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let hit = p.name.to_lowercase().contains(&term)
                || p.description.to_lowercase().contains(&term)
                || p.tags.iter().any(|t| t.to_lowercase().contains(&term));
            if !hit { return false; }
        }
        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub pages: u32,
    pub total: u64,
}

impl ProductPage {
    pub fn new(products: Vec<Product>, filter: &ProductFilter, total: u64) -> Self {
        let pages = total.div_ceil(u64::from(filter.limit()));
        Self { products, page: filter.page(), pages: u32::try_from(pages).unwrap_or(u32::MAX), total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.into(), description: "desc".into(), price: Decimal::new(price, 0), original_price: None,
            category: Category::Electronics, subcategory: String::new(), brand: String::new(), images: vec![],
            colors: vec![], sizes: vec![], stock: 10, featured: false, trending: false, tags: vec!["gadget".into()],
        }
    }

    #[test]
    fn test_product_create() {
        let p = Product::create(input("  Headphones ", 1999));
        assert_eq!(p.name, "Headphones");
        assert_eq!(p.num_reviews, 0);
        assert_eq!(p.original_price, Decimal::ZERO);
    }

    #[test]
    fn test_validation_messages() {
        let mut bad = input("", 10);
        bad.stock = -1;
        bad.price = Decimal::new(-5, 0);
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("stock"));
        assert!(fields.contains_key("price"));
    }

    #[test]
    fn test_category_serde() {
        let c: Category = serde_json::from_str("\"Home & Living\"").unwrap();
        assert_eq!(c, Category::HomeAndLiving);
        assert_eq!("Home & Living".parse::<Category>().unwrap(), c);
        assert!("Garden".parse::<Category>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let p = Product::create(input("Wireless Mouse", 500));
        let f = ProductFilter { search: Some("GADGET".into()), min_price: Some(Decimal::new(100, 0)), ..Default::default() };
        assert!(f.matches(&p));
        let f = ProductFilter { max_price: Some(Decimal::new(100, 0)), ..Default::default() };
        assert!(!f.matches(&p));
        let f = ProductFilter { category: Some(Category::Books), ..Default::default() };
        assert!(!f.matches(&p));
    }

    #[test]
    fn test_page_window() {
        let f = ProductFilter { page: Some(3), limit: Some(5), ..Default::default() };
        assert_eq!(f.offset(), 10);
        assert_eq!(ProductPage::new(vec![], &f, 11).pages, 3);
        assert_eq!(ProductFilter::default().limit(), DEFAULT_PAGE_SIZE);
    }
}
