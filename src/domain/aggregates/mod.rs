//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use cart::{Cart, CartError, CartItem};
pub use order::{Order, OrderDraft, OrderError, OrderItem, OrderStatus, PaymentResult, ShippingAddress};
pub use product::{Category, NewProduct, Product, ProductFilter, ProductImage, ProductPage, ProductSort, ProductSummary, ProductUpdate};
pub use review::{NewReview, Review, ReviewAuthor, ReviewStats, ReviewWithAuthor};
pub use user::{ApiToken, ProfileUpdate, Role, User};
