//! Business operations behind the HTTP routes.

pub mod cart;
pub mod catalog;
pub mod events;
pub mod orders;
pub mod payment;
pub mod reviews;
pub mod users;
