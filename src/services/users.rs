//! Account self-service: profile, address book and wishlist.

use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::db::{RepositoryError, Store};
use crate::domain::aggregates::{ProfileUpdate, ShippingAddress, User};
use crate::error::{AppError, Result};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

pub async fn list_users(store: &dyn Store) -> Result<Vec<User>> {
    Ok(store.list_users().await?)
}

#[instrument(skip(store, update))]
pub async fn update_profile(store: &dyn Store, user_id: Uuid, update: ProfileUpdate) -> Result<User> {
    let update = update.normalized();
    update.validate()?;
    store
        .update_user_profile(user_id, &update)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::BadRequest("Email already in use".to_string()),
            other => other.into(),
        })?
        .ok_or_else(user_not_found)
}

/// Append to the address book and return the full list.
#[instrument(skip(store, address))]
pub async fn add_address(store: &dyn Store, user_id: Uuid, address: ShippingAddress) -> Result<Vec<ShippingAddress>> {
    let user = store.add_user_address(user_id, &address).await?.ok_or_else(user_not_found)?;
    Ok(user.addresses)
}

#[instrument(skip(store))]
pub async fn add_to_wishlist(store: &dyn Store, user_id: Uuid, product_id: Uuid) -> Result<Vec<Uuid>> {
    if store.find_product(product_id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    let user = store.add_to_wishlist(user_id, product_id).await?.ok_or_else(user_not_found)?;
    Ok(user.wishlist)
}

#[instrument(skip(store))]
pub async fn remove_from_wishlist(store: &dyn Store, user_id: Uuid, product_id: Uuid) -> Result<Vec<Uuid>> {
    let user = store.remove_from_wishlist(user_id, product_id).await?.ok_or_else(user_not_found)?;
    Ok(user.wishlist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::aggregates::{Category, NewProduct, Product, Role};
    use rust_decimal::Decimal;

    async fn seeded() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let ada = User::create("Ada", "ada@example.com", Role::User);
        let bo = User::create("Bo", "bo@example.com", Role::User);
        store.insert_user(&ada).await.unwrap();
        store.insert_user(&bo).await.unwrap();
        (store, ada, bo)
    }

    #[tokio::test]
    async fn test_profile_email_must_stay_unique() {
        let (store, ada, _bo) = seeded().await;

        let update = ProfileUpdate { name: Some(" Ada L ".into()), phone: Some("555".into()), ..Default::default() };
        let user = update_profile(&store, ada.id, update).await.unwrap();
        assert_eq!((user.name.as_str(), user.email.as_str(), user.phone.as_str()), ("Ada L", "ada@example.com", "555"));

        let taken = ProfileUpdate { email: Some("BO@example.com".into()), ..Default::default() };
        let err = update_profile(&store, ada.id, taken).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already in use");

        let bad = ProfileUpdate { email: Some("nope".into()), ..Default::default() };
        assert!(matches!(update_profile(&store, ada.id, bad).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_wishlist_requires_existing_product() {
        let (store, ada, _bo) = seeded().await;
        let product = Product::create(NewProduct {
            name: "Lamp".into(), description: "desk lamp".into(), price: Decimal::new(40, 0), original_price: None,
            category: Category::HomeAndLiving, subcategory: String::new(), brand: String::new(), images: vec![],
            colors: vec![], sizes: vec![], stock: 3, featured: false, trending: false, tags: vec![],
        });
        store.insert_product(&product).await.unwrap();

        assert_eq!(add_to_wishlist(&store, ada.id, product.id).await.unwrap(), vec![product.id]);
        assert_eq!(add_to_wishlist(&store, ada.id, product.id).await.unwrap(), vec![product.id]);
        let err = add_to_wishlist(&store, ada.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(remove_from_wishlist(&store, ada.id, product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_addresses_accumulate() {
        let (store, ada, _bo) = seeded().await;
        let home = ShippingAddress { street: "1 Main St".into(), city: "Lagos".into(), ..Default::default() };
        let work = ShippingAddress { street: "9 Dock Rd".into(), city: "Accra".into(), ..Default::default() };

        add_address(&store, ada.id, home.clone()).await.unwrap();
        assert_eq!(add_address(&store, ada.id, work.clone()).await.unwrap(), vec![home, work]);

        let err = add_address(&store, Uuid::new_v4(), ShippingAddress::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
