//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::order::ShippingAddress;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::User => "user", Self::Admin => "admin" }
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: String,
    /// Saved address book, in the order addresses were added.
    #[serde(default)]
    pub addresses: Vec<ShippingAddress>,
    /// Product ids, each at most once.
    #[serde(default)]
    pub wishlist: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Self-service profile edit. Absent fields are left as they are.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "Please provide a name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    /// Trim the name and lowercase the email the way stored users are kept.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email.map(|e| e.trim().to_lowercase()),
            phone: self.phone.map(|p| p.trim().to_string()),
        }
    }
}

impl User {
    pub fn create(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            email: email.into().trim().to_lowercase(),
            role,
            phone: String::new(),
            addresses: vec![],
            wishlist: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    pub fn apply_profile(&mut self, update: ProfileUpdate) {
        if let Some(v) = update.name { self.name = v; }
        if let Some(v) = update.email { self.email = v; }
        if let Some(v) = update.phone { self.phone = v; }
    }

    pub fn add_address(&mut self, address: ShippingAddress) { self.addresses.push(address); }

    /// Returns false if the product was already listed.
    pub fn add_to_wishlist(&mut self, product_id: Uuid) -> bool {
        if self.wishlist.contains(&product_id) {
            return false;
        }
        self.wishlist.push(product_id);
        true
    }

    pub fn remove_from_wishlist(&mut self, product_id: Uuid) { self.wishlist.retain(|id| *id != product_id); }
}

/// Opaque bearer token. Only its SHA-256 digest is ever stored.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self { Self(raw.into()) }
    pub fn as_str(&self) -> &str { &self.0 }

    /// Hex SHA-256 digest used as the lookup key.
    pub fn digest(&self) -> String { hex::encode(Sha256::digest(self.0.as_bytes())) }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("ApiToken([REDACTED])") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_digest_is_stable() {
        let token = ApiToken::from_raw("abc");
        assert_eq!(token.digest(), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(ApiToken::generate().as_str().len(), 64);
    }

    #[test]
    fn test_token_debug_redacts() {
        assert!(!format!("{:?}", ApiToken::from_raw("secret-value")).contains("secret-value"));
    }

    #[test]
    fn test_email_normalized() {
        let user = User::create("Ada", "  Ada@Example.COM ", Role::Admin);
        assert_eq!(user.email, "ada@example.com");
        assert!(user.is_admin());
    }

    #[test]
    fn test_wishlist_holds_each_product_once() {
        let mut user = User::create("Bo", "bo@example.com", Role::User);
        let product = Uuid::new_v4();
        assert!(user.add_to_wishlist(product));
        assert!(!user.add_to_wishlist(product));
        assert_eq!(user.wishlist, vec![product]);
        user.remove_from_wishlist(product);
        assert!(user.wishlist.is_empty());
    }

    #[test]
    fn test_profile_update() {
        let mut user = User::create("Bo", "bo@example.com", Role::User);
        let update = ProfileUpdate { name: Some("  Bo Li ".into()), email: Some(" BO.LI@Example.com".into()), phone: None };
        user.apply_profile(update.normalized());
        assert_eq!(user.name, "Bo Li");
        assert_eq!(user.email, "bo.li@example.com");
        assert_eq!(user.phone, "");

        let bad = ProfileUpdate { email: Some("not-an-email".into()), ..Default::default() };
        assert!(bad.validate().is_err());
        assert!(ProfileUpdate { name: Some(String::new()), ..Default::default() }.validate().is_err());
    }
}
