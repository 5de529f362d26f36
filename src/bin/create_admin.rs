//! Bootstrap an admin account and issue it an API token.
//!
//! Creates `admin@shophub.com` (or `ADMIN_EMAIL`) with the admin role, or
//! promotes the existing account, then prints a fresh bearer token.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shophub::db::{PgStore, Store};
use shophub::domain::aggregates::{ApiToken, Role, User};

const DEFAULT_ADMIN_EMAIL: &str = "admin@shophub.com";
const ADMIN_NAME: &str = "Administrator";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "shophub=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());

    let store = PgStore::connect(&url, 1).await.context("failed to connect to database")?;
    store.migrate().await.context("failed to run migrations")?;

    let admin = match store.find_user_by_email(&email).await? {
        Some(user) if user.is_admin() => {
            tracing::info!(email = %user.email, "admin user already exists");
            user
        }
        Some(mut user) => {
            store.set_user_role(user.id, Role::Admin).await?;
            user.role = Role::Admin;
            tracing::info!(email = %user.email, "user promoted to admin");
            user
        }
        None => {
            let user = User::create(ADMIN_NAME, &email, Role::Admin);
            store.insert_user(&user).await?;
            tracing::info!(email = %user.email, "admin user created");
            user
        }
    };

    let token = ApiToken::generate();
    store.insert_token(admin.id, &token.digest()).await?;

    println!("==================================");
    println!("Email: {}", admin.email);
    println!("Role:  {}", admin.role.as_str());
    println!("Token: {}", token.as_str());
    println!("==================================");
    println!("Send it as `Authorization: Bearer <token>`. It is not shown again.");
    Ok(())
}
