//! ShopHub storefront API server

use std::sync::Arc;

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shophub::config::{Config, StoreBackend};
use shophub::db::{MemoryStore, PgStore, Store};
use shophub::services::events::EventPublisher;
use shophub::services::payment::StripeGateway;
use shophub::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shophub=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config.database_url.as_ref().context("DATABASE_URL is not set")?;
            let store = PgStore::connect(url.expose_secret(), config.db_max_connections)
                .await
                .context("failed to connect to database")?;
            store.migrate().await.context("failed to run migrations")?;
            tracing::info!("database connected, migrations applied");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => {
                tracing::info!(url = %url, "connected to NATS");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "NATS unavailable, events will only be logged");
                None
            }
        },
        None => None,
    };

    if config.stripe.secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set, payment endpoints will fail");
    }
    let payments = StripeGateway::new(&config.stripe).context("failed to build payment client")?;

    let addr = config.socket_addr();
    let state = AppState::new(config, store, Arc::new(payments), EventPublisher::new(nats));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 ShopHub API listening on {}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutting down");
}
