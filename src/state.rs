//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::events::EventPublisher;
use crate::services::payment::PaymentGateway;

/// Cheaply cloneable handle to the store, payment gateway and event
/// publisher.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: Arc<dyn Store>,
    payments: Arc<dyn PaymentGateway>,
    events: EventPublisher,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        payments: Arc<dyn PaymentGateway>,
        events: EventPublisher,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store, payments, events }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn payments(&self) -> &dyn PaymentGateway {
        self.inner.payments.as_ref()
    }

    #[must_use]
    pub fn events(&self) -> &EventPublisher {
        &self.inner.events
    }
}
