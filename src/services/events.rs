//! Domain event publishing over NATS.

use crate::domain::events::DomainEvent;

/// Publishes domain events as JSON. Without a NATS connection events are
/// only logged.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn is_connected(&self) -> bool {
        self.nats.is_some()
    }

    /// Publish every event. Failures are logged and never reach the caller.
    pub async fn publish_all(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            self.publish(&event).await;
        }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let subject = event.subject();
        tracing::debug!(subject, ?event, "domain event");
        let Some(client) = &self.nats else { return };

        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(subject, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(subject, error = %e, "failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::OrderEvent;

    #[tokio::test]
    async fn test_publish_without_nats_is_noop() {
        let publisher = EventPublisher::default();
        assert!(!publisher.is_connected());
        publisher
            .publish_all([DomainEvent::Order(OrderEvent::Paid { order_id: uuid::Uuid::nil() })])
            .await;
    }
}
