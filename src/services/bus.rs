//! In-process change notifications
//!
//! Every mutating service call publishes a `ChangeEvent`. Subscribers refetch
//! whatever they display; a lagging subscriber just misses events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

/// What kind of data changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ChangedEntity {
    Users,
    Boxes,
    Items,
    Records,
    AdminNotifications,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub entity: ChangedEntity,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish a change; no-op when nobody listens
    pub fn publish(&self, entity: ChangedEntity, at: DateTime<Utc>) {
        let receivers = self.sender.send(ChangeEvent { entity, at }).unwrap_or(0);
        tracing::trace!(?entity, receivers, "Change published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = ChangeBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(ChangedEntity::Records, Utc::now());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.entity, ChangedEntity::Records);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = ChangeBus::new(1);
        bus.publish(ChangedEntity::Boxes, Utc::now());
    }
}
