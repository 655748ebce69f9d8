use anvil_domain::LifecycleEvent;
use anvil_event_bus::EventBus;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Receives one notification per activation attempt and per stop attempt.
pub trait LifecycleSink: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

/// Discards every notification.
impl LifecycleSink for () {
    fn notify(&self, _event: LifecycleEvent) {}
}

/// Broadcasts [`LifecycleEvent`]s to the bus subscribers.
impl LifecycleSink for EventBus {
    fn notify(&self, event: LifecycleEvent) {
        if let Err(error) = self.publish(event) {
            warn!(%error, "Lifecycle event not published");
        }
    }
}

/// Keeps every notification in memory; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl LifecycleSink for RecordingSink {
    fn notify(&self, event: LifecycleEvent) {
        self.events.lock().push(event);
    }
}
