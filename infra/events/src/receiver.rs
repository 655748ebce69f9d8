use crate::bus::Event;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Lag-tolerant receiving on top of the raw tokio receivers.
pub trait EventReceiverExt<T> {
    /// Waits for the next event; `None` once the channel is closed.
    ///
    /// Broadcast receivers that fell behind skip to the oldest retained event.
    /// Latest-value receivers wait for a change and return the new value.
    fn next_event(&mut self) -> impl Future<Output = Option<Arc<T>>> + Send;

    /// Everything that can be received right now, without waiting.
    fn drain(&mut self) -> Vec<Arc<T>>;
}

impl<T: Event> EventReceiverExt<T> for broadcast::Receiver<Arc<T>> {
    async fn next_event(&mut self) -> Option<Arc<T>> {
        loop {
            match self.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(event = std::any::type_name::<T>(), skipped, "Receiver lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn drain(&mut self) -> Vec<Arc<T>> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(event = std::any::type_name::<T>(), skipped, "Receiver lagged");
                },
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    return events;
                },
            }
        }
    }
}

impl<T: Event> EventReceiverExt<T> for watch::Receiver<Arc<T>> {
    async fn next_event(&mut self) -> Option<Arc<T>> {
        self.changed().await.ok()?;
        Some(Arc::clone(&self.borrow_and_update()))
    }

    fn drain(&mut self) -> Vec<Arc<T>> {
        if self.has_changed().unwrap_or(false) {
            vec![Arc::clone(&self.borrow_and_update())]
        } else {
            Vec::new()
        }
    }
}
