use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{trace, warn};

/// Buffer of a broadcast channel unless the bus was built with another capacity.
pub const DEFAULT_CAPACITY: usize = 128;

/// Marker trait for types that can be sent across the [`EventBus`].
///
/// Any type that is `Send + Sync + 'static` automatically implements this trait.
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

/// How events of one type are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Every subscriber sees every event (bounded; slow subscribers lag).
    Broadcast,
    /// Subscribers only see the latest value.
    Latest,
}

#[derive(Debug)]
struct Channel {
    kind: ChannelKind,
    sender: Box<dyn Any + Send + Sync>,
}

impl Channel {
    fn broadcast<T: Event>(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
        Self { kind: ChannelKind::Broadcast, sender: Box::new(tx) }
    }

    fn latest<T: Event>(initial: Arc<T>) -> Self {
        let (tx, _) = watch::channel::<Arc<T>>(initial);
        Self { kind: ChannelKind::Latest, sender: Box::new(tx) }
    }

    fn expect_kind<T: Event>(&self, kind: ChannelKind) -> Result<(), EventBusError> {
        if self.kind == kind {
            return Ok(());
        }
        Err(EventBusError::ChannelKindMismatch {
            message: format!("expected {kind:?} but found {:?}", self.kind).into(),
            context: Some(type_name::<T>().into()),
        })
    }

    fn sender<S: Any + Clone, T: Event>(&self) -> Result<S, EventBusError> {
        self.sender.downcast_ref::<S>().cloned().ok_or_else(|| EventBusError::TypeMismatch {
            message: type_name::<T>().into(),
            context: Some("Channel registered under a foreign sender type".into()),
        })
    }
}

/// A thread-safe, type-indexed event bus.
///
/// One channel exists per event type, created lazily on first use. Publishing never
/// blocks and works without any async runtime; only awaiting on receivers needs one.
///
/// ```rust
/// use anvil_event_bus::{EventBus, EventBusError, EventReceiverExt};
///
/// #[derive(Debug, PartialEq)]
/// struct Started(&'static str);
///
/// fn main() -> Result<(), EventBusError> {
///     let bus = EventBus::new();
///     let mut rx = bus.subscribe::<Started>()?;
///
///     bus.publish(Started("db"))?;
///     bus.publish(Started("http"))?;
///
///     let seen: Vec<_> = rx.drain().into_iter().map(|e| e.0).collect();
///     assert_eq!(seen, ["db", "http"]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, Channel>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self { channels: Arc::default(), capacity: DEFAULT_CAPACITY }
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose broadcast channels buffer `capacity` events per subscriber.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, EventBusError> {
        if capacity == 0 {
            return Err(EventBusError::InvalidCapacity {
                message: "capacity must be >= 1".into(),
                context: None,
            });
        }
        Ok(Self { capacity, ..Self::default() })
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribes to every future event of type `T`.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is published as a latest value.
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        Ok(self.broadcast_sender::<T>()?.subscribe())
    }

    /// Publishes `event` to all current subscribers; returns how many received it.
    ///
    /// Publishing without subscribers is not an error: the event is dropped.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is published as a latest value.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        self.publish_arc(Arc::new(event))
    }

    /// Like [`EventBus::publish`] for an already shared event.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is published as a latest value.
    pub fn publish_arc<T: Event>(&self, event: Arc<T>) -> Result<usize, EventBusError> {
        let sender = self.broadcast_sender::<T>()?;
        match sender.send(event) {
            Ok(count) => {
                trace!(event = type_name::<T>(), count, "Event dispatched");
                Ok(count)
            },
            Err(_) => {
                trace!(event = type_name::<T>(), "Event dropped: no active subscribers");
                Ok(0)
            },
        }
    }

    /// Subscribes to the latest value of `T`, seeding the channel with `initial` if it
    /// does not exist yet.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is a broadcast event.
    pub fn watch<T: Event>(&self, initial: T) -> Result<watch::Receiver<Arc<T>>, EventBusError> {
        Ok(self.latest_sender(Arc::new(initial))?.subscribe())
    }

    /// Replaces the latest value of `T`; receivers are notified of the change.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is a broadcast event.
    pub fn publish_latest<T: Event>(&self, value: T) -> Result<(), EventBusError> {
        let value = Arc::new(value);
        let sender = self.latest_sender(Arc::clone(&value))?;
        sender.send_replace(value);
        trace!(event = type_name::<T>(), "Latest value replaced");
        Ok(())
    }

    /// Number of event types with an open channel.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Drops every channel; pending receivers observe the close.
    ///
    /// Returns the number of channels that were closed.
    #[must_use = "Returns the number of closed channels"]
    pub fn close(&self) -> usize {
        let mut channels = self.channels.write();
        let count = channels.len();
        channels.clear();
        if count > 0 {
            warn!(count, "Event bus closed with open channels");
        }
        count
    }

    fn broadcast_sender<T: Event>(&self) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        let id = TypeId::of::<T>();
        if let Some(channel) = self.channels.read().get(&id) {
            channel.expect_kind::<T>(ChannelKind::Broadcast)?;
            return channel.sender::<broadcast::Sender<Arc<T>>, T>();
        }

        let mut channels = self.channels.write();
        let channel = channels.entry(id).or_insert_with(|| {
            trace!(event = type_name::<T>(), capacity = self.capacity, "Broadcast channel created");
            Channel::broadcast::<T>(self.capacity)
        });
        channel.expect_kind::<T>(ChannelKind::Broadcast)?;
        channel.sender::<broadcast::Sender<Arc<T>>, T>()
    }

    fn latest_sender<T: Event>(&self, initial: Arc<T>) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        let id = TypeId::of::<T>();
        if let Some(channel) = self.channels.read().get(&id) {
            channel.expect_kind::<T>(ChannelKind::Latest)?;
            return channel.sender::<watch::Sender<Arc<T>>, T>();
        }

        let mut channels = self.channels.write();
        let channel = channels.entry(id).or_insert_with(|| {
            trace!(event = type_name::<T>(), "Latest-value channel created");
            Channel::latest(initial)
        });
        channel.expect_kind::<T>(ChannelKind::Latest)?;
        channel.sender::<watch::Sender<Arc<T>>, T>()
    }
}
