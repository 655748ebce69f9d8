//! # Event Bus
//!
//! A small, type-safe event bus used to publish lifecycle notifications.
//!
//! ## Features
//!
//! * **Type-Safe**: Events are identified by their Rust type.
//! * **Two delivery modes**: broadcast (every subscriber sees every event) and latest value.
//! * **Runtime agnostic publishing**: `publish` is synchronous; only awaiting needs `tokio`.
//! * **Shared**: `FxHashMap` + `parking_lot::RwLock` behind an `Arc`; clones share channels.
//!
//! # Example
//!
//! ```rust
//! use anvil_event_bus::{EventBus, EventReceiverExt, EventBusError};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct ModuleLoaded { name: &'static str }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!
//!     let mut rx = bus.subscribe::<ModuleLoaded>()?;
//!     bus.publish(ModuleLoaded { name: "cache" })?;
//!
//!     let event = rx.next_event().await.expect("bus is open");
//!     assert_eq!(event.name, "cache");
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{ChannelKind, DEFAULT_CAPACITY, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
