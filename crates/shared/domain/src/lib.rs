//! # Domain Models
//!
//! This crate contains pure domain types with minimal dependencies (`serde` only).
//! Keep it lean: no I/O, no locking, no heavy logic. Just property coordinates,
//! default-value sentinels, well-known configuration keys and lifecycle states.

pub mod constants;
pub mod key;
pub mod lifecycle;

pub use key::{DefaultValue, PropertyKey};
pub use lifecycle::{ActivationState, LifecycleEvent, LifecyclePhase};
