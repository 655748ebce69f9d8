pub use crate::{Anvil, AnvilBuilder, AnvilError};
pub use anvil_activation::{
    ActivationError, ActivationReport, Activator, ActivatorRef, ActivatorRegistry, LifecycleSink,
    ShutdownReport,
};
pub use anvil_domain::{ActivationState, LifecycleEvent, LifecyclePhase, PropertyKey};
pub use anvil_event_bus::{EventBus, EventReceiverExt};
pub use anvil_kernel::prelude::*;
