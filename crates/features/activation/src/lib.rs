//! # Activation
//!
//! Runs [`Activator`] lifecycle routines in dependency order.
//!
//! 1. **Registration**: [`ActivatorRegistry::register`] adds an activator and the
//!    activators it declares, [`ActivatorRegistry::configure_dependencies`] adds
//!    edges from `<activator>.dependencies` store entries.
//! 2. **Ordering**: a three-color depth-first search rejects cycles with their full
//!    path; the run order is topological and stable with respect to registration.
//! 3. **Run**: each activator is built through the [`ModuleLoader`](anvil_kernel::ModuleLoader)
//!    and initialized; the first failure halts the run.
//! 4. **Shutdown**: initialized activators are stopped in exact reverse order.
//!
//! Every init and stop attempt is reported to a [`LifecycleSink`], such as the
//! [`EventBus`](anvil_event_bus::EventBus).

mod activator;
mod error;
pub mod graph;
mod registry;
mod report;
mod sink;

pub use activator::{Activator, ActivatorRef};
pub use error::{ActivationError, ActivationErrorExt};
pub use graph::DependencyGraph;
pub use registry::{ActivationRecord, ActivatorRegistry, DEPENDENCIES_SUFFIX};
pub use report::{ActivationReport, ShutdownReport};
pub use sink::{LifecycleSink, RecordingSink};
