use crate::activator::{ActivatorRef, Running};
use crate::error::ActivationError;
use crate::graph::DependencyGraph;
use crate::report::{ActivationReport, ShutdownReport};
use crate::sink::LifecycleSink;
use crate::Activator;
use anvil_domain::{ActivationState, LifecycleEvent, LifecyclePhase};
use anvil_kernel::{ModuleCatalog, ModuleLoader, Overrides};
use anvil_store::PropertyStore;
use fxhash::FxHashMap;
use std::any::TypeId;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Suffix of the store keys listing configured dependencies: `<activator>.dependencies`.
pub const DEPENDENCIES_SUFFIX: &str = ".dependencies";

/// Snapshot of one registered activator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRecord {
    pub activator: ActivatorRef,
    pub dependencies: Vec<ActivatorRef>,
    pub state: ActivationState,
}

struct ActivatorNode {
    activator: ActivatorRef,
    dependencies: Vec<ActivatorRef>,
    state: ActivationState,
    instance: Option<Box<dyn Running>>,
}

impl ActivatorNode {
    fn transition(&mut self, next: ActivationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "{} cannot move from {} to {next}",
            self.activator.name(),
            self.state
        );
        self.state = next;
    }
}

/// Orders registered activators along their dependencies and runs their lifecycle.
///
/// The registry owns the loaded activator instances between [`ActivatorRegistry::start`]
/// and [`ActivatorRegistry::shutdown`]. Activators run once: a second `start` is an
/// [`ActivationError::InvalidState`].
pub struct ActivatorRegistry {
    nodes: Vec<ActivatorNode>,
    index: FxHashMap<TypeId, usize>,
    started: Vec<usize>,
    sink: Arc<dyn LifecycleSink>,
}

impl Default for ActivatorRegistry {
    fn default() -> Self {
        Self { nodes: Vec::new(), index: FxHashMap::default(), started: Vec::new(), sink: Arc::new(()) }
    }
}

impl fmt::Debug for ActivatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivatorRegistry")
            .field("records", &self.records())
            .field("started", &self.started.len())
            .finish_non_exhaustive()
    }
}

impl ActivatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends lifecycle notifications to `sink`.
    #[must_use = "Sets the lifecycle sink"]
    pub fn with_sink(mut self, sink: impl LifecycleSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Registers `T` and, transitively, the activators it declares as dependencies.
    /// Returns how many activators were added.
    pub fn register<T: Activator>(&mut self) -> usize {
        self.register_ref(ActivatorRef::of::<T>())
    }

    /// See [`ActivatorRegistry::register`].
    pub fn register_ref(&mut self, activator: ActivatorRef) -> usize {
        let mut added = 0;
        let mut pending = VecDeque::from([activator]);

        while let Some(next) = pending.pop_front() {
            if self.index.contains_key(&next.module_id()) {
                continue;
            }

            let mut dependencies = Vec::new();
            for dependency in next.declared_dependencies() {
                if !dependencies.contains(&dependency) {
                    dependencies.push(dependency);
                }
            }
            pending.extend(dependencies.iter().copied());

            debug!(activator = next.name(), dependencies = dependencies.len(), "Activator registered");
            self.index.insert(next.module_id(), self.nodes.len());
            self.nodes.push(ActivatorNode {
                activator: next,
                dependencies,
                state: ActivationState::Pending,
                instance: None,
            });
            added += 1;
        }

        added
    }

    /// Adds dependencies listed in `domain` under `<activator>.dependencies`, as a
    /// comma-separated list of full or short type names. Full-name keys win over
    /// short-name keys. Returns the number of new edges.
    ///
    /// Nothing is changed unless every listed name is registered.
    ///
    /// # Errors
    /// [`ActivationError::UnknownDependency`] for a name matching no registered activator,
    /// [`ActivationError::InvalidState`] once activators have run.
    pub fn configure_dependencies(
        &mut self,
        store: &PropertyStore,
        domain: &str,
    ) -> Result<usize, ActivationError> {
        self.ensure_pending()?;

        let mut edges = Vec::new();
        for (node, entry) in self.nodes.iter().enumerate() {
            let activator = entry.activator;
            let Some(raw) = store
                .find_property(domain, &format!("{}{DEPENDENCIES_SUFFIX}", activator.name()))
                .or_else(|| {
                    store.find_property(domain, &format!("{}{DEPENDENCIES_SUFFIX}", activator.short_name()))
                })
            else {
                continue;
            };

            for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
                let dependency = self.find(name).ok_or_else(|| ActivationError::UnknownDependency {
                    activator: activator.name(),
                    dependency: name.to_owned(),
                    context: Some(format!("Configured in domain `{domain}`").into()),
                })?;
                edges.push((node, dependency));
            }
        }

        let mut added = 0;
        for (node, dependency) in edges {
            let entry = &mut self.nodes[node];
            if !entry.dependencies.contains(&dependency) {
                debug!(activator = entry.activator.name(), dependency = dependency.name(), "Dependency configured");
                entry.dependencies.push(dependency);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Registers the module descriptor of every activator in `catalog`.
    pub fn register_modules(&self, catalog: &ModuleCatalog) -> usize {
        self.nodes.iter().map(|node| node.activator.register_module(catalog)).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, activator: ActivatorRef) -> bool {
        self.index.contains_key(&activator.module_id())
    }

    /// Registered activators in registration order.
    pub fn activators(&self) -> impl Iterator<Item = ActivatorRef> + '_ {
        self.nodes.iter().map(|node| node.activator)
    }

    #[must_use]
    pub fn state(&self, activator: ActivatorRef) -> Option<ActivationState> {
        self.index.get(&activator.module_id()).map(|&node| self.nodes[node].state)
    }

    #[must_use]
    pub fn state_of<T: Activator>(&self) -> Option<ActivationState> {
        self.state(ActivatorRef::of::<T>())
    }

    #[must_use]
    pub fn records(&self) -> Vec<ActivationRecord> {
        self.nodes
            .iter()
            .map(|node| ActivationRecord {
                activator: node.activator,
                dependencies: node.dependencies.clone(),
                state: node.state,
            })
            .collect()
    }

    /// The dependency graph of the registered activators, in registration order.
    #[must_use]
    pub fn graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for node in &self.nodes {
            graph.add_node(node.activator.name());
        }
        for (node, entry) in self.nodes.iter().enumerate() {
            for dependency in &entry.dependencies {
                if let Some(&dependency) = self.index.get(&dependency.module_id()) {
                    graph.add_dependency(node, dependency);
                }
            }
        }
        graph
    }

    /// The order [`ActivatorRegistry::start`] would run, without running anything.
    ///
    /// # Errors
    /// [`ActivationError::DependencyCycle`].
    pub fn plan(&self) -> Result<Vec<ActivatorRef>, ActivationError> {
        let order = self.graph().topological_order()?;
        Ok(order.into_iter().map(|node| self.nodes[node].activator).collect())
    }

    /// Loads and initializes every activator in dependency order.
    ///
    /// The first failure marks its activator `Failed` and halts the run; already
    /// initialized activators stay initialized until [`ActivatorRegistry::shutdown`].
    ///
    /// # Errors
    /// [`ActivationError::DependencyCycle`] (nothing runs) or
    /// [`ActivationError::InvalidState`] if the registry already ran. Activation
    /// failures are reported in the returned [`ActivationReport`].
    pub fn start(
        &mut self,
        loader: &ModuleLoader<'_>,
        overrides: &Overrides,
    ) -> Result<ActivationReport, ActivationError> {
        self.ensure_pending()?;
        let order = self.graph().topological_order()?;
        info!(count = order.len(), "Starting activators");

        let mut report = ActivationReport::default();
        for (position, &node) in order.iter().enumerate() {
            if let Err(error) = self.activate(node, loader, overrides) {
                report.failed = Some(error);
                report.not_attempted = order[position + 1..].iter().map(|&n| self.nodes[n].activator).collect();
                break;
            }
            report.initialized.push(self.nodes[node].activator);
        }

        if report.is_success() {
            info!(count = report.initialized.len(), "Activators started");
        } else {
            warn!(
                initialized = report.initialized.len(),
                not_attempted = report.not_attempted.len(),
                "Activation halted"
            );
        }
        Ok(report)
    }

    /// Stops initialized activators in exact reverse of their initialization.
    ///
    /// Stop failures are recorded and never prevent the remaining stops.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        while let Some(node) = self.started.pop() {
            let entry = &mut self.nodes[node];
            let name = entry.activator.name();
            let Some(mut instance) = entry.instance.take() else {
                continue;
            };

            match instance.stop() {
                Ok(()) => {
                    entry.transition(ActivationState::Stopped);
                    info!(activator = name, "Activator stopped");
                    self.sink.notify(LifecycleEvent::succeeded(name, LifecyclePhase::Stop));
                    report.stopped.push(entry.activator);
                },
                Err(error) => {
                    entry.transition(ActivationState::Failed);
                    warn!(activator = name, %error, "Activator failed to stop");
                    self.sink.notify(LifecycleEvent::failed(name, LifecyclePhase::Stop, error.to_string()));
                    report.failed.push((entry.activator, error));
                },
            }
        }

        report
    }

    fn activate(
        &mut self,
        node: usize,
        loader: &ModuleLoader<'_>,
        overrides: &Overrides,
    ) -> Result<(), ActivationError> {
        let activator = self.nodes[node].activator;
        let name = activator.name();

        let result = activator
            .load(loader, overrides)
            .map_err(|error| ActivationError::ActivationFailed {
                activator: name,
                source: Box::new(error),
                context: Some("Load".into()),
            })
            .and_then(|mut instance| match instance.init() {
                Ok(()) => Ok(instance),
                Err(source) => Err(ActivationError::ActivationFailed {
                    activator: name,
                    source,
                    context: Some("Init".into()),
                }),
            });

        let entry = &mut self.nodes[node];
        match result {
            Ok(instance) => {
                entry.instance = Some(instance);
                entry.transition(ActivationState::Initialized);
                self.started.push(node);
                info!(activator = name, "Activator initialized");
                self.sink.notify(LifecycleEvent::succeeded(name, LifecyclePhase::Init));
                Ok(())
            },
            Err(error) => {
                entry.transition(ActivationState::Failed);
                warn!(activator = name, %error, "Activator failed");
                self.sink.notify(LifecycleEvent::failed(name, LifecyclePhase::Init, error.to_string()));
                Err(error)
            },
        }
    }

    fn ensure_pending(&self) -> Result<(), ActivationError> {
        match self.nodes.iter().find(|node| node.state != ActivationState::Pending) {
            Some(node) => Err(ActivationError::InvalidState {
                activator: node.activator.name(),
                state: node.state,
                context: Some("Activators run once per registry".into()),
            }),
            None => Ok(()),
        }
    }

    fn find(&self, name: &str) -> Option<ActivatorRef> {
        let activators = || self.nodes.iter().map(|node| node.activator);
        activators()
            .find(|activator| activator.name() == name)
            .or_else(|| activators().find(|activator| activator.short_name() == name))
    }
}

impl Drop for ActivatorRegistry {
    fn drop(&mut self) {
        if !self.started.is_empty() {
            warn!(running = self.started.len(), "Activator registry dropped without shutdown");
        }
    }
}
