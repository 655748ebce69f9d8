//! # Anvil shell
//!
//! Library half of the `anvil` binary: opens the configuration folder, runs the
//! [`demo`] activators through [`Anvil`] and collects what happened in a [`Summary`].

pub mod args;
pub mod demo;

use crate::args::Cli;
use anvil::Anvil;
use anvil::activation::{ActivationReport, ActivatorRef, ShutdownReport};
use anvil::kernel::Overrides;
use anvil::store::{PropertyStore, StoreSettings};
use anyhow::Context;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Outcome of one [`run`].
#[derive(Debug)]
pub struct Summary {
    pub plan: Vec<ActivatorRef>,
    /// `None` when only the plan was requested.
    pub activation: Option<ActivationReport>,
    pub shutdown: Option<ShutdownReport>,
    pub saved: Vec<String>,
    pub domains: Vec<(String, BTreeMap<String, String>)>,
}

impl Summary {
    /// Whether every planned activator initialized and stopped cleanly.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.activation.as_ref().is_none_or(ActivationReport::is_success)
            && self.shutdown.as_ref().is_none_or(ShutdownReport::is_clean)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan: Vec<_> = self.plan.iter().map(ActivatorRef::short_name).collect();
        writeln!(f, "plan: {}", plan.join(" -> "))?;

        if let Some(activation) = &self.activation {
            writeln!(f, "activation: {activation}")?;
        }
        if let Some(shutdown) = &self.shutdown {
            writeln!(f, "shutdown: {shutdown}")?;
        }
        if !self.saved.is_empty() {
            writeln!(f, "saved: {}", self.saved.join(", "))?;
        }

        for (name, entries) in &self.domains {
            writeln!(f, "[{name}]")?;
            for (key, value) in entries {
                writeln!(f, "{key} = {value}")?;
            }
        }
        Ok(())
    }
}

/// Opens the store described by `cli` and the environment.
///
/// # Errors
/// Invalid `ANVIL__*` variables or an unusable config folder.
pub fn open_store(cli: &Cli) -> anyhow::Result<PropertyStore> {
    let mut settings = StoreSettings::from_env().context("Invalid ANVIL__* environment")?;
    if let Some(folder) = &cli.config_folder {
        settings = settings.with_config_folder(folder);
    }

    let folder = settings.config_folder.display().to_string();
    PropertyStore::builder()
        .settings(settings)
        .build()
        .with_context(|| format!("Cannot open config folder {folder}"))
}

/// Plans, starts and stops the demo activators, then saves dirty domains.
///
/// Activation failures do not make this fail; check [`Summary::succeeded`].
///
/// # Errors
/// Store failures, dependency cycles, unknown configured dependencies and unknown
/// `--domain` names.
pub fn run(cli: &Cli) -> anyhow::Result<Summary> {
    let store = open_store(cli)?;
    let overrides: Overrides = cli.overrides.iter().cloned().collect();

    let mut anvil = Anvil::builder().store(store).overrides(overrides).build();
    let registered = demo::register(&mut anvil)?;
    info!(registered, persistent = anvil.store().is_persistent(), "Demo activators registered");

    let plan = anvil.plan()?;
    let (activation, shutdown) = if cli.plan {
        (None, None)
    } else {
        let activation = anvil.start()?;
        if let Some(activator) = activation.failed_activator() {
            warn!(activator, "Activation halted");
        }
        (Some(activation), Some(anvil.shutdown()))
    };

    let saved = if cli.no_save { Vec::new() } else { anvil.save().context("Saving dirty domains")? };

    let domains = cli
        .domains
        .iter()
        .map(|name| {
            let domain = anvil.store().domain(name).with_context(|| format!("Unknown domain `{name}`"))?;
            Ok((name.clone(), domain.snapshot()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Summary { plan, activation, shutdown, saved, domains })
}
