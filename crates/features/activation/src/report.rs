use crate::activator::ActivatorRef;
use crate::error::ActivationError;
use anvil_kernel::BoxError;
use std::fmt;

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, activators: &[ActivatorRef]) -> fmt::Result {
    write!(f, "{label}: ")?;
    if activators.is_empty() {
        return f.write_str("-");
    }
    for (i, activator) in activators.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{activator}")?;
    }
    Ok(())
}

/// Outcome of [`ActivatorRegistry::start`](crate::ActivatorRegistry::start).
#[derive(Debug, Default)]
pub struct ActivationReport {
    /// Activators whose `init` succeeded, in run order.
    pub initialized: Vec<ActivatorRef>,
    /// The failure that halted the run, always [`ActivationError::ActivationFailed`].
    pub failed: Option<ActivationError>,
    /// Activators left pending because the run was halted.
    pub not_attempted: Vec<ActivatorRef>,
}

impl ActivationReport {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed.is_none()
    }

    /// The activator that failed, if any.
    #[must_use]
    pub fn failed_activator(&self) -> Option<&'static str> {
        match &self.failed {
            Some(ActivationError::ActivationFailed { activator, .. }) => Some(*activator),
            _ => None,
        }
    }

    /// The initialized activators, or the failure that halted the run.
    ///
    /// # Errors
    /// [`ActivationError::ActivationFailed`] if an activator failed.
    pub fn into_result(self) -> Result<Vec<ActivatorRef>, ActivationError> {
        match self.failed {
            Some(error) => Err(error),
            None => Ok(self.initialized),
        }
    }
}

impl fmt::Display for ActivationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, "initialized", &self.initialized)?;
        if let Some(error) = &self.failed {
            write!(f, "; failed: {error}")?;
        }
        if !self.not_attempted.is_empty() {
            f.write_str("; ")?;
            write_list(f, "not attempted", &self.not_attempted)?;
        }
        Ok(())
    }
}

/// Outcome of [`ActivatorRegistry::shutdown`](crate::ActivatorRegistry::shutdown).
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Activators stopped, in stop order (reverse of initialization).
    pub stopped: Vec<ActivatorRef>,
    /// Activators whose `stop` failed, with the error.
    pub failed: Vec<(ActivatorRef, BoxError)>,
}

impl ShutdownReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, "stopped", &self.stopped)?;
        for (activator, error) in &self.failed {
            write!(f, "; {activator} failed to stop: {error}")?;
        }
        Ok(())
    }
}
