use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// State of a single activation record.
///
/// `Pending → Initialized → Stopped`, with `Pending | Initialized → Failed` on error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationState {
    #[default]
    Pending,
    Initialized,
    Failed,
    Stopped,
}

impl ActivationState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Initialized | Self::Failed)
                | (Self::Initialized, Self::Stopped | Self::Failed)
        )
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Initialized => "initialized",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Which routine produced a lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecyclePhase {
    Init,
    Stop,
}

/// Notification published once per activation attempt and once per stop attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub activator: Cow<'static, str>,
    pub phase: LifecyclePhase,
    pub state: ActivationState,
    pub error: Option<String>,
}

impl LifecycleEvent {
    pub fn succeeded(activator: impl Into<Cow<'static, str>>, phase: LifecyclePhase) -> Self {
        let state = match phase {
            LifecyclePhase::Init => ActivationState::Initialized,
            LifecyclePhase::Stop => ActivationState::Stopped,
        };
        Self { activator: activator.into(), phase, state, error: None }
    }

    pub fn failed(
        activator: impl Into<Cow<'static, str>>,
        phase: LifecyclePhase,
        error: impl Into<String>,
    ) -> Self {
        Self {
            activator: activator.into(),
            phase,
            state: ActivationState::Failed,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
