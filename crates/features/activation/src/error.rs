use anvil_domain::ActivationState;
use anvil_kernel::BoxError;
use std::borrow::Cow;

#[anvil_derive::anvil_error]
pub enum ActivationError {
    #[error("Dependency cycle{}: {}", format_context(.context), .path.join(" -> "))]
    DependencyCycle { path: Vec<&'static str>, context: Option<Cow<'static, str>> },

    #[error("Activator {activator} depends on unknown activator `{dependency}`{}", format_context(.context))]
    UnknownDependency {
        activator: &'static str,
        dependency: String,
        context: Option<Cow<'static, str>>,
    },

    #[error("Activation of {activator} failed{}: {source}", format_context(.context))]
    ActivationFailed {
        activator: &'static str,
        source: BoxError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Activator {activator} is {state}{}", format_context(.context))]
    InvalidState {
        activator: &'static str,
        state: ActivationState,
        context: Option<Cow<'static, str>>,
    },
}
