use anvil_activation::ActivationError;
use anvil_kernel::LoadError;
use anvil_store::StoreError;
use std::borrow::Cow;

#[anvil_derive::anvil_error]
pub enum AnvilError {
    #[error("Configuration error{}: {source}", format_context(.context))]
    Store { source: StoreError, context: Option<Cow<'static, str>> },

    #[error("Module load failed{}: {source}", format_context(.context))]
    Load { source: LoadError, context: Option<Cow<'static, str>> },

    #[error("Activation error{}: {source}", format_context(.context))]
    Activation { source: ActivationError, context: Option<Cow<'static, str>> },
}
