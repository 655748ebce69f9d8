use std::borrow::Cow;

/// Errors that can occur during event bus operations.
#[anvil_derive::anvil_error]
pub enum EventBusError {
    /// A channel holds a sender of another event type. Indicates a broken registry invariant.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The event type is already delivered with the other [`crate::ChannelKind`].
    #[error("Channel kind mismatch{}: {message}", format_context(.context))]
    ChannelKindMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
