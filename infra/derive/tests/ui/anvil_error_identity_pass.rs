use anvil_derive::anvil_error;
use std::borrow::Cow;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[anvil_error]
pub enum DemoError {
    #[error("Construction of `{type_name}` failed{}: {source}", format_context(.context))]
    Construction { type_name: &'static str, source: BoxError, context: Option<Cow<'static, str>> },

    #[error("Init failed{}: {source}", format_context(.context))]
    Init { source: BoxError, context: Option<Cow<'static, str>> },
}

fn main() {
    let err: DemoError = BoxError::from("boom").into();
    assert!(matches!(err, DemoError::Init { .. }));
}
