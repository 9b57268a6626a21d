//! Built-in step types

mod account;
mod entry;
mod one_time_code;
mod password;
mod prompt;
mod result;
mod variables;

pub use account::{CheckUsernameAvailable, CreateUser};
pub use entry::Init;
pub use one_time_code::OneTimeCode;
pub use password::ValidateUsernamePassword;
pub use prompt::PromptStep;
pub use result::{FailureResult, SuccessResult};
pub use variables::SetVariable;

use authflow_core::ExecutionState;

/// Context value that is present and not blank
pub(crate) fn non_empty<'a>(state: &'a ExecutionState, key: &str) -> Option<&'a str> {
    state.get(key).map(str::trim).filter(|v| !v.is_empty())
}
