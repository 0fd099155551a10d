use thiserror::Error;

/// Input the user typed that can't be accepted. Rejected locally without touching the state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("'{0}' is not a positive annual salary")]
    InvalidSalary(String),
    #[error("The typed phrase doesn't match the challenge")]
    PhraseMismatch,
}
