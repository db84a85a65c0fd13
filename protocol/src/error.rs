use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Missing {0}; provide it or set it on-chain first")]
    Missing(&'static str),
    #[error("Invalid {label}: expected a non-negative integer, got {found}")]
    InvalidAmount { label: &'static str, found: String },
    #[error("Unexpected result shape: expected {expected}, got {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Empty {0} id")]
    Empty(&'static str),
    #[error("Invalid {kind} id {found:?}, expected prefix {prefix:?}")]
    BadPrefix {
        kind: &'static str,
        prefix: &'static str,
        found: String,
    },
}
