use crate::algorithm::InstanceState;
use crate::event::EventType;
use crate::field::FieldType;
use thiserror::Error;

/// A probing engine error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A probing engine error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("allocation failure")]
    AllocationFailure,
    #[error("probe failed to send: {0}")]
    ProbeSendFailure(String),
    #[error("no samples")]
    EmptyInput,
    #[error("cannot handle {event} in state {state}")]
    InvalidState {
        state: InstanceState,
        event: EventType,
    },
    #[error("algorithm aborted")]
    Aborted,
    #[error("field error: {0}")]
    Field(#[from] FieldError),
}

/// A field error result.
pub type FieldResult<T> = std::result::Result<T, FieldError>;

/// A field construction or extraction error.
///
/// These errors are recoverable: a predicate which fails to extract a field
/// treats the failure as "no information" rather than aborting.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum FieldError {
    #[error("invalid field type tag: {0}")]
    InvalidType(u8),
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: FieldType,
        actual: FieldType,
    },
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("value {value} out of range for {field_type}")]
    ValueOutOfRange { field_type: FieldType, value: u128 },
    #[error("invalid length for {field_type}: expected={expected}, provided={provided}")]
    InvalidLength {
        field_type: FieldType,
        expected: usize,
        provided: usize,
    },
    #[error("invalid utf-8 string")]
    InvalidString,
}
