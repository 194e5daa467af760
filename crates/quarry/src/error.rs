use derive_more::Display;
use quarry_core::error::{
    Error as CoreError, ErrorClass as CoreErrorClass, ErrorOrigin as CoreErrorOrigin,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Acting user when the failure crossed an environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<i64>,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
            user: None,
        }
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        Self {
            kind: err.class().into(),
            origin: err.origin().into(),
            message: err.kind.to_string(),
            user: err.user.map(|uid| uid.get()),
        }
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// A model, field or method name does not exist.
    NotFound,

    /// Malformed request: bad path, signature, operator or registry content.
    Invalid,

    /// Method execution control or a record rule refused the operation.
    Denied,

    /// The record set had the wrong number of records.
    Cardinality,

    /// The storage collaborator failed.
    Storage,

    /// The caller cannot remediate this.
    Internal,
}

impl From<CoreErrorClass> for ErrorKind {
    fn from(class: CoreErrorClass) -> Self {
        match class {
            CoreErrorClass::NotFound => Self::NotFound,
            CoreErrorClass::Invalid => Self::Invalid,
            CoreErrorClass::Denied => Self::Denied,
            CoreErrorClass::Cardinality => Self::Cardinality,
            CoreErrorClass::Storage => Self::Storage,
            CoreErrorClass::Internal => Self::Internal,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Registry,
    Path,
    Condition,
    RecordSet,
    Method,
    Security,
    Storage,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Registry => Self::Registry,
            CoreErrorOrigin::Path => Self::Path,
            CoreErrorOrigin::Condition => Self::Condition,
            CoreErrorOrigin::RecordSet => Self::RecordSet,
            CoreErrorOrigin::Method => Self::Method,
            CoreErrorOrigin::Security => Self::Security,
            CoreErrorOrigin::Storage => Self::Storage,
        }
    }
}

///
/// TESTS
///
