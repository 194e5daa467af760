use crate::{
    registry::RegistryError,
    value::{UserId, ValueKind},
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured failure raised anywhere in the core. Carries the offending
/// model / field / method names in its kind and, once it crosses an
/// Environment boundary, the acting user.
///

#[derive(Debug, ThisError)]
#[error("{}:{}: {}{}", .kind.origin(), .kind.class(), .kind, user_suffix(.user))]
pub struct Error {
    pub kind: ErrorKind,
    pub user: Option<UserId>,
}

impl Error {
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, user: None }
    }

    /// Stamp the acting user unless an inner layer already did.
    #[must_use]
    pub fn for_user(mut self, uid: UserId) -> Self {
        self.user.get_or_insert(uid);
        self
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        self.kind.origin()
    }

    pub(crate) fn unknown_model(model: impl Into<String>) -> Self {
        ErrorKind::UnknownModel {
            model: model.into(),
        }
        .into()
    }

    pub(crate) fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        ErrorKind::UnknownField {
            model: model.into(),
            field: field.into(),
        }
        .into()
    }

    pub(crate) fn not_a_relation(model: impl Into<String>, field: impl Into<String>) -> Self {
        ErrorKind::NotARelation {
            model: model.into(),
            field: field.into(),
        }
        .into()
    }

    pub(crate) fn unknown_method(model: impl Into<String>, method: impl Into<String>) -> Self {
        ErrorKind::UnknownMethod {
            model: model.into(),
            method: method.into(),
        }
        .into()
    }

    pub(crate) fn denied(
        model: impl Into<String>,
        method: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        ErrorKind::PermissionDenied {
            model: model.into(),
            method: method.map(ToString::to_string),
            reason: reason.into(),
        }
        .into()
    }

    pub(crate) fn storage(model: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorKind::Storage {
            model: model.into(),
            message: message.into(),
        }
        .into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Self::new(ErrorKind::Registry(err))
    }
}

#[expect(clippy::ref_option)]
fn user_suffix(user: &Option<UserId>) -> String {
    user.map(|uid| format!(" [user {uid}]")).unwrap_or_default()
}

///
/// ErrorKind
///

#[derive(Debug, ThisError)]
pub enum ErrorKind {
    #[error("unknown model '{model}'")]
    UnknownModel { model: String },

    #[error("unknown field '{field}' in model '{model}'")]
    UnknownField { model: String, field: String },

    #[error("field '{field}' of model '{model}' is not a relation")]
    NotARelation { model: String, field: String },

    #[error("unknown method '{method}' on model '{model}'")]
    UnknownMethod { model: String, method: String },

    #[error("no more layers to call for method '{method}' of model '{model}'")]
    NoMoreLayers { model: String, method: String },

    #[error("method '{method}' of model '{model}' expects {expected}, got ({found})")]
    SignatureMismatch {
        model: String,
        method: String,
        expected: String,
        found: String,
    },

    #[error("permission denied on model '{model}'{}: {reason}", method_suffix(.method.as_deref()))]
    PermissionDenied {
        model: String,
        method: Option<String>,
        reason: String,
    },

    #[error("'{operation}' on model '{model}' requires at least one record")]
    EmptyRecordSet {
        model: String,
        operation: &'static str,
    },

    #[error("'{operation}' on model '{model}' expects a single record, got {count}")]
    MultipleRecords {
        model: String,
        operation: &'static str,
        count: usize,
    },

    #[error("computing field '{field}' of model '{model}' failed: {source}")]
    Compute {
        model: String,
        field: String,
        source: Box<Error>,
    },

    #[error("storage failure on model '{model}': {message}")]
    Storage { model: String, message: String },

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("expected a {expected} value, found {found}")]
    InvalidValue {
        expected: ValueKind,
        found: ValueKind,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn method_suffix(method: Option<&str>) -> String {
    method.map(|m| format!(" (method '{m}')")).unwrap_or_default()
}

impl ErrorKind {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownModel { .. } | Self::UnknownField { .. } | Self::UnknownMethod { .. } => {
                ErrorClass::NotFound
            }
            Self::NotARelation { .. }
            | Self::SignatureMismatch { .. }
            | Self::UnknownOperator(_)
            | Self::InvalidValue { .. }
            | Self::Registry(_) => ErrorClass::Invalid,
            Self::PermissionDenied { .. } => ErrorClass::Denied,
            Self::EmptyRecordSet { .. } | Self::MultipleRecords { .. } => ErrorClass::Cardinality,
            Self::Storage { .. } => ErrorClass::Storage,
            Self::NoMoreLayers { .. } | Self::Compute { .. } => ErrorClass::Internal,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::UnknownModel { .. } | Self::Registry(_) => ErrorOrigin::Registry,
            Self::UnknownField { .. } | Self::NotARelation { .. } => ErrorOrigin::Path,
            Self::UnknownOperator(_) | Self::InvalidValue { .. } => ErrorOrigin::Condition,
            Self::EmptyRecordSet { .. } | Self::MultipleRecords { .. } | Self::Compute { .. } => {
                ErrorOrigin::RecordSet
            }
            Self::UnknownMethod { .. }
            | Self::NoMoreLayers { .. }
            | Self::SignatureMismatch { .. } => ErrorOrigin::Method,
            Self::PermissionDenied { .. } => ErrorOrigin::Security,
            Self::Storage { .. } => ErrorOrigin::Storage,
        }
    }
}

///
/// ErrorClass
/// Runtime classification of a failure.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    NotFound,
    Invalid,
    Denied,
    Cardinality,
    Storage,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::Invalid => "invalid",
            Self::Denied => "denied",
            Self::Cardinality => "cardinality",
            Self::Storage => "storage",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Component that detected the failure.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Registry,
    Path,
    Condition,
    RecordSet,
    Method,
    Security,
    Storage,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registry => "registry",
            Self::Path => "path",
            Self::Condition => "condition",
            Self::RecordSet => "record_set",
            Self::Method => "method",
            Self::Security => "security",
            Self::Storage => "storage",
        };
        write!(f, "{label}")
    }
}
