use crate::error::{Error, ErrorKind};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap};

///
/// FieldMap
///
/// Field name (semantic or storage) to value, as exchanged with callers and storage.
///

pub type FieldMap = BTreeMap<String, Value>;

///
/// RecordId
///
/// Row identifier. `0` never designates a stored row and is what an unset
/// relation compares equal to.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

///
/// UserId
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

///
/// Value
///
/// Tagged value flowing between conditions, caches and storage.
/// Relation fields carry `Ref` (to-one) or `RefList` (to-many); every other
/// field carries a scalar. `Null` is an unset value of any kind.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Ref(RecordId),
    RefList(Vec<RecordId>),
    List(Vec<Self>),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Ref(_) => ValueKind::Ref,
            Self::RefList(_) => ValueKind::RefList,
            Self::List(_) => ValueKind::List,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Record identifiers referenced by this value, if any.
    #[must_use]
    pub fn ref_ids(&self) -> Vec<RecordId> {
        match self {
            Self::Ref(id) if id.get() != 0 => vec![*id],
            Self::Int(id) if *id != 0 => vec![RecordId::new(*id)],
            Self::RefList(ids) => ids.clone(),
            Self::List(items) => items.iter().flat_map(Self::ref_ids).collect(),
            _ => Vec::new(),
        }
    }

    /// Partial comparison used by condition evaluation.
    ///
    /// Integers, floats and references compare numerically; `Null` only
    /// compares equal to `Null` and to an unset reference (`0`).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Null, v) | (v, Self::Null) => v.as_number().filter(|n| *n == 0.0).map(|_| Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::RefList(a), Self::RefList(b)) => Some(a.cmp(b)),
            (a, b) => a.as_number()?.partial_cmp(&b.as_number()?),
        }
    }

    /// Total order used for sorting: `Null` first, then by `compare`,
    /// incomparable values are treated as equal.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    #[expect(clippy::cast_precision_loss)]
    const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Ref(id) => Some(id.get() as f64),
            _ => None,
        }
    }
}

///
/// ValueKind
///
/// Shape tag used by method signatures.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[remain::sorted]
pub enum ValueKind {
    Any,
    Bool,
    Float,
    Int,
    List,
    Null,
    Ref,
    RefList,
    Text,
}

impl ValueKind {
    /// Whether a value may be passed where this kind is declared.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            _ if value.is_null() => true,
            Self::Float => matches!(value, Value::Float(_) | Value::Int(_)),
            Self::Ref => matches!(value, Value::Ref(_) | Value::Int(_)),
            kind => value.kind() == kind,
        }
    }
}

// ----------------------------------------------------------------------
// Conversions into Value
// ----------------------------------------------------------------------

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<RecordId> for Value {
    fn from(v: RecordId) -> Self {
        Self::Ref(v)
    }
}

impl From<Vec<RecordId>> for Value {
    fn from(v: Vec<RecordId>) -> Self {
        Self::RefList(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ----------------------------------------------------------------------
// Conversions out of Value (typed accessors)
// ----------------------------------------------------------------------

fn invalid(expected: ValueKind, found: &Value) -> Error {
    ErrorKind::InvalidValue {
        expected,
        found: found.kind(),
    }
    .into()
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Text(s) => Ok(s),
            Value::Null => Ok(Self::new()),
            other => Err(invalid(ValueKind::Text, &other)),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(n) => Ok(n),
            Value::Ref(id) => Ok(id.get()),
            Value::Null => Ok(0),
            other => Err(invalid(ValueKind::Int, &other)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    #[expect(clippy::cast_precision_loss)]
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as Self),
            Value::Null => Ok(0.0),
            other => Err(invalid(ValueKind::Float, &other)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(invalid(ValueKind::Bool, &other)),
        }
    }
}

impl TryFrom<Value> for Option<RecordId> {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Ref(id) if id.get() == 0 => Ok(None),
            Value::Ref(id) => Ok(Some(id)),
            Value::Null => Ok(None),
            other => Err(invalid(ValueKind::Ref, &other)),
        }
    }
}

impl TryFrom<Value> for Vec<RecordId> {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::RefList(ids) => Ok(ids),
            Value::Null => Ok(Self::new()),
            other => Err(invalid(ValueKind::RefList, &other)),
        }
    }
}
