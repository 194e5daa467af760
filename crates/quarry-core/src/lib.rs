//! Core of the Quarry record-set ORM: model registry, path resolution,
//! conditions, lazily loaded record sets, layered methods, and security.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod condition;
pub mod config;
pub mod env;
pub mod error;
pub mod method;
pub mod model;
pub mod path;
pub mod recordset;
pub mod registry;
pub mod security;
pub mod storage;
mod stored;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Separator between the segments of a field path.
pub const EXPR_SEP: &str = ".";

/// Semantic name of every model's primary key.
pub const ID_FIELD: &str = "ID";

/// Storage name of every model's primary key.
pub const ID_JSON: &str = "id";

///
/// Prelude
///
/// Vocabulary needed to declare models and query them.
///

pub mod prelude {
    pub use crate::{
        condition::{Condition, Operator},
        env::Environment,
        method::{Call, Layer, Signature},
        model::{ModelDef, field::{FieldDef, FieldKind}},
        recordset::RecordSet,
        registry::{Registry, RegistryBuilder},
        value::{FieldMap, RecordId, UserId, Value, ValueKind},
    };
}
