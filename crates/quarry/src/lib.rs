//! ## Crate layout
//! - `build`: code generator for typed record sets and query builders.
//! - `core`: registry, field paths, conditions, record sets, layered
//!   methods and record security.
//! - `error`: public error taxonomy for callers.
//!
//! The `prelude` module mirrors the surface used by application modules.

pub use quarry_build as build;
pub use quarry_core as core;

pub mod error;

pub use error::Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        condition::{Condition, ConditionField, Operator},
        config::OrmConfig,
        env::Environment,
        method::{Call, Layer, MethodRef, Signature},
        model::{ModelDef, field::{FieldDef, FieldKind}},
        recordset::RecordSet,
        registry::{Registry, RegistryBuilder},
        security::{Group, GroupRegistry, Permission, RecordRule, SecurityRegistry},
        storage::{MemoryStore, SearchParams, Transaction},
        value::{FieldMap, RecordId, UserId, Value, ValueKind},
    };
    pub use serde::{Deserialize, Serialize};
}
