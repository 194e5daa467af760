//! Runtime configuration captured by the registry when it is sealed.

use crate::value::UserId;
use serde::Deserialize;

///
/// OrmConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OrmConfig {
    /// User that bypasses method execution control and record rules.
    pub superuser_id: UserId,

    /// Group granted the CRUD methods of every model by default.
    pub admin_group: String,

    /// Display-name field searched when a string is compared to a relation.
    pub name_field: String,

    /// Upper bound on related-name expansion depth.
    pub max_path_depth: usize,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            superuser_id: UserId::new(1),
            admin_group: "base_group_system".to_string(),
            name_field: "Name".to_string(),
            max_path_depth: 16,
        }
    }
}
