//! Shared fixtures: a small blog schema, an in-memory store, and a group
//! registry with one administrator and one plain user.

use crate::{
    config::OrmConfig,
    env::Environment,
    method::{Layer, Signature},
    model::{ModelDef, field::FieldDef},
    registry::{Registry, RegistryBuilder},
    security::{Group, GroupRegistry},
    storage::MemoryStore,
    value::{FieldMap, RecordId, UserId, Value, ValueKind},
};
use std::sync::Arc;

pub const ADMIN: UserId = UserId::new(2);
pub const USER: UserId = UserId::new(3);
pub const USER_GROUP: &str = "base_group_user";

pub fn builder() -> RegistryBuilder {
    let mut b = RegistryBuilder::new(OrmConfig::default());

    b.add_model(
        ModelDef::new("User")
            .with_fields([
                FieldDef::char("Name").required(),
                FieldDef::char("Email"),
                FieldDef::char("Password").no_copy(),
                FieldDef::char("Lang").default_value("en"),
                FieldDef::boolean("Active"),
                FieldDef::boolean("IsStaff"),
                FieldDef::integer("Age"),
                FieldDef::many2one("Profile", "Profile"),
                FieldDef::one2many("Posts", "Post", "user_id"),
                FieldDef::integer("Nums").compute("compute_nums"),
                FieldDef::char("DecoratedName")
                    .compute("compute_decorated_name")
                    .stored(true)
                    .depends(["Name"]),
                FieldDef::float("PMoney").related("Profile.Money"),
            ])
            .with_default_order(["Name"]),
    )
    .unwrap();

    b.add_model(ModelDef::new("Profile").with_fields([
        FieldDef::integer("Age"),
        FieldDef::float("Money"),
        FieldDef::char("City"),
        FieldDef::many2one("BestPost", "Post"),
        FieldDef::char("UserName").related("BestPost.User.Name"),
    ]))
    .unwrap();

    b.add_model(
        ModelDef::new("Post")
            .with_fields([
                FieldDef::char("Title"),
                FieldDef::text("Content"),
                FieldDef::many2one("User", "User"),
                FieldDef::many2many("Tags", "Tag"),
                FieldDef::char("Name").related("Title"),
            ])
            .with_default_order(["Title"]),
    )
    .unwrap();

    b.add_model(ModelDef::new("Tag").with_fields([
        FieldDef::char("Name"),
        FieldDef::char("Description"),
    ]))
    .unwrap();

    b.add_model(ModelDef::new("Comment").with_fields([
        FieldDef::many2one("Post", "Post"),
        FieldDef::text("Text"),
    ]))
    .unwrap();

    b.add_method(
        "User",
        "compute_nums",
        "Number of posts written by the user.",
        Signature::new([], ValueKind::Int),
        Layer::new("base", |_, rs, _| {
            let posts = rs.get("Posts")?.ref_ids().len();
            Ok(Value::Int(i64::try_from(posts).unwrap_or(i64::MAX)))
        }),
    )
    .unwrap();

    b.add_method(
        "User",
        "compute_decorated_name",
        "",
        Signature::new([], ValueKind::Text),
        Layer::new("base", |_, rs, _| {
            let name: String = rs.get_as("Name")?;
            Ok(Value::Text(format!("User: {name}")))
        }),
    )
    .unwrap();

    b
}

pub fn registry() -> Arc<Registry> {
    builder().seal().unwrap()
}

///
/// Fixture
///

pub struct Fixture {
    pub registry: Arc<Registry>,
    pub store: Arc<MemoryStore>,
    pub groups: Arc<GroupRegistry>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_registry(registry())
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        let groups = GroupRegistry::new();
        let admin_group = registry.config().admin_group.clone();
        groups
            .add_group(Group::new(USER_GROUP, "Internal User"))
            .unwrap();
        groups
            .add_group(Group::new(&admin_group, "Administrator").inherits(USER_GROUP))
            .unwrap();
        groups.add_membership(ADMIN, &admin_group).unwrap();
        groups.add_membership(USER, USER_GROUP).unwrap();

        Self {
            store: Arc::new(MemoryStore::new(Arc::clone(&registry))),
            registry,
            groups: Arc::new(groups),
        }
    }

    pub fn env(&self, uid: UserId) -> Environment {
        Environment::new(
            Arc::clone(&self.registry),
            self.store.clone(),
            self.groups.clone(),
            uid,
        )
    }

    pub fn admin(&self) -> Environment {
        self.env(ADMIN)
    }

    /// Insert a record as the superuser.
    pub fn seed(&self, model: &str, values: &[(&str, Value)]) -> RecordId {
        let values: FieldMap = values
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();

        self.admin()
            .sudo()
            .pool(model)
            .unwrap()
            .create(&values)
            .unwrap()
            .ensure_one()
            .unwrap()
    }
}

pub fn fields(values: &[(&str, Value)]) -> FieldMap {
    values
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}
