pub mod field;

use crate::{
    ID_FIELD, ID_JSON,
    method::MethodDef,
    model::field::{FieldDef, FieldKind},
};
use convert_case::{Case, Casing};
use std::collections::BTreeMap;

///
/// ModelDef
///
/// A named schema unit: fields keyed by semantic name, methods keyed by
/// name, and the default ordering used by searches and `sorted_default`.
///

#[derive(Clone, Debug)]
pub struct ModelDef {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) fields: BTreeMap<String, FieldDef>,
    pub(crate) json_index: BTreeMap<String, String>,
    pub(crate) default_order: Vec<String>,
    pub(crate) methods: BTreeMap<String, MethodDef>,
}

impl ModelDef {
    /// Create a model owning only its primary key.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut model = Self {
            name: name.to_string(),
            table: name.to_case(Case::Snake),
            fields: BTreeMap::new(),
            json_index: BTreeMap::new(),
            default_order: vec![ID_FIELD.to_string()],
            methods: BTreeMap::new(),
        };
        model.put_field(
            FieldDef::scalar(ID_FIELD, FieldKind::Integer)
                .json(ID_JSON)
                .no_copy(),
        );

        model
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.put_field(field);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        for field in fields {
            self.put_field(field);
        }
        self
    }

    /// Replace the default order (semantic field names, optional `desc` suffix).
    #[must_use]
    pub fn with_default_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_order = order.into_iter().map(Into::into).collect();
        self
    }

    // add or override a field, keeping the json index consistent
    pub(crate) fn put_field(&mut self, field: FieldDef) {
        if let Some(previous) = self.fields.get(&field.name) {
            self.json_index.remove(&previous.json);
        }
        self.json_index
            .insert(field.json.clone(), field.name.clone());
        self.fields.insert(field.name.clone(), field);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Look up a field by semantic name, falling back to its storage name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name).or_else(|| {
            self.json_index
                .get(name)
                .and_then(|semantic| self.fields.get(semantic))
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    #[must_use]
    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.values()
    }
}
