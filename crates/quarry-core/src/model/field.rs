use crate::value::{Value, ValueKind};
use convert_case::{Case, Casing};
use derive_more::Display;
use serde::Serialize;

///
/// FieldKind
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[remain::sorted]
pub enum FieldKind {
    Boolean,
    Char,
    Date,
    DateTime,
    Float,
    Integer,
    Many2Many,
    Many2One,
    One2Many,
    One2One,
    Selection,
    Text,
}

impl FieldKind {
    #[must_use]
    pub const fn is_relation(self) -> bool {
        matches!(
            self,
            Self::Many2Many | Self::Many2One | Self::One2Many | Self::One2One
        )
    }

    #[must_use]
    pub const fn is_to_many(self) -> bool {
        matches!(self, Self::Many2Many | Self::One2Many)
    }

    /// Shape of the values this kind carries.
    #[must_use]
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::Boolean => ValueKind::Bool,
            Self::Char | Self::Date | Self::DateTime | Self::Selection | Self::Text => {
                ValueKind::Text
            }
            Self::Float => ValueKind::Float,
            Self::Integer => ValueKind::Int,
            Self::Many2One | Self::One2One => ValueKind::Ref,
            Self::Many2Many | Self::One2Many => ValueKind::RefList,
        }
    }
}

///
/// FieldDef
///
/// Metadata of one model field. Built by the contributing module, then
/// frozen when the registry is sealed.
///

#[derive(Clone, Debug, Serialize)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) json: String,
    pub(crate) kind: FieldKind,
    pub(crate) stored: bool,
    pub(crate) required: bool,
    pub(crate) copy: bool,

    /// Value stored on create when the caller gives none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) compute: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) related_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) related_model: Option<String>,

    /// Storage name of the inverse many2one on the related model (one2many only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reverse: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) depends: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) help: String,
}

impl FieldDef {
    fn build(name: &str, kind: FieldKind, related_model: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            json: default_json_name(name, kind),
            kind,
            stored: kind != FieldKind::One2Many,
            required: false,
            copy: true,
            default: None,
            compute: None,
            related_path: None,
            related_model,
            reverse: None,
            depends: Vec::new(),
            help: String::new(),
        }
    }

    /// Scalar field. Relation kinds must use the dedicated constructors.
    #[must_use]
    pub fn scalar(name: &str, kind: FieldKind) -> Self {
        debug_assert!(!kind.is_relation(), "relation field '{name}' built as scalar");
        Self::build(name, kind, None)
    }

    #[must_use]
    pub fn char(name: &str) -> Self {
        Self::scalar(name, FieldKind::Char)
    }

    #[must_use]
    pub fn text(name: &str) -> Self {
        Self::scalar(name, FieldKind::Text)
    }

    #[must_use]
    pub fn integer(name: &str) -> Self {
        Self::scalar(name, FieldKind::Integer)
    }

    #[must_use]
    pub fn float(name: &str) -> Self {
        Self::scalar(name, FieldKind::Float)
    }

    #[must_use]
    pub fn boolean(name: &str) -> Self {
        Self::scalar(name, FieldKind::Boolean)
    }

    #[must_use]
    pub fn many2one(name: &str, model: &str) -> Self {
        Self::build(name, FieldKind::Many2One, Some(model.to_string()))
    }

    #[must_use]
    pub fn one2one(name: &str, model: &str) -> Self {
        Self::build(name, FieldKind::One2One, Some(model.to_string()))
    }

    #[must_use]
    pub fn many2many(name: &str, model: &str) -> Self {
        Self::build(name, FieldKind::Many2Many, Some(model.to_string()))
    }

    /// One2many relation; `reverse` is the inverse many2one on `model`.
    #[must_use]
    pub fn one2many(name: &str, model: &str, reverse: &str) -> Self {
        let mut field = Self::build(name, FieldKind::One2Many, Some(model.to_string()));
        field.reverse = Some(reverse.to_string());
        field
    }

    // ------------------------------------------------------------------
    // Builder options
    // ------------------------------------------------------------------

    #[must_use]
    pub fn json(mut self, json: &str) -> Self {
        self.json = json.to_string();
        self
    }

    #[must_use]
    pub const fn stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Leave the field out of `RecordSet::copy`.
    #[must_use]
    pub const fn no_copy(mut self) -> Self {
        self.copy = false;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Compute the value with `method`; not stored unless `stored(true)` follows.
    #[must_use]
    pub fn compute(mut self, method: &str) -> Self {
        self.compute = Some(method.to_string());
        self.stored = false;
        self
    }

    /// Mirror the value found at `path` (semantic names, relative to this model).
    #[must_use]
    pub fn related(mut self, path: &str) -> Self {
        self.related_path = Some(path.to_string());
        self.stored = false;
        self
    }

    #[must_use]
    pub fn depends<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn json_name(&self) -> &str {
        &self.json
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub const fn is_stored(&self) -> bool {
        self.stored
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub const fn is_copied(&self) -> bool {
        self.copy
    }

    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[must_use]
    pub const fn is_computed(&self) -> bool {
        self.compute.is_some()
    }

    #[must_use]
    pub const fn is_related(&self) -> bool {
        self.related_path.is_some()
    }

    #[must_use]
    pub const fn is_relation_field(&self) -> bool {
        self.related_model.is_some()
    }

    #[must_use]
    pub fn compute_method(&self) -> Option<&str> {
        self.compute.as_deref()
    }

    #[must_use]
    pub fn related_path(&self) -> Option<&str> {
        self.related_path.as_deref()
    }

    #[must_use]
    pub fn related_model(&self) -> Option<&str> {
        self.related_model.as_deref()
    }

    #[must_use]
    pub fn reverse(&self) -> Option<&str> {
        self.reverse.as_deref()
    }

    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.depends
    }

    #[must_use]
    pub fn help_text(&self) -> &str {
        &self.help
    }
}

// default_json_name
// snake_case of the semantic name, with the relation suffix convention
fn default_json_name(name: &str, kind: FieldKind) -> String {
    let base = name.to_case(Case::Snake);
    match kind {
        FieldKind::Many2One | FieldKind::One2One => format!("{base}_id"),
        FieldKind::Many2Many | FieldKind::One2Many => format!("{base}_ids"),
        _ => base,
    }
}
