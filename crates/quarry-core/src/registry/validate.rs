use crate::{
    EXPR_SEP,
    model::{ModelDef, field::FieldKind},
    registry::Registry,
};
use std::{collections::BTreeMap, fmt};

///
/// ValidationErrors
///
/// Every problem found while sealing, reported together.
///

#[derive(Debug, Default)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}

/// Run registry validation in a fixed order: per-model structure first,
/// then cross-model references that need the full model set.
pub(crate) fn validate_registry(registry: &Registry) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::new();

    // Phase 1: local invariants.
    for model in registry.models() {
        validate_names(model, &mut errs);
        validate_methods(model, &mut errs);
        validate_defaults(model, &mut errs);
    }

    // Phase 2: invariants spanning models.
    for model in registry.models() {
        validate_relations(registry, model, &mut errs);
        validate_derived_fields(registry, model, &mut errs);
        validate_default_order(model, &mut errs);
    }

    errs.result()
}

fn validate_names(model: &ModelDef, errs: &mut ValidationErrors) {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();

    for field in model.fields() {
        if field.name().contains(EXPR_SEP) || field.json_name().contains(EXPR_SEP) {
            err!(
                errs,
                "model '{}', field '{}': names must not contain '{EXPR_SEP}'",
                model.name(),
                field.name()
            );
        }
        if let Some(other) = seen.insert(field.json_name(), field.name()) {
            err!(
                errs,
                "model '{}': fields '{other}' and '{}' share storage name '{}'",
                model.name(),
                field.name(),
                field.json_name()
            );
        }
    }
}

fn validate_methods(model: &ModelDef, errs: &mut ValidationErrors) {
    for field in model.fields() {
        let Some(method) = field.compute_method() else {
            continue;
        };
        match model.method(method) {
            Some(def) if !def.is_builtin() => {}
            _ => err!(
                errs,
                "model '{}', field '{}': compute method '{method}' is not declared",
                model.name(),
                field.name()
            ),
        }
    }
}

fn validate_defaults(model: &ModelDef, errs: &mut ValidationErrors) {
    for field in model.fields() {
        let Some(value) = field.default() else {
            continue;
        };
        if !field.kind().value_kind().accepts(value) {
            err!(
                errs,
                "model '{}', field '{}': default {value:?} does not fit a {} field",
                model.name(),
                field.name(),
                field.kind()
            );
        }
    }
}

fn validate_relations(registry: &Registry, model: &ModelDef, errs: &mut ValidationErrors) {
    for field in model.fields() {
        let Some(target_name) = field.related_model() else {
            continue;
        };
        let Some(target) = registry.get_model(target_name) else {
            err!(
                errs,
                "model '{}', field '{}': related model '{target_name}' is not registered",
                model.name(),
                field.name()
            );
            continue;
        };

        if field.kind() != FieldKind::One2Many {
            continue;
        }
        let reverse = field.reverse().unwrap_or_default();
        let points_back = target.field(reverse).is_some_and(|inverse| {
            !inverse.kind().is_to_many() && inverse.related_model() == Some(model.name())
        });
        if !points_back {
            err!(
                errs,
                "model '{}', field '{}': reverse '{reverse}' is not a to-one relation of '{}' back to '{}'",
                model.name(),
                field.name(),
                target.name(),
                model.name()
            );
        }
    }
}

fn validate_derived_fields(registry: &Registry, model: &ModelDef, errs: &mut ValidationErrors) {
    for field in model.fields() {
        if let Some(path) = field.related_path() {
            match registry.resolve_path(model.name(), path) {
                Ok(resolved) if resolved.leaf().kind() != field.kind() => err!(
                    errs,
                    "model '{}', field '{}': related path '{path}' ends on a {} field, expected {}",
                    model.name(),
                    field.name(),
                    resolved.leaf().kind(),
                    field.kind()
                ),
                Ok(_) => {}
                Err(e) => err!(
                    errs,
                    "model '{}', field '{}': related path: {e}",
                    model.name(),
                    field.name()
                ),
            }
        }

        for dep in field.dependencies() {
            if let Err(e) = registry.resolve_path(model.name(), dep) {
                err!(
                    errs,
                    "model '{}', field '{}': dependency: {e}",
                    model.name(),
                    field.name()
                );
            }
        }
    }
}

fn validate_default_order(model: &ModelDef, errs: &mut ValidationErrors) {
    for term in model.default_order() {
        let name = term.split_whitespace().next().unwrap_or_default();
        if model.field(name).is_none() {
            err!(
                errs,
                "model '{}': default order references unknown field '{name}'",
                model.name()
            );
        }
    }
}
