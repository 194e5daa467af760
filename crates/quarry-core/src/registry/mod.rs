//! Module: registry
//! Responsibility: collecting model and method contributions from modules,
//! validating them, and freezing the result into a shared `Registry`.
//! Does not own: path resolution (see `path`) or dispatch (see `method`).

mod validate;


pub use validate::ValidationErrors;

use crate::{
    config::OrmConfig,
    error::Error,
    method::{Layer, MethodDef, MethodRef, Signature, is_crud},
    model::{ModelDef, field::FieldDef},
    security::GroupId,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("model '{0}' is already registered")]
    DuplicateModel(String),

    #[error("cannot extend unknown model '{0}'")]
    UnknownModel(String),

    #[error("method '{method}' is already declared on model '{model}'")]
    DuplicateMethod { model: String, method: String },

    #[error("cannot extend unknown method '{method}' of model '{model}'")]
    UnknownMethod { model: String, method: String },

    #[error("method name '{method}' is reserved on model '{model}'")]
    ReservedMethod { model: String, method: String },

    #[error("override of '{model}.{method}' declares {found}, base declares {expected}")]
    SignatureMismatch {
        model: String,
        method: String,
        expected: Signature,
        found: Signature,
    },

    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    #[error("group '{0}' would inherit from itself")]
    CyclicGroup(String),

    #[error("path '{path}' of model '{model}' exceeds the maximum depth of {max}")]
    PathTooDeep {
        model: String,
        path: String,
        max: usize,
    },

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
}

///
/// RegistryBuilder
///
/// Mutable registration phase. Contributions are applied in call order,
/// so later modules override earlier ones.
///

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    config: OrmConfig,
    models: BTreeMap<String, ModelDef>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new(config: OrmConfig) -> Self {
        Self {
            config,
            models: BTreeMap::new(),
        }
    }

    /// Register a new model together with its built-in CRUD entries.
    pub fn add_model(&mut self, mut model: ModelDef) -> Result<(), RegistryError> {
        if self.models.contains_key(&model.name) {
            return Err(RegistryError::DuplicateModel(model.name));
        }
        for name in crate::method::CRUD_METHODS {
            model.methods.insert(
                name.to_string(),
                MethodDef::crud(&model.name, name, &self.config.admin_group),
            );
        }
        self.models.insert(model.name.clone(), model);

        Ok(())
    }

    /// Add or override fields of an already registered model.
    pub fn extend_model(
        &mut self,
        model: &str,
        fields: impl IntoIterator<Item = FieldDef>,
    ) -> Result<(), RegistryError> {
        let def = self.model_mut(model)?;
        for field in fields {
            def.put_field(field);
        }

        Ok(())
    }

    /// Declare a method with its base layer.
    pub fn add_method(
        &mut self,
        model: &str,
        name: &str,
        doc: &str,
        signature: Signature,
        base: Layer,
    ) -> Result<(), RegistryError> {
        let def = self.model_mut(model)?;
        if is_crud(name) {
            return Err(RegistryError::ReservedMethod {
                model: model.to_string(),
                method: name.to_string(),
            });
        }
        if def.methods.contains_key(name) {
            return Err(RegistryError::DuplicateMethod {
                model: model.to_string(),
                method: name.to_string(),
            });
        }

        let mut method = MethodDef::new(model, name, doc, signature);
        method.layers.push(base);
        def.methods.insert(name.to_string(), method);

        Ok(())
    }

    /// Stack an override layer on top of an existing method. The override
    /// must declare the exact signature of the base.
    pub fn extend_method(
        &mut self,
        model: &str,
        name: &str,
        signature: &Signature,
        layer: Layer,
    ) -> Result<(), RegistryError> {
        let method = self.method_mut(model, name)?;
        if method.is_builtin() {
            return Err(RegistryError::ReservedMethod {
                model: model.to_string(),
                method: name.to_string(),
            });
        }
        if &method.signature != signature {
            return Err(RegistryError::SignatureMismatch {
                model: model.to_string(),
                method: name.to_string(),
                expected: method.signature.clone(),
                found: signature.clone(),
            });
        }
        method.layers.push(layer);

        Ok(())
    }

    /// Grant execution of a method to `group`, optionally only when called
    /// from one of `callers`.
    pub fn allow_group(
        &mut self,
        model: &str,
        method: &str,
        group: &str,
        callers: impl IntoIterator<Item = MethodRef>,
    ) -> Result<(), RegistryError> {
        let callers: BTreeSet<_> = callers.into_iter().collect();
        self.method_mut(model, method)?
            .access
            .allow(GroupId::new(group), callers);

        Ok(())
    }

    /// Remove the grants of `group` and close the method to everyone not
    /// explicitly granted.
    pub fn revoke_group(
        &mut self,
        model: &str,
        method: &str,
        group: &str,
    ) -> Result<(), RegistryError> {
        self.method_mut(model, method)?
            .access
            .revoke(&GroupId::new(group));

        Ok(())
    }

    /// Validate every contribution and freeze the registry.
    pub fn seal(self) -> Result<Arc<Registry>, RegistryError> {
        let registry = Registry {
            config: self.config,
            models: self.models,
        };
        validate::validate_registry(&registry).map_err(RegistryError::Validation)?;

        tracing::debug!(models = registry.models.len(), "registry sealed");

        Ok(Arc::new(registry))
    }

    fn model_mut(&mut self, model: &str) -> Result<&mut ModelDef, RegistryError> {
        self.models
            .get_mut(model)
            .ok_or_else(|| RegistryError::UnknownModel(model.to_string()))
    }

    fn method_mut(&mut self, model: &str, method: &str) -> Result<&mut MethodDef, RegistryError> {
        self.model_mut(model)?
            .methods
            .get_mut(method)
            .ok_or_else(|| RegistryError::UnknownMethod {
                model: model.to_string(),
                method: method.to_string(),
            })
    }
}

///
/// Registry
///
/// Sealed, read-only model and method metadata shared by every environment.
///

#[derive(Debug)]
pub struct Registry {
    config: OrmConfig,
    models: BTreeMap<String, ModelDef>,
}

impl Registry {
    #[must_use]
    pub const fn config(&self) -> &OrmConfig {
        &self.config
    }

    pub fn model(&self, name: &str) -> Result<&ModelDef, Error> {
        self.models
            .get(name)
            .ok_or_else(|| Error::unknown_model(name))
    }

    #[must_use]
    pub fn get_model(&self, name: &str) -> Option<&ModelDef> {
        self.models.get(name)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDef> {
        self.models.values()
    }

    pub fn method(&self, model: &str, method: &str) -> Result<&MethodDef, Error> {
        self.model(model)?
            .method(method)
            .ok_or_else(|| Error::unknown_method(model, method))
    }
}
