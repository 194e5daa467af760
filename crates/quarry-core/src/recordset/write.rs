use crate::{
    EXPR_SEP,
    error::Error,
    model::field::{FieldDef, FieldKind},
    recordset::RecordSet,
    security::{Permission, combinator},
    value::{FieldMap, RecordId, Value},
};
use std::sync::Arc;

impl RecordSet {
    /// Insert one record from `values` (semantic or storage keys) and
    /// return it. Non-stored keys are ignored, missing stored fields take
    /// their default, and stored computed fields are filled in afterwards.
    pub fn create(&self, values: &FieldMap) -> Result<Self, Error> {
        self.run_create(values).map_err(|e| self.env.fail(e))
    }

    fn run_create(&self, values: &FieldMap) -> Result<Self, Error> {
        combinator::check_crud(&self.env, &self.model, "create")?;

        let registry = Arc::clone(self.env.registry());
        let model = registry.model(&self.model)?;
        let mut stored = registry.filter_stored_values(&self.model, values)?;
        for field in model.fields().filter(|field| field.is_stored()) {
            if let Some(default) = field.default() {
                stored
                    .entry(field.json_name().to_string())
                    .or_insert_with(|| default.clone());
            }
        }
        let id = self.env.transaction().create(model, &stored)?;
        tracing::debug!(model = %self.model, %id, "created");

        let created = Self::new(self.env.clone(), &self.model).derive(vec![id]);
        combinator::check_records(&created, Permission::CREATE)?;

        let computed: Vec<&FieldDef> = model
            .fields()
            .filter(|field| field.is_stored() && field.is_computed())
            .collect();
        created.recompute(&computed)?;

        Ok(created)
    }

    /// Duplicate the single record of the set with `overrides` applied.
    ///
    /// Stored fields are copied unless marked `no_copy`; computed fields are
    /// recomputed and one2many children are duplicated onto the copy.
    pub fn copy(&self, overrides: &FieldMap) -> Result<Self, Error> {
        self.run_copy(overrides).map_err(|e| self.env.fail(e))
    }

    fn run_copy(&self, overrides: &FieldMap) -> Result<Self, Error> {
        let source = self.one("copy")?;

        let registry = Arc::clone(self.env.registry());
        let model = registry.model(&self.model)?;
        let overridden: Vec<&str> = overrides
            .keys()
            .filter_map(|key| model.field(key).map(FieldDef::name))
            .collect();

        let mut values = overrides.clone();
        let mut children = Vec::new();
        for field in model.fields() {
            if !field.is_copied() || field.is_computed() || overridden.contains(&field.name()) {
                continue;
            }
            if field.kind() == FieldKind::One2Many && !field.is_related() {
                children.push(field);
            } else if field.is_stored() {
                values.insert(field.name().to_string(), self.value(field.name())?);
            }
        }

        let copy = self.run_create(&values)?;
        let id = copy.one("copy")?;
        for field in children {
            let reverse = field.reverse().unwrap_or_default();
            for child in self.related_set(field)?.records() {
                let link = FieldMap::from([(reverse.to_string(), Value::from(id))]);
                child.run_copy(&link)?;
            }
        }
        tracing::debug!(model = %self.model, %source, %id, "copied");

        Ok(copy)
    }

    /// Write `values` to every record of the set and recompute the stored
    /// computed fields that depend on them.
    pub fn write(&self, values: &FieldMap) -> Result<(), Error> {
        self.run_write(values).map_err(|e| self.env.fail(e))
    }

    fn run_write(&self, values: &FieldMap) -> Result<(), Error> {
        if self.is_empty() {
            return Ok(());
        }
        combinator::check_crud(&self.env, &self.model, "write")?;
        combinator::check_records(self, Permission::WRITE)?;

        let registry = Arc::clone(self.env.registry());
        let model = registry.model(&self.model)?;
        let stored = registry.filter_stored_values(&self.model, values)?;
        self.env.transaction().write(model, &self.ids, &stored)?;
        tracing::debug!(model = %self.model, records = self.len(), fields = stored.len(), "written");

        self.refresh_cache(&self.ids, &stored);

        let written: Vec<&str> = values
            .keys()
            .filter_map(|key| model.field(key).map(FieldDef::name))
            .collect();
        let dependents: Vec<&FieldDef> = model
            .fields()
            .filter(|field| field.is_stored() && field.is_computed())
            .filter(|field| {
                field.dependencies().iter().any(|dep| {
                    let head = dep.split(EXPR_SEP).next().unwrap_or_default();
                    written.contains(&head)
                })
            })
            .collect();

        self.recompute(&dependents)
    }

    /// Delete every record of the set.
    pub fn unlink(&self) -> Result<(), Error> {
        self.run_unlink().map_err(|e| self.env.fail(e))
    }

    fn run_unlink(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Ok(());
        }
        combinator::check_crud(&self.env, &self.model, "unlink")?;
        combinator::check_records(self, Permission::UNLINK)?;

        let registry = Arc::clone(self.env.registry());
        self.env
            .transaction()
            .unlink(registry.model(&self.model)?, &self.ids)?;
        tracing::debug!(model = %self.model, records = self.len(), "unlinked");

        self.cache.borrow_mut().forget(&self.ids);

        Ok(())
    }

    // Run each field's compute method per record and store the result.
    fn recompute(&self, fields: &[&FieldDef]) -> Result<(), Error> {
        if fields.is_empty() {
            return Ok(());
        }
        let registry = Arc::clone(self.env.registry());
        let model = registry.model(&self.model)?;

        for record in self.records() {
            let mut values = FieldMap::new();
            for field in fields {
                values.insert(field.json_name().to_string(), record.compute(field)?);
            }
            self.env
                .transaction()
                .write(model, record.ids(), &values)?;
            record.refresh_cache(record.ids(), &values);
        }

        Ok(())
    }

    // written values replace the cached row; derived paths are dropped
    fn refresh_cache(&self, ids: &[RecordId], stored: &FieldMap) {
        let mut cache = self.cache.borrow_mut();
        cache.forget(ids);
        for id in ids {
            for (key, value) in stored {
                cache.set(*id, key, value.clone());
            }
        }
    }
}
