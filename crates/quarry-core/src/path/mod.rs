//! Module: path
//! Responsibility: resolving dotted field paths against the registry and
//! translating them between semantic and storage names.
//! Does not own: condition rewriting beyond name lookups (see `name_search`).

mod name_search;


use crate::{
    EXPR_SEP,
    error::Error,
    model::{ModelDef, field::FieldDef},
    registry::Registry,
};

///
/// FieldPath
///
/// A resolved chain of fields starting at `root`. Every step but the
/// last is a relation field.
///

#[derive(Clone, Debug)]
pub struct FieldPath<'r> {
    root: &'r ModelDef,
    steps: Vec<&'r FieldDef>,
}

impl<'r> FieldPath<'r> {
    #[must_use]
    pub const fn root(&self) -> &'r ModelDef {
        self.root
    }

    #[must_use]
    pub fn steps(&self) -> &[&'r FieldDef] {
        &self.steps
    }

    /// Terminal field.
    #[must_use]
    pub fn leaf(&self) -> &'r FieldDef {
        // resolution never yields an empty path
        self.steps[self.steps.len() - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Storage names joined with the path separator.
    #[must_use]
    pub fn json(&self) -> String {
        self.join(FieldDef::json_name)
    }

    /// Semantic names joined with the path separator.
    #[must_use]
    pub fn semantic(&self) -> String {
        self.join(FieldDef::name)
    }

    fn join(&self, name: fn(&FieldDef) -> &str) -> String {
        self.steps
            .iter()
            .map(|step| name(step))
            .collect::<Vec<_>>()
            .join(EXPR_SEP)
    }
}

impl Registry {
    /// Resolve a dotted path (semantic or storage names, mixed freely).
    pub fn resolve_path(&self, model: &str, path: &str) -> Result<FieldPath<'_>, Error> {
        let exprs: Vec<&str> = path.split(EXPR_SEP).collect();
        self.resolve_exprs(model, &exprs)
    }

    /// Resolve pre-split path segments.
    pub fn resolve_exprs<S: AsRef<str>>(
        &self,
        model: &str,
        exprs: &[S],
    ) -> Result<FieldPath<'_>, Error> {
        let root = self.model(model)?;
        if exprs.is_empty() {
            return Err(Error::unknown_field(model, ""));
        }

        let mut current = root;
        let mut steps = Vec::with_capacity(exprs.len());

        for (i, expr) in exprs.iter().enumerate() {
            let segment = expr.as_ref();
            let field = current
                .field(segment)
                .ok_or_else(|| Error::unknown_field(current.name(), segment))?;
            steps.push(field);

            if i + 1 < exprs.len() {
                let target = field
                    .related_model()
                    .ok_or_else(|| Error::not_a_relation(current.name(), segment))?;
                current = self.model(target)?;
            }
        }
        tracing::trace!(model, depth = steps.len(), "path resolved");

        Ok(FieldPath { root, steps })
    }

    /// Translate a path to storage names.
    pub fn jsonize_path(&self, model: &str, path: &str) -> Result<String, Error> {
        Ok(self.resolve_path(model, path)?.json())
    }

    /// Semantic counterpart of `jsonize_path`.
    pub fn semantic_path(&self, model: &str, path: &str) -> Result<String, Error> {
        Ok(self.resolve_path(model, path)?.semantic())
    }

    /// Model owning the terminal field of `path`.
    pub fn leaf_model(&self, model: &str, path: &str) -> Result<&ModelDef, Error> {
        let resolved = self.resolve_path(model, path)?;
        let steps = resolved.steps();
        if steps.len() == 1 {
            return Ok(resolved.root());
        }
        let owner = steps[steps.len() - 2]
            .related_model()
            .unwrap_or_else(|| resolved.root().name());

        self.model(owner)
    }
}
