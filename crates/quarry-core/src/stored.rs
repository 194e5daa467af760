//! Module: stored
//! Responsibility: reducing requested field paths and value maps to what
//! storage actually holds.

use crate::{
    EXPR_SEP, ID_FIELD, ID_JSON,
    error::Error,
    model::ModelDef,
    registry::Registry,
    value::FieldMap,
};

impl Registry {
    /// Storage paths to fetch for `fields` on `model`.
    ///
    /// Non-stored terminal fields are dropped, dotted paths are translated
    /// segment by segment, duplicates are removed (first occurrence wins)
    /// and `id` is appended unless present or `include_id` is false.
    pub fn filter_stored<S: AsRef<str>>(
        &self,
        model: &str,
        fields: &[S],
        include_id: bool,
    ) -> Result<Vec<String>, Error> {
        let root = self.model(model)?;
        let mut out: Vec<String> = Vec::new();

        for field in fields {
            let exprs: Vec<&str> = field.as_ref().split(EXPR_SEP).collect();
            for path in self.stored_paths(root, &exprs)? {
                if !out.contains(&path) {
                    out.push(path);
                }
            }
        }

        let has_id = out.iter().any(|f| f == ID_JSON || f == ID_FIELD);
        if include_id && !has_id {
            out.push(ID_JSON.to_string());
        }

        Ok(out)
    }

    fn stored_paths(&self, model: &ModelDef, exprs: &[&str]) -> Result<Vec<String>, Error> {
        let Some((first, rest)) = exprs.split_first() else {
            return Ok(Vec::new());
        };
        let field = model
            .field(first)
            .ok_or_else(|| Error::unknown_field(model.name(), *first))?;

        if rest.is_empty() {
            return Ok(if field.is_stored() {
                vec![field.json_name().to_string()]
            } else {
                Vec::new()
            });
        }

        let target = field
            .related_model()
            .ok_or_else(|| Error::not_a_relation(model.name(), *first))?;
        let target = self.model(target)?;
        let subs = self.stored_paths(target, rest)?;
        if subs.is_empty() {
            return Ok(subs);
        }

        // a relation held on the other side is still fetched by its own name
        let mut out = Vec::with_capacity(subs.len() + 1);
        if !field.is_stored() {
            out.push(field.json_name().to_string());
        }
        out.extend(
            subs.into_iter()
                .map(|sub| format!("{}{EXPR_SEP}{sub}", field.json_name())),
        );

        Ok(out)
    }

    /// Keep only the entries of `values` naming stored fields, keyed by
    /// storage name. Unknown keys are dropped.
    pub fn filter_stored_values(&self, model: &str, values: &FieldMap) -> Result<FieldMap, Error> {
        let model = self.model(model)?;

        Ok(values
            .iter()
            .filter_map(|(key, value)| {
                model
                    .field(key)
                    .filter(|field| field.is_stored())
                    .map(|field| (field.json_name().to_string(), value.clone()))
            })
            .collect())
    }
}
