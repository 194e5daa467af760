use crate::{
    EXPR_SEP,
    condition::{Comparison, Condition, Operator},
    error::Error,
    model::ModelDef,
    registry::{Registry, RegistryError},
    value::Value,
};

impl Registry {
    /// Rewrite a condition so storage can execute it against `model`:
    ///
    /// - a boolean compared to a relation becomes a set / not-set test
    /// - a string compared to a relation searches the related model's name
    ///   field, following related name fields to their stored source
    /// - every path is translated to storage names
    pub fn prepare_condition(&self, model: &str, cond: Condition) -> Result<Condition, Error> {
        cond.try_map_comparisons(&mut |cmp| self.prepare_comparison(model, cmp))
    }

    fn prepare_comparison(&self, model: &str, mut cmp: Comparison) -> Result<Comparison, Error> {
        let leaf = self.resolve_exprs(model, &cmp.exprs)?.leaf();

        if let Some(target) = leaf.related_model() {
            match cmp.arg {
                Value::Bool(flag) => {
                    if matches!(cmp.operator, Operator::Equals | Operator::NotEquals) {
                        let wants_set = (cmp.operator == Operator::Equals) == flag;
                        cmp.operator = if wants_set {
                            Operator::NotEquals
                        } else {
                            Operator::Equals
                        };
                    }
                    cmp.arg = Value::Int(0);
                }
                Value::Text(_) => {
                    let target = self.model(target)?;
                    cmp.exprs.extend(self.name_exprs(target)?);
                }
                _ => {}
            }
        }

        cmp.exprs = self
            .resolve_exprs(model, &cmp.exprs)?
            .steps()
            .iter()
            .map(|field| field.json_name().to_string())
            .collect();

        Ok(cmp)
    }

    // Path, relative to `model`, of the stored field holding its display name.
    // Empty when the model has no name field.
    fn name_exprs(&self, model: &ModelDef) -> Result<Vec<String>, Error> {
        let Some(name) = model.field(&self.config().name_field) else {
            return Ok(Vec::new());
        };

        self.expand_related(model, vec![name.name().to_string()], 0)
    }

    fn expand_related(
        &self,
        model: &ModelDef,
        exprs: Vec<String>,
        depth: usize,
    ) -> Result<Vec<String>, Error> {
        let max = self.config().max_path_depth;
        if depth > max {
            return Err(RegistryError::PathTooDeep {
                model: model.name().to_string(),
                path: exprs.join(EXPR_SEP),
                max,
            }
            .into());
        }

        let leaf = self.resolve_exprs(model.name(), &exprs)?.leaf();
        let Some(related) = leaf.related_path() else {
            return Ok(exprs);
        };

        let mut expanded = exprs[..exprs.len() - 1].to_vec();
        expanded.extend(related.split(EXPR_SEP).map(ToString::to_string));

        self.expand_related(model, expanded, depth + 1)
    }
}
