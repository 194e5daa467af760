//! Module: recordset
//! Responsibility: ordered record identifier sets of one model, with lazy
//! field loading through a cache, searching, and method calls.
//! Does not own: query execution (storage) or access decisions (security).

mod algebra;
mod cache;
mod write;

#[cfg(test)]
mod tests;

use crate::{
    EXPR_SEP, ID_FIELD, ID_JSON,
    condition::{Condition, Domain},
    env::Environment,
    error::{Error, ErrorKind},
    method::Call,
    model::field::{FieldDef, FieldKind},
    security::{Permission, combinator},
    storage::SearchParams,
    value::{RecordId, Value},
};
use cache::RecordCache;
use std::{cell::RefCell, fmt, rc::Rc, sync::Arc};

///
/// RecordSet
///
/// Ordered, duplicate-free identifiers of one model bound to an
/// environment. Views produced by `records`, `browse` and `related` share
/// the cache of the set they came from and prefetch together; set algebra
/// results get their own copy.
///

#[derive(Clone)]
pub struct RecordSet {
    env: Environment,
    model: String,
    ids: Vec<RecordId>,
    prefetch: Rc<[RecordId]>,
    cache: Rc<RefCell<RecordCache>>,
}

impl RecordSet {
    pub(crate) fn new(env: Environment, model: &str) -> Self {
        Self {
            env,
            model: model.to_string(),
            ids: Vec::new(),
            prefetch: Vec::new().into(),
            cache: Rc::default(),
        }
    }

    // same cache, new membership
    fn derive(&self, ids: Vec<RecordId>) -> Self {
        let ids = dedup(ids);
        Self {
            env: self.env.clone(),
            model: self.model.clone(),
            prefetch: ids.clone().into(),
            ids,
            cache: Rc::clone(&self.cache),
        }
    }

    // own copy of the cache entries of `ids`
    fn detached(&self, ids: Vec<RecordId>) -> Self {
        let ids = dedup(ids);
        let mut cache = RecordCache::default();
        cache.absorb(&self.cache.borrow(), &ids);

        Self {
            env: self.env.clone(),
            model: self.model.clone(),
            prefetch: ids.clone().into(),
            ids,
            cache: Rc::new(RefCell::new(cache)),
        }
    }

    // single-record view prefetching with its siblings
    fn view(&self, id: RecordId) -> Self {
        Self {
            env: self.env.clone(),
            model: self.model.clone(),
            ids: vec![id],
            prefetch: Rc::clone(&self.prefetch),
            cache: Rc::clone(&self.cache),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn env(&self) -> &Environment {
        &self.env
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Same records seen from another environment, with an empty cache.
    #[must_use]
    pub fn with_env(&self, env: Environment) -> Self {
        Self {
            env,
            model: self.model.clone(),
            ids: self.ids.clone(),
            prefetch: self.ids.clone().into(),
            cache: Rc::default(),
        }
    }

    #[must_use]
    pub fn sudo(&self) -> Self {
        self.with_env(self.env.sudo())
    }

    /// Set of the given identifiers (duplicates dropped). No existence check.
    #[must_use]
    pub fn browse(&self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.derive(ids.into_iter().collect())
    }

    /// One single-record view per member, in order.
    #[must_use]
    pub fn records(&self) -> Vec<Self> {
        self.ids.iter().map(|id| self.view(*id)).collect()
    }

    /// The only identifier of the set.
    pub fn ensure_one(&self) -> Result<RecordId, Error> {
        self.one("ensure_one").map_err(|e| self.env.fail(e))
    }

    fn one(&self, operation: &'static str) -> Result<RecordId, Error> {
        match self.ids.as_slice() {
            [id] => Ok(*id),
            [] => Err(ErrorKind::EmptyRecordSet {
                model: self.model.clone(),
                operation,
            }
            .into()),
            many => Err(ErrorKind::MultipleRecords {
                model: self.model.clone(),
                operation,
                count: many.len(),
            }
            .into()),
        }
    }

    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub fn search(&self, cond: Condition) -> Result<Self, Error> {
        self.search_with(cond, &SearchParams::default())
    }

    pub fn search_all(&self) -> Result<Self, Error> {
        self.search(Condition::default())
    }

    pub fn search_with(&self, cond: Condition, params: &SearchParams) -> Result<Self, Error> {
        self.run_search(cond, params)
            .map_err(|e| self.env.fail(e))
    }

    pub fn search_count(&self, cond: Condition) -> Result<usize, Error> {
        self.run_count(cond).map_err(|e| self.env.fail(e))
    }

    fn run_search(&self, cond: Condition, params: &SearchParams) -> Result<Self, Error> {
        combinator::check_crud(&self.env, &self.model, "read")?;

        let registry = Arc::clone(self.env.registry());
        let def = registry.model(&self.model)?;
        let domain = self.read_domain(cond)?;
        let order = if params.order.is_empty() {
            registry.order_terms(&self.model, def.default_order())?
        } else {
            registry.order_terms(&self.model, &params.order)?
        };

        let ids = self
            .env
            .transaction()
            .search(def, &domain, &order, params.limit, params.offset)?;
        tracing::debug!(model = %self.model, found = ids.len(), "search");

        Ok(Self {
            env: self.env.clone(),
            model: self.model.clone(),
            prefetch: ids.clone().into(),
            ids,
            cache: Rc::default(),
        })
    }

    fn run_count(&self, cond: Condition) -> Result<usize, Error> {
        combinator::check_crud(&self.env, &self.model, "read")?;

        let registry = Arc::clone(self.env.registry());
        let domain = self.read_domain(cond)?;

        self.env
            .transaction()
            .count(registry.model(&self.model)?, &domain)
    }

    // caller condition AND read rules, prepared for storage
    fn read_domain(&self, cond: Condition) -> Result<Domain, Error> {
        let cond = match combinator::rule_condition(&self.env, &self.model, Permission::READ) {
            Some(rule) => Condition::default().and_cond(cond).and_cond(rule),
            None => cond,
        };

        Ok(self
            .env
            .registry()
            .prepare_condition(&self.model, cond)?
            .serialize())
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// Load the stored part of `fields` for every record of the set.
    pub fn load(&self, fields: &[&str]) -> Result<(), Error> {
        self.run_load(fields).map_err(|e| self.env.fail(e))
    }

    fn run_load(&self, fields: &[&str]) -> Result<(), Error> {
        let keys = self
            .env
            .registry()
            .filter_stored(&self.model, fields, true)?;

        self.fetch(&self.ids, &self.ids, &keys)
    }

    // Read `keys` for the readable part of `batch` into the cache. Every id
    // of `required` must be readable.
    fn fetch(&self, batch: &[RecordId], required: &[RecordId], keys: &[String]) -> Result<(), Error> {
        if batch.is_empty() || keys.is_empty() {
            return Ok(());
        }
        combinator::check_crud(&self.env, &self.model, "read")?;
        combinator::ensure_allowed(&self.env, &self.model, required, Permission::READ)?;
        let readable = combinator::allowed_ids(&self.env, &self.model, batch, Permission::READ)?;

        let registry = Arc::clone(self.env.registry());
        let rows = self
            .env
            .transaction()
            .read(registry.model(&self.model)?, &readable, keys)?;
        tracing::trace!(model = %self.model, rows = rows.len(), fields = keys.len(), "fetched");

        let mut cache = self.cache.borrow_mut();
        for row in rows {
            let Some(id) = row.get(ID_JSON).and_then(|v| v.ref_ids().first().copied()) else {
                continue;
            };
            cache.merge_row(id, row);
        }

        Ok(())
    }

    /// Value of a field or dotted path on the single record of the set.
    ///
    /// Compute methods reached here are entered as top-level calls, even
    /// from inside a layer, so caller-restricted grants never apply to them.
    pub fn get(&self, path: &str) -> Result<Value, Error> {
        self.value(path).map_err(|e| self.env.fail(e))
    }

    /// `get` followed by a typed conversion.
    pub fn get_as<T>(&self, path: &str) -> Result<T, Error>
    where
        T: TryFrom<Value, Error = Error>,
    {
        self.get(path)
            .and_then(T::try_from)
            .map_err(|e| self.env.fail(e))
    }

    pub(crate) fn value(&self, path: &str) -> Result<Value, Error> {
        let id = self.one("get")?;
        let registry = Arc::clone(self.env.registry());
        let resolved = registry.resolve_path(&self.model, path)?;
        let key = resolved.json();

        if key == ID_JSON {
            return Ok(Value::Int(id.get()));
        }
        if let Some(value) = self.cache.borrow().get(id, &key) {
            return Ok(value.clone());
        }

        let value = if resolved.steps().iter().all(|field| is_loadable(field)) {
            let batch: Vec<RecordId> = {
                let cache = self.cache.borrow();
                let mut batch: Vec<_> = self
                    .prefetch
                    .iter()
                    .copied()
                    .filter(|other| !cache.contains(*other, &key))
                    .collect();
                if !batch.contains(&id) {
                    batch.push(id);
                }
                batch
            };
            self.fetch(&batch, &[id], std::slice::from_ref(&key))?;

            self.cache.borrow().get(id, &key).cloned().unwrap_or_default()
        } else if let [field] = resolved.steps() {
            if let Some(related) = field.related_path() {
                self.value(related)?
            } else if field.is_computed() {
                self.compute(field)?
            } else {
                Value::Null
            }
        } else {
            let (first, rest) = resolved
                .steps()
                .split_first()
                .ok_or_else(|| Error::unknown_field(self.model.as_str(), path))?;
            let rest: Vec<&str> = rest.iter().map(|f| f.name()).collect();
            let rest = rest.join(EXPR_SEP);
            let target = self.related_set(first)?;

            if first.kind().is_to_many() {
                Value::List(
                    target
                        .records()
                        .iter()
                        .map(|record| record.value(&rest))
                        .collect::<Result<_, _>>()?,
                )
            } else if target.is_empty() {
                Value::Null
            } else {
                target.value(&rest)?
            }
        };

        self.cache.borrow_mut().set(id, &key, value.clone());

        Ok(value)
    }

    // no caller frame: the read may come from outside any layer
    fn compute(&self, field: &FieldDef) -> Result<Value, Error> {
        let method = field.compute_method().unwrap_or_default();
        tracing::trace!(model = %self.model, field = field.name(), method, "compute");

        self.dispatch(method, &[])
            .map_err(|source| {
                ErrorKind::Compute {
                    model: self.model.clone(),
                    field: field.name().to_string(),
                    source: Box::new(source),
                }
                .into()
            })
    }

    /// Records referenced by relation `field` across the whole set.
    pub fn related(&self, field: &str) -> Result<Self, Error> {
        self.run_related(field).map_err(|e| self.env.fail(e))
    }

    fn run_related(&self, field: &str) -> Result<Self, Error> {
        let registry = Arc::clone(self.env.registry());
        let def = registry
            .model(&self.model)?
            .field(field)
            .ok_or_else(|| Error::unknown_field(self.model.as_str(), field))?;

        self.related_set(def)
    }

    fn related_set(&self, field: &FieldDef) -> Result<Self, Error> {
        let target = field
            .related_model()
            .ok_or_else(|| Error::not_a_relation(self.model.as_str(), field.name()))?;

        let mut ids = Vec::new();
        for record in self.records() {
            ids.extend(record.value(field.name())?.ref_ids());
        }

        Ok(Self::new(self.env.clone(), target).derive(ids))
    }

    // ------------------------------------------------------------------
    // Methods
    // ------------------------------------------------------------------

    /// Run the outermost layer of `method` on this set.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, Error> {
        self.dispatch(method, args).map_err(|e| self.env.fail(e))
    }

    pub(crate) fn dispatch(&self, method: &str, args: &[Value]) -> Result<Value, Error> {
        let registry = Arc::clone(self.env.registry());
        let def = registry.method(&self.model, method)?;

        Call::invoke(def, None, self, args)
    }
}

impl fmt::Debug for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("model", &self.model)
            .field("ids", &self.ids)
            .field("uid", &self.env.uid())
            .finish_non_exhaustive()
    }
}

// stored columns, plus one2many relations storage resolves by reverse lookup
fn is_loadable(field: &FieldDef) -> bool {
    field.is_stored()
        || (field.kind() == FieldKind::One2Many && !field.is_computed() && !field.is_related())
}

fn dedup(ids: Vec<RecordId>) -> Vec<RecordId> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Split `"Field desc"` into its path and direction.
pub(crate) fn parse_order(term: &str) -> (&str, bool) {
    let mut parts = term.split_whitespace();
    let path = parts.next().unwrap_or(ID_FIELD);
    let descending = parts
        .next()
        .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));

    (path, descending)
}
