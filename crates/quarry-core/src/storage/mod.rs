//! Module: storage
//! Responsibility: the contract between record sets and the query executor.
//! Does not own: SQL generation or connection handling.

mod memory;

pub use memory::MemoryStore;

use crate::{
    condition::Domain,
    error::Error,
    model::ModelDef,
    recordset::parse_order,
    registry::Registry,
    value::{FieldMap, RecordId},
};

///
/// OrderTerm
/// One ORDER BY expression on a storage path.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderTerm {
    pub path: String,
    pub descending: bool,
}

///
/// SearchParams
///

#[derive(Clone, Debug, Default)]
pub struct SearchParams {
    /// Semantic paths with an optional `desc`/`asc` suffix; empty means
    /// the model's default order.
    pub order: Vec<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SearchParams {
    #[must_use]
    pub fn order_by(mut self, term: &str) -> Self {
        self.order.push(term.to_string());
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

///
/// Transaction
///
/// Query executor bound to one transaction. Paths are storage names,
/// dotted across relations. Unknown operators or paths are fatal.
///

pub trait Transaction: Send + Sync {
    fn search(
        &self,
        model: &ModelDef,
        domain: &Domain,
        order: &[OrderTerm],
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RecordId>, Error>;

    fn count(&self, model: &ModelDef, domain: &Domain) -> Result<usize, Error>;

    /// One map per found identifier, in request order, holding `id` and
    /// every requested path.
    fn read(&self, model: &ModelDef, ids: &[RecordId], paths: &[String]) -> Result<Vec<FieldMap>, Error>;

    fn create(&self, model: &ModelDef, values: &FieldMap) -> Result<RecordId, Error>;

    fn write(&self, model: &ModelDef, ids: &[RecordId], values: &FieldMap) -> Result<(), Error>;

    fn unlink(&self, model: &ModelDef, ids: &[RecordId]) -> Result<(), Error>;

    /// Mark the transaction for rollback; the owner decides when.
    fn request_rollback(&self);

    fn rollback_requested(&self) -> bool;
}

impl Registry {
    /// Translate order expressions (`"Field"`, `"Rel.Field desc"`) of
    /// `model` to storage terms.
    pub fn order_terms<S: AsRef<str>>(&self, model: &str, order: &[S]) -> Result<Vec<OrderTerm>, Error> {
        order
            .iter()
            .map(|term| {
                let (path, descending) = parse_order(term.as_ref());

                Ok(OrderTerm {
                    path: self.jsonize_path(model, path)?,
                    descending,
                })
            })
            .collect()
    }
}
