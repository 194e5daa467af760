//! Module: env
//! Responsibility: the per-request execution context shared by record sets.

use crate::{
    config::OrmConfig,
    error::Error,
    recordset::RecordSet,
    registry::Registry,
    security::SecurityRegistry,
    storage::Transaction,
    value::{UserId, Value},
};
use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// Environment
///
/// Acting user, transaction, and context for one request. Cheap to clone;
/// derived environments (`sudo`, `with_context`) share the transaction.
///

#[derive(Clone)]
pub struct Environment {
    registry: Arc<Registry>,
    tx: Arc<dyn Transaction>,
    security: Arc<dyn SecurityRegistry>,
    uid: UserId,
    context: Arc<BTreeMap<String, Value>>,
}

impl Environment {
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        tx: Arc<dyn Transaction>,
        security: Arc<dyn SecurityRegistry>,
        uid: UserId,
    ) -> Self {
        Self {
            registry,
            tx,
            security,
            uid,
            context: Arc::default(),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &OrmConfig {
        self.registry.config()
    }

    #[must_use]
    pub fn transaction(&self) -> &dyn Transaction {
        self.tx.as_ref()
    }

    #[must_use]
    pub fn security(&self) -> &dyn SecurityRegistry {
        self.security.as_ref()
    }

    #[must_use]
    pub const fn uid(&self) -> UserId {
        self.uid
    }

    #[must_use]
    pub fn is_superuser(&self) -> bool {
        self.uid == self.config().superuser_id
    }

    #[must_use]
    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Same request, acting as the superuser.
    #[must_use]
    pub fn sudo(&self) -> Self {
        self.with_user(self.config().superuser_id)
    }

    #[must_use]
    pub fn with_user(&self, uid: UserId) -> Self {
        Self {
            uid,
            ..self.clone()
        }
    }

    /// Same user and context on another transaction.
    #[must_use]
    pub fn with_transaction(&self, tx: Arc<dyn Transaction>) -> Self {
        Self { tx, ..self.clone() }
    }

    #[must_use]
    pub fn with_context(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut context = (*self.context).clone();
        context.insert(key.to_string(), value.into());

        Self {
            context: Arc::new(context),
            ..self.clone()
        }
    }

    /// Empty record set of `model`.
    pub fn pool(&self, model: &str) -> Result<RecordSet, Error> {
        self.registry
            .model(model)
            .map_err(|e| self.fail(e))?;

        Ok(RecordSet::new(self.clone(), model))
    }

    /// Abort the transaction and stamp the acting user on `err`.
    pub(crate) fn fail(&self, err: Error) -> Error {
        tracing::debug!(uid = %self.uid, error = %err, "rolling back");
        self.tx.request_rollback();

        err.for_user(self.uid)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("uid", &self.uid)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
