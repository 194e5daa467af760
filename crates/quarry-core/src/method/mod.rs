//! Module: method
//! Responsibility: layered method definitions and their execution grants.
//! Does not own: record access (security::combinator) or storage calls.

mod dispatch;


pub use dispatch::Call;

use crate::{
    error::Error,
    recordset::RecordSet,
    security::GroupId,
    value::{Value, ValueKind},
};
use serde::Serialize;
use std::{collections::BTreeSet, fmt, sync::Arc};

///
/// CONSTANTS
///

/// Methods gated to the administrator group until re-granted.
pub const CRUD_METHODS: [&str; 4] = ["create", "read", "write", "unlink"];

/// Whether `name` is one of the built-in CRUD methods.
#[must_use]
pub fn is_crud(name: &str) -> bool {
    CRUD_METHODS.contains(&name)
}

///
/// LayerFn
///
/// One module's implementation of a method. Receives the dispatch cursor,
/// the record set the method runs on, and positional arguments.
///

pub type LayerFn = Arc<dyn Fn(&Call<'_>, &RecordSet, &[Value]) -> Result<Value, Error> + Send + Sync>;

///
/// Signature
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Signature {
    pub params: Vec<ValueKind>,
    pub returns: ValueKind,
}

impl Signature {
    #[must_use]
    pub fn new(params: impl IntoIterator<Item = ValueKind>, returns: ValueKind) -> Self {
        Self {
            params: params.into_iter().collect(),
            returns,
        }
    }

    /// Check positional arguments against the declared parameter kinds.
    #[must_use]
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(kind, value)| kind.accepts(value))
    }

    pub(crate) fn describe_args(args: &[Value]) -> String {
        args.iter()
            .map(|a| a.kind().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "({params}) -> {}", self.returns)
    }
}

///
/// Layer
///

#[derive(Clone)]
pub struct Layer {
    pub(crate) module: String,
    pub(crate) func: LayerFn,
}

impl Layer {
    pub fn new<F>(module: &str, func: F) -> Self
    where
        F: Fn(&Call<'_>, &RecordSet, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self {
            module: module.to_string(),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

///
/// MethodRef
/// (model, method) pair naming a caller frame.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MethodRef {
    pub model: String,
    pub method: String,
}

impl MethodRef {
    #[must_use]
    pub fn new(model: &str, method: &str) -> Self {
        Self {
            model: model.to_string(),
            method: method.to_string(),
        }
    }
}

///
/// MethodGrant
///
/// Execution grant for one group. A non-empty `callers` set restricts the
/// grant to calls made (directly or transitively) from one of those methods.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MethodGrant {
    pub group: GroupId,
    pub callers: BTreeSet<MethodRef>,
}

///
/// MethodAccess
///
/// `open` methods run for everyone; closed ones need a matching grant.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MethodAccess {
    pub(crate) open: bool,
    pub(crate) grants: Vec<MethodGrant>,
}

impl MethodAccess {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn grants(&self) -> &[MethodGrant] {
        &self.grants
    }

    pub(crate) fn allow(&mut self, group: GroupId, callers: BTreeSet<MethodRef>) {
        self.grants.push(MethodGrant { group, callers });
    }

    pub(crate) fn revoke(&mut self, group: &GroupId) {
        self.open = false;
        self.grants.retain(|grant| &grant.group != group);
    }
}

///
/// MethodDef
///
/// A named method of one model with its ordered override chain
/// (index 0 = base layer, last = outermost).
///

#[derive(Clone, Debug)]
pub struct MethodDef {
    pub(crate) model: String,
    pub(crate) name: String,
    pub(crate) doc: String,
    pub(crate) signature: Signature,
    pub(crate) layers: Vec<Layer>,
    pub(crate) access: MethodAccess,
}

impl MethodDef {
    pub(crate) fn new(model: &str, name: &str, doc: &str, signature: Signature) -> Self {
        Self {
            model: model.to_string(),
            name: name.to_string(),
            doc: doc.to_string(),
            signature,
            layers: Vec::new(),
            access: MethodAccess {
                open: true,
                grants: Vec::new(),
            },
        }
    }

    /// Built-in CRUD entry: no layers, closed, granted to `admin_group`.
    pub(crate) fn crud(model: &str, name: &str, admin_group: &str) -> Self {
        let mut def = Self::new(model, name, "", Signature::new([], ValueKind::Null));
        def.access.open = false;
        def.access
            .allow(GroupId::new(admin_group), BTreeSet::new());

        def
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn doc(&self) -> &str {
        &self.doc
    }

    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[must_use]
    pub const fn access(&self) -> &MethodAccess {
        &self.access
    }

    /// CRUD entries exist for access control only and cannot be dispatched.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        is_crud(&self.name) && self.layers.is_empty()
    }
}
