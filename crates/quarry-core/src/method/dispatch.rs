use crate::{
    error::{Error, ErrorKind},
    method::{MethodDef, MethodRef, Signature},
    recordset::RecordSet,
    security::combinator,
    value::Value,
};
use std::sync::Arc;

///
/// Call
///
/// Dispatch cursor handed to every layer: which method and layer is
/// running, and the frame that called it. Layers reach the next layer down
/// with `super_call` and other methods with `call`.
///

#[derive(Clone, Copy, Debug)]
pub struct Call<'a> {
    def: &'a MethodDef,
    layer: usize,
    parent: Option<&'a Call<'a>>,
}

impl<'a> Call<'a> {
    // Outermost layer of `def`, after signature and execution checks.
    pub(crate) fn invoke(
        def: &'a MethodDef,
        parent: Option<&'a Call<'a>>,
        rs: &RecordSet,
        args: &[Value],
    ) -> Result<Value, Error> {
        if def.is_builtin() {
            return Err(Error::unknown_method(def.model(), def.name()));
        }
        check_signature(def, args)?;

        let callers: Vec<MethodRef> = parent
            .map(|frame| frame.frames().map(Call::method_ref).collect())
            .unwrap_or_default();
        combinator::check_method(rs.env(), def, &callers)?;

        let layer = def
            .layers
            .len()
            .checked_sub(1)
            .ok_or_else(|| no_more_layers(def))?;

        Self { def, layer, parent }.run(rs, args)
    }

    fn run(&self, rs: &RecordSet, args: &[Value]) -> Result<Value, Error> {
        let layer = &self.def.layers[self.layer];
        tracing::trace!(
            model = self.def.model(),
            method = self.def.name(),
            layer = self.layer,
            module = layer.module(),
            "enter layer"
        );

        (layer.func)(self, rs, args)
    }

    /// Run the next layer down of the current method.
    pub fn super_call(&self, rs: &RecordSet, args: &[Value]) -> Result<Value, Error> {
        let layer = self
            .layer
            .checked_sub(1)
            .ok_or_else(|| no_more_layers(self.def))?;
        check_signature(self.def, args)?;

        Self {
            def: self.def,
            layer,
            parent: self.parent,
        }
        .run(rs, args)
    }

    /// Call the outermost layer of `method` on `rs`, recording this frame
    /// as its caller.
    pub fn call(&self, rs: &RecordSet, method: &str, args: &[Value]) -> Result<Value, Error> {
        let registry = Arc::clone(rs.env().registry());
        let def = registry.method(rs.model(), method)?;

        Call::invoke(def, Some(self), rs, args)
    }

    /// Continue `method` below the layer an enclosing frame is running,
    /// or call it fresh when no frame on the stack runs it.
    pub fn super_of(&self, rs: &RecordSet, method: &str, args: &[Value]) -> Result<Value, Error> {
        let Some(frame) = self
            .frames()
            .find(|frame| frame.def.model() == rs.model() && frame.def.name() == method)
        else {
            return self.call(rs, method, args);
        };

        let layer = frame
            .layer
            .checked_sub(1)
            .ok_or_else(|| no_more_layers(frame.def))?;
        check_signature(frame.def, args)?;

        Call {
            def: frame.def,
            layer,
            parent: Some(self),
        }
        .run(rs, args)
    }

    // this frame, then its callers outward
    fn frames(&self) -> impl Iterator<Item = &Call<'a>> {
        std::iter::successors(Some(self), |frame| frame.parent)
    }

    fn method_ref(&self) -> MethodRef {
        MethodRef::new(self.def.model(), self.def.name())
    }

    #[must_use]
    pub const fn method(&self) -> &'a MethodDef {
        self.def
    }

    #[must_use]
    pub const fn layer(&self) -> usize {
        self.layer
    }

    /// Module that contributed the running layer.
    #[must_use]
    pub fn module(&self) -> &'a str {
        self.def.layers[self.layer].module()
    }

    /// Number of frames between this one and the outermost call.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames().count() - 1
    }
}

fn check_signature(def: &MethodDef, args: &[Value]) -> Result<(), Error> {
    if def.signature.accepts(args) {
        return Ok(());
    }

    Err(ErrorKind::SignatureMismatch {
        model: def.model().to_string(),
        method: def.name().to_string(),
        expected: def.signature.to_string(),
        found: Signature::describe_args(args),
    }
    .into())
}

fn no_more_layers(def: &MethodDef) -> Error {
    ErrorKind::NoMoreLayers {
        model: def.model().to_string(),
        method: def.name().to_string(),
    }
    .into()
}
