mod query;
mod set;

#[cfg(test)]
mod tests;

use convert_case::{Case, Casing};
use proc_macro2::{Ident, Span, TokenStream};
use quarry_core::{model::ModelDef, registry::Registry};
use quote::{format_ident, quote};

// generate
#[must_use]
/// Generate typed record-set wrappers and query builders for every model
/// of a sealed registry.
pub fn generate(registry: &Registry) -> String {
    CodeBuilder::new(registry).generate().to_string()
}

///
/// CodeBuilder
///

pub(crate) struct CodeBuilder<'r> {
    pub(crate) registry: &'r Registry,
}

impl<'r> CodeBuilder<'r> {
    #[must_use]
    pub(crate) const fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    #[must_use]
    /// Generate the full module: one set wrapper and one query builder per model.
    pub(crate) fn generate(self) -> TokenStream {
        let mut tokens = quote!();

        for model in self.models() {
            tokens.extend(set::generate(model));
            tokens.extend(query::generate(model));
        }

        quote! {
            #tokens
        }
    }

    /// Models in name order.
    pub(crate) fn models(&self) -> impl Iterator<Item = &'r ModelDef> {
        self.registry.models()
    }
}

// set_ident
// `User` -> `UserSet`
pub(crate) fn set_ident(model: &str) -> Ident {
    format_ident!("{}Set", model.to_case(Case::Pascal))
}

// query_ident
pub(crate) fn query_ident(model: &str) -> Ident {
    format_ident!("{}Query", model.to_case(Case::Pascal))
}

// fn_ident
// snake_case function name, raw when it collides with a keyword
pub(crate) fn fn_ident(name: &str) -> Ident {
    let snake = name.to_case(Case::Snake);
    match snake.as_str() {
        // path keywords cannot be raw identifiers
        "self" | "super" | "crate" => format_ident!("{}_", snake),
        _ => syn::parse_str::<Ident>(&snake)
            .unwrap_or_else(|_| Ident::new_raw(&snake, Span::call_site())),
    }
}
