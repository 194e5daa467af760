use crate::{fn_ident, set_ident};
use proc_macro2::TokenStream;
use quarry_core::model::{
    ModelDef,
    field::{FieldDef, FieldKind},
};
use quote::{format_ident, quote};

// names taken by the wrapper's own methods
const RESERVED: [&str; 4] = ["pool", "records", "search", "browse"];

#[must_use]
pub(crate) fn generate(model: &ModelDef) -> TokenStream {
    let ident = set_ident(model.name());
    let model_lit = model.name();
    let doc = format!(" Typed record set of `{model_lit}`.");

    let getters = model.fields().map(getter);

    quote! {
        #[doc = #doc]
        #[derive(Clone, Debug)]
        pub struct #ident(::quarry::core::recordset::RecordSet);

        impl #ident {
            pub const MODEL: &'static str = #model_lit;

            /// Empty set bound to `env`.
            pub fn pool(
                env: &::quarry::core::env::Environment,
            ) -> ::std::result::Result<Self, ::quarry::core::error::Error> {
                env.pool(Self::MODEL).map(Self)
            }

            #[must_use]
            pub const fn records(&self) -> &::quarry::core::recordset::RecordSet {
                &self.0
            }

            #[must_use]
            pub fn browse(
                &self,
                ids: impl ::std::iter::IntoIterator<Item = ::quarry::core::value::RecordId>,
            ) -> Self {
                Self(self.0.browse(ids))
            }

            pub fn search(
                &self,
                cond: ::quarry::core::condition::Condition,
            ) -> ::std::result::Result<Self, ::quarry::core::error::Error> {
                self.0.search(cond).map(Self)
            }

            #(#getters)*
        }

        impl ::std::convert::From<::quarry::core::recordset::RecordSet> for #ident {
            fn from(rs: ::quarry::core::recordset::RecordSet) -> Self {
                Self(rs)
            }
        }
    }
}

fn getter(field: &FieldDef) -> TokenStream {
    let mut ident = fn_ident(field.name());
    if RESERVED.contains(&ident.to_string().as_str()) {
        ident = format_ident!("{}_field", ident);
    }
    let name = field.name();
    let doc = if field.help_text().is_empty() {
        format!(" `{name}` ({}).", field.kind())
    } else {
        format!(" {}", field.help_text())
    };

    if let Some(target) = field.related_model() {
        // relations resolve to the typed set of their target
        let target = set_ident(target);

        return quote! {
            #[doc = #doc]
            pub fn #ident(&self) -> ::std::result::Result<#target, ::quarry::core::error::Error> {
                self.0.related(#name).map(#target)
            }
        };
    }

    let ty = match field.kind() {
        FieldKind::Boolean => quote!(bool),
        FieldKind::Float => quote!(f64),
        FieldKind::Integer => quote!(i64),
        _ => quote!(::std::string::String),
    };

    quote! {
        #[doc = #doc]
        pub fn #ident(&self) -> ::std::result::Result<#ty, ::quarry::core::error::Error> {
            self.0.get_as::<#ty>(#name)
        }
    }
}
