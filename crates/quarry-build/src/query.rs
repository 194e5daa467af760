use crate::{fn_ident, query_ident};
use proc_macro2::TokenStream;
use quarry_core::model::ModelDef;
use quote::{format_ident, quote};

#[must_use]
pub(crate) fn generate(model: &ModelDef) -> TokenStream {
    let ident = query_ident(model.name());
    let doc = format!(" Condition builders for the fields of `{}`.", model.name());

    let fields = model.fields().map(|field| {
        let mut fn_ident = fn_ident(field.name());
        if fn_ident == "not" {
            fn_ident = format_ident!("not_field");
        }
        let name = field.name();

        quote! {
            #[must_use]
            pub fn #fn_ident() -> ::quarry::core::condition::ConditionField {
                ::quarry::core::condition::Condition::start().field(#name)
            }
        }
    });

    quote! {
        #[doc = #doc]
        pub struct #ident;

        impl #ident {
            /// Negated start, for `not()` comparisons.
            #[must_use]
            pub fn not() -> ::quarry::core::condition::ConditionStart {
                ::quarry::core::condition::Condition::start().not()
            }

            #(#fields)*
        }
    }
}
