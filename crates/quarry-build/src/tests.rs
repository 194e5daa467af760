use crate::{fn_ident, generate};
use quarry_core::{
    config::OrmConfig,
    model::{ModelDef, field::FieldDef},
    registry::{Registry, RegistryBuilder},
};
use std::sync::Arc;
use syn::{ImplItem, Item};

fn registry() -> Arc<Registry> {
    let mut b = RegistryBuilder::new(OrmConfig::default());
    b.add_model(ModelDef::new("User").with_fields([
        FieldDef::char("Name").help("Display name."),
        FieldDef::integer("Age"),
        FieldDef::boolean("Active"),
        FieldDef::char("Type"),
        FieldDef::many2one("Profile", "Profile"),
        FieldDef::one2many("Posts", "BlogPost", "user_id"),
    ]))
    .unwrap();
    b.add_model(ModelDef::new("Profile").with_field(FieldDef::float("Money")))
        .unwrap();
    b.add_model(ModelDef::new("BlogPost").with_fields([
        FieldDef::char("Search"),
        FieldDef::many2one("User", "User"),
    ]))
    .unwrap();

    b.seal().unwrap()
}

fn parsed() -> syn::File {
    let code = generate(&registry());
    syn::parse_file(&code).unwrap()
}

fn methods_of(file: &syn::File, type_name: &str) -> Vec<String> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Impl(imp) => match &*imp.self_ty {
                syn::Type::Path(path) if path.path.is_ident(type_name) && imp.trait_.is_none() => {
                    Some(imp)
                }
                _ => None,
            },
            _ => None,
        })
        .flat_map(|imp| imp.items.iter())
        .filter_map(|item| match item {
            ImplItem::Fn(f) => Some(f.sig.ident.to_string()),
            _ => None,
        })
        .collect()
}

#[test]
fn output_is_valid_rust() {
    let file = parsed();

    let structs: Vec<String> = file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Struct(s) => Some(s.ident.to_string()),
            _ => None,
        })
        .collect();

    assert_eq!(
        structs,
        vec![
            "BlogPostSet",
            "BlogPostQuery",
            "ProfileSet",
            "ProfileQuery",
            "UserSet",
            "UserQuery",
        ]
    );
}

#[test]
fn set_has_one_getter_per_field() {
    let file = parsed();

    let methods = methods_of(&file, "UserSet");

    for expected in ["pool", "records", "browse", "search", "id", "name", "age", "active", "r#type", "profile", "posts"] {
        assert!(methods.iter().any(|m| m == expected), "missing {expected}");
    }
}

#[test]
fn wrapper_names_do_not_collide_with_fields() {
    let file = parsed();

    let methods = methods_of(&file, "BlogPostSet");

    assert!(methods.iter().any(|m| m == "search_field"));
    assert_eq!(methods.iter().filter(|m| *m == "search").count(), 1);
}

#[test]
fn relation_getters_return_target_sets() {
    let code = generate(&registry());

    assert!(code.contains("Result < ProfileSet"));
    assert!(code.contains("Result < BlogPostSet"));
    assert!(code.contains("get_as :: < i64 > (\"Age\")"));
    assert!(code.contains("get_as :: < bool > (\"Active\")"));
}

#[test]
fn query_builders_start_conditions() {
    let file = parsed();

    let methods = methods_of(&file, "ProfileQuery");

    assert_eq!(methods, vec!["not", "id", "money"]);
}

#[test]
fn help_text_becomes_doc() {
    let code = generate(&registry());

    assert!(code.contains("\" Display name.\""));
}

#[test]
fn keyword_names_become_raw_identifiers() {
    assert_eq!(fn_ident("Type").to_string(), "r#type");
    assert_eq!(fn_ident("Self").to_string(), "self_");
    assert_eq!(fn_ident("CreateDate").to_string(), "create_date");
}
