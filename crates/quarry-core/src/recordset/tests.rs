use crate::{
    condition::Condition,
    error::{Error, ErrorClass, ErrorKind},
    method::{Layer, MethodRef, Signature},
    model::field::FieldDef,
    recordset::RecordSet,
    security::{Permission, RecordRule},
    storage::{MemoryStore, SearchParams, Transaction},
    test_support::{ADMIN, Fixture, USER, USER_GROUP, builder, fields},
    value::{RecordId, Value, ValueKind},
};
use std::sync::Arc;

///
/// Blog
/// Three users, a profile and a few posts, seeded as the superuser.
///

struct Blog {
    fx: Fixture,
    ann: RecordId,
    bob: RecordId,
    cid: RecordId,
    profile: RecordId,
    rust: RecordId,
    go: RecordId,
}

impl Blog {
    fn new() -> Self {
        Self::with_fixture(Fixture::new())
    }

    fn with_fixture(fx: Fixture) -> Self {
        let profile = fx.seed(
            "Profile",
            &[("Age", 41.into()), ("Money", 12.5.into()), ("City", "Oslo".into())],
        );
        let cid = fx.seed(
            "User",
            &[("Name", "cid".into()), ("Age", 19.into()), ("Active", false.into())],
        );
        let ann = fx.seed(
            "User",
            &[
                ("Name", "ann".into()),
                ("Age", 41.into()),
                ("Active", true.into()),
                ("Profile", profile.into()),
            ],
        );
        let bob = fx.seed(
            "User",
            &[("Name", "bob".into()), ("Age", 33.into()), ("Active", true.into())],
        );
        let tag = fx.seed("Tag", &[("Name", "lang".into())]);
        let rust = fx.seed(
            "Post",
            &[
                ("Title", "Rust".into()),
                ("User", ann.into()),
                ("Tags", vec![tag].into()),
            ],
        );
        let go = fx.seed("Post", &[("Title", "Go".into()), ("User", ann.into())]);
        fx.admin()
            .sudo()
            .pool("Profile")
            .unwrap()
            .browse([profile])
            .write(&fields(&[("BestPost", rust.into())]))
            .unwrap();

        Self {
            fx,
            ann,
            bob,
            cid,
            profile,
            rust,
            go,
        }
    }

    fn users(&self) -> RecordSet {
        self.fx.admin().pool("User").unwrap()
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

// ----------------------------------------------------------------------
// Search
// ----------------------------------------------------------------------

#[test]
fn search_uses_default_order() {
    let blog = Blog::new();

    let users = blog.users().search_all().unwrap();

    assert_eq!(users.ids(), [blog.ann, blog.bob, blog.cid]);
}

#[test]
fn search_params_order_and_page() {
    let blog = Blog::new();
    let params = SearchParams::default().order_by("Age desc").limit(2).offset(1);

    let users = blog.users().search_with(Condition::default(), &params).unwrap();

    assert_eq!(users.ids(), [blog.bob, blog.cid]);
}

#[test]
fn search_follows_relations() {
    let blog = Blog::new();

    let writers = blog
        .users()
        .search(Condition::start().field("Posts.Title").equals("Go"))
        .unwrap();
    assert_eq!(writers.ids(), [blog.ann]);

    let tagged = blog
        .fx
        .admin()
        .pool("Post")
        .unwrap()
        .search(Condition::start().field("Tags").equals("lang"))
        .unwrap();
    assert_eq!(tagged.ids(), [blog.rust]);
}

#[test]
fn search_by_related_name_and_set_test() {
    let blog = Blog::new();
    let posts = blog.fx.admin().pool("Post").unwrap();

    let by_author = posts
        .search(Condition::start().field("User").ilike("AN%"))
        .unwrap();
    assert_eq!(by_author.len(), 2);

    let with_profile = blog
        .users()
        .search(Condition::start().field("Profile").equals(true))
        .unwrap();
    assert_eq!(with_profile.ids(), [blog.ann]);

    let without = blog
        .users()
        .search(Condition::start().field("Profile").equals(false))
        .unwrap();
    assert_eq!(without.ids(), [blog.bob, blog.cid]);
}

#[test]
fn search_count_matches_search() {
    let blog = Blog::new();
    let cond = Condition::start()
        .field("Age")
        .greater(20)
        .or()
        .field("Active")
        .equals(false);

    let count = blog.users().search_count(cond.clone()).unwrap();

    assert_eq!(count, 3);
    assert_eq!(blog.users().search(cond).unwrap().len(), count);
}

#[test]
fn search_with_unknown_field_fails_and_rolls_back() {
    let blog = Blog::new();

    let err = blog
        .users()
        .search(Condition::start().field("Nickname").equals("x"))
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::NotFound);
    assert_eq!(err.user, Some(ADMIN));
    assert!(blog.fx.store.rollback_requested());
}

// ----------------------------------------------------------------------
// Reading
// ----------------------------------------------------------------------

#[test]
fn get_reads_stored_and_typed_values() {
    let blog = Blog::new();
    let ann = blog.users().browse([blog.ann]);

    assert_eq!(ann.get("Name").unwrap(), text("ann"));
    assert_eq!(ann.get_as::<i64>("Age").unwrap(), 41);
    assert!(ann.get_as::<bool>("Active").unwrap());
    assert_eq!(ann.get("ID").unwrap(), Value::Int(blog.ann.get()));
    assert_eq!(
        ann.get_as::<Option<RecordId>>("Profile").unwrap(),
        Some(blog.profile)
    );
}

#[test]
fn get_crosses_relations() {
    let blog = Blog::new();
    let ann = blog.users().browse([blog.ann]);

    assert_eq!(ann.get("Profile.City").unwrap(), text("Oslo"));
    assert_eq!(ann.get("Posts").unwrap(), Value::RefList(vec![blog.rust, blog.go]));
    assert_eq!(
        ann.get("Posts.Title").unwrap(),
        Value::List(vec![text("Rust"), text("Go")])
    );

    // unset to-one relation yields null further down
    let bob = blog.users().browse([blog.bob]);
    assert_eq!(bob.get("Profile.City").unwrap(), Value::Null);
}

#[test]
fn related_and_computed_fields_are_derived() {
    let blog = Blog::new();
    let ann = blog.users().browse([blog.ann]);

    assert_eq!(ann.get("PMoney").unwrap(), Value::Float(12.5));
    assert_eq!(ann.get("Nums").unwrap(), Value::Int(2));
    assert_eq!(ann.get("Profile.UserName").unwrap(), text("ann"));
    assert_eq!(
        ann.get("Posts.Name").unwrap(),
        Value::List(vec![text("Rust"), text("Go")])
    );
}

#[test]
fn stored_computed_field_is_filled_on_create() {
    let blog = Blog::new();

    let row = blog.fx.store.row("User", blog.bob).unwrap();

    assert_eq!(row.get("decorated_name"), Some(&text("User: bob")));
}

#[test]
fn siblings_are_prefetched_together() {
    let blog = Blog::new();
    let users = blog.users().search_all().unwrap();
    let records = users.records();

    assert_eq!(records[0].get("Name").unwrap(), text("ann"));

    // change bob behind the cache of `users`
    blog.users()
        .browse([blog.bob])
        .write(&fields(&[("Name", "bobby".into())]))
        .unwrap();

    assert_eq!(records[1].get("Name").unwrap(), text("bob"));

    users.invalidate_cache();
    assert_eq!(records[1].get("Name").unwrap(), text("bobby"));
}

#[test]
fn load_fills_the_cache() {
    let blog = Blog::new();
    let users = blog.users().search_all().unwrap();
    users.load(&["Name", "Profile.City", "Nums"]).unwrap();

    blog.users()
        .browse([blog.ann])
        .write(&fields(&[("Name", "anna".into())]))
        .unwrap();

    assert_eq!(users.records()[0].get("Name").unwrap(), text("ann"));
    assert_eq!(users.records()[0].get("Profile.City").unwrap(), text("Oslo"));
}

#[test]
fn related_collects_across_the_set() {
    let blog = Blog::new();
    let users = blog.users().browse([blog.bob, blog.ann]);

    let posts = users.related("Posts").unwrap();
    assert_eq!(posts.model(), "Post");
    assert_eq!(posts.ids(), [blog.rust, blog.go]);

    let authors = posts.related("User").unwrap();
    assert_eq!(authors.ids(), [blog.ann]);

    assert!(matches!(
        users.related("Name").unwrap_err().kind,
        ErrorKind::NotARelation { .. }
    ));
}

#[test]
fn cardinality_is_enforced() {
    let blog = Blog::new();
    let none = blog.users();
    let many = blog.users().browse([blog.ann, blog.bob]);

    assert!(matches!(
        none.get("Name").unwrap_err().kind,
        ErrorKind::EmptyRecordSet { .. }
    ));
    assert!(matches!(
        many.get("Name").unwrap_err().kind,
        ErrorKind::MultipleRecords { count: 2, .. }
    ));
    assert_eq!(many.ensure_one().unwrap_err().class(), ErrorClass::Cardinality);
    assert_eq!(many.browse([blog.bob]).ensure_one().unwrap(), blog.bob);
}

#[test]
fn browse_drops_duplicates() {
    let blog = Blog::new();

    let users = blog.users().browse([blog.bob, blog.ann, blog.bob]);

    assert_eq!(users.ids(), [blog.bob, blog.ann]);
}

#[test]
fn compute_failure_names_the_field() {
    let mut b = builder();
    b.extend_model("User", [FieldDef::integer("Broken").compute("compute_broken")])
        .unwrap();
    b.add_method(
        "User",
        "compute_broken",
        "",
        Signature::new([], ValueKind::Int),
        Layer::new("base", |_, rs, _| {
            Err(Error::from(ErrorKind::Storage {
                model: rs.model().to_string(),
                message: "disk on fire".to_string(),
            }))
        }),
    )
    .unwrap();
    let blog = Blog::with_fixture(Fixture::with_registry(b.seal().unwrap()));

    let err = blog.users().browse([blog.ann]).get("Broken").unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Compute { ref field, .. } if field == "Broken"));
    assert!(err.to_string().contains("disk on fire"));
    assert!(blog.fx.store.rollback_requested());
}

// ----------------------------------------------------------------------
// Writing
// ----------------------------------------------------------------------

#[test]
fn create_returns_the_new_record() {
    let blog = Blog::new();

    let dee = blog
        .users()
        .create(&fields(&[("Name", "dee".into()), ("Nums", 99.into())]))
        .unwrap();

    assert_eq!(dee.len(), 1);
    assert_eq!(dee.get("Name").unwrap(), text("dee"));
    assert_eq!(dee.get("Nums").unwrap(), Value::Int(0));
    assert_eq!(dee.get("DecoratedName").unwrap(), text("User: dee"));
    assert_eq!(blog.fx.store.row_count("User"), 4);
}

#[test]
fn create_fills_missing_defaults() {
    let blog = Blog::new();

    let dee = blog.users().create(&fields(&[("Name", "dee".into())])).unwrap();
    let eve = blog
        .users()
        .create(&fields(&[("Name", "eve".into()), ("lang", "fr".into())]))
        .unwrap();

    assert_eq!(dee.get("Lang").unwrap(), text("en"));
    assert_eq!(eve.get("Lang").unwrap(), text("fr"));
    assert_eq!(
        blog.fx.store.row("User", dee.ensure_one().unwrap()).unwrap().get("lang"),
        Some(&text("en"))
    );
}

#[test]
fn copy_applies_overrides_and_duplicates_children() {
    let blog = Blog::new();
    let ann = blog.users().browse([blog.ann]);
    ann.write(&fields(&[("Password", "ann's password".into())]))
        .unwrap();

    let copy = ann
        .copy(&fields(&[
            ("Name", "ann's copy".into()),
            ("Email", "copy@example.com".into()),
        ]))
        .unwrap();

    assert_eq!(copy.len(), 1);
    assert_ne!(copy.ids(), ann.ids());
    assert_eq!(copy.get("Name").unwrap(), text("ann's copy"));
    assert_eq!(copy.get("Email").unwrap(), text("copy@example.com"));
    assert_eq!(copy.get_as::<String>("Password").unwrap(), "");
    assert_eq!(copy.get_as::<i64>("Age").unwrap(), 41);
    assert_eq!(copy.get("Profile").unwrap(), Value::Ref(blog.profile));
    assert_eq!(copy.get("DecoratedName").unwrap(), text("User: ann's copy"));
    assert_eq!(copy.get("Nums").unwrap(), Value::Int(2));

    let posts = copy.related("Posts").unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts.ids().iter().all(|id| *id != blog.rust && *id != blog.go));
    assert_eq!(ann.related("Posts").unwrap().ids(), [blog.rust, blog.go]);
    assert_eq!(blog.fx.store.row_count("Post"), 4);
}

#[test]
fn copy_requires_a_single_record() {
    let blog = Blog::new();

    let err = blog
        .users()
        .browse([blog.ann, blog.bob])
        .copy(&fields(&[]))
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::MultipleRecords { .. }));
    assert_eq!(blog.fx.store.row_count("User"), 3);
}

#[test]
fn write_recomputes_dependent_fields() {
    let blog = Blog::new();
    let bob = blog.users().browse([blog.bob]);
    assert_eq!(bob.get("DecoratedName").unwrap(), text("User: bob"));

    bob.write(&fields(&[("Name", "robert".into())])).unwrap();

    assert_eq!(bob.get("Name").unwrap(), text("robert"));
    assert_eq!(bob.get("DecoratedName").unwrap(), text("User: robert"));
    assert_eq!(
        blog.fx.store.row("User", blog.bob).unwrap().get("decorated_name"),
        Some(&text("User: robert"))
    );
}

#[test]
fn write_of_unrelated_field_leaves_computed_values() {
    let blog = Blog::new();
    let bob = blog.users().browse([blog.bob]);

    bob.write(&fields(&[("Age", 34.into())])).unwrap();

    assert_eq!(bob.get_as::<i64>("Age").unwrap(), 34);
    assert_eq!(bob.get("DecoratedName").unwrap(), text("User: bob"));
}

#[test]
fn writing_an_empty_set_is_a_no_op() {
    let fx = Fixture::new();

    fx.env(USER)
        .pool("User")
        .unwrap()
        .write(&fields(&[("Name", "x".into())]))
        .unwrap();

    assert!(!fx.store.rollback_requested());
}

#[test]
fn unlink_removes_records() {
    let blog = Blog::new();

    blog.fx.admin().pool("Post").unwrap().browse([blog.go]).unlink().unwrap();

    assert_eq!(blog.fx.store.row_count("Post"), 1);
    assert_eq!(
        blog.users().browse([blog.ann]).get("Posts").unwrap(),
        Value::RefList(vec![blog.rust])
    );
}

// ----------------------------------------------------------------------
// Algebra and sorting
// ----------------------------------------------------------------------

#[test]
fn set_algebra_keeps_first_operand_order() {
    let blog = Blog::new();
    let users = blog.users();
    let left = users.browse([blog.cid, blog.ann]);
    let right = users.browse([blog.bob, blog.ann]);

    assert_eq!(left.union(&right).ids(), [blog.cid, blog.ann, blog.bob]);
    assert_eq!(left.subtract(&right).ids(), [blog.cid]);
    assert_eq!(left.intersect(&right).ids(), [blog.ann]);
    assert!(left.intersect(&users).is_empty());
}

#[test]
fn filtered_keeps_matching_records() {
    let blog = Blog::new();
    let users = blog.users().search_all().unwrap();

    let older = users
        .filtered(|record| Ok(record.get_as::<i64>("Age")? > 30))
        .unwrap();

    assert_eq!(older.ids(), [blog.ann, blog.bob]);
}

#[test]
fn sorting_by_field_and_default_order() {
    let blog = Blog::new();
    let users = blog.users().browse([blog.bob, blog.cid, blog.ann]);

    assert_eq!(
        users.sorted_by_field("Age", false).unwrap().ids(),
        [blog.cid, blog.bob, blog.ann]
    );
    assert_eq!(
        users.sorted_by_field("Active", true).unwrap().ids(),
        [blog.ann, blog.bob, blog.cid]
    );
    assert_eq!(users.sorted_default().unwrap().ids(), [blog.ann, blog.bob, blog.cid]);
    assert_eq!(
        users.sorted(|a, b| b.ids()[0].cmp(&a.ids()[0])).ids(),
        [blog.bob, blog.ann, blog.cid]
    );
}

// ----------------------------------------------------------------------
// Security
// ----------------------------------------------------------------------

fn readable_by_users() -> Blog {
    let mut b = builder();
    b.allow_group("User", "read", USER_GROUP, Vec::<MethodRef>::new())
        .unwrap();
    let blog = Blog::with_fixture(Fixture::with_registry(b.seal().unwrap()));
    blog.fx
        .groups
        .add_rule(RecordRule::global(
            "active_only",
            "User",
            Condition::start().field("Active").equals(true),
            Permission::READ,
        ))
        .unwrap();

    blog
}

#[test]
fn crud_requires_a_grant() {
    let blog = Blog::new();
    let users = blog.fx.env(USER).pool("User").unwrap();

    let err = users.search_all().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Denied);
    assert_eq!(err.user, Some(USER));

    let err = users.create(&fields(&[("Name", "eve".into())])).unwrap_err();
    assert!(err.to_string().contains("(method 'create')"));

    let err = users.browse([blog.ann]).get("Name").unwrap_err();
    assert_eq!(err.class(), ErrorClass::Denied);
}

#[test]
fn read_rules_filter_searches() {
    let blog = readable_by_users();
    let users = blog.fx.env(USER).pool("User").unwrap();

    let visible = users.search_all().unwrap();

    assert_eq!(visible.ids(), [blog.ann, blog.bob]);
    assert_eq!(users.search_count(Condition::default()).unwrap(), 2);
}

#[test]
fn read_rules_guard_direct_access() {
    let blog = readable_by_users();
    let users = blog.fx.env(USER).pool("User").unwrap();
    let mixed = users.browse([blog.ann, blog.cid]);
    let records = mixed.records();

    // the hidden sibling does not poison the batch of a readable record
    assert_eq!(records[0].get("Name").unwrap(), text("ann"));

    let err = records[1].get("Name").unwrap_err();
    assert!(err.to_string().contains("record rules forbid read on 1 record(s)"));
}

#[test]
fn sudo_bypasses_grants_and_rules() {
    let blog = readable_by_users();
    let users = blog.fx.env(USER).pool("User").unwrap();

    let all = users.sudo().search_all().unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(all.browse([blog.cid]).get("Name").unwrap(), text("cid"));
    assert!(all.with_env(blog.fx.env(USER)).browse([blog.cid]).get("Name").is_err());
}

#[test]
fn write_rules_are_checked_per_call() {
    let mut b = builder();
    for method in ["read", "write"] {
        b.allow_group("User", method, USER_GROUP, Vec::<MethodRef>::new())
            .unwrap();
    }
    let blog = Blog::with_fixture(Fixture::with_registry(b.seal().unwrap()));
    let users = blog.fx.env(USER).pool("User").unwrap();
    let cid = users.browse([blog.cid]);

    cid.write(&fields(&[("Age", 20.into())])).unwrap();

    blog.fx
        .groups
        .add_rule(RecordRule::global(
            "active_only",
            "User",
            Condition::start().field("Active").equals(true),
            Permission::WRITE,
        ))
        .unwrap();

    let err = cid.write(&fields(&[("Age", 21.into())])).unwrap_err();
    assert!(err.to_string().contains("record rules forbid write"));
    assert_eq!(
        blog.fx.store.row("User", blog.cid).unwrap().get("age"),
        Some(&Value::Int(20))
    );
}

#[test]
fn environment_carries_context() {
    let blog = Blog::new();
    let env = blog.fx.admin().with_context("lang", "fr");

    let users = env.pool("User").unwrap();

    assert_eq!(users.env().context_value("lang"), Some(&text("fr")));
    assert_eq!(users.sudo().env().context_value("lang"), Some(&text("fr")));
    assert!(blog.fx.admin().context().is_empty());
}

#[test]
fn environment_switches_transaction() {
    let blog = Blog::new();
    let other = Arc::new(MemoryStore::new(Arc::clone(&blog.fx.registry)));
    let env = blog.fx.admin().with_transaction(other.clone());

    assert!(env.pool("User").unwrap().search_all().unwrap().is_empty());

    let missing = Condition::start().field("Nickname").equals("x");
    assert!(env.pool("User").unwrap().search(missing).is_err());
    assert!(other.rollback_requested());
    assert!(!blog.fx.store.rollback_requested());
}
