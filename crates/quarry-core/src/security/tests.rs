use crate::{
    condition::Condition,
    error::ErrorClass,
    registry::RegistryError,
    security::{
        Group, GroupId, GroupRegistry, Permission, RecordRule, SecurityRegistry,
        combinator::{self, record_allowed, rule_condition},
    },
    test_support::{ADMIN, Fixture, USER, USER_GROUP, fields},
    value::{FieldMap, UserId, Value},
};

const GROUP_B: &str = "group_b";

fn row(active: bool, email: &str, is_staff: bool) -> FieldMap {
    fields(&[
        ("active", Value::Bool(active)),
        ("email", Value::from(email)),
        ("is_staff", Value::Bool(is_staff)),
    ])
}

// one global rule, one rule for each of two groups USER holds
fn combined_rules(fx: &Fixture) {
    fx.groups.add_group(Group::new(GROUP_B, "Group B")).unwrap();
    fx.groups.add_membership(USER, GROUP_B).unwrap();

    fx.groups
        .add_rule(RecordRule::global(
            "active_only",
            "User",
            Condition::start().field("Active").equals(true),
            Permission::ALL,
        ))
        .unwrap();
    fx.groups
        .add_rule(RecordRule::for_group(
            "own",
            "User",
            USER_GROUP,
            Condition::start().field("Email").equals("user@example.com"),
            Permission::ALL,
        ))
        .unwrap();
    fx.groups
        .add_rule(RecordRule::for_group(
            "shared",
            "User",
            GROUP_B,
            Condition::start().field("IsStaff").equals(true),
            Permission::READ,
        ))
        .unwrap();
}

// ----------------------------------------------------------------------
// Groups
// ----------------------------------------------------------------------

#[test]
fn membership_is_inherited_transitively() {
    let groups = GroupRegistry::new();
    groups.add_group(Group::new("base", "Base")).unwrap();
    groups.add_group(Group::new("sales", "Sales").inherits("base")).unwrap();
    groups
        .add_group(Group::new("sales_manager", "Sales Manager").inherits("sales"))
        .unwrap();
    let uid = UserId::new(10);
    groups.add_membership(uid, "sales_manager").unwrap();

    assert!(groups.is_member(uid, &GroupId::new("base")));
    assert!(groups.is_member(uid, &GroupId::new("sales")));
    assert!(!groups.is_member(UserId::new(11), &GroupId::new("base")));
    assert_eq!(groups.direct_groups(uid), vec![GroupId::new("sales_manager")]);
}

#[test]
fn inheritance_cycles_are_rejected() {
    let groups = GroupRegistry::new();
    groups.add_group(Group::new("a", "A")).unwrap();
    groups.add_group(Group::new("b", "B").inherits("a")).unwrap();

    let err = groups.add_group(Group::new("a", "A").inherits("b")).unwrap_err();
    assert!(matches!(err, RegistryError::CyclicGroup(id) if id == "a"));

    let err = groups.add_group(Group::new("c", "C").inherits("c")).unwrap_err();
    assert!(matches!(err, RegistryError::CyclicGroup(_)));
}

#[test]
fn unknown_groups_are_rejected() {
    let groups = GroupRegistry::new();

    assert!(matches!(
        groups.add_group(Group::new("child", "Child").inherits("ghost")),
        Err(RegistryError::UnknownGroup(_))
    ));
    assert!(matches!(
        groups.add_membership(UserId::new(5), "ghost"),
        Err(RegistryError::UnknownGroup(_))
    ));
    assert!(matches!(
        groups.add_rule(RecordRule::for_group(
            "r",
            "User",
            "ghost",
            Condition::default(),
            Permission::READ
        )),
        Err(RegistryError::UnknownGroup(_))
    ));
}

#[test]
fn rules_are_kept_per_model_in_order() {
    let groups = GroupRegistry::new();
    for name in ["first", "second"] {
        groups
            .add_rule(RecordRule::global(name, "Post", Condition::default(), Permission::READ))
            .unwrap();
    }
    groups
        .add_rule(RecordRule::global("other", "Tag", Condition::default(), Permission::READ))
        .unwrap();

    let names: Vec<_> = groups.rules_for("Post").into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["first", "second"]);

    groups.remove_rule("Post", "first");
    assert_eq!(groups.rules_for("Post").len(), 1);
    assert!(groups.rules_for("Comment").is_empty());
}

// ----------------------------------------------------------------------
// Record rules
// ----------------------------------------------------------------------

#[test]
fn global_rule_gates_every_group_rule() {
    let fx = Fixture::new();
    combined_rules(&fx);
    let env = fx.env(USER);

    // owner mismatch, but the held group B rule matches
    let shared = row(true, "other@example.com", true);
    assert!(record_allowed(&env, "User", Permission::READ, &shared).unwrap());

    // inactive records fail the global rule whatever the group rules say
    let inactive = row(false, "other@example.com", true);
    assert!(!record_allowed(&env, "User", Permission::READ, &inactive).unwrap());
}

#[test]
fn rules_only_apply_to_their_permissions() {
    let fx = Fixture::new();
    combined_rules(&fx);
    let env = fx.env(USER);
    let shared = row(true, "other@example.com", true);

    // group B's rule covers READ only, so WRITE falls back to the owner rule
    assert!(!record_allowed(&env, "User", Permission::WRITE, &shared).unwrap());
    assert!(
        record_allowed(
            &env,
            "User",
            Permission::WRITE,
            &row(true, "user@example.com", false)
        )
        .unwrap()
    );
}

#[test]
fn group_rules_of_unheld_groups_are_ignored() {
    let fx = Fixture::new();
    combined_rules(&fx);
    fx.groups.remove_membership(USER, GROUP_B);
    let env = fx.env(USER);

    // same environment, re-evaluated against the changed membership
    let shared = row(true, "other@example.com", true);
    assert!(!record_allowed(&env, "User", Permission::READ, &shared).unwrap());
}

#[test]
fn only_global_rules_when_no_group_rule_is_held() {
    let fx = Fixture::new();
    combined_rules(&fx);
    let stranger = fx.env(UserId::new(40));

    assert!(record_allowed(&stranger, "User", Permission::READ, &row(true, "x", false)).unwrap());
    assert!(!record_allowed(&stranger, "User", Permission::READ, &row(false, "x", true)).unwrap());
}

#[test]
fn no_applicable_rule_means_unrestricted() {
    let fx = Fixture::new();
    combined_rules(&fx);

    assert!(rule_condition(&fx.env(USER), "Post", Permission::READ).is_none());
    assert!(rule_condition(&fx.env(USER), "User", Permission::READ).is_some());
}

#[test]
fn superuser_bypasses_record_rules() {
    let fx = Fixture::new();
    combined_rules(&fx);
    let root = fx.admin().sudo();

    assert!(rule_condition(&root, "User", Permission::READ).is_none());
    assert!(record_allowed(&root, "User", Permission::UNLINK, &row(false, "x", false)).unwrap());
}

#[test]
fn stored_records_are_checked_through_storage() {
    let fx = Fixture::new();
    let visible = fx.seed("User", &[("Name", "ann".into()), ("Active", true.into())]);
    let hidden = fx.seed("User", &[("Name", "bob".into()), ("Active", false.into())]);
    fx.groups
        .add_rule(RecordRule::global(
            "active_only",
            "User",
            Condition::start().field("Active").equals(true),
            Permission::READ,
        ))
        .unwrap();
    let env = fx.admin();

    let allowed = combinator::allowed_ids(&env, "User", &[hidden, visible], Permission::READ).unwrap();
    assert_eq!(allowed, vec![visible]);

    let err = combinator::ensure_allowed(&env, "User", &[visible, hidden], Permission::READ)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Denied);
    assert!(err.to_string().contains("record rules forbid read on 1 record(s)"));

    assert!(combinator::ensure_allowed(&env, "User", &[visible], Permission::WRITE).is_ok());
    assert_eq!(env.uid(), ADMIN);
}
