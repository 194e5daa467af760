//! Merges method execution control with record rules. Every check reads the
//! security registry afresh; nothing here is cached.

use crate::{
    ID_FIELD,
    condition::{Condition, Row},
    env::Environment,
    error::Error,
    method::{MethodDef, MethodRef},
    recordset::RecordSet,
    security::Permission,
    value::RecordId,
};

/// Whether the acting user may execute `def` with `callers` on the stack
/// (innermost first).
pub(crate) fn check_method(
    env: &Environment,
    def: &MethodDef,
    callers: &[MethodRef],
) -> Result<(), Error> {
    if env.is_superuser() || def.access().is_open() {
        return Ok(());
    }

    let security = env.security();
    let granted = def.access().grants().iter().any(|grant| {
        security.is_member(env.uid(), &grant.group)
            && (grant.callers.is_empty() || callers.iter().any(|c| grant.callers.contains(c)))
    });

    if granted {
        Ok(())
    } else {
        tracing::debug!(uid = %env.uid(), model = def.model(), method = def.name(), "method denied");
        Err(Error::denied(
            def.model(),
            Some(def.name()),
            "no granted group held by the user",
        ))
    }
}

/// Method execution control for a built-in CRUD entry.
pub(crate) fn check_crud(env: &Environment, model: &str, method: &str) -> Result<(), Error> {
    let registry = env.registry();
    let def = registry.method(model, method)?;

    check_method(env, def, &[])
}

/// Combined record-rule condition for `perm` on `model`:
/// every global rule AND (any rule of a group the user holds).
///
/// `None` when no rule applies, which means unrestricted access.
#[must_use]
pub fn rule_condition(env: &Environment, model: &str, perm: Permission) -> Option<Condition> {
    if env.is_superuser() {
        return None;
    }

    let security = env.security();
    let rules: Vec<_> = security
        .rules_for(model)
        .into_iter()
        .filter(|rule| rule.perms.intersects(perm))
        .collect();

    let mut global = Condition::default();
    let mut held = Condition::default();
    let mut any = false;

    for rule in rules {
        match &rule.group {
            None => {
                global = global.and_cond(rule.condition);
                any = true;
            }
            Some(group) if security.is_member(env.uid(), group) => {
                held = held.or_cond(rule.condition);
                any = true;
            }
            Some(_) => {}
        }
    }

    any.then(|| global.and_cond(held))
}

/// Whether a single row (keyed by storage names) passes the record rules.
pub fn record_allowed<R: Row + ?Sized>(
    env: &Environment,
    model: &str,
    perm: Permission,
    row: &R,
) -> Result<bool, Error> {
    let Some(cond) = rule_condition(env, model, perm) else {
        return Ok(true);
    };
    let domain = env.registry().prepare_condition(model, cond)?.serialize();

    Ok(domain.evaluate(row))
}

/// Subset of `ids` (in input order) that passes the rules for `perm`.
pub(crate) fn allowed_ids(
    env: &Environment,
    model: &str,
    ids: &[RecordId],
    perm: Permission,
) -> Result<Vec<RecordId>, Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rule) = rule_condition(env, model, perm) else {
        return Ok(ids.to_vec());
    };

    let registry = env.registry();
    let cond = Condition::start()
        .field(ID_FIELD)
        .is_in(ids.iter().copied())
        .and_cond(rule);
    let domain = registry.prepare_condition(model, cond)?.serialize();
    let found = env
        .transaction()
        .search(registry.model(model)?, &domain, &[], None, 0)?;

    Ok(ids.iter().copied().filter(|id| found.contains(id)).collect())
}

/// Fail unless every record of `rs` passes the rules for `perm`.
pub(crate) fn check_records(rs: &RecordSet, perm: Permission) -> Result<(), Error> {
    ensure_allowed(rs.env(), rs.model(), rs.ids(), perm)
}

/// Fail unless every id in `ids` passes the rules for `perm`.
pub(crate) fn ensure_allowed(
    env: &Environment,
    model: &str,
    ids: &[RecordId],
    perm: Permission,
) -> Result<(), Error> {
    let allowed = allowed_ids(env, model, ids, perm)?;
    if allowed.len() == ids.len() {
        return Ok(());
    }

    let denied = ids.len() - allowed.len();
    tracing::debug!(uid = %env.uid(), model, denied, "record rules denied access");

    Err(Error::denied(
        model,
        None,
        format!(
            "record rules forbid {} on {denied} record(s)",
            permission_label(perm)
        ),
    ))
}

fn permission_label(perm: Permission) -> &'static str {
    if perm == Permission::READ {
        "read"
    } else if perm == Permission::WRITE {
        "write"
    } else if perm == Permission::CREATE {
        "create"
    } else if perm == Permission::UNLINK {
        "unlink"
    } else {
        "access"
    }
}
