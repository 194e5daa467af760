use crate::{
    condition::{Domain, DomainTerm, Operator},
    value::{FieldMap, Value},
};
use std::cmp::Ordering;

///
/// Row
///
/// Read access to one record, keyed by the storage paths a domain names.
///

pub trait Row {
    fn value(&self, path: &str) -> Option<Value>;
}

impl Row for FieldMap {
    fn value(&self, path: &str) -> Option<Value> {
        self.get(path).cloned()
    }
}

impl Domain {
    /// Evaluate the domain against one row.
    ///
    /// Missing paths read as `Null`. Terms are consumed right to left on an
    /// operand stack; whatever remains at the end is ANDed, so an empty
    /// domain matches everything.
    #[must_use]
    pub fn evaluate<R: Row + ?Sized>(&self, row: &R) -> bool {
        let mut stack: Vec<bool> = Vec::with_capacity(self.len());

        for term in self.iter().rev() {
            let result = match term {
                DomainTerm::Leaf {
                    path,
                    operator,
                    value,
                } => {
                    let actual = row.value(path).unwrap_or_default();
                    matches(&actual, *operator, value)
                }
                DomainTerm::Not => !stack.pop().unwrap_or(true),
                DomainTerm::And => {
                    let lhs = stack.pop().unwrap_or(true);
                    let rhs = stack.pop().unwrap_or(true);
                    lhs && rhs
                }
                DomainTerm::Or => {
                    let lhs = stack.pop().unwrap_or(false);
                    let rhs = stack.pop().unwrap_or(false);
                    lhs || rhs
                }
            };
            stack.push(result);
        }

        stack.into_iter().all(|operand| operand)
    }
}

/// Whether `actual` satisfies `operator arg`. Collections on the record
/// side (to-many values) match when any element does.
pub(crate) fn matches(actual: &Value, operator: Operator, arg: &Value) -> bool {
    if operator.is_negative() {
        return !matches(actual, positive(operator), arg);
    }

    match actual {
        Value::RefList(ids) if !ids.is_empty() => ids
            .iter()
            .any(|id| matches_scalar(&Value::Ref(*id), operator, arg)),
        Value::List(items) if !items.is_empty() => {
            items.iter().any(|item| matches(item, operator, arg))
        }
        Value::RefList(_) | Value::List(_) => matches_scalar(&Value::Null, operator, arg),
        scalar => matches_scalar(scalar, operator, arg),
    }
}

const fn positive(operator: Operator) -> Operator {
    match operator {
        Operator::NotEquals => Operator::Equals,
        Operator::NotContains => Operator::Contains,
        Operator::NotIContains => Operator::IContains,
        Operator::NotIn => Operator::In,
        other => other,
    }
}

fn matches_scalar(actual: &Value, operator: Operator, arg: &Value) -> bool {
    match operator {
        Operator::Equals => actual.compare(arg) == Some(Ordering::Equal),
        Operator::Greater => actual.compare(arg) == Some(Ordering::Greater),
        Operator::GreaterOrEqual => {
            matches!(actual.compare(arg), Some(Ordering::Greater | Ordering::Equal))
        }
        Operator::Lower => actual.compare(arg) == Some(Ordering::Less),
        Operator::LowerOrEqual => {
            matches!(actual.compare(arg), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::Like => text_match(actual, arg, false, false),
        Operator::ILike => text_match(actual, arg, true, false),
        Operator::Contains => text_match(actual, arg, false, true),
        Operator::IContains => text_match(actual, arg, true, true),
        // no hierarchy is known at this level, so child_of degrades to membership
        Operator::In | Operator::ChildOf => match arg {
            Value::List(items) => items
                .iter()
                .any(|item| actual.compare(item) == Some(Ordering::Equal)),
            Value::RefList(ids) => ids
                .iter()
                .any(|id| actual.compare(&Value::Ref(*id)) == Some(Ordering::Equal)),
            single => actual.compare(single) == Some(Ordering::Equal),
        },
        Operator::NotEquals
        | Operator::NotContains
        | Operator::NotIContains
        | Operator::NotIn => !matches_scalar(actual, positive(operator), arg),
    }
}

fn text_match(actual: &Value, arg: &Value, fold_case: bool, substring: bool) -> bool {
    let (Value::Text(text), Value::Text(pattern)) = (actual, arg) else {
        return false;
    };
    let (text, pattern) = if fold_case {
        (text.to_lowercase(), pattern.to_lowercase())
    } else {
        (text.clone(), pattern.clone())
    };

    if substring {
        text.contains(&pattern)
    } else {
        like(&text.chars().collect::<Vec<_>>(), &pattern.chars().collect::<Vec<_>>())
    }
}

// SQL LIKE: `%` matches any run, `_` any single character
fn like(text: &[char], pattern: &[char]) -> bool {
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;

    for &p in pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for (i, slot) in next.iter_mut().enumerate() {
                    seen |= reachable[i];
                    *slot = seen;
                }
            }
            _ => {
                for i in 0..text.len() {
                    if reachable[i] && (p == '_' || text[i] == p) {
                        next[i + 1] = true;
                    }
                }
            }
        }
        reachable = next;
    }

    reachable[text.len()]
}
