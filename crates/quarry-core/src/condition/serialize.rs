use crate::{
    condition::{Condition, Operator, Predicate, Term},
    value::Value,
};
use derive_more::{Deref, IntoIterator};
use serde::{Serialize, Serializer};

///
/// DomainTerm
///
/// One token of a prefix-notation domain. Connectives take the following
/// one (`Not`) or two (`And`, `Or`) operands.
///

#[derive(Clone, Debug, PartialEq)]
pub enum DomainTerm {
    And,
    Or,
    Not,
    Leaf {
        path: String,
        operator: Operator,
        value: Value,
    },
}

impl DomainTerm {
    pub(crate) fn leaf(path: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self::Leaf {
            path: path.into(),
            operator,
            value,
        }
    }

    // net change in complete operands contributed by this term
    const fn arity_delta(&self) -> isize {
        match self {
            Self::And | Self::Or => -1,
            Self::Not => 0,
            Self::Leaf { .. } => 1,
        }
    }
}

impl Serialize for DomainTerm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::And => serializer.serialize_str("&"),
            Self::Or => serializer.serialize_str("|"),
            Self::Not => serializer.serialize_str("!"),
            Self::Leaf {
                path,
                operator,
                value,
            } => (path, operator.as_str(), value).serialize(serializer),
        }
    }
}

///
/// Domain
///
/// Prefix-notation form of a condition. Top-level operands left over after
/// all connectives are consumed are implicitly ANDed.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct Domain(Vec<DomainTerm>);

impl Domain {
    #[must_use]
    pub const fn new(terms: Vec<DomainTerm>) -> Self {
        Self(terms)
    }

    #[must_use]
    pub fn into_terms(self) -> Vec<DomainTerm> {
        self.0
    }

    /// Number of complete top-level operands.
    #[must_use]
    pub fn operand_count(&self) -> usize {
        operand_count(&self.0)
    }
}

pub(super) fn serialize(cond: &Condition) -> Domain {
    Domain(serialize_predicates(&cond.predicates))
}

// AND runs are emitted left-folded (n-1 markers, then the n operands).
// An OR predicate opens `| <pred> <following AND run>`, and the whole
// group is placed before everything serialized so far.
fn serialize_predicates(predicates: &[Predicate]) -> Vec<DomainTerm> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < predicates.len() {
        if starts_or(predicates, i) {
            let mut group = vec![DomainTerm::Or];
            append_predicate(&mut group, &predicates[i]);
            i = consume_and_run(predicates, i + 1, &mut group);
            group.append(&mut out);
            out = group;
        } else {
            i = consume_and_run(predicates, i, &mut out);
        }
    }

    out
}

fn starts_or(predicates: &[Predicate], i: usize) -> bool {
    i > 0 && predicates[i].is_or
}

fn consume_and_run(predicates: &[Predicate], start: usize, out: &mut Vec<DomainTerm>) -> usize {
    let end = (start..predicates.len())
        .find(|&j| starts_or(predicates, j))
        .unwrap_or(predicates.len());
    if start >= end {
        return start;
    }

    out.extend(std::iter::repeat_n(DomainTerm::And, end - start - 1));
    for predicate in &predicates[start..end] {
        append_predicate(out, predicate);
    }

    end
}

fn append_predicate(out: &mut Vec<DomainTerm>, predicate: &Predicate) {
    if predicate.is_not {
        out.push(DomainTerm::Not);
    }
    match &predicate.term {
        Term::Compare(cmp) => {
            out.push(DomainTerm::leaf(cmp.path(), cmp.operator, cmp.arg.clone()));
        }
        Term::Nested(cond) => {
            // An OR group leaves its AND run as extra top-level operands that
            // consumers join implicitly. Spliced bare under an enclosing OR,
            // those operands would bind to the outer connective instead, so
            // the k operands are joined with k-1 AND markers first.
            let inner = serialize_predicates(&cond.predicates);
            let operands = operand_count(&inner);
            out.extend(std::iter::repeat_n(
                DomainTerm::And,
                operands.saturating_sub(1),
            ));
            out.extend(inner);
        }
    }
}

fn operand_count(terms: &[DomainTerm]) -> usize {
    let total: isize = terms.iter().map(DomainTerm::arity_delta).sum();
    usize::try_from(total).unwrap_or_default()
}
