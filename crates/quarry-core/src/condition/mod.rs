//! Module: condition
//! Responsibility: the boolean condition tree, its fluent builder, and its
//! prefix-notation serialization and evaluation.
//! Does not own: path resolution (conditions hold raw path segments).

mod builder;
mod eval;
mod serialize;


pub use builder::{ConditionField, ConditionStart};
pub use eval::Row;
pub use serialize::{Domain, DomainTerm};

use crate::{
    EXPR_SEP,
    error::{Error, ErrorKind},
    value::{FieldMap, Value},
};
use serde::Serialize;
use std::{fmt, str::FromStr};

///
/// Operator
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(into = "&'static str")]
pub enum Operator {
    Equals,
    NotEquals,
    Greater,
    GreaterOrEqual,
    Lower,
    LowerOrEqual,
    Like,
    ILike,
    Contains,
    NotContains,
    IContains,
    NotIContains,
    In,
    NotIn,
    ChildOf,
}

impl Operator {
    pub const ALL: [Self; 15] = [
        Self::Equals,
        Self::NotEquals,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Lower,
        Self::LowerOrEqual,
        Self::Like,
        Self::ILike,
        Self::Contains,
        Self::NotContains,
        Self::IContains,
        Self::NotIContains,
        Self::In,
        Self::NotIn,
        Self::ChildOf,
    ];

    /// Wire symbol of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Lower => "<",
            Self::LowerOrEqual => "<=",
            Self::Like => "=like",
            Self::ILike => "=ilike",
            Self::Contains => "like",
            Self::NotContains => "not like",
            Self::IContains => "ilike",
            Self::NotIContains => "not ilike",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::ChildOf => "child_of",
        }
    }

    /// Operators whose match is the complement of another operator.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(
            self,
            Self::NotEquals | Self::NotContains | Self::NotIContains | Self::NotIn
        )
    }
}

impl From<Operator> for &'static str {
    fn from(op: Operator) -> Self {
        op.as_str()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ErrorKind::UnknownOperator(s.to_string()).into())
    }
}

///
/// Comparison
///
/// `path <operator> arg`, with the path kept as raw segments until the
/// condition is prepared against a model.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub exprs: Vec<String>,
    pub operator: Operator,
    pub arg: Value,
}

impl Comparison {
    #[must_use]
    pub fn path(&self) -> String {
        self.exprs.join(EXPR_SEP)
    }
}

///
/// Term
///

#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Compare(Comparison),
    Nested(Condition),
}

///
/// Predicate
///
/// One element of a condition. `is_or` joins it to its predecessor with OR
/// instead of AND; it has no meaning on the first predicate.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub term: Term,
    pub is_or: bool,
    pub is_not: bool,
}

///
/// Condition
///
/// Ordered predicate list. Grouping is encoded by position only: an OR
/// predicate together with the AND run following it forms one group that
/// serializes ahead of everything before it. Conditions are values; every
/// combinator consumes its receiver and returns the extended condition.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Condition {
    pub(crate) predicates: Vec<Predicate>,
}

impl Condition {
    /// Begin a new condition.
    #[must_use]
    pub fn start() -> ConditionStart {
        ConditionStart::new(Self::default(), false, false)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn and(self) -> ConditionStart {
        ConditionStart::new(self, false, false)
    }

    #[must_use]
    pub fn and_not(self) -> ConditionStart {
        ConditionStart::new(self, false, true)
    }

    #[must_use]
    pub fn or(self) -> ConditionStart {
        ConditionStart::new(self, true, false)
    }

    #[must_use]
    pub fn or_not(self) -> ConditionStart {
        ConditionStart::new(self, true, true)
    }

    #[must_use]
    pub fn and_cond(self, cond: Self) -> Self {
        self.nest(cond, false, false)
    }

    #[must_use]
    pub fn and_not_cond(self, cond: Self) -> Self {
        self.nest(cond, false, true)
    }

    #[must_use]
    pub fn or_cond(self, cond: Self) -> Self {
        self.nest(cond, true, false)
    }

    #[must_use]
    pub fn or_not_cond(self, cond: Self) -> Self {
        self.nest(cond, true, true)
    }

    // empty nested conditions are dropped
    fn nest(mut self, cond: Self, is_or: bool, is_not: bool) -> Self {
        if cond.is_empty() {
            return self;
        }
        self.predicates.push(Predicate {
            term: Term::Nested(cond),
            is_or,
            is_not,
        });
        self
    }

    pub(crate) fn push(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Every comparison path in the condition, nested ones included,
    /// in order of appearance.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths(&self, out: &mut Vec<String>) {
        for predicate in &self.predicates {
            match &predicate.term {
                Term::Compare(cmp) => out.push(cmp.path()),
                Term::Nested(cond) => cond.collect_paths(out),
            }
        }
    }

    /// Rebuild the condition with every comparison passed through `f`.
    pub(crate) fn try_map_comparisons<F>(self, f: &mut F) -> Result<Self, Error>
    where
        F: FnMut(Comparison) -> Result<Comparison, Error>,
    {
        let predicates = self
            .predicates
            .into_iter()
            .map(|predicate| {
                let term = match predicate.term {
                    Term::Compare(cmp) => Term::Compare(f(cmp)?),
                    Term::Nested(cond) => Term::Nested(cond.try_map_comparisons(f)?),
                };
                Ok(Predicate { term, ..predicate })
            })
            .collect::<Result<_, Error>>()?;

        Ok(Self { predicates })
    }

    /// AND an equality on each grouped path, taking the value from `values`
    /// (`Null` when absent). Used to select the records of one group.
    #[must_use]
    pub fn and_group_values<S: AsRef<str>>(self, group_by: &[S], values: &FieldMap) -> Self {
        group_by.iter().fold(self, |cond, path| {
            let path = path.as_ref();
            let value = values.get(path).cloned().unwrap_or_default();
            cond.and().field(path).equals(value)
        })
    }

    /// Serialize to prefix notation.
    #[must_use]
    pub fn serialize(&self) -> Domain {
        serialize::serialize(self)
    }
}
