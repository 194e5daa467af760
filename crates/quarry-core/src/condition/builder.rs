use crate::{
    EXPR_SEP,
    condition::{Comparison, Condition, Operator, Predicate, Term},
    value::Value,
};

///
/// ConditionStart
///
/// Pending connective: the next field comparison is joined with AND or OR,
/// optionally negated.
///

#[derive(Clone, Debug)]
pub struct ConditionStart {
    cond: Condition,
    is_or: bool,
    is_not: bool,
}

impl ConditionStart {
    pub(crate) const fn new(cond: Condition, is_or: bool, is_not: bool) -> Self {
        Self {
            cond,
            is_or,
            is_not,
        }
    }

    /// Negate the next comparison.
    #[must_use]
    pub const fn not(mut self) -> Self {
        self.is_not = !self.is_not;
        self
    }

    /// Name the field (dotted path) of the next comparison.
    #[must_use]
    pub fn field(self, path: &str) -> ConditionField {
        ConditionField {
            start: self,
            exprs: path.split(EXPR_SEP).map(ToString::to_string).collect(),
        }
    }
}

///
/// ConditionField
///

#[derive(Clone, Debug)]
pub struct ConditionField {
    start: ConditionStart,
    exprs: Vec<String>,
}

impl ConditionField {
    /// Extend the path with one more segment.
    #[must_use]
    pub fn field(mut self, name: &str) -> Self {
        self.exprs.extend(name.split(EXPR_SEP).map(ToString::to_string));
        self
    }

    #[must_use]
    pub fn compare(self, operator: Operator, arg: impl Into<Value>) -> Condition {
        let ConditionStart {
            cond,
            is_or,
            is_not,
        } = self.start;

        cond.push(Predicate {
            term: Term::Compare(Comparison {
                exprs: self.exprs,
                operator,
                arg: arg.into(),
            }),
            is_or,
            is_not,
        })
    }

    #[must_use]
    pub fn equals(self, arg: impl Into<Value>) -> Condition {
        self.compare(Operator::Equals, arg)
    }

    #[must_use]
    pub fn not_equals(self, arg: impl Into<Value>) -> Condition {
        self.compare(Operator::NotEquals, arg)
    }

    #[must_use]
    pub fn greater(self, arg: impl Into<Value>) -> Condition {
        self.compare(Operator::Greater, arg)
    }

    #[must_use]
    pub fn greater_or_equal(self, arg: impl Into<Value>) -> Condition {
        self.compare(Operator::GreaterOrEqual, arg)
    }

    #[must_use]
    pub fn lower(self, arg: impl Into<Value>) -> Condition {
        self.compare(Operator::Lower, arg)
    }

    #[must_use]
    pub fn lower_or_equal(self, arg: impl Into<Value>) -> Condition {
        self.compare(Operator::LowerOrEqual, arg)
    }

    /// SQL `LIKE` pattern match (`%` and `_` wildcards).
    #[must_use]
    pub fn like(self, pattern: &str) -> Condition {
        self.compare(Operator::Like, pattern)
    }

    #[must_use]
    pub fn ilike(self, pattern: &str) -> Condition {
        self.compare(Operator::ILike, pattern)
    }

    /// Substring match.
    #[must_use]
    pub fn contains(self, arg: &str) -> Condition {
        self.compare(Operator::Contains, arg)
    }

    #[must_use]
    pub fn not_contains(self, arg: &str) -> Condition {
        self.compare(Operator::NotContains, arg)
    }

    #[must_use]
    pub fn icontains(self, arg: &str) -> Condition {
        self.compare(Operator::IContains, arg)
    }

    #[must_use]
    pub fn not_icontains(self, arg: &str) -> Condition {
        self.compare(Operator::NotIContains, arg)
    }

    #[must_use]
    pub fn is_in<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.compare(Operator::In, collect_list(values))
    }

    #[must_use]
    pub fn not_in<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.compare(Operator::NotIn, collect_list(values))
    }

    #[must_use]
    pub fn child_of(self, arg: impl Into<Value>) -> Condition {
        self.compare(Operator::ChildOf, arg)
    }

    /// Relation is set (or scalar is non-null).
    #[must_use]
    pub fn is_set(self) -> Condition {
        self.compare(Operator::NotEquals, Value::Null)
    }

    #[must_use]
    pub fn is_not_set(self) -> Condition {
        self.compare(Operator::Equals, Value::Null)
    }
}

fn collect_list<I, V>(values: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Value::List(values.into_iter().map(Into::into).collect())
}
