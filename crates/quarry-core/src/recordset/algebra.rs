use crate::{
    error::Error,
    recordset::{RecordSet, parse_order},
    value::Value,
};
use std::{cmp::Ordering, sync::Arc};

impl RecordSet {
    /// Members of `self` followed by the members of `other` not already in it.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        debug_assert_eq!(self.model, other.model, "union across models");
        let mut ids = self.ids.clone();
        ids.extend(other.ids.iter().copied().filter(|id| !self.ids.contains(id)));

        let out = self.detached(ids);
        out.cache
            .borrow_mut()
            .absorb(&other.cache.borrow(), &other.ids);

        out
    }

    /// Members of `self` that are not in `other`.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        self.detached(
            self.ids
                .iter()
                .copied()
                .filter(|id| !other.ids.contains(id))
                .collect(),
        )
    }

    /// Members of `self` that are also in `other`, in `self` order.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        self.detached(
            self.ids
                .iter()
                .copied()
                .filter(|id| other.ids.contains(id))
                .collect(),
        )
    }

    /// Members for which `keep` returns true, in order.
    pub fn filtered<F>(&self, mut keep: F) -> Result<Self, Error>
    where
        F: FnMut(&Self) -> Result<bool, Error>,
    {
        let mut ids = Vec::new();
        for record in self.records() {
            if keep(&record)? {
                ids.extend_from_slice(record.ids());
            }
        }

        Ok(self.detached(ids))
    }

    /// Members ordered by `compare` over single-record views. Members that
    /// compare equal may come out in any order.
    #[must_use]
    pub fn sorted<F>(&self, mut compare: F) -> Self
    where
        F: FnMut(&Self, &Self) -> Ordering,
    {
        let mut records = self.records();
        records.sort_unstable_by(|a, b| compare(a, b));

        self.detached(records.iter().flat_map(|r| r.ids.clone()).collect())
    }

    /// Members ordered by `field`, ties broken by the model's default order
    /// and then by identifier.
    pub fn sorted_by_field(&self, field: &str, descending: bool) -> Result<Self, Error> {
        let mut terms = vec![(field.to_string(), descending)];
        terms.extend(self.default_terms()?);

        self.sort_by_terms(&terms).map_err(|e| self.env.fail(e))
    }

    /// Members ordered by the model's default order.
    pub fn sorted_default(&self) -> Result<Self, Error> {
        let terms = self.default_terms()?;

        self.sort_by_terms(&terms).map_err(|e| self.env.fail(e))
    }

    fn default_terms(&self) -> Result<Vec<(String, bool)>, Error> {
        let registry = Arc::clone(self.env.registry());
        let model = registry.model(&self.model).map_err(|e| self.env.fail(e))?;

        Ok(model
            .default_order()
            .iter()
            .map(|term| {
                let (path, descending) = parse_order(term);
                (path.to_string(), descending)
            })
            .collect())
    }

    fn sort_by_terms(&self, terms: &[(String, bool)]) -> Result<Self, Error> {
        let mut keyed = self
            .records()
            .iter()
            .map(|record| {
                let key = terms
                    .iter()
                    .map(|(path, _)| record.value(path))
                    .collect::<Result<Vec<Value>, Error>>()?;
                Ok((record.ids[0], key))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        keyed.sort_by(|(id_a, a), (id_b, b)| {
            terms
                .iter()
                .zip(a.iter().zip(b))
                .map(|((_, descending), (x, y))| {
                    let ord = x.sort_cmp(y);
                    if *descending { ord.reverse() } else { ord }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| id_a.cmp(id_b))
        });

        Ok(self.detached(keyed.into_iter().map(|(id, _)| id).collect()))
    }
}
