use crate::value::{FieldMap, RecordId, Value};
use std::collections::BTreeMap;

///
/// RecordCache
///
/// Loaded values per record, keyed by storage path. A path that is absent
/// has not been loaded; a loaded unset value is stored as `Null`.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct RecordCache {
    entries: BTreeMap<RecordId, FieldMap>,
}

impl RecordCache {
    pub(crate) fn get(&self, id: RecordId, path: &str) -> Option<&Value> {
        self.entries.get(&id).and_then(|row| row.get(path))
    }

    pub(crate) fn contains(&self, id: RecordId, path: &str) -> bool {
        self.get(id, path).is_some()
    }

    pub(crate) fn set(&mut self, id: RecordId, path: &str, value: Value) {
        self.entries
            .entry(id)
            .or_default()
            .insert(path.to_string(), value);
    }

    pub(crate) fn merge_row(&mut self, id: RecordId, row: FieldMap) {
        self.entries.entry(id).or_default().extend(row);
    }

    /// Copy the entries of `ids` from `other`, keeping existing values.
    pub(crate) fn absorb(&mut self, other: &Self, ids: &[RecordId]) {
        for id in ids {
            if let Some(row) = other.entries.get(id) {
                let target = self.entries.entry(*id).or_default();
                for (path, value) in row {
                    target.entry(path.clone()).or_insert_with(|| value.clone());
                }
            }
        }
    }

    pub(crate) fn forget(&mut self, ids: &[RecordId]) {
        for id in ids {
            self.entries.remove(id);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
