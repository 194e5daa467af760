use crate::{
    EXPR_SEP, ID_JSON,
    condition::{Domain, DomainTerm, Row},
    error::Error,
    model::{ModelDef, field::FieldKind},
    registry::Registry,
    storage::{OrderTerm, Transaction},
    value::{FieldMap, RecordId, Value},
};
use parking_lot::Mutex;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
    },
};

///
/// MemoryStore
///
/// In-process executor keeping one table per model. Evaluates domains with
/// `Domain::evaluate`, following relations across tables, so it honours
/// exactly the structure the condition serializer emits.
///

#[derive(Debug)]
pub struct MemoryStore {
    registry: Arc<Registry>,
    state: Mutex<State>,
    rollback: AtomicBool,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, BTreeMap<RecordId, FieldMap>>,
    last_id: i64,
}

impl MemoryStore {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            state: Mutex::new(State::default()),
            rollback: AtomicBool::new(false),
        }
    }

    /// Raw stored row, keyed by storage name.
    #[must_use]
    pub fn row(&self, model: &str, id: RecordId) -> Option<FieldMap> {
        self.state
            .lock()
            .tables
            .get(model)
            .and_then(|table| table.get(&id))
            .cloned()
    }

    #[must_use]
    pub fn row_count(&self, model: &str) -> usize {
        self.state.lock().tables.get(model).map_or(0, BTreeMap::len)
    }

    fn check_paths(&self, model: &ModelDef, domain: &Domain) -> Result<(), Error> {
        for term in domain.iter() {
            if let DomainTerm::Leaf { path, .. } = term {
                self.registry
                    .resolve_path(model.name(), path)
                    .map_err(|e| Error::storage(model.name(), e.to_string()))?;
            }
        }

        Ok(())
    }

    fn matching(&self, state: &State, model: &ModelDef, domain: &Domain) -> Vec<RecordId> {
        let Some(table) = state.tables.get(model.name()) else {
            return Vec::new();
        };

        table
            .iter()
            .filter(|(id, row)| {
                domain.evaluate(&StoredRow {
                    state,
                    registry: &self.registry,
                    model,
                    id: **id,
                    row,
                })
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Transaction for MemoryStore {
    fn search(
        &self,
        model: &ModelDef,
        domain: &Domain,
        order: &[OrderTerm],
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RecordId>, Error> {
        self.check_paths(model, domain)?;
        let state = self.state.lock();
        let mut ids = self.matching(&state, model, domain);

        if !order.is_empty() {
            let table = state.tables.get(model.name());
            let keys: BTreeMap<RecordId, Vec<Value>> = ids
                .iter()
                .map(|id| {
                    let row = table.and_then(|t| t.get(id));
                    let key = order
                        .iter()
                        .map(|term| {
                            row.map(|row| {
                                value_at(&state, &self.registry, model, *id, row, &term.path)
                            })
                            .unwrap_or_default()
                        })
                        .collect();
                    (*id, key)
                })
                .collect();

            ids.sort_by(|a, b| {
                order
                    .iter()
                    .zip(keys[a].iter().zip(&keys[b]))
                    .map(|(term, (x, y))| {
                        let ord = x.sort_cmp(y);
                        if term.descending { ord.reverse() } else { ord }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or_else(|| a.cmp(b))
            });
        }

        tracing::trace!(model = model.name(), found = ids.len(), "memory search");

        Ok(ids
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn count(&self, model: &ModelDef, domain: &Domain) -> Result<usize, Error> {
        self.check_paths(model, domain)?;
        let state = self.state.lock();

        Ok(self.matching(&state, model, domain).len())
    }

    fn read(&self, model: &ModelDef, ids: &[RecordId], paths: &[String]) -> Result<Vec<FieldMap>, Error> {
        let state = self.state.lock();
        let Some(table) = state.tables.get(model.name()) else {
            return Ok(Vec::new());
        };

        let rows = ids
            .iter()
            .filter_map(|id| table.get(id).map(|row| (*id, row)))
            .map(|(id, row)| {
                let mut out = FieldMap::new();
                out.insert(ID_JSON.to_string(), Value::Int(id.get()));
                for path in paths {
                    let value = value_at(&state, &self.registry, model, id, row, path);
                    out.insert(path.clone(), value);
                }
                out
            })
            .collect();

        Ok(rows)
    }

    fn create(&self, model: &ModelDef, values: &FieldMap) -> Result<RecordId, Error> {
        let mut state = self.state.lock();
        state.last_id += 1;
        let id = RecordId::new(state.last_id);

        let mut row = values.clone();
        row.insert(ID_JSON.to_string(), Value::Int(id.get()));
        state
            .tables
            .entry(model.name().to_string())
            .or_default()
            .insert(id, row);

        tracing::trace!(model = model.name(), %id, "memory create");

        Ok(id)
    }

    fn write(&self, model: &ModelDef, ids: &[RecordId], values: &FieldMap) -> Result<(), Error> {
        let mut state = self.state.lock();
        let table = state.tables.entry(model.name().to_string()).or_default();

        for id in ids {
            let row = table
                .get_mut(id)
                .ok_or_else(|| Error::storage(model.name(), format!("record {id} does not exist")))?;
            row.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(())
    }

    fn unlink(&self, model: &ModelDef, ids: &[RecordId]) -> Result<(), Error> {
        let mut state = self.state.lock();
        if let Some(table) = state.tables.get_mut(model.name()) {
            for id in ids {
                table.remove(id);
            }
        }

        Ok(())
    }

    fn request_rollback(&self) {
        self.rollback.store(true, AtomicOrdering::SeqCst);
    }

    fn rollback_requested(&self) -> bool {
        self.rollback.load(AtomicOrdering::SeqCst)
    }
}

///
/// StoredRow
/// One stored record seen through the relation graph.
///

struct StoredRow<'a> {
    state: &'a State,
    registry: &'a Registry,
    model: &'a ModelDef,
    id: RecordId,
    row: &'a FieldMap,
}

impl Row for StoredRow<'_> {
    fn value(&self, path: &str) -> Option<Value> {
        Some(value_at(
            self.state,
            self.registry,
            self.model,
            self.id,
            self.row,
            path,
        ))
    }
}

// Value at a dotted storage path. To-many hops collect into a list.
fn value_at(
    state: &State,
    registry: &Registry,
    model: &ModelDef,
    id: RecordId,
    row: &FieldMap,
    path: &str,
) -> Value {
    let (head, rest) = match path.split_once(EXPR_SEP) {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let Some(field) = model.field(head) else {
        return Value::Null;
    };

    let own = if field.kind() == FieldKind::One2Many {
        let reverse = field.reverse().unwrap_or_default();
        let ids = field
            .related_model()
            .and_then(|target| state.tables.get(target))
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, other)| {
                        other
                            .get(reverse)
                            .is_some_and(|v| v.ref_ids().contains(&id))
                    })
                    .map(|(other_id, _)| *other_id)
                    .collect()
            })
            .unwrap_or_default();
        Value::RefList(ids)
    } else {
        row.get(field.json_name()).cloned().unwrap_or_default()
    };

    let Some(rest) = rest else {
        return own;
    };
    let Some(target) = field.related_model().and_then(|m| registry.get_model(m)) else {
        return Value::Null;
    };
    let table = state.tables.get(target.name());
    let values: Vec<Value> = own
        .ref_ids()
        .into_iter()
        .filter_map(|rid| {
            table
                .and_then(|t| t.get(&rid))
                .map(|r| value_at(state, registry, target, rid, r, rest))
        })
        .collect();

    if field.kind().is_to_many() {
        Value::List(values)
    } else {
        values.into_iter().next().unwrap_or_default()
    }
}
