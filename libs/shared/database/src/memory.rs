//! In-memory record store. Backs the cell test suites and local runs without
//! a database; behavior mirrors [`crate::postgrest::PostgrestStore`] —
//! sequential store-assigned ids, the same filter operators, and exclusive
//! advisory row locks with bounded acquisition.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use crate::store::{Filter, FilterOp, Ordering, RecordStore, RowLock, StoreError};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Value>,
}

#[derive(Default)]
struct LockTable {
    slots: HashMap<String, Arc<Mutex<()>>>,
    held: HashMap<Uuid, OwnedMutexGuard<()>>,
}

pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    locks: Mutex<LockTable>,
    lock_timeout: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            locks: Mutex::new(LockTable::default()),
            lock_timeout,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_by_id(&self, table: &str, id: i64) -> Result<Option<Value>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(table)
            .and_then(|t| t.rows.get(&id))
            .cloned())
    }

    async fn find_one(&self, table: &str, filters: &[Filter]) -> Result<Option<Value>, StoreError> {
        let rows = self.find_all(table, filters, None, Some(1)).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_all(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<Ordering>,
        limit: Option<u32>,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Value> = match tables.get(table) {
            Some(t) => t
                .rows
                .values()
                .filter(|row| filters.iter().all(|f| matches_filter(row, f)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&Value::Null);
                let right = b.get(&order.column).unwrap_or(&Value::Null);
                let cmp = compare_values(left, right).unwrap_or(std::cmp::Ordering::Equal);
                if order.descending {
                    cmp.reverse()
                } else {
                    cmp
                }
            });
        }

        if let Some(limit) = limit {
            rows.truncate(limit as usize);
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let mut stored = match row {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Decode(format!(
                    "expected object row, got {}",
                    other
                )))
            }
        };

        let mut tables = self.tables.lock().await;
        let entry = tables.entry(table.to_string()).or_default();
        entry.next_id += 1;
        let id = entry.next_id;
        stored.insert("id".to_string(), Value::from(id));

        let value = Value::Object(stored);
        entry.rows.insert(id, value.clone());
        Ok(value)
    }

    async fn update(&self, table: &str, id: i64, patch: Value) -> Result<Option<Value>, StoreError> {
        let changes = match patch {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Decode(format!(
                    "expected object patch, got {}",
                    other
                )))
            }
        };

        let mut tables = self.tables.lock().await;
        let row = match tables.get_mut(table).and_then(|t| t.rows.get_mut(&id)) {
            Some(row) => row,
            None => return Ok(None),
        };

        if let Value::Object(fields) = row {
            for (key, value) in changes {
                fields.insert(key, value);
            }
        }

        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: &str, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .get_mut(table)
            .and_then(|t| t.rows.remove(&id))
            .is_some())
    }

    async fn acquire_row_lock(&self, key: &str) -> Result<RowLock, StoreError> {
        let slot = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.slots.entry(key.to_string()).or_default())
        };

        let guard = timeout(self.lock_timeout, slot.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(key.to_string()))?;

        let token = Uuid::new_v4();
        self.locks.lock().await.held.insert(token, guard);

        Ok(RowLock {
            key: key.to_string(),
            token,
        })
    }

    async fn release_row_lock(&self, lock: RowLock) -> Result<(), StoreError> {
        // Dropping the guard unlocks the slot.
        self.locks.lock().await.held.remove(&lock.token);
        Ok(())
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let field = row.get(&filter.column).unwrap_or(&Value::Null);
    match filter.op {
        FilterOp::Eq => field == &filter.value,
        FilterOp::Neq => field != &filter.value,
        FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte => {
            match compare_values(field, &filter.value) {
                Some(cmp) => match filter.op {
                    FilterOp::Lt => cmp.is_lt(),
                    FilterOp::Lte => cmp.is_le(),
                    FilterOp::Gt => cmp.is_gt(),
                    FilterOp::Gte => cmp.is_ge(),
                    _ => unreachable!(),
                },
                None => false,
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        // Wire timestamps are zero-padded, so text order is time order.
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
