//! The record-store contract the cells are written against. Rows cross the
//! boundary as `serde_json::Value` and are decoded at the call site with
//! [`decode_row`]; concrete implementations live in [`crate::postgrest`]
//! (production) and [`crate::memory`] (tests, local runs).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("row lock timed out: {0}")]
    LockTimeout(String),

    #[error("malformed row: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    pub fn as_postgrest(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Neq, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lte, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gte, value)
    }
}

#[derive(Debug, Clone)]
pub struct Ordering {
    pub column: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Handle for an advisory row lock held in the store. Must be handed back to
/// [`RecordStore::release_row_lock`]; implementations also expire stale locks
/// so a missed release cannot wedge a key forever.
#[derive(Debug, Clone)]
pub struct RowLock {
    pub key: String,
    pub token: Uuid,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_by_id(&self, table: &str, id: i64) -> Result<Option<Value>, StoreError>;

    async fn find_one(&self, table: &str, filters: &[Filter]) -> Result<Option<Value>, StoreError>;

    async fn find_all(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<Ordering>,
        limit: Option<u32>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Returns the stored row, including the store-assigned id.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Returns `None` when no row matches `id`.
    async fn update(&self, table: &str, id: i64, patch: Value) -> Result<Option<Value>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, table: &str, id: i64) -> Result<bool, StoreError>;

    /// Exclusive, short-held advisory lock scoped to `key`. Acquisition is
    /// bounded; a contended key surfaces as [`StoreError::LockTimeout`].
    async fn acquire_row_lock(&self, key: &str) -> Result<RowLock, StoreError>;

    async fn release_row_lock(&self, lock: RowLock) -> Result<(), StoreError>;
}

pub fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string()))
}
