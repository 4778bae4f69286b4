//! PostgREST-backed implementation of the record store. Query strings are
//! built the `column=op.value` way; writes ask for the stored representation
//! back so callers always see the committed row. Advisory row locks ride on a
//! `row_locks` table with a unique `lock_key` and an expiry column.

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use async_trait::async_trait;
use shared_config::AppConfig;

use crate::store::{Filter, Ordering, RecordStore, RowLock, StoreError};

const LOCK_TABLE: &str = "row_locks";
const LOCK_TTL_SECONDS: i64 = 30;
const LOCK_RETRY_ATTEMPTS: u32 = 5;

pub struct PostgrestStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl PostgrestStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            service_key: config.store_service_key.clone(),
        }
    }

    fn headers(&self, return_representation: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        if return_representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        headers
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        return_representation: bool,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making store request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(return_representation));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("unreadable error body: {}", e));
            error!("Store API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::CONFLICT => StoreError::Constraint(error_text),
                _ => StoreError::Request(format!("{}: {}", status, error_text)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn query_path(
        table: &str,
        filters: &[Filter],
        order: Option<&Ordering>,
        limit: Option<u32>,
    ) -> String {
        let mut parts: Vec<String> = filters
            .iter()
            .map(|f| {
                format!(
                    "{}={}.{}",
                    f.column,
                    f.op.as_postgrest(),
                    filter_value(&f.value)
                )
            })
            .collect();

        if let Some(order) = order {
            let direction = if order.descending { "desc" } else { "asc" };
            parts.push(format!("order={}.{}", order.column, direction));
        }
        if let Some(limit) = limit {
            parts.push(format!("limit={}", limit));
        }

        if parts.is_empty() {
            format!("/{}", table)
        } else {
            format!("/{}?{}", table, parts.join("&"))
        }
    }

    async fn try_acquire_lock(&self, key: &str, token: Uuid) -> Result<bool, StoreError> {
        let now = Utc::now();
        let lock_row = json!({
            "lock_key": key,
            "token": token,
            "acquired_at": now.to_rfc3339_opts(SecondsFormat::Secs, true),
            "expires_at": (now + ChronoDuration::seconds(LOCK_TTL_SECONDS))
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        });

        match self
            .request::<Vec<Value>>(Method::POST, &format!("/{}", LOCK_TABLE), Some(lock_row), true)
            .await
        {
            Ok(_) => Ok(true),
            Err(StoreError::Constraint(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Deletes the lock row for `key` if its expiry has passed. Returns
    /// whether a stale row was removed, in which case acquisition may be
    /// retried immediately.
    async fn cleanup_expired_lock(&self, key: &str) -> Result<bool, StoreError> {
        // "Z"-suffixed timestamps keep the query string free of "+".
        let path = format!(
            "/{}?lock_key=eq.{}&expires_at=lt.{}",
            LOCK_TABLE,
            key,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let removed: Vec<Value> = self.request(Method::DELETE, &path, None, true).await?;

        if !removed.is_empty() {
            debug!("Cleaned up expired row lock: {}", key);
        }
        Ok(!removed.is_empty())
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn get_by_id(&self, table: &str, id: i64) -> Result<Option<Value>, StoreError> {
        let path = format!("/{}?id=eq.{}", table, id);
        let rows: Vec<Value> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_one(&self, table: &str, filters: &[Filter]) -> Result<Option<Value>, StoreError> {
        let path = Self::query_path(table, filters, None, Some(1));
        let rows: Vec<Value> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_all(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<Ordering>,
        limit: Option<u32>,
    ) -> Result<Vec<Value>, StoreError> {
        let path = Self::query_path(table, filters, order.as_ref(), limit);
        self.request(Method::GET, &path, None, false).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let rows: Vec<Value> = self
            .request(Method::POST, &format!("/{}", table), Some(row), true)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Request(format!("insert into {} returned no row", table)))
    }

    async fn update(&self, table: &str, id: i64, patch: Value) -> Result<Option<Value>, StoreError> {
        let path = format!("/{}?id=eq.{}", table, id);
        let rows: Vec<Value> = self.request(Method::PATCH, &path, Some(patch), true).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete(&self, table: &str, id: i64) -> Result<bool, StoreError> {
        let path = format!("/{}?id=eq.{}", table, id);
        let rows: Vec<Value> = self.request(Method::DELETE, &path, None, true).await?;
        Ok(!rows.is_empty())
    }

    async fn acquire_row_lock(&self, key: &str) -> Result<RowLock, StoreError> {
        let token = Uuid::new_v4();

        for attempt in 1..=LOCK_RETRY_ATTEMPTS {
            if self.try_acquire_lock(key, token).await? {
                debug!("Row lock acquired: {}", key);
                return Ok(RowLock {
                    key: key.to_string(),
                    token,
                });
            }

            if self.cleanup_expired_lock(key).await? {
                continue;
            }

            tokio::time::sleep(std::time::Duration::from_millis(100 * attempt as u64)).await;
        }

        Err(StoreError::LockTimeout(key.to_string()))
    }

    async fn release_row_lock(&self, lock: RowLock) -> Result<(), StoreError> {
        let path = format!(
            "/{}?lock_key=eq.{}&token=eq.{}",
            LOCK_TABLE, lock.key, lock.token
        );
        let _removed: Vec<Value> = self.request(Method::DELETE, &path, None, true).await?;

        debug!("Row lock released: {}", lock.key);
        Ok(())
    }
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
