//! Contract for the external analytics warehouse the reconciliation job
//! pulls from, plus the HTTP implementation used in production. The
//! warehouse owns vaccination event data; the clinic only ever reads an
//! aggregated rollup of it.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::time::date_format;

/// Aggregation shipped to the warehouse: one row per `(no_ktp, vaccine_type)`
/// pair with the occurrence count.
const VACCINE_ROLLUP_QUERY: &str = "SELECT no_ktp, name, birthdate, vaccine_type, \
     COUNT(vaccine_type) AS vaccine_count \
     FROM vaccine_events \
     GROUP BY no_ktp, name, birthdate, vaccine_type";

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("warehouse query failed: {0}")]
    Query(String),

    #[error("malformed warehouse row: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub no_ktp: String,
    pub name: String,
    #[serde(with = "date_format")]
    pub birthdate: NaiveDate,
    pub vaccine_type: String,
    pub vaccine_count: i64,
}

#[async_trait]
pub trait VaccinationWarehouse: Send + Sync {
    /// Aggregated vaccination counts per `(no_ktp, vaccine_type)` pair.
    async fn fetch_vaccination_counts(&self) -> Result<Vec<VaccinationRecord>, WarehouseError>;
}

pub struct HttpWarehouse {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    rows: Vec<Value>,
}

impl HttpWarehouse {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.warehouse_url.clone(),
            api_key: config.warehouse_api_key.clone(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers
    }
}

#[async_trait]
impl VaccinationWarehouse for HttpWarehouse {
    async fn fetch_vaccination_counts(&self) -> Result<Vec<VaccinationRecord>, WarehouseError> {
        let url = format!("{}/v1/query", self.base_url);
        debug!("Running vaccination rollup query against {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&json!({ "query": VACCINE_ROLLUP_QUERY }))
            .send()
            .await
            .map_err(|e| WarehouseError::Query(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("unreadable error body: {}", e));
            return Err(WarehouseError::Query(format!("{}: {}", status, error_text)));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| WarehouseError::Decode(e.to_string()))?;

        body.rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| WarehouseError::Decode(e.to_string()))
            })
            .collect()
    }
}
