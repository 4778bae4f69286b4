use std::env;
use tracing::warn;

pub const DEFAULT_RECONCILE_INTERVAL_HOURS: u64 = 24;
pub const DEFAULT_RECONCILE_DEADLINE_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_service_key: String,
    pub warehouse_url: String,
    pub warehouse_api_key: String,
    pub reconcile_interval_hours: u64,
    pub reconcile_deadline_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL").unwrap_or_else(|_| {
                warn!("STORE_URL not set, using empty value");
                String::new()
            }),
            store_service_key: env::var("STORE_SERVICE_KEY").unwrap_or_else(|_| {
                warn!("STORE_SERVICE_KEY not set, using empty value");
                String::new()
            }),
            warehouse_url: env::var("WAREHOUSE_URL").unwrap_or_else(|_| {
                warn!("WAREHOUSE_URL not set, using empty value");
                String::new()
            }),
            warehouse_api_key: env::var("WAREHOUSE_API_KEY").unwrap_or_else(|_| {
                warn!("WAREHOUSE_API_KEY not set, using empty value");
                String::new()
            }),
            reconcile_interval_hours: parse_env_u64(
                "RECONCILE_INTERVAL_HOURS",
                DEFAULT_RECONCILE_INTERVAL_HOURS,
            ),
            reconcile_deadline_secs: parse_env_u64(
                "RECONCILE_DEADLINE_SECS",
                DEFAULT_RECONCILE_DEADLINE_SECS,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_service_key.is_empty()
    }

    pub fn is_warehouse_configured(&self) -> bool {
        !self.warehouse_url.is_empty() && !self.warehouse_api_key.is_empty()
    }
}

fn parse_env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid integer, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}
