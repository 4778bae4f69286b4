use std::sync::Arc;

use shared_config::AppConfig;

use crate::store::RecordStore;
use crate::warehouse::VaccinationWarehouse;

/// Shared state handed to every cell router. Owned by the process
/// bootstrap; handlers construct their services from it per request.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn RecordStore>,
    pub warehouse: Arc<dyn VaccinationWarehouse>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RecordStore>,
        warehouse: Arc<dyn VaccinationWarehouse>,
    ) -> Self {
        Self {
            config,
            store,
            warehouse,
        }
    }
}
