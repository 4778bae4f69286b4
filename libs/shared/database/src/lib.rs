pub mod context;
pub mod memory;
pub mod postgrest;
pub mod store;
pub mod warehouse;

pub use context::AppContext;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use store::{decode_row, Filter, FilterOp, Ordering, RecordStore, RowLock, StoreError};
pub use warehouse::{HttpWarehouse, VaccinationRecord, VaccinationWarehouse, WarehouseError};
