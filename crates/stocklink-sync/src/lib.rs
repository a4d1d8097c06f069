pub mod error;
pub mod orchestrator;
pub mod postgres;
pub mod report;
pub mod store;

pub use error::SyncError;
pub use orchestrator::{build_stock_payload, SyncOrchestrator};
pub use postgres::{PgProductStore, PgSyncLog, PgTokenStore};
pub use report::{
    CronSummary, MappingInfo, MappingSetup, NextRun, PreviewEntry, PreviewStatus, ScheduledRun,
    SyncDetail, SyncOutcome, SyncPreview, SyncStatusReport, SyncSummary,
};
pub use store::{MemoryProductStore, MemorySyncLog, ProductStore, SyncLog};
