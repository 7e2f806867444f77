pub mod sync_service;

pub use sync_service::{SyncOutcome, SyncReport, SyncService, SyncTrigger};
