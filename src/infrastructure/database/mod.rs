pub mod connection;
pub mod local_store;
pub mod mappers;
pub mod rows;
pub mod settings_repository;
pub mod sync_queue_repository;

pub use connection::{Database, DbPool};
pub use local_store::{LocalStore, RemoteApplyOutcome};
pub use settings_repository::SettingsRepository;
pub use sync_queue_repository::SyncQueueRepository;
