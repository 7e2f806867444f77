pub mod config;
pub mod error;

pub use config::{AppConfig, DatabaseConfig, RemoteConfig, SyncConfig};
pub use error::AppError;
