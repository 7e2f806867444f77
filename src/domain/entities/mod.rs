pub mod dead_letter;
pub mod records;
pub mod setting;
pub mod sync_queue_entry;
pub mod sync_stats;

pub use dead_letter::DeadLetter;
pub use records::{ChatMessage, ChatSession, Invoice, QueryLog, User};
pub use setting::{Setting, SettingKey};
pub use sync_queue_entry::SyncQueueEntry;
pub use sync_stats::SyncStats;
