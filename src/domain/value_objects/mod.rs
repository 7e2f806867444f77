pub mod record_payload;
pub mod sync_operation;
pub mod sync_state;
pub mod sync_table;

pub use record_payload::RecordPayload;
pub use sync_operation::SyncOperation;
pub use sync_state::SyncState;
pub use sync_table::{ColumnKind, SyncTable};
