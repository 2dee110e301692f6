pub mod config;
pub mod sync;

pub use sync::{sync, SyncError, SyncReport, Syncer};
