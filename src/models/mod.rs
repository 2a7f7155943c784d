//! Domain models shared across the pipeline.

pub mod analysis;
pub mod checkpoint;
pub mod monitor;
pub mod notification;
pub mod safe_info;
pub mod transaction;

pub use analysis::SecurityAnalysisResult;
pub use checkpoint::CheckpointState;
pub use monitor::Monitor;
pub use notification::NotificationContext;
pub use safe_info::SafeInfo;
pub use transaction::SafeTransaction;
