//! The orchestration engine: the poll scheduler, the per-pair transaction
//! processor, and the alert manager that drives notification dispatch.

pub mod alert_manager;
pub mod poller;
pub mod processor;

pub use alert_manager::AlertManager;
pub use poller::TransactionPoller;
pub use processor::SafeProcessor;
