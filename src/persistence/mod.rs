//! Durable state: monitors, transactions, analysis results, checkpoints
//! and notification-dedup records.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::PersistenceError;
pub use sqlite::SqliteStateRepository;
pub use traits::StateRepository;
