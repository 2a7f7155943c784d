//! Upstream data sources: the per-network Safe transaction-indexing API.

pub mod traits;
pub mod transaction_service;

pub use traits::{SourceError, TransactionSource};
pub use transaction_service::SafeTransactionService;
