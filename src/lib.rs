#![warn(missing_docs)]
//! Safewatch continuously watches Safe multisig wallets across networks,
//! re-verifies transaction hashes, classifies risk and dispatches alerts.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod http_client;
pub mod models;
pub mod networks;
pub mod notification;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
pub mod verifier;
