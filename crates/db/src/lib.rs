//! Storage layer for the Starkscope transaction index.
//!
//! SQLite-backed, with schema migrations and an idempotent upsert keyed
//! by transaction hash.

pub mod models;
pub mod pool;
pub mod store;

pub use pool::DbPool;
pub use store::{StoreError, TransactionStore, UpsertOutcome};
