//! # Journal Database Crate
//!
//! This crate is the system's "permanent archive" for logged trades and
//! strategy metadata.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** All storage-specific logic lives here behind the
//!   `TradeRecordStore` and `StrategyStore` traits. Callers receive a store as
//!   an injected `Arc<dyn ...>`; there is no process-wide client.
//! - **Store-owned invariants:** Stores validate payloads and compute each
//!   trade's profit/loss at create and update time. Readers never recompute it.
//! - **Asynchronous & Pooled:** The PostgreSQL repository uses a connection
//!   pool (`PgPool`); the in-memory store guards its maps with an async lock.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: establish the pool and bring the schema up to date.
//! - `DbRepository`: PostgreSQL-backed implementation of both store traits.
//! - `MemoryStore`: in-process implementation for tests and throwaway sessions.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{PoolSettings, connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryStore;
pub use repository::DbRepository;
pub use store::{StrategyStore, TradeQuery, TradeRecordStore};
