//! Storage backends for the portkey URL shortener.
//!
//! Three interchangeable implementations of
//! [`portkey_core::LinkRepository`]: process-local memory, an append-only
//! journal file replayed at startup, and Postgres.

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

// Re-export the contract so backends and callers share one import path.
pub use portkey_core::{Link, LinkRepository, Result, StorageError, StoreStats};
