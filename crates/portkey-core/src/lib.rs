//! Core types and traits for the portkey URL shortener.
//!
//! This crate provides the shared vocabulary used by every backend and
//! both front-ends: the [`Link`] entity, the [`LinkRepository`] storage
//! contract, the storage error taxonomy, and the short-id generator.

pub mod error;
pub mod idgen;
pub mod link;
pub mod repository;

pub use error::{Result, StorageError};
pub use idgen::{AlphaGenerator, Generator};
pub use link::Link;
pub use repository::{LinkRepository, StoreStats};
