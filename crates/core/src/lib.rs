//! Core domain types for the chunkvault storage engine.
//!
//! This crate defines the data model shared across all other crates:
//! - File identifiers and the `<file>_chunk_<index>` key grammar
//! - Configuration for storage, engine limits, quota and retention

pub mod chunk;
pub mod config;
pub mod error;

pub use chunk::{CHUNK_KEY_SEPARATOR, ChunkKey, FileId};
pub use error::{Error, Result};

/// Default per-chunk size cap: 30 MiB
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 30 * 1024 * 1024;

/// One gibibyte, the default storage unit.
pub const GIB: u64 = 1024 * 1024 * 1024;
