//! Error type covering every failure mode of the index.
//!
//! All variants are precondition failures surfaced to the caller; nothing is
//! retried internally, and the index is left unchanged by a failed operation.

use std::path::PathBuf;

/// Unified error type for index construction, mutation, query, and snapshots.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A vector's length does not match the index dimension.
    #[error("dimension mismatch: index stores {expected}-dim vectors, got {found}")]
    DimensionMismatch {
        /// Dimension the index was built with.
        expected: usize,
        /// Length of the offending vector.
        found: usize,
    },

    /// An insert reused an id that is already present.
    #[error("point {id} is already present; ids are stable for the life of the index")]
    DuplicateId {
        /// The conflicting id.
        id: u64,
    },

    /// A lookup referenced an id that was never inserted.
    #[error("unknown point id {id}")]
    UnknownId {
        /// The missing id.
        id: u64,
    },

    /// A constructor or query parameter is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Which parameter was rejected.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A query was issued against an index with zero points.
    #[error("index is empty; insert at least one point before querying")]
    EmptyIndex,

    /// A snapshot file failed integrity or structural validation.
    #[error("snapshot corrupted at {path}: {detail}")]
    SnapshotCorrupted {
        /// Path to the offending file.
        path: PathBuf,
        /// Nature of the corruption.
        detail: String,
    },

    /// An underlying I/O operation failed during snapshot save or load.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexError>;
