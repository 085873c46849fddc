//! Buffer queue error types.

use sluice_core::PartitionId;
use thiserror::Error;

/// Result type for buffer queue operations.
pub type PbqResult<T> = Result<T, PbqError>;

/// Errors that can occur during buffer queue operations.
///
/// None of these are retried internally; every backend and channel
/// condition surfaces to the immediate caller, which decides retry or
/// abort policy. End-of-stream is an expected terminal signal, not an
/// error, and is reported through [`crate::ReadOutcome`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PbqError {
    /// Write attempted after close-of-book (or after the write path was
    /// terminally closed by cancellation). Non-retryable for this
    /// partition.
    #[error("partition {partition_id} is closed for writes")]
    ClosedForWrites {
        /// The partition that rejected the write.
        partition_id: PartitionId,
    },

    /// The store is at capacity. The message was still delivered on the
    /// live channel; the caller must treat it as accepted downstream but
    /// not durably persisted.
    #[error("store is full: capacity {capacity} reached")]
    StoreFull {
        /// The store's configured capacity.
        capacity: u64,
    },

    /// Write attempted after the store was closed (explicitly, through
    /// cancellation, or after garbage collection).
    #[error("store is closed")]
    StoreClosed,

    /// The caller's cancellation token fired. Propagated verbatim.
    #[error("{operation} canceled")]
    Canceled {
        /// The operation that was canceled.
        operation: &'static str,
    },

    /// A partition was created twice. A partition must be created at
    /// most once concurrently.
    #[error("partition {partition_id} is already registered")]
    PartitionExists {
        /// The duplicate partition.
        partition_id: PartitionId,
    },

    /// `read` was called after the output channel was handed to a
    /// consumer via `take_output`.
    #[error("output channel of partition {partition_id} already taken")]
    OutputTaken {
        /// The partition whose output was taken.
        partition_id: PartitionId,
    },
}
