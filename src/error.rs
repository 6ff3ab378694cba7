//! Error types for `logring` operations.

use thiserror::Error;

/// Errors surfaced by the underlying [`crate::fs::RingFs`] implementation.
///
/// Every `RingFs` method that can fail returns this type; `logring` never
/// inspects the variant beyond "it failed" except where the state machine
/// specifically needs to distinguish a missing file from every other failure
/// (see [`FsError::NotFound`]).
#[derive(Debug, Error)]
pub enum FsError {
    /// The named file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Any other I/O failure (permission, device, corruption, ...).
    #[error("filesystem I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by `logring`'s public operations.
///
/// This enum is the Rust rendering of the original taxonomy's `OK`, `EMPTY`,
/// `NVMEM_ERR`, `NVMEM_FULL`, `MUTEX_ERR`, and `INV_CAP` statuses. `EMPTY` is
/// not a variant here: an empty ring is an expected outcome of `pop` and
/// `peek_*`, modeled as `Ok(None)` rather than an error (see SPEC_FULL.md §7).
#[derive(Debug, Error)]
pub enum RingError {
    /// An underlying filesystem operation failed (open/read/write/seek/rename/unlink/stat).
    #[error("ring storage error: {0}")]
    Nvmem(#[from] FsError),

    /// A write succeeded only in part and could not be repaired: storage exhausted.
    #[error("storage exhausted: wrote {written} of {expected} bytes")]
    NvmemFull {
        /// Bytes actually written.
        written: usize,
        /// Bytes that were supposed to be written.
        expected: usize,
    },

    /// `max_capacity` was outside `[MIN_CAPACITY, MAX_CAPACITY]` at open time.
    #[error("capacity {got} out of range [{min}, {max}]")]
    InvalidCapacity {
        /// The capacity that was rejected.
        got: usize,
        /// Lower bound, inclusive.
        min: usize,
        /// Upper bound, inclusive.
        max: usize,
    },

    /// The process-wide mutex could not be acquired.
    ///
    /// Unreachable with the stock [`crate::fs::StdFs`] backend (a poisoned
    /// `std::sync::Mutex` panics on lock, it does not return an error), but
    /// retained for `RingFs` implementations that wrap a fallible external
    /// lock (e.g. a scheduler-aware semaphore that can fail to allocate).
    #[error("mutex could not be acquired")]
    Mutex,
}
