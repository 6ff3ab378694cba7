//! `logring`: a persistent, file-backed ring buffer of log entries for
//! resource-constrained filesystems.
//!
//! Entries are ordinary files named by a fixed-width, sortable scheme (see
//! [`name`]); a small control record (see [`control`]) tracks which name is
//! the current head (next write slot) and tail (oldest live entry) so the
//! ring survives a restart without scanning the directory. [`fs`] is the
//! seam between the ring state machine and the actual storage medium: the
//! crate ships [`fs::StdFs`] for desktop/test use, but any type implementing
//! [`fs::RingFs`] can back a [`LogRing`].
//!
//! ```no_run
//! use logring::{LogRing, RingConfig};
//! use logring::fs::StdFs;
//!
//! # fn main() -> Result<(), logring::RingError> {
//! let fs = StdFs::new("/mnt/logs");
//! let mut ring = LogRing::open(fs, RingConfig::new("ring.ctl", b'd').with_capacity(64))?;
//! ring.insert(None)?;
//! if let Some(popped) = ring.pop()? {
//!     println!("popped {popped}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod fs;
pub mod name;
pub mod ring;

pub use config::RingConfig;
pub use error::{FsError, RingError};
pub use ring::LogRing;

use std::sync::{Mutex, MutexGuard, OnceLock};

/// Process-wide mutex guarding every [`LogRing`] operation against every
/// other `LogRing` operation, regardless of which instance or backend is
/// involved — mirroring the source's single global lock rather than a
/// per-instance one, since two `LogRing`s can point at the same underlying
/// storage.
static RING_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

/// Acquires the process-wide ring mutex for the duration of the returned guard.
///
/// A poisoned mutex (a prior holder panicked mid-operation) is recovered
/// rather than propagated: the control record's on-disk state is the source
/// of truth, and every operation re-reads it via [`control::cache_control_data`]
/// before touching anything, so a torn in-memory cache from a panicked
/// operation cannot leak into the next one.
pub(crate) fn lock() -> MutexGuard<'static, ()> {
    RING_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
