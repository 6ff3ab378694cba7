//! Ring State Machine.
//!
//! `LogRing<F>` is the public entry point: head/tail advancement, wrap
//! detection, collision resolution (the "ring full, overwrite oldest"
//! policy), and reconciliation against asynchronous external deletion all
//! live here. Every public method acquires the process-wide mutex
//! ([`crate::lock`]) for its entire duration and refreshes the cached
//! head/tail from the control record before doing anything else.

use std::io::SeekFrom;

use tracing::{debug, warn};

use crate::config::RingConfig;
use crate::control::{self, CachedNames};
use crate::error::{FsError, RingError};
use crate::fs::{OpenMode, RingFs};
use crate::name::{self, MAX_CAPACITY, MIN_CAPACITY};

/// Outcome of a tail-reconciliation pass. Internal: callers only care whether
/// the ring ended up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconciled {
    /// A live tail entry was found (or the cached tail was already live).
    Found,
    /// No live entry remains; `head == tail` and neither file exists.
    Empty,
}

/// A single ring instance: a control file, an element tag, a capacity, and
/// the cached head/tail names read from that control file.
///
/// `F` is the filesystem backend (see [`crate::fs::RingFs`]); most callers use
/// [`crate::fs::StdFs`].
pub struct LogRing<F: RingFs> {
    fs: F,
    control_path: String,
    tag: u8,
    max_capacity: usize,
    cached: CachedNames,
}

impl<F: RingFs> LogRing<F> {
    /// Opens (or lazily creates) a ring backed by `fs` with the given `config`.
    ///
    /// # Errors
    /// Returns [`RingError::InvalidCapacity`] if `config.max_capacity` is outside
    /// `[MIN_CAPACITY, MAX_CAPACITY]`, or [`RingError::Nvmem`]/[`RingError::NvmemFull`]
    /// if the control record cannot be read or created.
    pub fn open(fs: F, config: RingConfig) -> Result<Self, RingError> {
        if !config.capacity_is_valid() {
            return Err(RingError::InvalidCapacity {
                got: config.max_capacity,
                min: MIN_CAPACITY,
                max: MAX_CAPACITY,
            });
        }

        let _guard = crate::lock();
        let cached = control::cache_control_data(&fs, &config.control_path, config.tag)?;
        debug!(head = %cached.head, tail = %cached.tail, "ring opened");

        Ok(Self {
            fs,
            control_path: config.control_path,
            tag: config.tag,
            max_capacity: config.max_capacity,
            cached,
        })
    }

    /// The current cached head name, re-read from the control record by every
    /// public method. Exposed read-only for diagnostics and tests.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.cached.head
    }

    /// The current cached tail name. See [`Self::head`].
    #[must_use]
    pub fn tail(&self) -> &str {
        &self.cached.tail
    }

    fn refresh(&mut self) -> Result<(), RingError> {
        self.cached = control::cache_control_data(&self.fs, &self.control_path, self.tag)?;
        Ok(())
    }

    /// `next_name`, falling back to reinitializing the control record if `name`
    /// fails to parse (SPEC_FULL.md §4.1: a cached name that fails the
    /// validating decode is treated as corruption, not silently coerced to 0).
    fn advance(&mut self, name: &str) -> Result<String, RingError> {
        if let Some(next) = name::next_name(name, self.max_capacity) {
            return Ok(next);
        }
        warn!(name, "entry name failed to parse; reinitializing control record");
        self.cached = control::create_control_file(&self.fs, &self.control_path, self.tag)?;
        name::next_name(&self.cached.head, self.max_capacity).ok_or_else(|| {
            RingError::Nvmem(FsError::Io(std::io::Error::other(
                "control record still unparseable after reinitialization",
            )))
        })
    }

    /// Reconciles the cached tail against what actually exists on disk,
    /// tolerating asynchronous external deletion of entry files.
    ///
    /// Starting from the cached tail, probes up to `max_capacity` names. If a
    /// probe's file exists, that name becomes tail. If `tail == head` and the
    /// file is missing, the ring is empty. If the loop exhausts without
    /// finding a file, the ring is treated as empty and tail is set to head
    /// (SPEC_FULL.md §4.3.3 / spec.md §9, resolving the source's ambiguous
    /// `do_update=false` exit path).
    fn update_tail(&mut self) -> Result<Reconciled, RingError> {
        let head = self.cached.head.clone();
        let mut probe = self.cached.tail.clone();

        for _ in 0..self.max_capacity {
            match self.fs.open(&probe, OpenMode::ReadOnly) {
                Ok(_) => {
                    self.cached.tail = probe.clone();
                    control::set_tail(&self.fs, &self.control_path, &probe)?;
                    return Ok(Reconciled::Found);
                }
                Err(FsError::NotFound(_)) => {
                    if probe == head {
                        self.cached.tail = probe;
                        return Ok(Reconciled::Empty);
                    }
                    debug!(missing = %probe, "tail entry missing, probing next slot");
                    probe = self.advance(&probe)?;
                }
                Err(e) => return Err(RingError::Nvmem(e)),
            }
        }

        warn!("update_tail exhausted max_capacity probes without finding a live entry");
        self.cached.tail = head.clone();
        control::set_tail(&self.fs, &self.control_path, &head)?;
        Ok(Reconciled::Empty)
    }

    /// Renames `name` out of the tracked (`.log`) namespace into a unique
    /// `.bin` name, advancing the popped-temporal counter first so a crash
    /// between the two only skips a counter value, never reuses one.
    fn untrack(&mut self, name: &str) -> Result<String, RingError> {
        let popped = control::advance_popped_counter(&self.fs, &self.control_path)?;
        let untracked = name::untracked_name(self.tag, popped);
        if self.fs.exists(&untracked) {
            self.fs.unlink(&untracked).map_err(RingError::Nvmem)?;
        }
        self.fs.rename(name, &untracked).map_err(RingError::Nvmem)?;
        Ok(untracked)
    }

    /// Inserts a new entry at the head of the ring.
    ///
    /// The entry is written into the *current* head slot (the name returned
    /// by [`Self::head`] before this call) — per the invariant that the most
    /// recently inserted entry occupies the slot named by head before
    /// advancement. Head is then advanced and persisted as the new cursor,
    /// naming the next (as yet unpopulated) slot a future `insert` will use.
    ///
    /// If `new_entry` is `None`, an empty file is created at that slot. If
    /// `Some(path)`, the file at `path` is renamed into it (any stale file
    /// already occupying the slot is unlinked first).
    ///
    /// If the ring is full (the slot about to be populated shares tail's
    /// sequence and tail's file still exists), the oldest entry is discarded:
    /// tail is reconciled against disk first (to rule out the apparent
    /// collision being a stale artifact of an async deletion), and only if
    /// the collision persists is the tail file unlinked and tail advanced
    /// past it.
    ///
    /// # Errors
    /// Returns [`RingError::Nvmem`] on any filesystem failure, including a
    /// failed rename of `new_entry` into place.
    pub fn insert(&mut self, new_entry: Option<&str>) -> Result<(), RingError> {
        let _guard = crate::lock();
        self.refresh()?;

        let populate_at = self.cached.head.clone();
        let head_next = self.advance(&populate_at)?;

        if name::same_sequence(&populate_at, &self.cached.tail) {
            debug!(head = %populate_at, tail = %self.cached.tail, "write target shares tail's sequence, reconciling tail");
            if self.update_tail()? == Reconciled::Found
                && name::same_sequence(&populate_at, &self.cached.tail)
            {
                let evicted = self.cached.tail.clone();
                warn!(evicted = %evicted, "ring full, overwriting oldest entry");
                self.fs.unlink(&evicted).map_err(RingError::Nvmem)?;
                let new_tail = self.advance(&evicted)?;
                control::set_tail(&self.fs, &self.control_path, &new_tail)?;
                self.cached.tail = new_tail;
            }
        }

        match new_entry {
            None => {
                self.fs
                    .open(&populate_at, OpenMode::ReadWriteCreate)
                    .map_err(RingError::Nvmem)?;
            }
            Some(source) => {
                if self.fs.exists(&populate_at) {
                    self.fs.unlink(&populate_at).map_err(RingError::Nvmem)?;
                }
                self.fs.rename(source, &populate_at).map_err(RingError::Nvmem)?;
            }
        }

        control::set_head(&self.fs, &self.control_path, &head_next)?;
        self.cached.head = head_next;
        Ok(())
    }

    /// Pops the oldest live entry, renaming it out of the tracked namespace.
    ///
    /// Returns `Ok(None)` if the ring is empty. On success, returns the
    /// renamed (`.bin`) name of the popped entry.
    ///
    /// # Errors
    /// Returns [`RingError::Nvmem`] on any filesystem failure.
    pub fn pop(&mut self) -> Result<Option<String>, RingError> {
        let _guard = crate::lock();
        self.refresh()?;

        match self.fs.open(&self.cached.tail, OpenMode::ReadOnly) {
            Ok(_) => {}
            Err(FsError::NotFound(_)) => {
                if self.update_tail()? == Reconciled::Empty {
                    return Ok(None);
                }
            }
            Err(e) => return Err(RingError::Nvmem(e)),
        }

        if self.cached.head == self.cached.tail {
            return Ok(None);
        }

        let tail = self.cached.tail.clone();
        let untracked = self.untrack(&tail)?;
        self.update_tail()?;
        Ok(Some(untracked))
    }

    /// Opens the head entry read-only, seeked to its end-of-file. Head names
    /// the next slot to be populated, not the slot `insert` just wrote to, so
    /// this is mainly useful as an existence probe on a not-yet-written slot;
    /// callers that want a handle to the entry they just inserted should keep
    /// their own reference to it, or use [`Self::peek_tail`] when the ring
    /// has exactly one live entry.
    ///
    /// Returns `Ok(None)` if the head file does not exist.
    ///
    /// # Errors
    /// Returns [`RingError::Nvmem`] if `stat` or `seek` fails.
    pub fn peek_head(&mut self) -> Result<Option<F::File>, RingError> {
        let _guard = crate::lock();
        self.refresh()?;

        match self.fs.open(&self.cached.head, OpenMode::ReadOnly) {
            Ok(mut file) => {
                let len = self.fs.len(&file).map_err(RingError::Nvmem)?;
                std::io::Seek::seek(&mut file, SeekFrom::Start(len))
                    .map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
                Ok(Some(file))
            }
            Err(FsError::NotFound(_)) => Ok(None),
            Err(e) => Err(RingError::Nvmem(e)),
        }
    }

    /// Opens the tail entry read-write, reconciling the tail against disk
    /// first if it cannot be opened (see [`Self::update_tail`]).
    ///
    /// Returns `Ok(None)` if the ring is empty after reconciliation.
    ///
    /// # Errors
    /// Returns [`RingError::Nvmem`] on any other filesystem failure.
    pub fn peek_tail(&mut self) -> Result<Option<F::File>, RingError> {
        let _guard = crate::lock();
        self.refresh()?;

        match self.fs.open(&self.cached.tail, OpenMode::ReadWrite) {
            Ok(file) => Ok(Some(file)),
            Err(FsError::NotFound(_)) => {
                if self.update_tail()? == Reconciled::Empty {
                    return Ok(None);
                }
                match self.fs.open(&self.cached.tail, OpenMode::ReadOnly) {
                    Ok(file) => Ok(Some(file)),
                    Err(FsError::NotFound(_)) => Ok(None),
                    Err(e) => Err(RingError::Nvmem(e)),
                }
            }
            Err(e) => Err(RingError::Nvmem(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::StdFs;
    use std::io::Read as _;

    fn ring(dir: &std::path::Path, capacity: usize) -> LogRing<StdFs> {
        let fs = StdFs::new(dir);
        LogRing::open(fs, RingConfig::new("a.log", b'd').with_capacity(capacity)).unwrap()
    }

    #[test]
    fn fresh_init_matches_spec_scenario_1() {
        let dir = tempfile::tempdir().unwrap();
        let r = ring(dir.path(), 100);
        assert_eq!(r.head(), "000d0000.log");
        assert_eq!(r.tail(), "000d0000.log");
    }

    #[test]
    fn single_insert_matches_spec_scenario_2() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ring(dir.path(), 100);
        r.insert(None).unwrap();
        assert_eq!(r.head(), "001d0001.log");
        assert_eq!(r.tail(), "000d0000.log");
        assert!(dir.path().join("000d0000.log").exists());
    }

    #[test]
    fn insert_then_pop_matches_spec_scenario_3() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ring(dir.path(), 100);
        r.insert(None).unwrap();

        let popped = r.pop().unwrap().unwrap();
        assert_eq!(popped, "d0000000.bin");
        assert_eq!(r.tail(), "001d0001.log");
        assert_eq!(r.head(), r.tail());

        assert_eq!(r.pop().unwrap(), None);
    }

    #[test]
    fn wrap_around_overwrite_matches_spec_scenario_4() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ring(dir.path(), 3);
        for _ in 0..4 {
            r.insert(None).unwrap();
        }

        let log_files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
            .collect();
        assert_eq!(log_files.len(), 3);
        assert!(!dir.path().join("000d0000.log").exists());
    }

    #[test]
    fn async_deletion_is_tolerated_matches_spec_scenario_5() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ring(dir.path(), 100);
        r.insert(None).unwrap(); // 000d0000.log -> head 001d0001.log
        r.insert(None).unwrap(); // 001d0001.log -> head 002d0002.log
        r.insert(None).unwrap(); // 002d0002.log -> head 003d0003.log

        // External actor removes the tail file behind the ring's back.
        std::fs::remove_file(dir.path().join("000d0000.log")).unwrap();

        let popped = r.pop().unwrap().unwrap();
        assert_eq!(popped, "d0000000.bin");
        assert_eq!(r.tail(), "002d0002.log");
    }

    #[test]
    fn corrupt_control_record_is_rewritten_matches_spec_scenario_6() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _ = ring(dir.path(), 100); // creates the control file
        }
        std::fs::write(dir.path().join("a.log"), b"xxxxx").unwrap(); // truncate to 5 bytes

        let r = ring(dir.path(), 100);
        assert_eq!(r.head(), "000d0000.log");
        assert_eq!(r.tail(), "000d0000.log");
    }

    #[test]
    fn capacity_one_always_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ring(dir.path(), 1);
        r.insert(None).unwrap();
        r.insert(None).unwrap();
        r.insert(None).unwrap();
        // Exactly one live entry at all times.
        let log_files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
            .collect();
        assert_eq!(log_files.len(), 1);
    }

    #[test]
    fn invalid_capacity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fs = StdFs::new(dir.path());
        let err = LogRing::open(fs, RingConfig::new("a.log", b'd').with_capacity(0)).unwrap_err();
        assert!(matches!(err, RingError::InvalidCapacity { .. }));
    }

    #[test]
    fn insert_with_named_file_renames_it_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let fs = StdFs::new(dir.path());
        fs.open("incoming.tmp", OpenMode::ReadWriteCreate).unwrap();
        std::fs::write(dir.path().join("incoming.tmp"), b"payload").unwrap();

        let mut r = LogRing::open(fs, RingConfig::new("a.log", b'd').with_capacity(100)).unwrap();
        r.insert(Some("incoming.tmp")).unwrap();

        assert!(!dir.path().join("incoming.tmp").exists());
        let mut contents = String::new();
        std::fs::File::open(dir.path().join("000d0000.log"))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "payload");
    }

    #[test]
    fn peek_head_is_empty_right_after_insert() {
        // head names the next (unpopulated) slot; the entry `insert` just
        // wrote lives at the slot head named *before* this call, so peek_head
        // observes an as-yet-nonexistent file immediately afterward.
        let dir = tempfile::tempdir().unwrap();
        let fs = StdFs::new(dir.path());
        fs.open("incoming.tmp", OpenMode::ReadWriteCreate).unwrap();
        std::fs::write(dir.path().join("incoming.tmp"), b"hello").unwrap();

        let mut r = LogRing::open(fs, RingConfig::new("a.log", b'd').with_capacity(100)).unwrap();
        r.insert(Some("incoming.tmp")).unwrap();

        assert!(r.peek_head().unwrap().is_none());
    }

    #[test]
    fn peek_tail_matches_insert_size_on_a_single_entry_ring() {
        let dir = tempfile::tempdir().unwrap();
        let fs = StdFs::new(dir.path());
        fs.open("incoming.tmp", OpenMode::ReadWriteCreate).unwrap();
        std::fs::write(dir.path().join("incoming.tmp"), b"hello").unwrap();

        let mut r = LogRing::open(fs, RingConfig::new("a.log", b'd').with_capacity(100)).unwrap();
        r.insert(Some("incoming.tmp")).unwrap();

        let mut file = r.peek_tail().unwrap().unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"hello");
    }

    #[test]
    fn peek_tail_on_empty_ring_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ring(dir.path(), 100);
        assert!(r.peek_tail().unwrap().is_none());
    }

    #[test]
    fn update_tail_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ring(dir.path(), 100);
        r.insert(None).unwrap();
        r.insert(None).unwrap();
        std::fs::remove_file(dir.path().join("000d0000.log")).unwrap();

        let first = r.update_tail().unwrap();
        let tail_after_first = r.tail().to_string();
        let second = r.update_tail().unwrap();
        assert_eq!(first, second);
        assert_eq!(r.tail(), tail_after_first);
    }
}
