//! Filesystem seam.
//!
//! `logring` never touches `std::fs` directly outside this module. Every
//! other component talks to the [`RingFs`] trait, so an embedded integrator
//! can swap in a NOR-flash filesystem driver without touching the ring state
//! machine. [`StdFs`] is the desktop/testing backend, rooted at an arbitrary
//! directory so tests can run against a `tempfile::TempDir`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use crate::error::FsError;

/// How a file should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open for reading only; fails if the file does not exist.
    ReadOnly,
    /// Open for reading and writing; fails if the file does not exist.
    ReadWrite,
    /// Open for reading and writing, creating the file if it does not exist.
    ReadWriteCreate,
}

/// The filesystem capability `logring` needs.
///
/// `Self::File` closes itself on `Drop`: there is no `close` method, unlike
/// the `open`/`close`/`read`/`write`/`seek` C-style contract this is grounded
/// on, because RAII already gives every caller "closed on all exit paths"
/// for free.
pub trait RingFs {
    /// A handle to an open file, readable/writable/seekable, closed on `Drop`.
    type File: Read + Write + Seek;

    /// Opens `name` under this backend's root with the given mode.
    ///
    /// # Errors
    /// Returns [`FsError::NotFound`] if `mode` is not `ReadWriteCreate` and
    /// the file does not exist, or [`FsError::Io`] for any other failure.
    fn open(&self, name: &str, mode: OpenMode) -> Result<Self::File, FsError>;

    /// Returns the size, in bytes, of an open file.
    ///
    /// # Errors
    /// Returns [`FsError::Io`] if the underlying `stat` fails.
    fn len(&self, file: &Self::File) -> Result<u64, FsError>;

    /// Renames `from` to `to`. Whether an existing `to` is silently replaced
    /// or the call fails is platform-defined (it follows the host's
    /// `rename`/`MoveFile` semantics); callers that need a guaranteed
    /// replacement must `unlink` the destination themselves first.
    ///
    /// # Errors
    /// Returns [`FsError::Io`] on any rename failure.
    fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// Removes `name`. Not an error if `name` does not exist.
    ///
    /// # Errors
    /// Returns [`FsError::Io`] for any failure other than the file already being absent.
    fn unlink(&self, name: &str) -> Result<(), FsError>;

    /// Returns `true` if `name` can currently be opened read-only.
    ///
    /// Implemented in terms of `open` by default; backends with a cheaper
    /// existence check may override it.
    fn exists(&self, name: &str) -> bool {
        self.open(name, OpenMode::ReadOnly).is_ok()
    }
}

/// [`RingFs`] backed by `std::fs`, rooted at a directory.
///
/// Names passed to [`RingFs`] methods are 8.3-style leaf names (e.g.
/// `"000d0000.log"`); `StdFs` joins them onto its root.
#[derive(Debug, Clone)]
pub struct StdFs {
    root: PathBuf,
}

impl StdFs {
    /// Creates a backend rooted at `root`. The directory is not created here;
    /// it must already exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn map_open_err(err: std::io::Error, name: &str) -> FsError {
    if err.kind() == std::io::ErrorKind::NotFound {
        FsError::NotFound(name.to_string())
    } else {
        FsError::Io(err)
    }
}

impl RingFs for StdFs {
    type File = File;

    fn open(&self, name: &str, mode: OpenMode) -> Result<Self::File, FsError> {
        let path = self.resolve(name);
        let mut opts = OpenOptions::new();
        match mode {
            OpenMode::ReadOnly => {
                opts.read(true);
            }
            OpenMode::ReadWrite => {
                opts.read(true).write(true);
            }
            OpenMode::ReadWriteCreate => {
                opts.read(true).write(true).create(true);
            }
        }
        opts.open(&path).map_err(|e| map_open_err(e, name))
    }

    fn len(&self, file: &Self::File) -> Result<u64, FsError> {
        Ok(file.metadata().map_err(FsError::Io)?.len())
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        std::fs::rename(self.resolve(from), self.resolve(to)).map_err(FsError::Io)
    }

    fn unlink(&self, name: &str) -> Result<(), FsError> {
        match std::fs::remove_file(self.resolve(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::Io(e)),
        }
    }
}

/// Returns `true` if `path` (a directory) exists and is usable as a [`StdFs`] root.
pub fn is_usable_root(path: &Path) -> bool {
    path.is_dir()
}
