//! Control Record.
//!
//! The fixed-layout persistent record storing head name, tail name, and the
//! popped-temporal counter, byte-compatible across restarts:
//!
//! ```text
//! | HEAD (L+1, null-terminated) | TAIL (L+1, null-terminated)
//! | reserved seq (3) | reserved temporal (4) | popped temporal (7) | reserved (2) |
//! ```
//!
//! The two reserved/scratch fields are written as ASCII `'0'` at creation and
//! never touched again; they exist only to keep the 42-byte layout
//! byte-compatible with the original record, not to cache a derived value.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{FsError, RingError};
use crate::fs::{OpenMode, RingFs};
use crate::name;

/// Width, in bytes, of a null-terminated name field.
pub const NAME_FIELD_LEN: usize = name::NAME_LEN + 1;
/// Byte offset of the head name field.
pub const HEAD_OFFSET: u64 = 0;
/// Byte offset of the tail name field.
pub const TAIL_OFFSET: u64 = NAME_FIELD_LEN as u64;
/// Byte offset of the reserved sequence scratch field.
pub const RESERVED_SEQ_OFFSET: u64 = 2 * NAME_FIELD_LEN as u64;
const RESERVED_SEQ_LEN: usize = 3;
/// Byte offset of the reserved temporal scratch field.
pub const RESERVED_TEMPORAL_OFFSET: u64 = RESERVED_SEQ_OFFSET + RESERVED_SEQ_LEN as u64;
const RESERVED_TEMPORAL_LEN: usize = 4;
/// Byte offset of the popped-temporal counter field.
pub const POPPED_OFFSET: u64 = RESERVED_TEMPORAL_OFFSET + RESERVED_TEMPORAL_LEN as u64;
const POPPED_LEN: usize = name::POPPED_WIDTH;
const RESERVED2_LEN: usize = 2;
/// Total length of the control record, in bytes.
pub const RECORD_LEN: usize = (POPPED_OFFSET as usize) + POPPED_LEN + RESERVED2_LEN;

/// The ring's cached head/tail names, as read from (or about to be written to)
/// the control record. Does not include the popped-temporal counter, which is
/// only read/written transactionally by the untrack path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedNames {
    /// Name of the next slot to be populated.
    pub head: String,
    /// Name of the oldest live entry.
    pub tail: String,
}

fn initial_record_bytes(tag: u8) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    let name = name::initial_name(tag);
    write_name_field(&mut buf[HEAD_OFFSET as usize..(HEAD_OFFSET as usize + NAME_FIELD_LEN)], &name);
    write_name_field(&mut buf[TAIL_OFFSET as usize..(TAIL_OFFSET as usize + NAME_FIELD_LEN)], &name);
    let scratch_start = RESERVED_SEQ_OFFSET as usize;
    let scratch_end = (POPPED_OFFSET as usize) + POPPED_LEN + RESERVED2_LEN;
    buf[scratch_start..scratch_end].fill(b'0');
    buf
}

fn write_name_field(slot: &mut [u8], name: &str) {
    slot.fill(0);
    let bytes = name.as_bytes();
    slot[..bytes.len()].copy_from_slice(bytes);
}

fn parse_name_field(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..end]).into_owned()
}

/// Writes the canonical initial control record (`head == tail ==` the ring's
/// initial name, popped counter zero) to `control_path`, overwriting any
/// existing contents.
///
/// # Errors
/// Returns [`RingError::Nvmem`] if the file cannot be opened/written, or
/// [`RingError::NvmemFull`] if the write is short.
pub fn create_control_file<F: RingFs>(
    fs: &F,
    control_path: &str,
    tag: u8,
) -> Result<CachedNames, RingError> {
    let record = initial_record_bytes(tag);
    let mut file = fs
        .open(control_path, OpenMode::ReadWriteCreate)
        .map_err(RingError::Nvmem)?;
    let written = file.write(&record).map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
    if written != record.len() {
        return Err(RingError::NvmemFull {
            written,
            expected: record.len(),
        });
    }
    let name = name::initial_name(tag);
    Ok(CachedNames {
        head: name.clone(),
        tail: name,
    })
}

/// Reads the cached head/tail names from `control_path`, creating (and then
/// re-reading) the control record if it is missing or truncated.
///
/// # Errors
/// Returns [`RingError::Nvmem`]/[`RingError::NvmemFull`] for any unrecoverable
/// filesystem failure.
pub fn cache_control_data<F: RingFs>(
    fs: &F,
    control_path: &str,
    tag: u8,
) -> Result<CachedNames, RingError> {
    let mut file = match fs.open(control_path, OpenMode::ReadOnly) {
        Ok(f) => f,
        Err(FsError::NotFound(_)) => {
            create_control_file(fs, control_path, tag)?;
            fs.open(control_path, OpenMode::ReadOnly)
                .map_err(RingError::Nvmem)?
        }
        Err(e) => return Err(RingError::Nvmem(e)),
    };

    let mut head_buf = [0u8; NAME_FIELD_LEN];
    let mut tail_buf = [0u8; NAME_FIELD_LEN];
    let head_truncated = read_field(&mut file, &mut head_buf)?;
    let tail_truncated = !head_truncated && read_field(&mut file, &mut tail_buf)?;
    drop(file);

    if head_truncated || tail_truncated {
        // Short read, not a real I/O failure: truncated record, recreate from scratch.
        return create_control_file(fs, control_path, tag);
    }

    Ok(CachedNames {
        head: parse_name_field(&head_buf),
        tail: parse_name_field(&tail_buf),
    })
}

/// Reads exactly `buf.len()` bytes. Returns `Ok(true)` if the read came up
/// short (the record is truncated, not a filesystem failure); a genuine I/O
/// error propagates as [`RingError::Nvmem`] rather than being folded into the
/// truncation case (original `logger_cache_control_data` keeps these
/// separate: `RED_FILE_ERR` on the read itself is `LOGGER_NVMEM_ERR`, only a
/// short byte count recreates the record).
fn read_field(file: &mut impl Read, buf: &mut [u8]) -> Result<bool, RingError> {
    match file.read_exact(buf) {
        Ok(()) => Ok(false),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(true),
        Err(e) => Err(RingError::Nvmem(FsError::Io(e))),
    }
}

/// Overwrites the head name field in the control record.
///
/// # Errors
/// Returns [`RingError::Nvmem`]/[`RingError::NvmemFull`] on filesystem failure.
pub fn set_head<F: RingFs>(fs: &F, control_path: &str, head: &str) -> Result<(), RingError> {
    write_name_at(fs, control_path, HEAD_OFFSET, head)
}

/// Overwrites the tail name field in the control record.
///
/// # Errors
/// Returns [`RingError::Nvmem`]/[`RingError::NvmemFull`] on filesystem failure.
pub fn set_tail<F: RingFs>(fs: &F, control_path: &str, tail: &str) -> Result<(), RingError> {
    write_name_at(fs, control_path, TAIL_OFFSET, tail)
}

fn write_name_at<F: RingFs>(
    fs: &F,
    control_path: &str,
    offset: u64,
    name: &str,
) -> Result<(), RingError> {
    let mut file = fs
        .open(control_path, OpenMode::ReadWrite)
        .map_err(RingError::Nvmem)?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
    // Only the name bytes are written, not the null terminator: this mirrors
    // the source, which writes FILESYSTEM_MAX_NAME_LENGTH bytes here (the
    // terminator was already laid down at creation and a fixed-width name
    // never needs to grow).
    let bytes = name.as_bytes();
    let written = file
        .write(&bytes[..name::NAME_LEN.min(bytes.len())])
        .map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
    if written != name::NAME_LEN {
        return Err(RingError::NvmemFull {
            written,
            expected: name::NAME_LEN,
        });
    }
    Ok(())
}

/// Reads the popped-temporal counter, computes its successor modulo
/// `10^POPPED_WIDTH`, and writes the successor back *before* returning it —
/// the untrack path renames the tail file only after this call succeeds, so
/// a crash in between simply skips a counter value.
///
/// # Errors
/// Returns [`RingError::Nvmem`]/[`RingError::NvmemFull`] on filesystem failure.
pub fn advance_popped_counter<F: RingFs>(fs: &F, control_path: &str) -> Result<u32, RingError> {
    let mut file = fs
        .open(control_path, OpenMode::ReadWrite)
        .map_err(RingError::Nvmem)?;
    file.seek(SeekFrom::Start(POPPED_OFFSET))
        .map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
    let mut buf = [0u8; POPPED_LEN];
    file.read_exact(&mut buf)
        .map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
    let current = name::decode_unsigned_checked(&buf, 10).unwrap_or(0);
    let next = (current + 1) % name::POPPED_MODULUS;

    file.seek(SeekFrom::Start(POPPED_OFFSET))
        .map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
    let encoded = name::encode_unsigned(next, POPPED_LEN, 10);
    let written = file
        .write(encoded.as_bytes())
        .map_err(|e| RingError::Nvmem(FsError::Io(e)))?;
    if written != POPPED_LEN {
        return Err(RingError::NvmemFull {
            written,
            expected: POPPED_LEN,
        });
    }
    Ok(current)
}
