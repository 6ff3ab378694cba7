//! Name Codec.
//!
//! Entry names are fixed-width, 12 ASCII bytes: `NNNCTTTT.log` for a tracked
//! entry (`N` = sequence, base [`SEQUENCE_BASE`]; `C` = the ring's element
//! tag; `T` = temporal counter, base 10) or `CPPPPPPP.bin` for an untracked
//! entry (`C` = tag, `P` = the 7-digit popped-temporal counter).

/// Width, in characters, of the sequence field.
pub const SEQUENCE_WIDTH: usize = 3;
/// Numeric base of the sequence field (digits `0-9a-z`).
pub const SEQUENCE_BASE: u32 = 36;
/// Width, in characters, of the temporal field.
pub const TEMPORAL_WIDTH: usize = 4;
/// Modulus of the temporal field: it wraps at `10^TEMPORAL_WIDTH`.
pub const TEMPORAL_MODULUS: u32 = 10_000;
/// Width, in characters, of the popped-temporal field.
pub const POPPED_WIDTH: usize = 7;
/// Modulus of the popped-temporal field: it wraps at `10^POPPED_WIDTH`.
pub const POPPED_MODULUS: u32 = 10_000_000;
/// Total length of an entry name, without a terminator: `SSSCTTTT.ext`.
pub const NAME_LEN: usize = SEQUENCE_WIDTH + 1 + TEMPORAL_WIDTH + 4;
/// Smallest capacity a ring may be configured with.
pub const MIN_CAPACITY: usize = 1;
/// Largest capacity a ring may be configured with: `SEQUENCE_BASE^SEQUENCE_WIDTH`.
pub const MAX_CAPACITY: usize = 46_656; // 36^3

const SUFFIX_TRACKED: &str = ".log";
const SUFFIX_UNTRACKED: &str = ".bin";

/// Left-pads `n` to `width` characters in the given `base`, using digits `0-9a-z`.
///
/// # Panics
/// Panics if `n` cannot be represented in `width` digits of `base` — callers
/// are expected to keep their counters within the field's modulus.
pub fn encode_unsigned(n: u32, width: usize, base: u32) -> String {
    let mut digits = vec![b'0'; width];
    let mut rem = n;
    for slot in digits.iter_mut().rev() {
        let d = rem % base;
        *slot = if d < 10 {
            b'0' + d as u8
        } else {
            b'a' + (d - 10) as u8
        };
        rem /= base;
    }
    assert!(rem == 0, "value {n} does not fit in {width} base-{base} digits");
    String::from_utf8(digits).expect("digits are ASCII")
}

/// Decodes `chars` (a `width`-byte ASCII field) in `base`.
///
/// Matches the original source's `logger_atoui`: any byte outside
/// `0-9`, `a-z`, `A-Z` makes the whole field decode to `0`, silently. Kept
/// only as the byte-compatible low-level primitive; every call site that
/// parses a name coming off disk uses [`decode_unsigned_checked`] instead.
#[must_use]
pub fn decode_unsigned_raw(chars: &[u8], base: u32) -> u32 {
    decode_unsigned_checked(chars, base).unwrap_or(0)
}

/// Decodes `chars` in `base`, returning `None` if any byte is not a valid digit.
#[must_use]
pub fn decode_unsigned_checked(chars: &[u8], base: u32) -> Option<u32> {
    let mut num: u32 = 0;
    for &byte in chars {
        let digit = match byte {
            b'0'..=b'9' => u32::from(byte - b'0'),
            b'a'..=b'z' => u32::from(byte - b'a') + 10,
            b'A'..=b'Z' => u32::from(byte - b'A') + 10,
            _ => return None,
        };
        if digit >= base {
            return None;
        }
        num = num.checked_mul(base)?.checked_add(digit)?;
    }
    Some(num)
}

/// The canonical initial name for a ring with the given element tag: `"000<tag>0000.log"`.
#[must_use]
pub fn initial_name(tag: u8) -> String {
    format!("000{}0000.log", tag as char)
}

/// Parses the sequence field of a tracked entry name.
///
/// Returns `None` if `name` is shorter than [`NAME_LEN`] or the sequence
/// field contains an invalid digit — callers treat this as cause to
/// reinitialize the control record (SPEC_FULL.md §4.1).
#[must_use]
pub fn sequence_of(name: &str) -> Option<u32> {
    let bytes = name.as_bytes();
    if bytes.len() < NAME_LEN {
        return None;
    }
    decode_unsigned_checked(&bytes[0..SEQUENCE_WIDTH], SEQUENCE_BASE)
}

/// Parses the temporal field of a tracked entry name. See [`sequence_of`].
#[must_use]
pub fn temporal_of(name: &str) -> Option<u32> {
    let bytes = name.as_bytes();
    if bytes.len() < NAME_LEN {
        return None;
    }
    let start = SEQUENCE_WIDTH + 1;
    decode_unsigned_checked(&bytes[start..start + TEMPORAL_WIDTH], 10)
}

/// Returns the element tag byte at its fixed position in a tracked entry name.
#[must_use]
pub fn tag_of(name: &str) -> Option<u8> {
    name.as_bytes().get(SEQUENCE_WIDTH).copied()
}

/// Computes the next name in ring order: advances sequence (wrapping at
/// `max_capacity`, not via modulo, since capacity may shrink at runtime) and
/// temporal (wrapping at [`TEMPORAL_MODULUS`]); the tag byte is untouched.
///
/// Returns `None` if `name` cannot be parsed (see [`sequence_of`]).
#[must_use]
pub fn next_name(name: &str, max_capacity: usize) -> Option<String> {
    let seq = sequence_of(name)?;
    let tem = temporal_of(name)?;
    let tag = tag_of(name)?;

    let mut next_seq = seq + 1;
    if next_seq as usize >= max_capacity {
        next_seq = 0;
    }
    let next_tem = (tem + 1) % TEMPORAL_MODULUS;

    Some(format!(
        "{}{}{}{}",
        encode_unsigned(next_seq, SEQUENCE_WIDTH, SEQUENCE_BASE),
        tag as char,
        encode_unsigned(next_tem, TEMPORAL_WIDTH, 10),
        SUFFIX_TRACKED,
    ))
}

/// Builds the untracked (`.bin`) name for the given tag and popped-temporal counter.
#[must_use]
pub fn untracked_name(tag: u8, popped: u32) -> String {
    format!(
        "{}{}{}",
        tag as char,
        encode_unsigned(popped, POPPED_WIDTH, 10),
        SUFFIX_UNTRACKED,
    )
}

/// Returns `true` if `a` and `b` share the same sequence field — the
/// collision check `insert` uses to detect head catching up to tail.
#[must_use]
pub fn same_sequence(a: &str, b: &str) -> bool {
    match (a.as_bytes(), b.as_bytes()) {
        (a, b) if a.len() >= SEQUENCE_WIDTH && b.len() >= SEQUENCE_WIDTH => {
            a[0..SEQUENCE_WIDTH] == b[0..SEQUENCE_WIDTH]
        }
        _ => false,
    }
}
