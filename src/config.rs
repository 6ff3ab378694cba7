//! Configuration for opening a [`crate::LogRing`].

use crate::name::{MAX_CAPACITY, MIN_CAPACITY};

/// Configuration for a single ring instance.
///
/// Mirrors the builder pattern `ringmpsc-stream`'s `StreamConfig` uses: a
/// `Default`-able struct with `with_*` setters, rather than a constructor
/// taking every field positionally.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Path (an 8.3-style name, passed through to the `RingFs` backend) of the control file.
    pub control_path: String,
    /// The single ASCII byte identifying which ring owns its entry files.
    pub tag: u8,
    /// Maximum number of live entries, in `[MIN_CAPACITY, MAX_CAPACITY]`.
    pub max_capacity: usize,
}

impl RingConfig {
    /// Creates a configuration for a ring at `control_path` with the given element tag.
    ///
    /// Capacity defaults to [`MAX_CAPACITY`]; call [`Self::with_capacity`] to narrow it.
    pub fn new(control_path: impl Into<String>, tag: u8) -> Self {
        Self {
            control_path: control_path.into(),
            tag,
            max_capacity: MAX_CAPACITY,
        }
    }

    /// Sets the element tag.
    #[must_use]
    pub fn with_tag(mut self, tag: u8) -> Self {
        self.tag = tag;
        self
    }

    /// Sets the maximum capacity. Validated against `[MIN_CAPACITY, MAX_CAPACITY]` at
    /// [`crate::LogRing::open`] time, not here.
    #[must_use]
    pub fn with_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Returns `true` if `max_capacity` is within the allowed range.
    #[must_use]
    pub fn capacity_is_valid(&self) -> bool {
        (MIN_CAPACITY..=MAX_CAPACITY).contains(&self.max_capacity)
    }
}
