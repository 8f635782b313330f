//! Frame indices and per-object memoization keyed by them.

use core::fmt;

/// Frame counter supplied by the frame scheduler. Wraps at `u16::MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameIndex(pub u16);

impl FrameIndex {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the following frame, wrapping around.
    #[inline]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last derived value of one object, valid for a single frame index.
///
/// Several systems may ask for the same derived transform in one frame; only
/// the first request computes it. Frame indices wrap, so a value left
/// untouched for exactly 65536 frames reads as fresh again.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformCache<V> {
    entry: Option<(FrameIndex, V)>,
}

impl<V: Copy> TransformCache<V> {
    pub fn new() -> Self {
        Self { entry: None }
    }

    /// Returns the value for `frame`, computing it only if the cache holds
    /// nothing for that frame.
    pub fn get_or_compute(&mut self, frame: FrameIndex, compute: impl FnOnce() -> V) -> V {
        match self.entry {
            Some((cached, value)) if cached == frame => value,
            _ => {
                let value = compute();
                self.entry = Some((frame, value));
                value
            }
        }
    }

    /// Stores a value computed elsewhere (e.g. by a projected proximity pass).
    pub fn seed(&mut self, frame: FrameIndex, value: V) {
        self.entry = Some((frame, value));
    }

    /// Returns the cached value if it was computed for `frame`.
    pub fn get(&self, frame: FrameIndex) -> Option<V> {
        self.entry
            .and_then(|(cached, value)| (cached == frame).then_some(value))
    }

    pub fn last_computed_frame(&self) -> Option<FrameIndex> {
        self.entry.map(|(frame, _)| frame)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

impl<V: Copy> Default for TransformCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
