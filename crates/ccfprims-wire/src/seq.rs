use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of distinct CCF segment sequence numbers (13 bits).
pub const SEQUENCE_SPACE: u16 = 1 << 13;

const MASK: u16 = SEQUENCE_SPACE - 1;

/// A 13-bit CCF segment sequence number.
///
/// Advancing wraps modulo [`SEQUENCE_SPACE`], so 8191 is followed by 0.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentSeq(u16);

impl SegmentSeq {
    /// Creates a sequence number, discarding bits above the 13-bit field.
    #[must_use]
    pub const fn new(n: u16) -> Self {
        Self(n & MASK)
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The sequence number that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self((self.0 + 1) & MASK)
    }

    /// Returns the current value and advances `self`, like a post-increment
    /// counter.
    pub fn take(&mut self) -> Self {
        let current = *self;
        *self = current.next();
        current
    }

    /// Whether `self` may sit directly after `prev` in one reassembly run.
    ///
    /// A repeated number counts as adjacent so that duplicates don't split a
    /// run.
    #[must_use]
    pub const fn follows(self, prev: Self) -> bool {
        self.0 == prev.0 || self.0 == prev.next().0
    }
}

impl From<u16> for SegmentSeq {
    fn from(n: u16) -> Self {
        Self::new(n)
    }
}

impl From<SegmentSeq> for u16 {
    fn from(seq: SegmentSeq) -> Self {
        seq.0
    }
}

impl fmt::Debug for SegmentSeq {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("SegmentSeq").field(&self.0).finish()
    }
}

impl fmt::Display for SegmentSeq {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
