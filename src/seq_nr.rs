use std::fmt::{Display, Formatter};

/// An 8-bit sequence number with wrap-around (modulo 256) arithmetic.
///
/// Ordering between two sequence numbers is only defined within half a cycle: `a` is ahead
///  of `b` if it is 1 to 127 steps after `b`. Everything else (including a distance of exactly
///  128) is treated as 'behind or equal'.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct SeqNr(u8);

impl Display for SeqNr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SeqNr {
    /// NB: Senders never put this on the wire as their first sequence number, and statistics
    ///  use it as a 'nothing yet' marker
    pub const ZERO: SeqNr = SeqNr(0);

    /// size of the half-cycle window in which forward progress is recognized
    pub const HALF_RANGE: u8 = 128;

    pub fn from_raw(value: u8) -> Self {
        Self(value)
    }

    pub fn to_raw(&self) -> u8 {
        self.0
    }

    pub fn next(&self) -> SeqNr {
        SeqNr(self.0.wrapping_add(1))
    }

    /// circular distance `(self - other) mod 256`
    pub fn difference(&self, other: SeqNr) -> u8 {
        self.0.wrapping_sub(other.0)
    }

    pub fn is_ahead_of(&self, other: SeqNr) -> bool {
        let diff = self.difference(other);
        diff >= 1 && diff < Self::HALF_RANGE
    }

    /// Freshness check for a received sequence number: anything is fresh if there was no
    ///  previously accepted packet, otherwise it must be ahead of the previous one. This
    ///  rejects exact duplicates as well as stale / reordered packets.
    pub fn is_fresh(candidate: SeqNr, previous: Option<SeqNr>) -> bool {
        match previous {
            None => true,
            Some(previous) => candidate.is_ahead_of(previous),
        }
    }
}
