use std::cmp::{max, min};

/// One run of a chromosome sharing a single signal value.
///
/// Represents the range [start, end): inclusive start, exclusive end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalInterval {
    pub start: u32,
    pub end: u32,
    pub value: f32,
}

impl SignalInterval {
    pub fn new(start: u32, end: u32, value: f32) -> Self {
        SignalInterval { start, end, value }
    }

    /// Number of bases covered by the interval
    #[inline]
    pub fn width(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Intersect the interval with [lo, hi). Returns `None` when nothing is left.
    #[inline]
    pub fn clip(&self, lo: u32, hi: u32) -> Option<SignalInterval> {
        let start = max(self.start, lo);
        let end = min(self.end, hi);
        (start < end).then_some(SignalInterval {
            start,
            end,
            value: self.value,
        })
    }
}
