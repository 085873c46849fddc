//! The watermark marker type.

use sluice_core::{Offset, Watermark};

/// A watermark marker observed at the head of a partition.
///
/// Carries the offset the marker was observed at, the watermark value
/// itself (opaque to validation), and whether the partition was idle at
/// the time of observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wmb {
    /// True if no new data has arrived since the last observation.
    pub idle: bool,
    /// Offset the marker was observed at.
    pub offset: Offset,
    /// The watermark value carried by the marker.
    pub watermark: Watermark,
}

impl Wmb {
    /// Creates an idle marker at the given offset.
    #[must_use]
    pub const fn idle(offset: Offset, watermark: Watermark) -> Self {
        Self {
            idle: true,
            offset,
            watermark,
        }
    }

    /// Creates a non-idle (active) marker at the given offset.
    #[must_use]
    pub const fn active(offset: Offset, watermark: Watermark) -> Self {
        Self {
            idle: false,
            offset,
            watermark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmb_constructors() {
        let w = Wmb::idle(Offset::new(5), Watermark::from_millis(100));
        assert!(w.idle);
        assert_eq!(w.offset, Offset::new(5));

        let w = Wmb::active(Offset::new(5), Watermark::from_millis(100));
        assert!(!w.idle);
    }
}
