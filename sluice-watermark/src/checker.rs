//! Idle-watermark stability checking.

use sluice_core::Offset;

use crate::wmb::Wmb;

/// Validates that a repeated idle watermark offset is stable enough to
/// trust.
///
/// An idle marker becomes valid only after `max` consecutive polling
/// iterations observe the *same* idle offset. Any non-idle marker, or an
/// idle marker at a different offset, breaks the streak and the count
/// starts over. This keeps a flapping or transiently-stale offset from
/// being propagated downstream as a commitment that no more data will
/// arrive before that point.
#[derive(Debug, Clone)]
pub struct WmbChecker {
    /// Completed iterations of the current streak, in `0..max`.
    counter: u32,
    /// Required streak length.
    max: u32,
    /// Offset recorded when the current streak started.
    last_offset: Offset,
}

impl WmbChecker {
    /// Creates a checker that requires `iterations` consecutive
    /// observations of the same idle offset.
    ///
    /// # Panics
    ///
    /// Panics if `iterations` is zero.
    #[must_use]
    pub fn new(iterations: u32) -> Self {
        assert!(iterations > 0, "iterations must be positive");
        Self {
            counter: 0,
            max: iterations,
            last_offset: Offset::default(),
        }
    }

    /// Feeds one head-watermark observation into the checker.
    ///
    /// Returns true only when the last `max` observations were all idle
    /// at the same offset; the checker then resets and a fresh streak
    /// begins.
    pub fn validate_head_wmb(&mut self, w: Wmb) -> bool {
        if !w.idle {
            // An active watermark always breaks the streak.
            self.counter = 0;
            return false;
        }

        if self.counter == 0 {
            // First idle observation of a streak: record the offset.
            self.last_offset = w.offset;
            self.counter = 1;
        } else if self.counter < self.max - 1 {
            if w.offset == self.last_offset {
                self.counter += 1;
            } else {
                // Streak broken. The breaking offset is not recorded;
                // the next call starts a fresh streak.
                self.counter = 0;
            }
        } else {
            // Streak reached the required length.
            self.counter = 0;
            if w.offset == self.last_offset {
                return true;
            }
        }
        false
    }

    /// Returns the current streak counter, for logs and tests.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::Watermark;

    fn idle_at(offset: u64) -> Wmb {
        Wmb::idle(Offset::new(offset), Watermark::from_millis(0))
    }

    fn feed(checker: &mut WmbChecker, offsets: &[u64]) -> Vec<bool> {
        offsets
            .iter()
            .map(|&o| checker.validate_head_wmb(idle_at(o)))
            .collect()
    }

    #[test]
    fn test_stable_idle_offset_validates() {
        let mut checker = WmbChecker::new(3);
        assert_eq!(feed(&mut checker, &[5, 5, 5]), vec![false, false, true]);
        // The checker resets after returning true.
        assert_eq!(checker.counter(), 0);
    }

    #[test]
    fn test_offset_change_breaks_streak() {
        let mut checker = WmbChecker::new(3);
        assert_eq!(
            feed(&mut checker, &[5, 5, 6]),
            vec![false, false, false]
        );
        // The break did not record offset 6: a full fresh streak of 6s
        // is required before the marker validates.
        assert_eq!(
            feed(&mut checker, &[6, 6, 6]),
            vec![false, false, true]
        );
    }

    #[test]
    fn test_mid_streak_break_resets_counter() {
        let mut checker = WmbChecker::new(3);
        assert!(!checker.validate_head_wmb(idle_at(5)));
        assert_eq!(checker.counter(), 1);

        // Different offset mid-streak: counter back to zero.
        assert!(!checker.validate_head_wmb(idle_at(9)));
        assert_eq!(checker.counter(), 0);
    }

    #[test]
    fn test_active_wmb_resets_unconditionally() {
        let mut checker = WmbChecker::new(3);
        assert_eq!(feed(&mut checker, &[5, 5]), vec![false, false]);
        assert_eq!(checker.counter(), 2);

        let active = Wmb::active(Offset::new(5), Watermark::from_millis(0));
        assert!(!checker.validate_head_wmb(active));
        assert_eq!(checker.counter(), 0);

        // Streak must rebuild from scratch.
        assert_eq!(feed(&mut checker, &[5, 5, 5]), vec![false, false, true]);
    }

    #[test]
    fn test_single_iteration_checker() {
        let mut checker = WmbChecker::new(1);
        // With max = 1, the first idle observation starts the streak and
        // the second completes it.
        assert!(!checker.validate_head_wmb(idle_at(3)));
        assert!(checker.validate_head_wmb(idle_at(3)));
    }

    #[test]
    fn test_repeated_validation_cycles() {
        let mut checker = WmbChecker::new(2);
        assert_eq!(
            feed(&mut checker, &[7, 7, 7, 7]),
            vec![false, true, false, true]
        );
    }

    #[test]
    #[should_panic(expected = "iterations must be positive")]
    fn test_zero_iterations_panics() {
        let _ = WmbChecker::new(0);
    }
}
