//! Per-position accumulator state.

use super::PSQT_BUCKETS;
use crate::board::{Color, StateInfo};
use crate::nnue::{BIG_L1, SMALL_L1};

/// Transformed features of one position, for both perspectives.
///
/// Valid only for the exact position of the state node that owns it; every
/// board mutation on that node clears the computed flags.
#[derive(Clone)]
#[repr(C, align(64))]
pub struct Accumulator<const L1: usize> {
    pub accumulation: [[i16; L1]; 2],
    pub psqt_accumulation: [[i32; PSQT_BUCKETS]; 2],
    pub computed: [bool; 2],
    pub computed_psqt: [bool; 2],
}

impl<const L1: usize> Default for Accumulator<L1> {
    fn default() -> Self {
        Self {
            accumulation: [[0; L1]; 2],
            psqt_accumulation: [[0; PSQT_BUCKETS]; 2],
            computed: [false; 2],
            computed_psqt: [false; 2],
        }
    }
}

impl<const L1: usize> Accumulator<L1> {
    /// Whether `perspective` is usable for a request of the given mode
    #[inline]
    #[must_use]
    pub fn is_ready(&self, perspective: Color, psqt_only: bool) -> bool {
        let p = perspective.index();
        self.computed_psqt[p] && (psqt_only || self.computed[p])
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.computed = [false; 2];
        self.computed_psqt = [false; 2];
    }
}

/// Selects the accumulator of one model size from a state node.
pub trait AccumulatorSlot<const L1: usize> {
    fn accumulator(&self) -> &Accumulator<L1>;
    fn accumulator_mut(&mut self) -> &mut Accumulator<L1>;
}

impl AccumulatorSlot<BIG_L1> for StateInfo {
    #[inline]
    fn accumulator(&self) -> &Accumulator<BIG_L1> {
        &self.accumulator_big
    }

    #[inline]
    fn accumulator_mut(&mut self) -> &mut Accumulator<BIG_L1> {
        &mut self.accumulator_big
    }
}

impl AccumulatorSlot<SMALL_L1> for StateInfo {
    #[inline]
    fn accumulator(&self) -> &Accumulator<SMALL_L1> {
        &self.accumulator_small
    }

    #[inline]
    fn accumulator_mut(&mut self) -> &mut Accumulator<SMALL_L1> {
        &mut self.accumulator_small
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_is_cache_aligned() {
        assert_eq!(std::mem::align_of::<Accumulator<BIG_L1>>(), 64);
        let acc = Box::new(Accumulator::<SMALL_L1>::default());
        assert_eq!((&*acc as *const Accumulator<SMALL_L1>) as usize % 64, 0);
    }

    #[test]
    fn test_ready_flags() {
        let mut acc = Accumulator::<SMALL_L1>::default();
        assert!(!acc.is_ready(Color::White, true));
        acc.computed_psqt[0] = true;
        assert!(acc.is_ready(Color::White, true));
        assert!(!acc.is_ready(Color::White, false));
        acc.computed[0] = true;
        assert!(acc.is_ready(Color::White, false));
        acc.invalidate();
        assert!(!acc.is_ready(Color::White, true));
    }
}
