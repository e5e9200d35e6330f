//! Strategy weights shared across evaluation threads.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::eval::StrategyWeights;
use crate::style::Style;

/// Process-wide strategy weights written by the manual-override path.
///
/// The two halves are separate relaxed atomics: a reader may pair a new
/// material weight with an old positional one, and sees a store no later
/// than its next evaluation call after the writer's store. Both halves are
/// always within the clamped range.
#[derive(Clone, Debug)]
pub struct SharedStrategyWeights(Arc<(AtomicI32, AtomicI32)>);

impl SharedStrategyWeights {
    #[must_use]
    pub fn new(weights: StrategyWeights) -> Self {
        SharedStrategyWeights(Arc::new((
            AtomicI32::new(weights.material),
            AtomicI32::new(weights.positional),
        )))
    }

    #[inline]
    #[must_use]
    pub fn load(&self) -> StrategyWeights {
        StrategyWeights {
            material: self.0 .0.load(Ordering::Relaxed),
            positional: self.0 .1.load(Ordering::Relaxed),
        }
    }

    /// Store clamped weights
    #[inline]
    pub fn store(&self, weights: StrategyWeights) {
        let clamped = StrategyWeights::new(weights.material, weights.positional);
        self.0 .0.store(clamped.material, Ordering::Relaxed);
        self.0 .1.store(clamped.positional, Ordering::Relaxed);
    }

    /// Derive and store weights from a style mix in percent.
    pub fn apply_dynamic_blend(&self, tal: i32, petrosian: i32, capablanca: i32) {
        self.store(StrategyWeights::from_style_mix(tal, petrosian, capablanca));
    }

    pub fn adjust_for_style(&self, style: Style) {
        self.store(self.load().adjusted_for(style));
    }
}

impl Default for SharedStrategyWeights {
    fn default() -> Self {
        Self::new(StrategyWeights::new(15, 15))
    }
}
