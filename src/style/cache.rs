//! Single-entry memo of the last style blend.

use super::phase::GamePhase;
use super::StyleWeights;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlendCacheEntry {
    pub key: u64,
    pub phase: GamePhase,
    pub weights: StyleWeights,
}

/// Remembers the blend of the last position seen by one evaluation stream.
///
/// A hit needs both the position key and the phase to match.
#[derive(Clone, Debug, Default)]
pub struct BlendCache {
    entry: Option<BlendCacheEntry>,
}

impl BlendCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn probe(&self, key: u64, phase: GamePhase) -> Option<StyleWeights> {
        self.entry
            .filter(|e| e.key == key && e.phase == phase)
            .map(|e| e.weights)
    }

    #[inline]
    pub fn store(&mut self, key: u64, phase: GamePhase, weights: StyleWeights) {
        self.entry = Some(BlendCacheEntry {
            key,
            phase,
            weights,
        });
    }

    #[must_use]
    pub fn entry(&self) -> Option<&BlendCacheEntry> {
        self.entry.as_ref()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
