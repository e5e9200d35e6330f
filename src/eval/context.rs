//! Per-worker evaluation state.

use std::fmt;
use std::sync::Arc;

use crate::board::Position;
use crate::logger::{logger_for, EvalLogger};
use crate::options::EvalOptions;
use crate::style::blend::{apply_complexity, blend_toward_targets};
use crate::style::{
    tactical_complexity, BlendCache, BlendStats, GamePhase, MaterialStyleProvider, PhaseDetector,
    PositionalIndicators, StyleWeightProvider, StyleWeights, WeightDedup,
};
use crate::sync::SharedStrategyWeights;

use super::StrategyWeights;

/// Everything one search worker carries between evaluation calls.
///
/// The phase detector, blend cache and dedup memory only make sense along
/// one sequential walk of a search tree, so each worker owns its own
/// context and nothing in it is shared. The strategy weights written by the
/// blend are likewise private to the worker; only the manual override
/// comes from the shared store.
pub struct EvalContext {
    options: EvalOptions,
    shared: SharedStrategyWeights,
    provider: Arc<dyn StyleWeightProvider>,
    logger: Arc<dyn EvalLogger>,
    phase: PhaseDetector,
    cache: BlendCache,
    dedup: WeightDedup,
    strategy: StrategyWeights,
    stats: BlendStats,
}

impl EvalContext {
    #[must_use]
    pub fn new(options: EvalOptions, shared: SharedStrategyWeights) -> Self {
        let logger = logger_for(options.debug_blend);
        EvalContext {
            options,
            shared,
            provider: Arc::new(MaterialStyleProvider),
            logger,
            phase: PhaseDetector::new(),
            cache: BlendCache::new(),
            dedup: WeightDedup::new(),
            strategy: StrategyWeights::default(),
            stats: BlendStats::default(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn StyleWeightProvider>) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn EvalLogger>) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Replace the options; the logger follows `debug_blend`.
    pub fn set_options(&mut self, options: EvalOptions) {
        if options.debug_blend != self.options.debug_blend {
            self.logger = logger_for(options.debug_blend);
        }
        self.options = options;
    }

    /// Weights an adjusted evaluation should use right now
    #[inline]
    #[must_use]
    pub fn strategy_weights(&self) -> StrategyWeights {
        if self.options.manual_weights {
            self.shared.load()
        } else {
            self.strategy
        }
    }

    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.phase.phase()
    }

    #[must_use]
    pub fn stats(&self) -> BlendStats {
        self.stats
    }

    #[must_use]
    pub fn cache(&self) -> &BlendCache {
        &self.cache
    }

    /// Blend `weights` for `pos` and refresh this worker's strategy
    /// weights.
    ///
    /// Does nothing when the style blend is off or manual weights are in
    /// force. A repeated position in an unchanged phase returns the cached
    /// mix without recomputing it.
    pub fn blend_style(&mut self, pos: &Position, weights: &mut StyleWeights) {
        if !self.options.style_enabled || self.options.manual_weights {
            return;
        }

        let key = pos.key();
        let phase = self.phase.update(pos);
        if let Some(cached) = self.cache.probe(key, phase) {
            *weights = cached;
            self.stats.cache_hits += 1;
            return;
        }
        self.stats.recomputations += 1;

        let complexity = tactical_complexity(pos);
        self.provider.provide(pos, weights);
        let indicators = PositionalIndicators::compute(pos);
        let blended = apply_complexity(blend_toward_targets(*weights, &indicators, phase), complexity);
        self.update_strategy(phase, blended);

        let normalized = blended.normalized();
        *weights = normalized;
        self.cache.store(key, phase, normalized);
        self.logger.blend_committed(key, phase, normalized);
    }

    fn update_strategy(&mut self, phase: GamePhase, weights: StyleWeights) {
        if !self.options.style_enabled || self.options.manual_weights {
            return;
        }
        let phase = if self.options.dynamic_weights {
            phase
        } else {
            GamePhase::Middlegame
        };
        if self.dedup.update(phase, weights, &mut self.strategy) {
            self.stats.commits += 1;
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new(EvalOptions::default(), SharedStrategyWeights::default())
    }
}

impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("options", &self.options)
            .field("phase", &self.phase)
            .field("cache", &self.cache)
            .field("strategy", &self.strategy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FixedStyleProvider;

    fn context(options: EvalOptions) -> EvalContext {
        EvalContext::new(options, SharedStrategyWeights::default())
            .with_provider(Arc::new(FixedStyleProvider(StyleWeights::new(40, 30, 30))))
    }

    #[test]
    fn test_second_call_hits_cache() {
        let mut ctx = context(EvalOptions::default());
        let pos = Position::startpos();
        let mut first = StyleWeights::default();
        ctx.blend_style(&pos, &mut first);
        let mut second = StyleWeights::new(1, 2, 3);
        ctx.blend_style(&pos, &mut second);
        assert_eq!(first, second);
        assert_eq!(first.total(), 100);
        assert_eq!(ctx.stats().recomputations, 1);
        assert_eq!(ctx.stats().cache_hits, 1);
    }

    #[test]
    fn test_disabled_blend_is_a_no_op() {
        let mut opts = EvalOptions::default();
        opts.style_enabled = false;
        let mut ctx = context(opts);
        let mut w = StyleWeights::new(1, 2, 3);
        ctx.blend_style(&Position::startpos(), &mut w);
        assert_eq!(w, StyleWeights::new(1, 2, 3));
        assert_eq!(ctx.stats(), BlendStats::default());
    }

    #[test]
    fn test_manual_weights_come_from_shared_store() {
        let shared = SharedStrategyWeights::new(StrategyWeights::new(25, 6));
        let mut opts = EvalOptions::default();
        opts.manual_weights = true;
        let mut ctx = EvalContext::new(opts, shared.clone());
        let mut w = StyleWeights::new(1, 2, 3);
        ctx.blend_style(&Position::startpos(), &mut w);
        assert_eq!(w, StyleWeights::new(1, 2, 3));
        assert_eq!(ctx.strategy_weights(), StrategyWeights::new(25, 6));
        shared.store(StrategyWeights::new(9, 9));
        assert_eq!(ctx.strategy_weights(), StrategyWeights::new(9, 9));
    }

    #[derive(Default)]
    struct Commits(parking_lot::Mutex<u32>);

    impl EvalLogger for Commits {
        fn blend_committed(&self, _key: u64, _phase: GamePhase, _weights: StyleWeights) {
            *self.0.lock() += 1;
        }
    }

    #[test]
    fn test_injected_logger_sees_each_recomputation() {
        let commits = Arc::new(Commits::default());
        let mut ctx = context(EvalOptions::default()).with_logger(commits.clone());
        let mut pos = Position::startpos();
        let mut w = StyleWeights::default();
        ctx.blend_style(&pos, &mut w);
        ctx.blend_style(&pos, &mut w);
        pos.play("e2e4").unwrap();
        ctx.blend_style(&pos, &mut w);
        assert_eq!(*commits.0.lock(), 2);
    }

    #[test]
    fn test_set_options_switches_to_manual_weights() {
        let shared = SharedStrategyWeights::new(StrategyWeights::new(7, 8));
        let mut ctx = EvalContext::new(EvalOptions::default(), shared);
        let mut w = StyleWeights::new(40, 30, 30);
        ctx.blend_style(&Position::startpos(), &mut w);
        assert_eq!(ctx.stats().recomputations, 1);

        ctx.set_options(EvalOptions {
            manual_weights: true,
            debug_blend: true,
            ..EvalOptions::default()
        });
        assert_eq!(ctx.strategy_weights(), StrategyWeights::new(7, 8));
        ctx.blend_style(&Position::startpos(), &mut w);
        assert_eq!(ctx.stats().recomputations, 1);
    }

    #[test]
    fn test_blend_commits_strategy_weights() {
        let mut ctx = context(EvalOptions::default());
        assert_eq!(ctx.strategy_weights(), StrategyWeights::default());
        let mut w = StyleWeights::default();
        ctx.blend_style(&Position::startpos(), &mut w);
        let s = ctx.strategy_weights();
        assert!((5..=30).contains(&s.material));
        assert!((5..=30).contains(&s.positional));
        assert_eq!(ctx.stats().commits, 1);
    }
}
