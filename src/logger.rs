//! Injectable diagnostics for network loading and style blending.
//!
//! `NoopLogger` is the default; `LogLogger` forwards to the `log` facade and
//! is chosen when blend debugging is switched on.

use std::sync::Arc;

use crate::nnue::{NetSize, NetworkError};
use crate::style::{GamePhase, StyleWeights};

/// Receiver of evaluation-side events. Every method defaults to a no-op.
pub trait EvalLogger: Send + Sync {
    /// A freshly computed style blend was stored for `key`
    fn blend_committed(&self, _key: u64, _phase: GamePhase, _weights: StyleWeights) {}

    fn network_loaded(&self, _size: NetSize, _name: &str, _description: &str) {}

    fn network_saved(&self, _size: NetSize, _target: &str) {}

    fn network_rejected(&self, _size: NetSize, _name: &str, _err: &NetworkError) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl EvalLogger for NoopLogger {}

/// Forwards events to `log` at debug, info and warn levels.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogLogger;

impl EvalLogger for LogLogger {
    fn blend_committed(&self, key: u64, phase: GamePhase, weights: StyleWeights) {
        log::debug!("style blend phase={} {} key={:#018x}", phase.index(), weights, key);
    }

    fn network_loaded(&self, size: NetSize, name: &str, description: &str) {
        log::info!("loaded {size} network {name} ({description})");
    }

    fn network_saved(&self, size: NetSize, target: &str) {
        log::info!("saved {size} network to {target}");
    }

    fn network_rejected(&self, size: NetSize, name: &str, err: &NetworkError) {
        log::warn!("rejected {size} network {name}: {err}");
    }
}

/// Logger for the given debug setting
#[must_use]
pub fn logger_for(debug: bool) -> Arc<dyn EvalLogger> {
    if debug {
        Arc::new(LogLogger)
    } else {
        Arc::new(NoopLogger)
    }
}
