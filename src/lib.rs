//! Incrementally updated NNUE evaluation with a style-weighted blend.
//!
//! - [`nnue`]: network parameters, the feature transformer with per-node
//!   accumulators, and the bucketed hidden layers
//! - [`eval`]: model selection, score blending and per-worker state
//! - [`style`]: game phase detection and the Tal / Petrosian / Capablanca blend
//! - [`service`]: loading, saving and configuration for an engine front end
//! - [`trace`]: a human-readable breakdown of one evaluation

pub mod board;
pub mod eval;
pub mod logger;
pub mod nnue;
pub mod options;
pub mod service;
pub mod style;
pub mod sync;
pub mod trace;
mod zobrist;

pub use board::{Color, Move, Piece, Position, Square};
pub use eval::{EvalContext, Evaluation, Evaluator, StrategyWeights};
pub use nnue::{NetSize, NetworkError, Networks};
pub use options::EvalOptions;
pub use service::EvalService;
pub use style::{Style, StyleWeights};
