//! Position evaluation: model selection, network output and blending.
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::sync::Arc;
//! use style_nnue::board::Position;
//! use style_nnue::eval::{EvalContext, Evaluator};
//! use style_nnue::nnue::Networks;
//! use style_nnue::style::StyleWeights;
//!
//! let evaluator = Evaluator::new(Arc::new(Networks::random(&mut StdRng::seed_from_u64(1))));
//! let mut ctx = EvalContext::default();
//! let mut pos = Position::startpos();
//! let mut style = StyleWeights::default();
//! let eval = evaluator.evaluate_with_style(&mut pos, &mut ctx, &mut style, true);
//! assert!(!eval.psqt_only);
//! assert_eq!(ctx.stats().recomputations, 1);
//! ```

pub mod blender;
pub mod context;

use std::sync::Arc;

use crate::board::{Color, Piece, Position};
use crate::nnue::{NetSize, Networks, Value, OUTPUT_SCALE};
use crate::style::StyleWeights;

pub use blender::{
    clamp_weight, combine, StrategyWeights, ADJUST_DELTA, MAX_STRATEGY_WEIGHT, MIN_STRATEGY_WEIGHT,
};
pub use context::EvalContext;

/// Simple-eval magnitude above which the small network is used
pub const SMALL_NET_THRESHOLD: i32 = 1165;
/// Simple-eval magnitude above which only the PSQT term is computed
pub const PSQT_ONLY_THRESHOLD: i32 = 2500;

/// Material balance from `color`'s point of view.
#[must_use]
pub fn simple_eval(pos: &Position, color: Color) -> i32 {
    let them = color.opponent();
    let pawns = pos.count(color, Piece::Pawn) as i32 - pos.count(them, Piece::Pawn) as i32;
    Piece::Pawn.value() * pawns + pos.non_pawn_material(color) - pos.non_pawn_material(them)
}

/// Gap between the two network terms in output units
#[inline]
#[must_use]
pub fn complexity(psqt: Value, positional: Value) -> i32 {
    psqt.wrapping_sub(positional).wrapping_abs() / OUTPUT_SCALE
}

/// Which network evaluates a position, and how much of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelChoice {
    pub size: NetSize,
    pub psqt_only: bool,
}

/// Lopsided positions go to the small network, very lopsided ones skip
/// its hidden layers.
#[must_use]
pub fn select_model(pos: &Position) -> ModelChoice {
    let simple = simple_eval(pos, pos.side_to_move()).abs();
    if simple > SMALL_NET_THRESHOLD {
        ModelChoice {
            size: NetSize::Small,
            psqt_only: simple > PSQT_ONLY_THRESHOLD,
        }
    } else {
        ModelChoice {
            size: NetSize::Big,
            psqt_only: false,
        }
    }
}

/// One network's verdict on a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetEvaluation {
    /// Blended score, side to move's point of view
    pub value: Value,
    pub psqt: Value,
    pub positional: Value,
    /// `|psqt - positional| / OUTPUT_SCALE`, zero when PSQT-only
    pub complexity: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub value: Value,
    pub size: NetSize,
    pub psqt_only: bool,
    pub complexity: i32,
}

/// Read-only handle on a loaded network pair. Cheap to clone into every
/// search worker.
#[derive(Clone, Debug)]
pub struct Evaluator {
    networks: Arc<Networks>,
}

impl Evaluator {
    #[must_use]
    pub fn new(networks: Arc<Networks>) -> Self {
        Evaluator { networks }
    }

    #[must_use]
    pub fn networks(&self) -> &Networks {
        &self.networks
    }

    /// Evaluate with a fixed network.
    pub fn evaluate_net(
        &self,
        size: NetSize,
        pos: &mut Position,
        adjusted: bool,
        psqt_only: bool,
        weights: StrategyWeights,
    ) -> NetEvaluation {
        let out = self.networks.evaluate(size, pos, psqt_only);
        NetEvaluation {
            value: combine(out.psqt, out.positional, ADJUST_DELTA, adjusted, weights),
            psqt: out.psqt,
            positional: out.positional,
            complexity: if psqt_only {
                0
            } else {
                complexity(out.psqt, out.positional)
            },
        }
    }

    /// Evaluate with the network `select_model` picks.
    pub fn evaluate(
        &self,
        pos: &mut Position,
        adjusted: bool,
        weights: StrategyWeights,
    ) -> Evaluation {
        let choice = select_model(pos);
        let net = self.evaluate_net(choice.size, pos, adjusted, choice.psqt_only, weights);
        Evaluation {
            value: net.value,
            size: choice.size,
            psqt_only: choice.psqt_only,
            complexity: net.complexity,
        }
    }

    /// Evaluate with the strategy weights currently in effect for `ctx`.
    pub fn evaluate_in(&self, pos: &mut Position, ctx: &EvalContext, adjusted: bool) -> Evaluation {
        self.evaluate(pos, adjusted, ctx.strategy_weights())
    }

    /// Run the style blend for `pos`, then evaluate with the strategy
    /// weights it leaves in `ctx`.
    ///
    /// `style` is the caller's running style mix and is overwritten with the
    /// blended one. With the blend disabled or manual weights in force this
    /// is the same as `evaluate_in`.
    pub fn evaluate_with_style(
        &self,
        pos: &mut Position,
        ctx: &mut EvalContext,
        style: &mut StyleWeights,
        adjusted: bool,
    ) -> Evaluation {
        ctx.blend_style(pos, style);
        self.evaluate_in(pos, ctx, adjusted)
    }

    /// Bring the accumulator of a node about to be expanded up to date, for
    /// the network its children are likely to use.
    pub fn hint_common_parent_position(&self, pos: &mut Position) {
        let choice = select_model(pos);
        self.networks
            .hint_common_access(choice.size, pos, choice.psqt_only);
    }
}
