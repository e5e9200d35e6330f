//! Steps of the style blend that do not depend on configuration.

use crate::board::Position;
use crate::eval::StrategyWeights;

use super::indicators::PositionalIndicators;
use super::phase::GamePhase;
use super::StyleWeights;

pub const MAX_TACTICAL_COMPLEXITY: i32 = 12;

/// Short-term tactical tension of `pos` in `[0, 12]`.
///
/// Checkers and attackers of either king count twice. Every enemy piece
/// attacked by the side to move adds one, and one more if undefended.
#[must_use]
pub fn tactical_complexity(pos: &Position) -> i32 {
    let us = pos.side_to_move();
    let them = us.opponent();
    let mut score = 2 * pos.checkers().popcount() as i32;

    for color in [us, them] {
        if let Some(king) = pos.king_square(color) {
            score += 2 * pos.attackers_to(king).popcount() as i32;
        }
    }

    for sq in pos.pieces_of(them).iter() {
        let attackers = pos.attackers_to(sq);
        let ours = (attackers & pos.pieces_of(us)).popcount();
        let defenders = (attackers & pos.pieces_of(them)).popcount();
        if ours > 0 {
            score += 1;
            if defenders == 0 {
                score += 1;
            }
        }
    }
    score.clamp(0, MAX_TACTICAL_COMPLEXITY)
}

/// Fraction of the opening-side indicator in each target, in percent:
/// 100 in the opening, 0 in the endgame.
#[inline]
#[must_use]
pub const fn opening_share(phase: GamePhase) -> i32 {
    (2 - phase.index()) * 50
}

/// Pull each weight halfway toward its phase-dependent indicator target.
#[must_use]
pub fn blend_toward_targets(
    weights: StyleWeights,
    indicators: &PositionalIndicators,
    phase: GamePhase,
) -> StyleWeights {
    let f = opening_share(phase);
    let mix = |late: i32, early: i32| ((100 - f) * late + f * early) / 100;
    let target_tal = mix(indicators.center_dominance, indicators.king_safety);
    let target_cap = mix(indicators.material_imbalance, indicators.center_control);
    let target_pet = mix(indicators.flank_control, indicators.piece_activity);
    StyleWeights::new(
        (weights.tal + target_tal) / 2,
        (weights.petrosian + target_pet) / 2,
        (weights.capablanca + target_cap) / 2,
    )
}

/// Tension favours Tal at the expense of the other two.
#[must_use]
pub fn apply_complexity(weights: StyleWeights, complexity: i32) -> StyleWeights {
    if complexity <= 0 {
        return weights;
    }
    StyleWeights::new(
        weights.tal + 2 * complexity,
        weights.petrosian - complexity,
        weights.capablanca - complexity,
    )
}

/// Material and positional strategy weights implied by a style mix in a
/// given phase, before clamping.
#[must_use]
pub fn phase_strategy(phase: GamePhase, w: StyleWeights) -> (i32, i32) {
    match phase {
        GamePhase::Opening => (
            (2 * w.tal + w.petrosian) / 3,
            (2 * w.capablanca + w.petrosian) / 3,
        ),
        GamePhase::Middlegame => {
            let even = (w.tal + w.petrosian + w.capablanca) / 3;
            (even, even)
        }
        GamePhase::Endgame => (
            (2 * w.petrosian + w.capablanca) / 3,
            (2 * w.capablanca + w.tal) / 3,
        ),
    }
}

/// Per-stream memory that lets repeated inputs skip the strategy commit.
#[derive(Clone, Debug, Default)]
pub struct WeightDedup {
    last_inputs: Option<(GamePhase, StyleWeights)>,
    last_committed: Option<StrategyWeights>,
}

impl WeightDedup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive strategy weights for `(phase, weights)` and write them to
    /// `strategy`. Returns `true` only when `strategy` changed.
    pub fn update(
        &mut self,
        phase: GamePhase,
        weights: StyleWeights,
        strategy: &mut StrategyWeights,
    ) -> bool {
        if self.last_inputs == Some((phase, weights)) {
            return false;
        }
        self.last_inputs = Some((phase, weights));

        let (material, positional) = phase_strategy(phase, weights);
        let next = StrategyWeights::new(material, positional);
        if self.last_committed == Some(next) {
            return false;
        }
        self.last_committed = Some(next);
        *strategy = next;
        true
    }
}

/// Counters of one stream's blend activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlendStats {
    /// Blends computed from scratch
    pub recomputations: u64,
    pub cache_hits: u64,
    /// Strategy weight writes that changed the value
    pub commits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position_counts_own_queens() {
        // Each king is attacked by its own queen: 2 + 2
        assert_eq!(tactical_complexity(&Position::startpos()), 4);
    }

    #[test]
    fn test_enemy_knight_raises_start_baseline() {
        // A black knight on f3 checks e1 and sits attacked by e2 and g2.
        let pos =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/5n2/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
                .unwrap();
        // 2 (checker) + 4 (queen and knight on e1) + 2 (queen on e8) + 2 (hanging knight)
        assert_eq!(tactical_complexity(&pos), 10);
        assert!(tactical_complexity(&pos) > tactical_complexity(&Position::startpos()));
    }

    #[test]
    fn test_check_and_hanging_piece() {
        // Black queen checks from e2, undefended and attacked by the king.
        let pos = Position::from_fen("k7/8/8/8/8/8/4q3/4K3 w - - 0 1").unwrap();
        // 2 (checker) + 2 (attacker of our king) + 1 + 1 (queen hangs)
        assert_eq!(tactical_complexity(&pos), 6);
    }

    #[test]
    fn test_complexity_is_capped() {
        let pos = Position::from_fen("r3k2r/8/8/3q4/8/2n1n3/3Q4/R3K2R w KQkq - 0 1").unwrap();
        assert!(tactical_complexity(&pos) <= MAX_TACTICAL_COMPLEXITY);
    }

    #[test]
    fn test_targets_by_phase() {
        let ind = PositionalIndicators {
            center_control: 80,
            center_dominance: 20,
            king_safety: 100,
            material_imbalance: 0,
            flank_control: 40,
            piece_activity: 60,
        };
        let w = StyleWeights::new(40, 40, 40);
        assert_eq!(
            blend_toward_targets(w, &ind, GamePhase::Opening),
            StyleWeights::new(70, 50, 60)
        );
        assert_eq!(
            blend_toward_targets(w, &ind, GamePhase::Endgame),
            StyleWeights::new(30, 40, 20)
        );
        assert_eq!(
            blend_toward_targets(w, &ind, GamePhase::Middlegame),
            StyleWeights::new(50, 45, 40)
        );
    }

    #[test]
    fn test_complexity_nudge() {
        let w = StyleWeights::new(30, 30, 40);
        assert_eq!(apply_complexity(w, 3), StyleWeights::new(36, 27, 37));
        assert_eq!(apply_complexity(w, 0), w);
    }

    #[test]
    fn test_phase_strategy() {
        let w = StyleWeights::new(30, 60, 9);
        assert_eq!(phase_strategy(GamePhase::Opening, w), (40, 26));
        assert_eq!(phase_strategy(GamePhase::Middlegame, w), (33, 33));
        assert_eq!(phase_strategy(GamePhase::Endgame, w), (43, 16));
    }

    #[test]
    fn test_dedup_skips_repeated_inputs() {
        let mut dedup = WeightDedup::new();
        let mut strategy = StrategyWeights::default();
        let w = StyleWeights::new(30, 30, 40);
        assert!(dedup.update(GamePhase::Middlegame, w, &mut strategy));
        assert_eq!(strategy, StrategyWeights::new(33, 33));

        strategy = StrategyWeights::new(7, 7);
        assert!(!dedup.update(GamePhase::Middlegame, w, &mut strategy));
        assert_eq!(strategy, StrategyWeights::new(7, 7));

        // New inputs that land on the same clamped commit are not rewritten.
        let w2 = StyleWeights::new(33, 33, 34);
        assert!(!dedup.update(GamePhase::Middlegame, w2, &mut strategy));
        assert_eq!(strategy, StrategyWeights::new(7, 7));
    }
}
