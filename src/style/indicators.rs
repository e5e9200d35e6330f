//! Scalar positional features used as style blend targets.

use crate::board::{king_attacks, Bitboard, Color, Position};
use crate::eval::simple_eval;

/// Position-derived features from the side to move's point of view, each
/// in `[0, 100]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionalIndicators {
    /// Share of attacks on the extended center
    pub center_control: i32,
    /// Share of pieces standing in the extended center
    pub center_dominance: i32,
    /// 100 for an unattacked king zone, falling with each attacked square
    pub king_safety: i32,
    /// Size of the material gap, either way
    pub material_imbalance: i32,
    /// Share of attacks on the two flanks
    pub flank_control: i32,
    /// Share of all attacked squares
    pub piece_activity: i32,
}

/// `a` as a percentage of `a + b`; 50 when both are zero
#[inline]
fn share(a: u32, b: u32) -> i32 {
    if a + b == 0 {
        50
    } else {
        (100 * a / (a + b)) as i32
    }
}

fn king_zone(pos: &Position, color: Color) -> Bitboard {
    match pos.king_square(color) {
        Some(sq) => king_attacks(sq) | Bitboard::from_square(sq),
        None => Bitboard::EMPTY,
    }
}

impl PositionalIndicators {
    #[must_use]
    pub fn compute(pos: &Position) -> Self {
        let us = pos.side_to_move();
        let them = us.opponent();
        let our_attacks = pos.attacks_by(us);
        let their_attacks = pos.attacks_by(them);

        let center = Bitboard::EXTENDED_CENTER;
        let center_control = share(
            (our_attacks & center).popcount(),
            (their_attacks & center).popcount(),
        );
        let center_dominance = share(
            (pos.pieces_of(us) & center).popcount(),
            (pos.pieces_of(them) & center).popcount(),
        );

        let zone = king_zone(pos, us);
        let zone_size = zone.popcount().max(1) as i32;
        let attacked = (zone & their_attacks).popcount() as i32;
        let king_safety = 100 - 100 * attacked / zone_size;

        let material_imbalance = (simple_eval(pos, us).abs() / 25).min(100);

        let flanks = Bitboard::QUEEN_FLANK | Bitboard::KING_FLANK;
        let flank_control = share(
            (our_attacks & flanks).popcount(),
            (their_attacks & flanks).popcount(),
        );
        let piece_activity = share(our_attacks.popcount(), their_attacks.popcount());

        PositionalIndicators {
            center_control,
            center_dominance,
            king_safety,
            material_imbalance,
            flank_control,
            piece_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(ind: &PositionalIndicators) -> bool {
        [
            ind.center_control,
            ind.center_dominance,
            ind.king_safety,
            ind.material_imbalance,
            ind.flank_control,
            ind.piece_activity,
        ]
        .iter()
        .all(|v| (0..=100).contains(v))
    }

    #[test]
    fn test_startpos_is_symmetric() {
        let ind = PositionalIndicators::compute(&Position::startpos());
        assert_eq!(ind.center_control, 50);
        assert_eq!(ind.center_dominance, 50);
        assert_eq!(ind.king_safety, 100);
        assert_eq!(ind.material_imbalance, 0);
        assert_eq!(ind.piece_activity, 50);
        assert!(in_range(&ind));
    }

    #[test]
    fn test_exposed_king_is_unsafe() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/3q4/4K3 w - - 0 1").unwrap();
        let ind = PositionalIndicators::compute(&pos);
        assert!(ind.king_safety < 100);
        assert!(ind.material_imbalance > 0);
        assert!(in_range(&ind));
    }
}
