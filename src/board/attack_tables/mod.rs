//! Attack generation.
//!
//! Leapers come from precomputed tables. Sliders use Hyperbola Quintessence
//! (`o^(o-2r)` with a byte swap for the reverse ray) on diagonals and files,
//! and a small lookup table for ranks.

#![allow(clippy::inline_always)]

mod tables;

use once_cell::sync::Lazy;

use crate::board::types::{Bitboard, Color, Square};
use tables::{KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};

/// Walk a ray from `sq` in direction (dr, df) until the board edge.
fn ray(sq: usize, dr: isize, df: isize) -> u64 {
    let mut mask = 0u64;
    let mut r = (sq / 8) as isize + dr;
    let mut f = (sq % 8) as isize + df;
    while (0..8).contains(&r) && (0..8).contains(&f) {
        mask |= 1u64 << (r * 8 + f);
        r += dr;
        f += df;
    }
    mask
}

/// Line masks through each square, including the square itself.
struct LineMasks {
    diag: [u64; 64],
    anti: [u64; 64],
    file: [u64; 64],
}

static LINES: Lazy<LineMasks> = Lazy::new(|| {
    let mut lines = LineMasks {
        diag: [0; 64],
        anti: [0; 64],
        file: [0; 64],
    };
    for sq in 0..64 {
        let own = 1u64 << sq;
        lines.diag[sq] = own | ray(sq, 1, 1) | ray(sq, -1, -1);
        lines.anti[sq] = own | ray(sq, 1, -1) | ray(sq, -1, 1);
        lines.file[sq] = own | ray(sq, 1, 0) | ray(sq, -1, 0);
    }
    lines
});

/// `[8 * inner_occupancy + file]` -> attacks along rank 1.
/// Inner occupancy covers files b-g only; the edge files never block.
static RANK_ATTACKS: Lazy<[u64; 512]> = Lazy::new(|| {
    let mut attacks = [0u64; 512];
    for occ in 0..64usize {
        let blockers = (occ as u64) << 1;
        for file in 0..8usize {
            let mut mask = 0u64;
            for f in (file + 1)..8 {
                mask |= 1 << f;
                if blockers & (1 << f) != 0 {
                    break;
                }
            }
            for f in (0..file).rev() {
                mask |= 1 << f;
                if blockers & (1 << f) != 0 {
                    break;
                }
            }
            attacks[8 * occ + file] = mask;
        }
    }
    attacks
});

#[inline(always)]
fn hyperbola(occupied: u64, line: u64, sq: usize) -> u64 {
    let piece = 1u64 << sq;
    let forward = occupied & line & !piece;
    let reverse = forward.swap_bytes();
    let fwd = forward.wrapping_sub(piece.wrapping_mul(2));
    let rev = reverse
        .wrapping_sub(piece.swap_bytes().wrapping_mul(2))
        .swap_bytes();
    (fwd ^ rev) & line & !piece
}

#[inline(always)]
fn rank_attacks(occupied: u64, sq: usize) -> u64 {
    let rank = sq / 8;
    let inner = ((occupied >> (rank * 8 + 1)) & 63) as usize;
    RANK_ATTACKS[8 * inner + sq % 8] << (rank * 8)
}

#[inline]
#[must_use]
pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    let s = sq.index();
    Bitboard(hyperbola(occupied.0, LINES.diag[s], s) | hyperbola(occupied.0, LINES.anti[s], s))
}

#[inline]
#[must_use]
pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    let s = sq.index();
    Bitboard(hyperbola(occupied.0, LINES.file[s], s) | rank_attacks(occupied.0, s))
}

#[inline]
#[must_use]
pub fn knight_attacks(sq: Square) -> Bitboard {
    Bitboard(KNIGHT_ATTACKS[sq.index()])
}

#[inline]
#[must_use]
pub fn king_attacks(sq: Square) -> Bitboard {
    Bitboard(KING_ATTACKS[sq.index()])
}

/// Squares a pawn of `color` standing on `sq` attacks
#[inline]
#[must_use]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    Bitboard(PAWN_ATTACKS[color.index()][sq.index()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn bb(squares: &[&str]) -> Bitboard {
        squares
            .iter()
            .fold(Bitboard::EMPTY, |acc, s| acc | Bitboard::from_square(sq(s)))
    }

    #[test]
    fn test_rook_attacks_empty_board() {
        let attacks = rook_attacks(sq("e4"), Bitboard::EMPTY);
        assert_eq!(attacks.popcount(), 14);
        assert!(attacks.contains(sq("e8")));
        assert!(attacks.contains(sq("a4")));
        assert!(!attacks.contains(sq("e4")));
    }

    #[test]
    fn test_rook_attacks_with_blockers() {
        let attacks = rook_attacks(sq("e4"), bb(&["e6", "c4"]));
        assert!(attacks.contains(sq("e6")));
        assert!(!attacks.contains(sq("e7")));
        assert!(attacks.contains(sq("c4")));
        assert!(!attacks.contains(sq("b4")));
        assert!(attacks.contains(sq("h4")));
    }

    #[test]
    fn test_bishop_attacks_with_blockers() {
        let attacks = bishop_attacks(sq("e4"), bb(&["g6"]));
        assert!(attacks.contains(sq("g6")));
        assert!(!attacks.contains(sq("h7")));
        assert!(attacks.contains(sq("b1")));
        assert!(attacks.contains(sq("a8")));
        assert!(attacks.contains(sq("h1")));
    }

    #[test]
    fn test_own_square_in_occupancy_is_ignored() {
        let occ = bb(&["e4"]);
        assert_eq!(rook_attacks(sq("e4"), occ), rook_attacks(sq("e4"), Bitboard::EMPTY));
        assert_eq!(
            bishop_attacks(sq("e4"), occ),
            bishop_attacks(sq("e4"), Bitboard::EMPTY)
        );
    }

    #[test]
    fn test_leaper_tables() {
        assert_eq!(knight_attacks(sq("a1")), bb(&["b3", "c2"]));
        assert_eq!(king_attacks(sq("h8")).popcount(), 3);
        assert_eq!(pawn_attacks(Color::White, sq("e4")), bb(&["d5", "f5"]));
        assert_eq!(pawn_attacks(Color::Black, sq("a5")), bb(&["b4"]));
    }
}
