//! Bitboard type and operations.

use std::ops::{BitAnd, BitOr, Not};

use super::square::Square;

/// A 64-bit bitboard representing piece positions or attack squares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Bitboard(pub u64);

impl Bitboard {
    pub const EMPTY: Bitboard = Bitboard(0);

    /// d4, e4, d5, e5
    pub const CENTER: Bitboard = Bitboard(0x0000_0018_1800_0000);
    /// c3-f6 rectangle
    pub const EXTENDED_CENTER: Bitboard = Bitboard(0x0000_3C3C_3C3C_0000);
    /// Files a-c
    pub const QUEEN_FLANK: Bitboard = Bitboard(0x0707_0707_0707_0707);
    /// Files f-h
    pub const KING_FLANK: Bitboard = Bitboard(0xE0E0_E0E0_E0E0_E0E0);

    #[inline]
    #[must_use]
    pub const fn from_square(sq: Square) -> Self {
        Bitboard(1 << (sq.0 * 8 + sq.1))
    }

    /// Iterate the squares set in this bitboard, lowest index first
    #[inline]
    #[must_use]
    pub fn iter(self) -> BitboardIter {
        BitboardIter(self)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn popcount(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, sq: Square) -> bool {
        (self.0 & (1 << (sq.0 * 8 + sq.1))) != 0
    }
}

impl BitAnd for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Bitboard(self.0 & rhs.0)
    }
}

impl BitOr for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Bitboard(self.0 | rhs.0)
    }
}

impl Not for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn not(self) -> Self {
        Bitboard(!self.0)
    }
}

/// Iterator over set bits in a Bitboard
pub struct BitboardIter(Bitboard);

impl Iterator for BitboardIter {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            None
        } else {
            let idx = self.0 .0.trailing_zeros() as usize;
            self.0 .0 &= self.0 .0 - 1;
            Some(Square::from_index(idx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_yields_squares_in_order() {
        let bb = Bitboard::from_square(Square(0, 1)) | Bitboard::from_square(Square(7, 7));
        let squares: Vec<Square> = bb.iter().collect();
        assert_eq!(squares, vec![Square(0, 1), Square(7, 7)]);
        assert_eq!(bb.popcount(), 2);
    }

    #[test]
    fn test_flank_masks_are_disjoint() {
        assert!((Bitboard::QUEEN_FLANK & Bitboard::KING_FLANK).is_empty());
        assert_eq!(Bitboard::CENTER.popcount(), 4);
        assert!(Bitboard::CENTER.contains(Square(3, 4)));
    }
}
