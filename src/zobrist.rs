//! Zobrist hashing for positions.
//!
//! The key doubles as the position identity for the style blend cache, so it
//! must be updated incrementally and consistently by every board mutation.

use once_cell::sync::Lazy;
use rand::prelude::*;

use crate::board::{Color, Piece, Square};

pub(crate) struct ZobristKeys {
    /// `pieces[color][piece][square]`
    pieces: [[[u64; 64]; 6]; 2],
    black_to_move: u64,
    /// Indexed by the 4-bit castling rights mask
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(1234567890_u64);
        let mut pieces = [[[0u64; 64]; 6]; 2];
        for by_piece in &mut pieces {
            for by_square in by_piece.iter_mut() {
                for key in by_square.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        let black_to_move = rng.gen();

        // Combined rights hash as the XOR of their single-right keys so that
        // clearing one right is a single XOR of the two table entries.
        let singles: [u64; 4] = rng.gen();
        let mut castling = [0u64; 16];
        for (mask, slot) in castling.iter_mut().enumerate() {
            *slot = (0..4)
                .filter(|bit| mask & (1 << bit) != 0)
                .fold(0, |acc, bit| acc ^ singles[bit]);
        }

        let en_passant_file = rng.gen();

        ZobristKeys {
            pieces,
            black_to_move,
            castling,
            en_passant_file,
        }
    }
}

pub(crate) static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

#[inline]
pub(crate) fn piece_key(color: Color, piece: Piece, sq: Square) -> u64 {
    ZOBRIST.pieces[color.index()][piece.index()][sq.index()]
}

#[inline]
pub(crate) fn side_key() -> u64 {
    ZOBRIST.black_to_move
}

#[inline]
pub(crate) fn castling_key(rights: u8) -> u64 {
    ZOBRIST.castling[usize::from(rights & 0x0F)]
}

#[inline]
pub(crate) fn en_passant_key(sq: Square) -> u64 {
    ZOBRIST.en_passant_file[sq.file()]
}
