//! Board collaborator: the position the evaluator reads and updates.
//!
//! Move generation and legality checking live outside this crate. The
//! position only needs to apply moves it is handed, keep a Zobrist key, and
//! record the piece diff of every move for incremental accumulator updates.
//!
//! # Example
//! ```
//! use style_nnue::board::Position;
//!
//! let mut pos = Position::startpos();
//! pos.play("e2e4").unwrap();
//! assert_eq!(pos.state().dirty.len(), 1);
//! pos.undo_move();
//! assert_eq!(pos.key(), Position::startpos().key());
//! ```

mod attack_tables;
mod error;
mod fen;
mod position;
mod types;

#[cfg(test)]
mod tests;

pub use attack_tables::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
pub use error::{FenError, MoveParseError, SquareError};
pub use position::{DirtyEntry, DirtyPiece, Position, StateInfo, STARTPOS_FEN};
pub use types::{Bitboard, BitboardIter, Color, Move, Piece, Square};
