//! Position representation and its state stack.
//!
//! Every move pushes a `StateInfo` node recording the piece diff that produced
//! it. The evaluator walks this stack backwards to find the nearest node with
//! a computed accumulator and replays the diffs forward.

use std::fmt;

use super::attack_tables::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use super::error::MoveParseError;
use super::types::{
    Bitboard, Color, Move, Piece, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K,
    CASTLE_WHITE_Q,
};
use crate::nnue::{Accumulator, BIG_L1, SMALL_L1};
use crate::zobrist::{castling_key, en_passant_key, piece_key, side_key};

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// One piece change: a piece leaving `from`, arriving on `to`, or both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyEntry {
    pub color: Color,
    pub piece: Piece,
    pub from: Option<Square>,
    pub to: Option<Square>,
}

const EMPTY_ENTRY: DirtyEntry = DirtyEntry {
    color: Color::White,
    piece: Piece::Pawn,
    from: None,
    to: None,
};

/// The piece changes between a state node and its parent (at most 3:
/// moving piece, captured piece, promoted piece; or king and rook).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyPiece {
    len: usize,
    entries: [DirtyEntry; 3],
}

impl Default for DirtyPiece {
    fn default() -> Self {
        DirtyPiece {
            len: 0,
            entries: [EMPTY_ENTRY; 3],
        }
    }
}

impl DirtyPiece {
    fn push(&mut self, color: Color, piece: Piece, from: Option<Square>, to: Option<Square>) {
        debug_assert!(self.len < 3);
        self.entries[self.len] = DirtyEntry {
            color,
            piece,
            from,
            to,
        };
        self.len += 1;
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &DirtyEntry> {
        self.entries[..self.len].iter()
    }
}

/// Mutable per-node state.
#[derive(Clone)]
pub struct StateInfo {
    pub key: u64,
    pub castling: u8,
    pub en_passant: Option<Square>,
    pub captured: Option<Piece>,
    pub dirty: DirtyPiece,
    /// The board of this node was edited outside of `do_move`, so it cannot
    /// be derived from its parent by replaying `dirty`.
    pub refresh_required: bool,
    pub(crate) accumulator_big: Accumulator<BIG_L1>,
    pub(crate) accumulator_small: Accumulator<SMALL_L1>,
}

impl StateInfo {
    fn new(key: u64, castling: u8, en_passant: Option<Square>) -> Self {
        StateInfo {
            key,
            castling,
            en_passant,
            captured: None,
            dirty: DirtyPiece::default(),
            refresh_required: false,
            accumulator_big: Accumulator::default(),
            accumulator_small: Accumulator::default(),
        }
    }

    /// Clear the computed flags of both accumulators
    pub fn invalidate_accumulators(&mut self) {
        self.accumulator_big.invalidate();
        self.accumulator_small.invalidate();
    }
}

/// A chess position with a stack of incremental states.
#[derive(Clone)]
pub struct Position {
    pieces: [[Bitboard; 6]; 2],
    occupied: [Bitboard; 2],
    mailbox: [Option<(Color, Piece)>; 64],
    side_to_move: Color,
    states: Vec<StateInfo>,
}

#[inline]
fn castling_mask(sq: Square) -> u8 {
    match sq.index() {
        0 => CASTLE_WHITE_Q,
        7 => CASTLE_WHITE_K,
        4 => CASTLE_WHITE_K | CASTLE_WHITE_Q,
        56 => CASTLE_BLACK_Q,
        63 => CASTLE_BLACK_K,
        60 => CASTLE_BLACK_K | CASTLE_BLACK_Q,
        _ => 0,
    }
}

impl Position {
    pub(crate) fn empty() -> Self {
        let mut states = Vec::with_capacity(256);
        states.push(StateInfo::new(0, 0, None));
        Position {
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupied: [Bitboard::EMPTY; 2],
            mailbox: [None; 64],
            side_to_move: Color::White,
            states,
        }
    }

    /// The standard starting position
    #[must_use]
    pub fn startpos() -> Self {
        Self::from_fen(STARTPOS_FEN).unwrap_or_else(|_| Self::empty())
    }

    // ---- raw board edits (no state bookkeeping) ----

    fn set_square(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] = self.pieces[color.index()][piece.index()] | bit;
        self.occupied[color.index()] = self.occupied[color.index()] | bit;
        self.mailbox[sq.index()] = Some((color, piece));
    }

    fn clear_square(&mut self, sq: Square) -> Option<(Color, Piece)> {
        let found = self.mailbox[sq.index()].take();
        if let Some((color, piece)) = found {
            let keep = !Bitboard::from_square(sq);
            self.pieces[color.index()][piece.index()] =
                self.pieces[color.index()][piece.index()] & keep;
            self.occupied[color.index()] = self.occupied[color.index()] & keep;
        }
        found
    }

    pub(crate) fn set_side_to_move(&mut self, color: Color) {
        self.side_to_move = color;
    }

    /// Replace the root state and recompute its key from scratch.
    pub(crate) fn reset_root(&mut self, castling: u8, en_passant: Option<Square>) {
        let mut key = castling_key(castling);
        if let Some(ep) = en_passant {
            key ^= en_passant_key(ep);
        }
        if self.side_to_move == Color::Black {
            key ^= side_key();
        }
        for sq in Square::all() {
            if let Some((color, piece)) = self.mailbox[sq.index()] {
                key ^= piece_key(color, piece, sq);
            }
        }
        self.states.clear();
        self.states.push(StateInfo::new(key, castling, en_passant));
    }

    pub(crate) fn place_initial(&mut self, color: Color, piece: Piece, sq: Square) {
        self.set_square(color, piece, sq);
    }

    // ---- queries ----

    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    #[must_use]
    pub fn piece_on(&self, sq: Square) -> Option<(Color, Piece)> {
        self.mailbox[sq.index()]
    }

    #[inline]
    #[must_use]
    pub fn pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    /// All pieces of one color
    #[inline]
    #[must_use]
    pub fn pieces_of(&self, color: Color) -> Bitboard {
        self.occupied[color.index()]
    }

    /// Pieces of one type, both colors
    #[inline]
    #[must_use]
    pub fn pieces_of_type(&self, piece: Piece) -> Bitboard {
        self.pieces(Color::White, piece) | self.pieces(Color::Black, piece)
    }

    #[inline]
    #[must_use]
    pub fn occupied(&self) -> Bitboard {
        self.occupied[0] | self.occupied[1]
    }

    /// Total number of pieces on the board, kings included
    #[inline]
    #[must_use]
    pub fn count_all(&self) -> u32 {
        self.occupied().popcount()
    }

    #[inline]
    #[must_use]
    pub fn count(&self, color: Color, piece: Piece) -> u32 {
        self.pieces(color, piece).popcount()
    }

    #[must_use]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color, Piece::King).iter().next()
    }

    /// Material of knights, bishops, rooks and queens for one side
    #[must_use]
    pub fn non_pawn_material(&self, color: Color) -> i32 {
        [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
            .iter()
            .map(|&p| self.count(color, p) as i32 * p.value())
            .sum()
    }

    /// Squares attacked by `piece` of `color` standing on `sq`
    #[must_use]
    pub fn piece_attacks(&self, color: Color, piece: Piece, sq: Square) -> Bitboard {
        let occ = self.occupied();
        match piece {
            Piece::Pawn => pawn_attacks(color, sq),
            Piece::Knight => knight_attacks(sq),
            Piece::Bishop => bishop_attacks(sq, occ),
            Piece::Rook => rook_attacks(sq, occ),
            Piece::Queen => bishop_attacks(sq, occ) | rook_attacks(sq, occ),
            Piece::King => king_attacks(sq),
        }
    }

    /// Every square attacked by at least one piece of `color`
    #[must_use]
    pub fn attacks_by(&self, color: Color) -> Bitboard {
        let mut attacks = Bitboard::EMPTY;
        for piece in Piece::ALL {
            for sq in self.pieces(color, piece).iter() {
                attacks = attacks | self.piece_attacks(color, piece, sq);
            }
        }
        attacks
    }

    /// Pieces of either color attacking `sq`
    #[must_use]
    pub fn attackers_to(&self, sq: Square) -> Bitboard {
        let occ = self.occupied();
        let diagonal = self.pieces_of_type(Piece::Bishop) | self.pieces_of_type(Piece::Queen);
        let straight = self.pieces_of_type(Piece::Rook) | self.pieces_of_type(Piece::Queen);
        (pawn_attacks(Color::Black, sq) & self.pieces(Color::White, Piece::Pawn))
            | (pawn_attacks(Color::White, sq) & self.pieces(Color::Black, Piece::Pawn))
            | (knight_attacks(sq) & self.pieces_of_type(Piece::Knight))
            | (king_attacks(sq) & self.pieces_of_type(Piece::King))
            | (bishop_attacks(sq, occ) & diagonal)
            | (rook_attacks(sq, occ) & straight)
    }

    /// Enemy pieces giving check to the side to move
    #[must_use]
    pub fn checkers(&self) -> Bitboard {
        match self.king_square(self.side_to_move) {
            Some(king) => self.attackers_to(king) & self.pieces_of(self.side_to_move.opponent()),
            None => Bitboard::EMPTY,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> u64 {
        self.state().key
    }

    #[inline]
    #[must_use]
    pub fn castling_rights(&self) -> u8 {
        self.state().castling
    }

    #[inline]
    #[must_use]
    pub fn en_passant(&self) -> Option<Square> {
        self.state().en_passant
    }

    /// The current (innermost) state node
    #[inline]
    #[must_use]
    pub fn state(&self) -> &StateInfo {
        // The stack always holds the root node.
        &self.states[self.states.len() - 1]
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut StateInfo {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// The whole state stack, root first
    #[inline]
    pub(crate) fn states(&self) -> &[StateInfo] {
        &self.states
    }

    #[inline]
    pub(crate) fn states_mut(&mut self) -> &mut [StateInfo] {
        &mut self.states
    }

    /// Number of state nodes above the root
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.states.len() - 1
    }

    // ---- incremental mutation ----

    /// Play `mv` for the side to move.
    ///
    /// The move is trusted to be pseudo-legal; only the presence of a piece of
    /// the side to move on the origin square is checked.
    pub fn do_move(&mut self, mv: Move) -> Result<(), MoveParseError> {
        let us = self.side_to_move;
        let piece = match self.mailbox[mv.from.index()] {
            Some((color, piece)) if color == us => piece,
            _ => {
                return Err(MoveParseError::NoPieceOnSquare {
                    notation: mv.to_string(),
                })
            }
        };

        let prev = self.state();
        let mut key = prev.key ^ side_key();
        if let Some(ep) = prev.en_passant {
            key ^= en_passant_key(ep);
        }
        let prev_castling = prev.castling;

        let mut dirty = DirtyPiece::default();
        let mut captured = None;
        let file_distance = mv.from.file().abs_diff(mv.to.file());

        if piece == Piece::King && file_distance == 2 {
            let rank = mv.from.rank();
            let (rook_from, rook_to) = if mv.to.file() > mv.from.file() {
                (Square(rank, 7), Square(rank, 5))
            } else {
                (Square(rank, 0), Square(rank, 3))
            };
            dirty.push(us, Piece::King, Some(mv.from), Some(mv.to));
            dirty.push(us, Piece::Rook, Some(rook_from), Some(rook_to));
        } else {
            let en_passant_capture =
                piece == Piece::Pawn && file_distance == 1 && self.mailbox[mv.to.index()].is_none();
            let capture_sq = if en_passant_capture {
                Square(mv.from.rank(), mv.to.file())
            } else {
                mv.to
            };
            let promotion = mv.promotion.filter(|_| piece == Piece::Pawn);
            dirty.push(
                us,
                piece,
                Some(mv.from),
                if promotion.is_some() { None } else { Some(mv.to) },
            );
            if let Some((color, victim)) = self.mailbox[capture_sq.index()] {
                captured = Some(victim);
                dirty.push(color, victim, Some(capture_sq), None);
            }
            if let Some(promo) = promotion {
                dirty.push(us, promo, None, Some(mv.to));
            }
        }

        for entry in dirty.iter() {
            if let Some(from) = entry.from {
                self.clear_square(from);
                key ^= piece_key(entry.color, entry.piece, from);
            }
        }
        for entry in dirty.iter() {
            if let Some(to) = entry.to {
                self.set_square(entry.color, entry.piece, to);
                key ^= piece_key(entry.color, entry.piece, to);
            }
        }

        let castling = prev_castling & !(castling_mask(mv.from) | castling_mask(mv.to));
        key ^= castling_key(prev_castling) ^ castling_key(castling);

        let en_passant = if piece == Piece::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
            let ep = Square((mv.from.rank() + mv.to.rank()) / 2, mv.from.file());
            key ^= en_passant_key(ep);
            Some(ep)
        } else {
            None
        };

        let mut state = StateInfo::new(key, castling, en_passant);
        state.captured = captured;
        state.dirty = dirty;
        self.states.push(state);
        self.side_to_move = us.opponent();
        Ok(())
    }

    /// Parse a UCI move and play it
    pub fn play(&mut self, uci: &str) -> Result<Move, MoveParseError> {
        let mv: Move = uci.parse()?;
        self.do_move(mv)?;
        Ok(mv)
    }

    /// Take back the last `do_move` or `do_null_move`.
    ///
    /// Board edits made with `put_piece`/`remove_piece` on the current node
    /// must be reverted by the caller first.
    pub fn undo_move(&mut self) {
        if self.states.len() <= 1 {
            debug_assert!(false, "undo_move at root");
            return;
        }
        let Some(state) = self.states.pop() else {
            return;
        };
        for entry in state.dirty.iter() {
            if let Some(to) = entry.to {
                self.clear_square(to);
            }
        }
        for entry in state.dirty.iter() {
            if let Some(from) = entry.from {
                self.set_square(entry.color, entry.piece, from);
            }
        }
        self.side_to_move = self.side_to_move.opponent();
    }

    /// Pass the move to the opponent without changing the board
    pub fn do_null_move(&mut self) {
        let prev = self.state();
        let mut key = prev.key ^ side_key();
        if let Some(ep) = prev.en_passant {
            key ^= en_passant_key(ep);
        }
        let state = StateInfo::new(key, prev.castling, None);
        self.states.push(state);
        self.side_to_move = self.side_to_move.opponent();
    }

    pub fn undo_null_move(&mut self) {
        self.undo_move();
    }

    /// Place a piece on an empty square of the current node.
    ///
    /// The node's accumulators are invalidated and marked as requiring a full
    /// refresh, since the edit is not described by its diff.
    pub fn put_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        if let Some((c, p)) = self.clear_square(sq) {
            self.state_mut().key ^= piece_key(c, p, sq);
        }
        self.set_square(color, piece, sq);
        let state = self.state_mut();
        state.key ^= piece_key(color, piece, sq);
        state.refresh_required = true;
        state.invalidate_accumulators();
    }

    /// Remove whatever stands on `sq` from the current node
    pub fn remove_piece(&mut self, sq: Square) -> Option<(Color, Piece)> {
        let removed = self.clear_square(sq)?;
        let state = self.state_mut();
        state.key ^= piece_key(removed.0, removed.1, sq);
        state.refresh_required = true;
        state.invalidate_accumulators();
        Some(removed)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.to_fen())
            .field("key", &format_args!("{:#018x}", self.key()))
            .field("depth", &self.depth())
            .finish()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let c = self
                    .piece_on(Square(rank, file))
                    .map_or('.', |(color, piece)| piece.to_fen_char(color));
                write!(f, "{c} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "  a b c d e f g h")
    }
}
