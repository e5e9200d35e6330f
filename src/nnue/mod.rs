//! NNUE (Efficiently Updatable Neural Network) evaluation.
//!
//! Two independently loaded models share one architecture and differ only in
//! the width of the feature transformer:
//!
//! ```text
//! 768 -> L1 (x2 perspectives, pairwise product) -> 16 -> (15 sqr + 15 crelu) -> 32 -> 1
//! ```
//!
//! plus a PSQT side channel of 8 buckets read straight off the accumulator.
//! One of 8 layer stacks is selected by material bucket.

pub mod accumulator;
pub mod aligned;
pub mod error;
pub mod feature_transformer;
pub mod layers;
pub mod network;
pub mod networks;
pub(crate) mod serialize;
pub mod simd;

use crate::board::{Color, Piece, Square};

pub use accumulator::Accumulator;
pub use error::NetworkError;
pub use network::NetworkParams;
pub use networks::{NetOutput, Network, Networks};

/// Evaluation value in internal units
pub type Value = i32;

/// Format version stored in every parameter file header
pub const NNUE_VERSION: u32 = 0x7AF3_2F20;

/// Divisor between raw network output and internal value units
pub const OUTPUT_SCALE: i32 = 16;

/// Fixed-point shift of the hidden layer weights
pub const WEIGHT_SCALE_BITS: u32 = 6;

pub const CACHE_LINE_SIZE: usize = 64;

pub const PSQT_BUCKETS: usize = 8;
pub const LAYER_STACKS: usize = 8;

/// 2 colors x 6 piece types x 64 squares
pub const INPUT_DIMENSIONS: usize = 768;

pub const BIG_L1: usize = 256;
pub const SMALL_L1: usize = 64;
pub const L2: usize = 15;
pub const L3: usize = 32;

/// Longest description a header may declare
pub const MAX_DESCRIPTION_LEN: usize = 1 << 16;

pub const DEFAULT_NAME_BIG: &str = "nn-b1a57edbea57.nnue";
pub const DEFAULT_NAME_SMALL: &str = "nn-baff1ede1f90.nnue";

/// Which of the two models an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetSize {
    Big,
    Small,
}

impl NetSize {
    #[must_use]
    pub const fn default_name(self) -> &'static str {
        match self {
            NetSize::Big => DEFAULT_NAME_BIG,
            NetSize::Small => DEFAULT_NAME_SMALL,
        }
    }
}

impl std::fmt::Display for NetSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetSize::Big => write!(f, "big"),
            NetSize::Small => write!(f, "small"),
        }
    }
}

/// Feature index of `piece` of `color` on `sq` as seen from `perspective`.
///
/// Black's view mirrors the board vertically and swaps colors, so both
/// perspectives share one weight table.
#[inline]
#[must_use]
pub fn feature_index(perspective: Color, color: Color, piece: Piece, sq: Square) -> usize {
    let (oriented_sq, oriented_color) = match perspective {
        Color::White => (sq.index(), color.index()),
        Color::Black => (sq.index() ^ 56, color.opponent().index()),
    };
    oriented_color * 384 + piece.index() * 64 + oriented_sq
}

/// Layer stack / PSQT bucket for a given total piece count (kings included).
#[inline]
#[must_use]
pub fn material_bucket(piece_count: u32) -> usize {
    ((piece_count.max(1) as usize - 1) / 4).min(LAYER_STACKS - 1)
}
