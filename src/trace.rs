//! Human-readable breakdown of a big-network evaluation.
//!
//! Every piece is removed and the position re-evaluated, so this is slow.

use std::fmt::Write as _;

use crate::board::{Color, Piece, Position, Square};
use crate::eval::{combine, StrategyWeights, ADJUST_DELTA};
use crate::nnue::{material_bucket, NetSize, Networks, Value, LAYER_STACKS, OUTPUT_SCALE};

/// Internal units per pawn
pub const NORMALIZE_TO_PAWN_VALUE: i32 = 345;

const GRID_ROWS: usize = 3 * 8 + 1;
const GRID_COLS: usize = 8 * 8 + 1;
const TABLE_RULE: &str = "+------------+------------+------------+------------+";

#[inline]
#[must_use]
pub fn to_cp(v: Value) -> i32 {
    100 * v / NORMALIZE_TO_PAWN_VALUE
}

/// Per-bucket PSQT and positional terms of the big network, in internal
/// units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketTrace {
    pub psqt: [Value; LAYER_STACKS],
    pub positional: [Value; LAYER_STACKS],
    /// Bucket the current material count selects
    pub correct_bucket: usize,
}

pub fn trace_buckets(networks: &Networks, pos: &mut Position) -> BucketTrace {
    let mut trace = BucketTrace {
        psqt: [0; LAYER_STACKS],
        positional: [0; LAYER_STACKS],
        correct_bucket: material_bucket(pos.count_all()),
    };
    for (bucket, out) in networks.big.evaluate_all_buckets(pos).into_iter().enumerate() {
        trace.psqt[bucket] = out.psqt / OUTPUT_SCALE;
        trace.positional[bucket] = out.positional / OUTPUT_SCALE;
    }
    trace
}

/// Unadjusted big-network score from White's point of view
fn white_eval(networks: &Networks, pos: &mut Position) -> Value {
    let out = networks.evaluate(NetSize::Big, pos, false);
    let v = combine(
        out.psqt,
        out.positional,
        ADJUST_DELTA,
        false,
        StrategyWeights::default(),
    );
    v * pos.side_to_move().sign()
}

/// What each non-king piece contributes to the White-relative score,
/// indexed by square. Kings and empty squares are `None`.
///
/// The position is left as it was found.
pub fn piece_values(networks: &Networks, pos: &mut Position) -> [Option<Value>; 64] {
    let mut values = [None; 64];
    let base = white_eval(networks, pos);

    for sq in Square::all() {
        let Some((color, piece)) = pos.piece_on(sq) else {
            continue;
        };
        if piece == Piece::King {
            continue;
        }
        let refresh_required = pos.state().refresh_required;

        pos.remove_piece(sq);
        let without = white_eval(networks, pos);
        pos.put_piece(color, piece, sq);

        // The node holds its original pieces again, so its diff is valid.
        pos.state_mut().refresh_required = refresh_required;
        values[sq.index()] = Some(base - without);
    }
    values
}

/// Five characters: sign then pawns with up to two decimals.
#[must_use]
pub fn format_cp_compact(v: Value) -> [u8; 5] {
    let mut buf = [b' '; 5];
    buf[0] = match v.signum() {
        -1 => b'-',
        1 => b'+',
        _ => b' ',
    };
    let digit = |d: i32| b'0' + d as u8;
    let mut cp = to_cp(v).abs();
    if cp >= 10000 {
        buf[1] = digit(cp / 10000);
        cp %= 10000;
        buf[2] = digit(cp / 1000);
        cp %= 1000;
        buf[3] = digit(cp / 100);
        buf[4] = b' ';
    } else if cp >= 1000 {
        buf[1] = digit(cp / 1000);
        cp %= 1000;
        buf[2] = digit(cp / 100);
        cp %= 100;
        buf[3] = b'.';
        buf[4] = digit(cp / 10);
    } else {
        buf[1] = digit(cp / 100);
        cp %= 100;
        buf[2] = b'.';
        buf[3] = digit(cp / 10);
        buf[4] = digit(cp % 10);
    }
    buf
}

/// Sign followed by pawns right-aligned in six columns with two decimals.
#[must_use]
pub fn format_cp_aligned_dot(v: Value) -> String {
    let sign = match v.signum() {
        -1 => '-',
        1 => '+',
        _ => ' ',
    };
    let pawns = (0.01 * f64::from(to_cp(v))).abs();
    format!("{sign}{pawns:>6.2}")
}

fn write_square(grid: &mut [[u8; GRID_COLS]], sq: Square, label: Option<u8>, value: Option<Value>) {
    let x = sq.file() * 8;
    let y = (7 - sq.rank()) * 3;
    for i in 1..8 {
        grid[y][x + i] = b'-';
        grid[y + 3][x + i] = b'-';
    }
    for i in 1..3 {
        grid[y + i][x] = b'|';
        grid[y + i][x + 8] = b'|';
    }
    grid[y][x] = b'+';
    grid[y][x + 8] = b'+';
    grid[y + 3][x] = b'+';
    grid[y + 3][x + 8] = b'+';
    if let Some(c) = label {
        grid[y + 1][x + 4] = c;
    }
    if let Some(v) = value {
        grid[y + 2][x + 2..x + 7].copy_from_slice(&format_cp_compact(v));
    }
}

/// Board of per-piece values followed by the per-bucket table.
pub fn trace(networks: &Networks, pos: &mut Position) -> String {
    let values = piece_values(networks, pos);
    let mut grid = [[b' '; GRID_COLS]; GRID_ROWS];
    for sq in Square::all() {
        let label = pos
            .piece_on(sq)
            .map(|(color, piece)| piece.to_fen_char(color) as u8);
        write_square(&mut grid, sq, label, values[sq.index()]);
    }

    let mut out = String::from(" NNUE derived piece values:\n");
    for row in &grid {
        out.push_str(&String::from_utf8_lossy(row));
        out.push('\n');
    }
    out.push('\n');

    let t = trace_buckets(networks, pos);
    let to_move = match pos.side_to_move() {
        Color::White => "(White to move)",
        Color::Black => "(Black to move)",
    };
    // Writing to a String cannot fail.
    let _ = writeln!(out, " NNUE network contributions {to_move}");
    let _ = writeln!(out, "{TABLE_RULE}");
    let _ = writeln!(out, "|   Bucket   |  Material  | Positional |   Total    |");
    let _ = writeln!(out, "|            |   (PSQT)   |  (Layers)  |            |");
    let _ = writeln!(out, "{TABLE_RULE}");
    for bucket in 0..LAYER_STACKS {
        let _ = write!(
            out,
            "|  {bucket}         |  {}   |  {}   |  {}   |",
            format_cp_aligned_dot(t.psqt[bucket]),
            format_cp_aligned_dot(t.positional[bucket]),
            format_cp_aligned_dot(t.psqt[bucket] + t.positional[bucket]),
        );
        if bucket == t.correct_bucket {
            out.push_str(" <-- this bucket is used");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{TABLE_RULE}");
    out
}
