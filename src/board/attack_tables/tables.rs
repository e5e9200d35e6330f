//! Precomputed attack tables for leaper pieces (knights, kings, pawns).

use once_cell::sync::Lazy;

const KNIGHT_DELTAS: [(isize, isize); 8] = [
    (2, 1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (-1, -2),
    (1, -2),
    (2, -1),
];

const KING_DELTAS: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Squares reachable from `sq` by one of `deltas`, clipped to the board.
fn leaper_mask(sq: usize, deltas: &[(isize, isize)]) -> u64 {
    let r = (sq / 8) as isize;
    let f = (sq % 8) as isize;
    deltas
        .iter()
        .map(|&(dr, df)| (r + dr, f + df))
        .filter(|&(nr, nf)| (0..8).contains(&nr) && (0..8).contains(&nf))
        .fold(0u64, |mask, (nr, nf)| mask | 1u64 << (nr * 8 + nf))
}

fn leaper_table(deltas: &[(isize, isize)]) -> [u64; 64] {
    let mut table = [0u64; 64];
    for (sq, slot) in table.iter_mut().enumerate() {
        *slot = leaper_mask(sq, deltas);
    }
    table
}

pub(crate) static KNIGHT_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| leaper_table(&KNIGHT_DELTAS));

pub(crate) static KING_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| leaper_table(&KING_DELTAS));

/// `PAWN_ATTACKS[color][sq]`: squares a pawn of `color` on `sq` captures on.
pub(crate) static PAWN_ATTACKS: Lazy<[[u64; 64]; 2]> = Lazy::new(|| {
    [
        leaper_table(&[(1, -1), (1, 1)]),
        leaper_table(&[(-1, -1), (-1, 1)]),
    ]
});
