//! Debounced game phase detection.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::board::{Color, Piece, Position};

pub const ENDGAME_MATERIAL: i32 = 1300;
pub const MIDDLEGAME_MATERIAL: i32 = 2000;

/// Consecutive differing observations needed to commit a new phase
pub const STABILITY_THRESHOLD: u32 = 3;
/// Observations after a commit during which a flip back is rejected
pub const COOLDOWN: u32 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GamePhase {
    #[default]
    Opening = 0,
    Middlegame = 1,
    Endgame = 2,
}

impl GamePhase {
    #[inline]
    #[must_use]
    pub const fn index(self) -> i32 {
        self as i32
    }

    /// Undebounced phase for a material total
    #[must_use]
    pub const fn from_material(material: i32) -> Self {
        if material <= ENDGAME_MATERIAL {
            GamePhase::Endgame
        } else if material <= MIDDLEGAME_MATERIAL {
            GamePhase::Middlegame
        } else {
            GamePhase::Opening
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Opening => write!(f, "opening"),
            GamePhase::Middlegame => write!(f, "middlegame"),
            GamePhase::Endgame => write!(f, "endgame"),
        }
    }
}

/// Value of every piece on the board, pawns included, kings excluded.
#[must_use]
pub fn board_material(pos: &Position) -> i32 {
    Piece::NON_KING
        .iter()
        .map(|&p| {
            let n = pos.count(Color::White, p) + pos.count(Color::Black, p);
            n as i32 * p.value()
        })
        .sum()
}

/// Hysteresis over the material-derived phase of one evaluation stream.
///
/// A differing candidate must be seen `STABILITY_THRESHOLD` times in a row
/// before it is committed, and for `COOLDOWN` observations after a commit
/// differing candidates are dropped outright.
#[derive(Clone, Debug, Default)]
pub struct PhaseDetector {
    stable: GamePhase,
    stability: u32,
    cooldown: u32,
}

impl PhaseDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.stable
    }

    pub fn update(&mut self, pos: &Position) -> GamePhase {
        self.observe(board_material(pos))
    }

    pub fn observe(&mut self, material: i32) -> GamePhase {
        let candidate = GamePhase::from_material(material);

        if self.cooldown > 0 && candidate != self.stable {
            self.cooldown -= 1;
            return self.stable;
        }

        if candidate == self.stable {
            self.stability = 0;
            self.cooldown = self.cooldown.saturating_sub(1);
        } else {
            self.stability += 1;
            if self.stability >= STABILITY_THRESHOLD {
                self.stable = candidate;
                self.stability = 0;
                self.cooldown = COOLDOWN;
            }
        }
        self.stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENING: i32 = 5000;
    const MIDDLE: i32 = 1800;
    const END: i32 = 900;

    #[test]
    fn test_thresholds() {
        assert_eq!(GamePhase::from_material(1300), GamePhase::Endgame);
        assert_eq!(GamePhase::from_material(1301), GamePhase::Middlegame);
        assert_eq!(GamePhase::from_material(2000), GamePhase::Middlegame);
        assert_eq!(GamePhase::from_material(2001), GamePhase::Opening);
    }

    #[test]
    fn test_third_consecutive_observation_commits() {
        let mut det = PhaseDetector::new();
        assert_eq!(det.observe(END), GamePhase::Opening);
        assert_eq!(det.observe(END), GamePhase::Opening);
        assert_eq!(det.observe(END), GamePhase::Endgame);
    }

    #[test]
    fn test_oscillation_never_commits() {
        let mut det = PhaseDetector::new();
        for i in 0..50 {
            let material = if i % 2 == 0 { MIDDLE } else { OPENING };
            assert_eq!(det.observe(material), GamePhase::Opening);
        }
    }

    #[test]
    fn test_cooldown_rejects_flip_back() {
        let mut det = PhaseDetector::new();
        for _ in 0..3 {
            det.observe(MIDDLE);
        }
        assert_eq!(det.phase(), GamePhase::Middlegame);
        for _ in 0..4 {
            assert_eq!(det.observe(OPENING), GamePhase::Middlegame);
        }
        // Cooldown spent: three more differing calls are needed.
        assert_eq!(det.observe(OPENING), GamePhase::Middlegame);
        assert_eq!(det.observe(OPENING), GamePhase::Middlegame);
        assert_eq!(det.observe(OPENING), GamePhase::Opening);
    }

    #[test]
    fn test_matching_observations_decay_cooldown() {
        let mut det = PhaseDetector::new();
        for _ in 0..3 {
            det.observe(END);
        }
        for _ in 0..4 {
            det.observe(END);
        }
        assert_eq!(det.observe(MIDDLE), GamePhase::Endgame);
        assert_eq!(det.observe(MIDDLE), GamePhase::Endgame);
        assert_eq!(det.observe(MIDDLE), GamePhase::Middlegame);
    }

    #[test]
    fn test_startpos_is_opening_material() {
        assert!(board_material(&Position::startpos()) > MIDDLEGAME_MATERIAL);
    }
}
