//! Style weights and the per-position style blend.
//!
//! Three named leanings are mixed in percent: Tal (attacking), Petrosian
//! (defensive) and Capablanca (balanced). A blend reads the game phase,
//! positional indicators and tactical tension of a position and nudges a
//! provider's raw mix toward them, then normalizes it back to 100.

pub mod blend;
pub mod cache;
pub mod indicators;
pub mod phase;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::eval::simple_eval;

pub use blend::{phase_strategy, tactical_complexity, BlendStats, WeightDedup};
pub use cache::{BlendCache, BlendCacheEntry};
pub use indicators::PositionalIndicators;
pub use phase::{GamePhase, PhaseDetector};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Style {
    Tal,
    Petrosian,
    Capablanca,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Tal => write!(f, "Tal"),
            Style::Petrosian => write!(f, "Petrosian"),
            Style::Capablanca => write!(f, "Capablanca"),
        }
    }
}

/// A Tal / Petrosian / Capablanca mix in percent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleWeights {
    pub tal: i32,
    pub petrosian: i32,
    pub capablanca: i32,
}

impl StyleWeights {
    #[must_use]
    pub const fn new(tal: i32, petrosian: i32, capablanca: i32) -> Self {
        StyleWeights {
            tal,
            petrosian,
            capablanca,
        }
    }

    #[must_use]
    pub const fn total(self) -> i32 {
        self.tal + self.petrosian + self.capablanca
    }

    /// Clamp each weight to `[0, 100]` and rescale so they sum to 100.
    ///
    /// Tal and Petrosian are rounded to nearest; Capablanca takes whatever
    /// is left, so all rounding error lands on it. When both round up past
    /// 100 together Capablanca is pinned at 0 and the total is 101. An
    /// all-zero mix is left as is.
    #[must_use]
    pub fn normalized(self) -> Self {
        let tal = self.tal.clamp(0, 100);
        let petrosian = self.petrosian.clamp(0, 100);
        let capablanca = self.capablanca.clamp(0, 100);
        let total = tal + petrosian + capablanca;
        if total <= 0 || total == 100 {
            return StyleWeights::new(tal, petrosian, capablanca);
        }
        let new_tal = (tal * 100 + total / 2) / total;
        let new_pet = (petrosian * 100 + total / 2) / total;
        let new_cap = (100 - new_tal - new_pet).clamp(0, 100);
        StyleWeights::new(new_tal, new_pet, new_cap)
    }
}

impl fmt::Display for StyleWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={} P={} C={}", self.tal, self.petrosian, self.capablanca)
    }
}

/// Source of the raw style mix a blend starts from.
pub trait StyleWeightProvider: Send + Sync {
    /// Overwrite `weights` with this provider's mix for `pos`
    fn provide(&self, pos: &Position, weights: &mut StyleWeights);
}

/// Always the same mix.
#[derive(Clone, Copy, Debug)]
pub struct FixedStyleProvider(pub StyleWeights);

impl StyleWeightProvider for FixedStyleProvider {
    fn provide(&self, _pos: &Position, weights: &mut StyleWeights) {
        *weights = self.0;
    }
}

/// Leans Tal when the side to move is ahead in material, Petrosian when
/// behind and Capablanca when the material is level.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialStyleProvider;

impl MaterialStyleProvider {
    /// Material lead treated as level
    pub const BALANCE_MARGIN: i32 = 100;
}

impl StyleWeightProvider for MaterialStyleProvider {
    fn provide(&self, pos: &Position, weights: &mut StyleWeights) {
        let lead = simple_eval(pos, pos.side_to_move());
        if lead.abs() <= Self::BALANCE_MARGIN {
            *weights = StyleWeights::new(25, 25, 50);
            return;
        }
        let shift = ((lead.abs() - Self::BALANCE_MARGIN).min(500)) / 25;
        let (lean, other) = (50 + shift, 20 - shift / 2);
        let capablanca = 100 - lean - other;
        *weights = if lead > 0 {
            StyleWeights::new(lean, other, capablanca)
        } else {
            StyleWeights::new(other, lean, capablanca)
        };
    }
}
