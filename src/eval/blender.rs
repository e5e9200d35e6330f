//! Combining the PSQT and positional terms into one score.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::nnue::{Value, OUTPUT_SCALE};
use crate::style::Style;

/// Bias toward the positional term applied by every adjusted evaluation
pub const ADJUST_DELTA: i32 = 24;

pub const MIN_STRATEGY_WEIGHT: i32 = 5;
pub const MAX_STRATEGY_WEIGHT: i32 = 30;

/// Extra material and positional weight for adjusted evaluations.
///
/// Both fields stay within `[MIN_STRATEGY_WEIGHT, MAX_STRATEGY_WEIGHT]`
/// once written through any of the constructors below; the zero default
/// is the untouched starting state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrategyWeights {
    pub material: i32,
    pub positional: i32,
}

impl StrategyWeights {
    /// Clamped constructor
    #[must_use]
    pub fn new(material: i32, positional: i32) -> Self {
        StrategyWeights {
            material: clamp_weight(material),
            positional: clamp_weight(positional),
        }
    }

    /// Weights implied by a Tal / Petrosian / Capablanca mix given in
    /// percent.
    #[must_use]
    pub fn from_style_mix(tal: i32, petrosian: i32, capablanca: i32) -> Self {
        let material = (25 * tal + 10 * capablanca) / 100;
        let positional = (5 * tal + 15 * capablanca + 25 * petrosian) / 100;
        StrategyWeights::new(material, positional)
    }

    /// Shift toward one style: Tal favours material, Petrosian favours
    /// position and Capablanca resets to an even split.
    #[must_use]
    pub fn adjusted_for(self, style: Style) -> Self {
        match style {
            Style::Tal => StrategyWeights::new(self.material + 5, self.positional - 5),
            Style::Petrosian => StrategyWeights::new(self.material - 5, self.positional + 5),
            Style::Capablanca => StrategyWeights::new(15, 15),
        }
    }
}

#[inline]
#[must_use]
pub fn clamp_weight(w: i32) -> i32 {
    w.clamp(MIN_STRATEGY_WEIGHT, MAX_STRATEGY_WEIGHT)
}

/// Blend network terms into a score in internal units.
///
/// Unadjusted is a plain sum. Adjusted weights the material term by
/// `1024 - delta + material` and the positional term by
/// `1024 + delta + positional`.
#[inline]
#[must_use]
pub fn combine(
    psqt: Value,
    positional: Value,
    delta: i32,
    adjusted: bool,
    weights: StrategyWeights,
) -> Value {
    if adjusted {
        let material_weight = i64::from(1024 - delta + weights.material);
        let positional_weight = i64::from(1024 + delta + weights.positional);
        let scaled = material_weight * i64::from(psqt) + positional_weight * i64::from(positional);
        (scaled / i64::from(1024 * OUTPUT_SCALE)) as Value
    } else {
        psqt.wrapping_add(positional) / OUTPUT_SCALE
    }
}
