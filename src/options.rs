//! Evaluation configuration and its text-protocol option names.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::eval::{clamp_weight, StrategyWeights};
use crate::nnue::NetSize;

/// What the caller has to do after an option changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionAction {
    /// Load the named network for this size
    ReloadNetwork(NetSize, String),
    /// Publish new manual strategy weights to the shared store
    PublishManualWeights(StrategyWeights),
    /// Rebuild worker contexts with a different logger
    ReselectLogger(bool),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvalOptions {
    /// Master switch of the style blend
    pub style_enabled: bool,
    /// Use the manual strategy weights and skip the blend
    pub manual_weights: bool,
    /// Take the phase from the detector instead of assuming middlegame
    pub dynamic_weights: bool,
    pub manual_material_weight: i32,
    pub manual_positional_weight: i32,
    pub eval_file: String,
    pub eval_file_small: String,
    /// Emit a log line per computed blend
    pub debug_blend: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            style_enabled: true,
            manual_weights: false,
            dynamic_weights: true,
            manual_material_weight: 15,
            manual_positional_weight: 15,
            eval_file: NetSize::Big.default_name().to_string(),
            eval_file_small: NetSize::Small.default_name().to_string(),
            debug_blend: false,
        }
    }
}

fn parse_check(value: Option<&str>) -> Option<bool> {
    value.map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
}

impl EvalOptions {
    #[must_use]
    pub fn manual_strategy(&self) -> StrategyWeights {
        StrategyWeights::new(self.manual_material_weight, self.manual_positional_weight)
    }

    #[must_use]
    pub fn eval_file_for(&self, size: NetSize) -> &str {
        match size {
            NetSize::Big => &self.eval_file,
            NetSize::Small => &self.eval_file_small,
        }
    }

    /// Option declarations in text-protocol form.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("option name Style Blend type check default {}", self.style_enabled),
            format!(
                "option name NNUE ManualWeights type check default {}",
                self.manual_weights
            ),
            format!(
                "option name NNUE Dynamic Weights type check default {}",
                self.dynamic_weights
            ),
            format!(
                "option name NNUE StrategyMaterialWeight type spin default {} min 5 max 30",
                self.manual_material_weight
            ),
            format!(
                "option name NNUE StrategyPositionalWeight type spin default {} min 5 max 30",
                self.manual_positional_weight
            ),
            format!("option name EvalFile type string default {}", self.eval_file),
            format!(
                "option name EvalFileSmall type string default {}",
                self.eval_file_small
            ),
            format!("option name Debug Blend type check default {}", self.debug_blend),
        ]
    }

    /// Apply one `setoption`. Unknown names and unparsable values are
    /// ignored.
    pub fn apply_setoption(&mut self, name: &str, value: Option<&str>) -> Option<OptionAction> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "style blend" => {
                if let Some(v) = parse_check(value) {
                    self.style_enabled = v;
                }
            }
            "nnue manualweights" => {
                if let Some(v) = parse_check(value) {
                    self.manual_weights = v;
                    if v {
                        return Some(OptionAction::PublishManualWeights(self.manual_strategy()));
                    }
                }
            }
            "nnue dynamic weights" => {
                if let Some(v) = parse_check(value) {
                    self.dynamic_weights = v;
                }
            }
            "nnue strategymaterialweight" => {
                if let Some(v) = value.and_then(|v| v.trim().parse::<i32>().ok()) {
                    self.manual_material_weight = clamp_weight(v);
                    if self.manual_weights {
                        return Some(OptionAction::PublishManualWeights(self.manual_strategy()));
                    }
                }
            }
            "nnue strategypositionalweight" => {
                if let Some(v) = value.and_then(|v| v.trim().parse::<i32>().ok()) {
                    self.manual_positional_weight = clamp_weight(v);
                    if self.manual_weights {
                        return Some(OptionAction::PublishManualWeights(self.manual_strategy()));
                    }
                }
            }
            "evalfile" => {
                if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
                    self.eval_file = v.to_string();
                    return Some(OptionAction::ReloadNetwork(NetSize::Big, v.to_string()));
                }
            }
            "evalfilesmall" => {
                if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
                    self.eval_file_small = v.to_string();
                    return Some(OptionAction::ReloadNetwork(NetSize::Small, v.to_string()));
                }
            }
            "debug blend" => {
                if let Some(v) = parse_check(value) {
                    if v != self.debug_blend {
                        self.debug_blend = v;
                        return Some(OptionAction::ReselectLogger(v));
                    }
                }
            }
            _ => {}
        }
        None
    }
}

/// Split `setoption name <name...> [value <value...>]` into name and value.
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    if parts.first() != Some(&"setoption") {
        return None;
    }

    let mut name_parts: Vec<&str> = Vec::new();
    let mut value_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for part in parts.iter().skip(1) {
        match *part {
            "name" => mode = "name",
            "value" => mode = "value",
            _ => match mode {
                "name" => name_parts.push(part),
                "value" => value_parts.push(part),
                _ => {}
            },
        }
    }

    if name_parts.is_empty() {
        return None;
    }

    let name = name_parts.join(" ");
    let value = if value_parts.is_empty() {
        None
    } else {
        Some(value_parts.join(" "))
    };

    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_setoption_line() {
        let parts: Vec<&str> = "setoption name NNUE Dynamic Weights value false"
            .split_whitespace()
            .collect();
        assert_eq!(
            parse_setoption(&parts),
            Some(("NNUE Dynamic Weights".to_string(), Some("false".to_string())))
        );
        assert_eq!(parse_setoption(&["go"]), None);
        assert_eq!(parse_setoption(&["setoption", "value", "1"]), None);
    }

    #[test]
    fn test_toggles_are_case_insensitive() {
        let mut opts = EvalOptions::default();
        assert_eq!(opts.apply_setoption("style BLEND", Some("false")), None);
        assert!(!opts.style_enabled);
        opts.apply_setoption("NNUE Dynamic Weights", Some("0"));
        assert!(!opts.dynamic_weights);
    }

    #[test]
    fn test_manual_weights_publish_clamped_values() {
        let mut opts = EvalOptions::default();
        assert_eq!(
            opts.apply_setoption("NNUE StrategyMaterialWeight", Some("99")),
            None
        );
        assert_eq!(opts.manual_material_weight, 30);
        assert_eq!(
            opts.apply_setoption("NNUE ManualWeights", Some("true")),
            Some(OptionAction::PublishManualWeights(StrategyWeights::new(30, 15)))
        );
        assert_eq!(
            opts.apply_setoption("NNUE StrategyPositionalWeight", Some("-3")),
            Some(OptionAction::PublishManualWeights(StrategyWeights::new(30, 5)))
        );
    }

    #[test]
    fn test_eval_file_requests_reload() {
        let mut opts = EvalOptions::default();
        assert_eq!(
            opts.apply_setoption("EvalFileSmall", Some("tiny.nnue")),
            Some(OptionAction::ReloadNetwork(NetSize::Small, "tiny.nnue".to_string()))
        );
        assert_eq!(opts.eval_file_for(NetSize::Small), "tiny.nnue");
        assert_eq!(opts.apply_setoption("EvalFile", Some("  ")), None);
        assert_eq!(opts.eval_file_for(NetSize::Big), NetSize::Big.default_name());
    }

    #[test]
    fn test_describe_lists_every_option() {
        assert_eq!(EvalOptions::default().describe().len(), 8);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_roundtrip_json() {
        let mut opts = EvalOptions::default();
        opts.manual_weights = true;
        let json = serde_json::to_string(&opts).unwrap();
        let back: EvalOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }
}
