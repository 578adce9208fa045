//! Simulation configuration with documented constants
//!
//! Formula coefficients that define the model live next to the stage that uses
//! them. The values collected here are the tunables a scenario may override
//! from a TOML file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Longest duration, in turns, a ledger entry may be configured to last
pub const MAX_EFFECT_TURNS: u32 = 1000;

/// Top-level tunables for a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Influence accrual and cap
    pub influence: InfluenceConfig,

    /// Relation-effects ledger durations and growth magnitudes
    pub effects: EffectsConfig,

    /// Maximum number of events retained in the log (most recent kept)
    pub event_log_cap: usize,
}

/// Per-turn influence income
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceConfig {
    /// Influence points every country earns each turn
    pub base_gain: i32,

    /// Extra points per turn when stability is at or above `stability_threshold`
    pub stability_gain: i32,

    /// Extra points per turn for countries in the top GDP percentile
    pub top_gdp_gain: i32,

    /// Stability (0 to 1) needed for the stability bonus
    pub stability_threshold: f64,

    /// Fraction of countries (by GDP rank) counted as "top GDP"
    ///
    /// At 0.15 with 9 countries, ceil(1.35) = 2 countries get the bonus.
    pub top_gdp_percentile: f64,

    /// Points cap applied by turn accrual. Action debits clamp to [0, 100] separately.
    pub max_influence: i32,
}

/// Side effects left behind by guarantees, sanctions and trade deals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Turns until a guarantee expires, counted from the turn it is given
    pub guarantee_turns: u32,

    /// Turns until a sanction expires, counted from the turn it is imposed
    pub sanction_turns: u32,

    /// Per-turn growth delta (fraction of GDP) for the sanctioning country while active
    pub sanction_penalty_actor: f64,

    /// Per-turn growth delta (fraction of GDP) for the sanctioned country while active
    pub sanction_penalty_target: f64,

    /// Turns until a trade deal's growth buff expires
    pub trade_buff_turns: u32,

    /// Per-turn growth delta (fraction of GDP) for both endpoints while a trade buff is active
    pub trade_bonus: f64,

    /// Highest trade level an edge can accumulate; each deal adds one
    pub trade_max_level: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            influence: InfluenceConfig::default(),
            effects: EffectsConfig::default(),
            event_log_cap: 80,
        }
    }
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            base_gain: 1,
            stability_gain: 1,
            top_gdp_gain: 1,
            stability_threshold: 0.7,
            top_gdp_percentile: 0.15,
            max_influence: 50,
        }
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            guarantee_turns: 6,
            sanction_turns: 4,
            sanction_penalty_actor: -0.001,
            sanction_penalty_target: -0.003,
            trade_buff_turns: 4,
            trade_bonus: 0.002,
            trade_max_level: 3,
        }
    }
}

impl SimConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let influence = &self.influence;
        if influence.max_influence < 0 || influence.max_influence > 100 {
            return Err(SimError::InvalidConfig(format!(
                "max_influence ({}) must be within 0..=100",
                influence.max_influence
            )));
        }

        if influence.base_gain < 0 || influence.stability_gain < 0 || influence.top_gdp_gain < 0 {
            return Err(SimError::InvalidConfig("influence gains must be non-negative".into()));
        }

        if !(0.0..=1.0).contains(&influence.top_gdp_percentile) {
            return Err(SimError::InvalidConfig(format!(
                "top_gdp_percentile ({}) must be within 0..=1",
                influence.top_gdp_percentile
            )));
        }

        if !(0.0..=1.0).contains(&influence.stability_threshold) {
            return Err(SimError::InvalidConfig(format!(
                "stability_threshold ({}) must be within 0..=1",
                influence.stability_threshold
            )));
        }

        let effects = &self.effects;
        let magnitudes = [
            effects.sanction_penalty_actor,
            effects.sanction_penalty_target,
            effects.trade_bonus,
        ];
        if magnitudes.iter().any(|m| !m.is_finite() || m.abs() > 0.05) {
            return Err(SimError::InvalidConfig(
                "ledger growth magnitudes must be finite and within ±0.05".into(),
            ));
        }

        let durations = [
            ("guarantee_turns", effects.guarantee_turns),
            ("sanction_turns", effects.sanction_turns),
            ("trade_buff_turns", effects.trade_buff_turns),
        ];
        for (name, turns) in durations {
            if turns > MAX_EFFECT_TURNS {
                return Err(SimError::InvalidConfig(format!(
                    "{name} ({turns}) must be at most {MAX_EFFECT_TURNS} turns"
                )));
            }
        }

        if self.event_log_cap == 0 {
            return Err(SimError::InvalidConfig("event_log_cap must be positive".into()));
        }

        Ok(())
    }
}
