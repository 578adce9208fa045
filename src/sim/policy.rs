//! Per-country policy: targets and stance, always held in range
//!
//! A stored policy is re-clamped on every write and on every read from
//! untrusted input, so the per-turn formulas never see out-of-range values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{round_half_up, CountryCode};
use crate::sim::relations::RelationInputs;

pub const MIL_TARGET_MIN: f64 = 0.5;
pub const MIL_TARGET_MAX: f64 = 10.0 / 12.0;
pub const DEFAULT_MIL_TARGET: f64 = 0.6;

pub const FOCUS_MIN: u8 = 0;
pub const FOCUS_MAX: u8 = 100;
pub const DEFAULT_FOCUS: u8 = 50;

/// Largest military % change policy can cause in one turn
pub const MILITARY_MAX_DELTA: f64 = 0.2;
pub const GROWTH_MOD_LIMIT: f64 = 0.02;
pub const STABILITY_DELTA_LIMIT: f64 = 0.03;

/// Diplomatic stance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Hardline,
    #[default]
    #[serde(alias = "balanced")]
    Neutral,
    Conciliatory,
}

/// Additive per-turn effects of a stance
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StanceEffects {
    pub growth: f64,
    pub stability: f64,
    pub trust_delta: i32,
}

impl Stance {
    pub fn effects(self) -> StanceEffects {
        match self {
            Stance::Hardline => StanceEffects {
                growth: -0.0015,
                stability: -0.002,
                trust_delta: -1,
            },
            Stance::Neutral => StanceEffects::default(),
            Stance::Conciliatory => StanceEffects {
                growth: 0.0015,
                stability: 0.002,
                trust_delta: 1,
            },
        }
    }

    /// Contribution to every border edge of a country holding this stance
    pub fn relation_inputs(self) -> RelationInputs {
        RelationInputs {
            trust_delta: self.effects().trust_delta,
            ..RelationInputs::default()
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stance::Hardline => "hardline",
            Stance::Neutral => "neutral",
            Stance::Conciliatory => "conciliatory",
        })
    }
}

impl FromStr for Stance {
    type Err = PolicyRejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hardline" => Ok(Stance::Hardline),
            "neutral" | "balanced" => Ok(Stance::Neutral),
            "conciliatory" => Ok(Stance::Conciliatory),
            _ => Err(PolicyRejected::UnknownStance(s.to_string())),
        }
    }
}

/// Why a policy change was refused
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PolicyRejected {
    #[error("unknown-country: {0}")]
    UnknownCountry(CountryCode),

    #[error("unknown-policy-field: {0}")]
    UnknownField(String),

    #[error("invalid-policy-value: {0}")]
    InvalidValue(String),

    #[error("unknown-stance: {0}")]
    UnknownStance(String),
}

/// A country's policy settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Military spending target, % of GDP
    pub mil_target_pct: f64,
    /// 0-100
    pub growth_focus: u8,
    /// 0-100
    pub stability_focus: u8,
    pub stance: Stance,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            mil_target_pct: DEFAULT_MIL_TARGET,
            growth_focus: DEFAULT_FOCUS,
            stability_focus: DEFAULT_FOCUS,
            stance: Stance::Neutral,
        }
    }
}

/// Bounded per-turn deltas derived from a policy
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolicyDeltas {
    pub military_delta: f64,
    pub growth_mod: f64,
    pub stability_delta: f64,
}

impl Policy {
    /// Starting policy for a country with the given baseline military share
    pub fn for_baseline(military_pct: f64) -> Self {
        Self {
            mil_target_pct: military_pct,
            ..Self::default()
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        let mil_target_pct = if self.mil_target_pct.is_finite() {
            self.mil_target_pct.clamp(MIL_TARGET_MIN, MIL_TARGET_MAX)
        } else {
            DEFAULT_MIL_TARGET
        };
        Self {
            mil_target_pct,
            growth_focus: self.growth_focus.min(FOCUS_MAX),
            stability_focus: self.stability_focus.min(FOCUS_MAX),
            stance: self.stance,
        }
    }

    /// Deltas for a country currently at `military_pct`
    pub fn deltas(&self, military_pct: f64) -> PolicyDeltas {
        let g = f64::from(self.growth_focus) / 100.0;
        let s = f64::from(self.stability_focus) / 100.0;
        let stance = self.stance.effects();

        PolicyDeltas {
            military_delta: (self.mil_target_pct - military_pct).clamp(-MILITARY_MAX_DELTA, MILITARY_MAX_DELTA),
            growth_mod: ((g - 0.5) * 0.01 + (0.5 - s) * 0.004 + stance.growth)
                .clamp(-GROWTH_MOD_LIMIT, GROWTH_MOD_LIMIT),
            stability_delta: ((s - 0.5) * 0.03 - (g - 0.5) * 0.012 + stance.stability)
                .clamp(-STABILITY_DELTA_LIMIT, STABILITY_DELTA_LIMIT),
        }
    }

    /// Apply an update and re-clamp
    pub fn with_update(self, update: PolicyUpdate) -> Self {
        let mut next = self;
        match update {
            PolicyUpdate::MilTargetPct(value) => next.mil_target_pct = value,
            PolicyUpdate::GrowthFocus(value) => next.growth_focus = focus_from_f64(value, self.growth_focus),
            PolicyUpdate::StabilityFocus(value) => {
                next.stability_focus = focus_from_f64(value, self.stability_focus)
            }
            PolicyUpdate::Stance(stance) => next.stance = stance,
        }
        if !next.mil_target_pct.is_finite() {
            next.mil_target_pct = self.mil_target_pct;
        }
        next.clamped()
    }
}

/// Round and clamp a focus value; non-finite input keeps `fallback`
pub fn focus_from_f64(value: f64, fallback: u8) -> u8 {
    if !value.is_finite() {
        return fallback;
    }
    round_half_up(value).clamp(f64::from(FOCUS_MIN), f64::from(FOCUS_MAX)) as u8
}

/// A single policy field change
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PolicyUpdate {
    MilTargetPct(f64),
    GrowthFocus(f64),
    StabilityFocus(f64),
    Stance(Stance),
}

impl PolicyUpdate {
    /// Build an update from a field name and a raw value
    pub fn parse_field(field: &str, value: &str) -> Result<Self, PolicyRejected> {
        let number = || {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PolicyRejected::InvalidValue(value.to_string()))
        };

        match field.trim() {
            "milTargetPct" | "mil_target_pct" => Ok(Self::MilTargetPct(number()?)),
            "growthFocus" | "growth_focus" => Ok(Self::GrowthFocus(number()?)),
            "stabilityFocus" | "stability_focus" => Ok(Self::StabilityFocus(number()?)),
            "stance" => Ok(Self::Stance(value.parse()?)),
            other => Err(PolicyRejected::UnknownField(other.to_string())),
        }
    }
}

impl FromStr for PolicyUpdate {
    type Err = PolicyRejected;

    /// Parses `field=value`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| PolicyRejected::InvalidValue(s.to_string()))?;
        Self::parse_field(field, value)
    }
}
