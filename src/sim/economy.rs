//! Economy, military and stability updates
//!
//! A country's turn is split in two: `begin_country_turn` applies policy and
//! draws drift/shocks before diplomacy runs, and `finalize_growth` applies the
//! accumulated growth once the relation step and hostility feedback are done.

use std::collections::BTreeMap;

use crate::core::rng::country_turn_rng;
use crate::core::types::{CountryCode, EdgeKey, Turn};
use crate::sim::events::{Event, EventKind};
use crate::sim::relations::{Posture, PostureMap};
use crate::sim::state::CountryState;
use crate::world::Scenario;

pub const MILITARY_PCT_MIN: f64 = 0.2;
pub const MILITARY_PCT_MAX: f64 = 12.0;

pub const BASE_GROWTH: f64 = 0.01;
/// Drift is uniform in +/- half of this
pub const DRIFT_SPAN: f64 = 0.012;
pub const SHOCK_CHANCE: f64 = 0.012;
pub const SHOCK_GROWTH: f64 = -0.018;
pub const BOOM_GROWTH: f64 = 0.02;
/// Military % added per unit of hostile-border fraction
pub const HOSTILITY_MILITARY_GAIN: f64 = 0.08;

/// Derived power score; negative inputs count as zero
pub fn compute_power(gdp: f64, military_pct: f64, population: f64) -> f64 {
    let gdp = gdp.max(0.0);
    let spend = military_spend(gdp, military_pct).max(0.0);
    spend.sqrt() * 0.6 + gdp.sqrt() * 0.3 + population.max(0.0).sqrt() * 0.1
}

pub fn military_spend(gdp: f64, military_pct: f64) -> f64 {
    gdp * (military_pct / 100.0)
}

pub fn clamp_military_pct(value: f64) -> f64 {
    value.clamp(MILITARY_PCT_MIN, MILITARY_PCT_MAX)
}

/// Growth components carried from the start of a country's turn to finalization
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PendingGrowth {
    pub drift: f64,
    pub policy_growth: f64,
}

/// Result of the random draw for one country and turn
#[derive(Clone, Debug, PartialEq)]
pub struct DriftDraw {
    pub drift: f64,
    pub growth_mod: f64,
    pub mod_turns: u32,
    pub shock: Option<EventKind>,
}

/// Draw drift and a possible shock from the country's turn stream
///
/// Draw order is fixed: drift, shock roll, then sign and duration only when
/// the shock fires.
pub fn draw_drift(seed: u64, turn: Turn, code: CountryCode, growth_mod: f64, mod_turns: u32) -> DriftDraw {
    let mut rng = country_turn_rng(seed, turn, code, "sim");
    let drift = (rng.next_f64() - 0.5) * DRIFT_SPAN;
    let roll = rng.next_f64();

    let mut draw = DriftDraw {
        drift,
        growth_mod: if mod_turns > 0 { growth_mod } else { 0.0 },
        mod_turns: mod_turns.saturating_sub(1),
        shock: None,
    };

    if roll < SHOCK_CHANCE {
        let negative = rng.next_f64() < 0.5;
        draw.growth_mod = if negative { SHOCK_GROWTH } else { BOOM_GROWTH };
        draw.mod_turns = 3 + (rng.next_f64() * 4.0).floor() as u32;
        draw.shock = Some(if negative {
            EventKind::EconomicShock
        } else {
            EventKind::InvestmentBoom
        });
    }

    draw
}

/// Apply policy deltas and the drift draw to one country
pub fn begin_country_turn(
    seed: u64,
    turn: Turn,
    code: CountryCode,
    prev: &CountryState,
    population: f64,
) -> (CountryState, PendingGrowth, Option<Event>) {
    let mut next = prev.clone();
    next.policy = prev.policy.clamped();
    let deltas = next.policy.deltas(prev.military_pct);

    next.military_pct = clamp_military_pct(prev.military_pct + deltas.military_delta);
    next.stability = (prev.stability + deltas.stability_delta).clamp(0.0, 1.0);
    next.recompute_derived(population);

    let draw = draw_drift(seed, turn, code, prev.growth_mod, prev.mod_turns);
    next.growth_mod = draw.growth_mod;
    next.mod_turns = draw.mod_turns;

    let event = draw.shock.map(|kind| Event::new(turn, code, None, kind));
    let pending = PendingGrowth {
        drift: draw.drift,
        policy_growth: deltas.growth_mod,
    };
    (next, pending, event)
}

/// Fraction of a country's borders classified hostile; `None` without borders
pub fn hostility_rate(scenario: &Scenario, postures: &PostureMap, code: CountryCode) -> Option<f64> {
    let neighbours = scenario.neighbours(code);
    let postures: Vec<Posture> = neighbours
        .iter()
        .filter_map(|&other| EdgeKey::new(code, other))
        .filter_map(|key| postures.get(&key).copied())
        .collect();
    if postures.is_empty() {
        return None;
    }
    let hostile = postures.iter().filter(|p| **p == Posture::Hostile).count();
    Some(hostile as f64 / postures.len() as f64)
}

/// Push military spending up on hostile borders
pub fn apply_hostility_feedback(
    countries: &mut BTreeMap<CountryCode, CountryState>,
    scenario: &Scenario,
    postures: &PostureMap,
) {
    for (&code, country) in countries.iter_mut() {
        let Some(rate) = hostility_rate(scenario, postures, code) else {
            continue;
        };
        country.military_pct = clamp_military_pct(country.military_pct + rate * HOSTILITY_MILITARY_GAIN);
        country.recompute_derived(scenario.population(code));
    }
}

/// Apply this turn's total growth to GDP
pub fn finalize_growth(country: &mut CountryState, pending: PendingGrowth, ledger_growth: f64, population: f64) {
    let growth = BASE_GROWTH + pending.drift + country.growth_mod + pending.policy_growth + ledger_growth;
    country.growth_rate = growth;
    let gdp = (country.gdp * (1.0 + growth)).max(1.0);
    country.gdp = if gdp.is_finite() { gdp } else { country.gdp.max(1.0) };
    country.recompute_derived(population);
}
