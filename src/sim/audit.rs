//! Invariant checks and the regression checksum

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashMap;
use thiserror::Error;

use crate::core::types::{round_half_up, CountryCode, EdgeKey, Turn};
use crate::sim::diplomacy::ActionKind;
use crate::sim::economy::{MILITARY_PCT_MAX, MILITARY_PCT_MIN};
use crate::sim::relations::Posture;
use crate::sim::state::SimState;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("country set differs from the scenario ({0} states)")]
    CountrySetMismatch(usize),

    #[error("non-finite {field} for {code}")]
    NonFinite { code: CountryCode, field: &'static str },

    #[error("negative GDP for {0}")]
    NegativeGdp(CountryCode),

    #[error("military % out of bounds for {code}: {value}")]
    MilitaryOutOfBounds { code: CountryCode, value: f64 },

    #[error("stability out of bounds for {code}: {value}")]
    StabilityOutOfBounds { code: CountryCode, value: f64 },

    #[error("influence out of bounds for {code}: {value}")]
    InfluenceOutOfBounds { code: CountryCode, value: i32 },

    #[error("zero cooldown stored for {code}:{action}")]
    StaleCooldown { code: CountryCode, action: ActionKind },

    #[error("missing edge {0}")]
    MissingEdge(EdgeKey),

    #[error("edge {0} is not a border")]
    UnknownEdge(EdgeKey),

    #[error("edge {0} out of bounds")]
    EdgeOutOfBounds(EdgeKey),

    #[error("posture for {0} does not match its edge")]
    PostureMismatch(EdgeKey),

    #[error("ledger entry on non-border edge {0}")]
    LedgerOffBorder(EdgeKey),

    #[error("more than one action for {code} on turn {turn}")]
    MultipleActions { code: CountryCode, turn: Turn },

    #[error("event log holds {len} events, cap is {cap}")]
    EventLogOverflow { len: usize, cap: usize },
}

/// Verify every structural and numeric invariant of a state
pub fn check_invariants(state: &SimState) -> Result<(), InvariantViolation> {
    let scenario = state.scenario();
    let config = state.config();

    if state.countries.len() != scenario.countries().len()
        || !state.countries.keys().all(|code| scenario.contains(*code))
    {
        return Err(InvariantViolation::CountrySetMismatch(state.countries.len()));
    }

    for (&code, country) in &state.countries {
        for (field, value) in [
            ("gdp", country.gdp),
            ("militaryPct", country.military_pct),
            ("stability", country.stability),
            ("power", country.power),
            ("growthMod", country.growth_mod),
        ] {
            if !value.is_finite() {
                return Err(InvariantViolation::NonFinite { code, field });
            }
        }
        if country.gdp < 0.0 {
            return Err(InvariantViolation::NegativeGdp(code));
        }
        if !(MILITARY_PCT_MIN..=MILITARY_PCT_MAX).contains(&country.military_pct) {
            return Err(InvariantViolation::MilitaryOutOfBounds {
                code,
                value: country.military_pct,
            });
        }
        if !(0.0..=1.0).contains(&country.stability) {
            return Err(InvariantViolation::StabilityOutOfBounds {
                code,
                value: country.stability,
            });
        }
        if !(0..=config.influence.max_influence).contains(&country.influence) {
            return Err(InvariantViolation::InfluenceOutOfBounds {
                code,
                value: country.influence,
            });
        }
        if let Some((&action, _)) = country.cooldowns.iter().find(|(_, turns)| **turns == 0) {
            return Err(InvariantViolation::StaleCooldown { code, action });
        }
    }

    for key in scenario.edges() {
        let edge = state
            .relations
            .get_by_key(key)
            .ok_or(InvariantViolation::MissingEdge(*key))?;
        if !edge.in_bounds() {
            return Err(InvariantViolation::EdgeOutOfBounds(*key));
        }
        if state.postures.get(key) != Some(&edge.posture()) {
            return Err(InvariantViolation::PostureMismatch(*key));
        }
    }
    if let Some((key, _)) = state
        .relations
        .iter()
        .find(|(key, _)| !scenario.are_adjacent(key.low(), key.high()))
    {
        return Err(InvariantViolation::UnknownEdge(*key));
    }

    let ledger = &state.effects;
    let off_border = ledger
        .guarantees_by_edge
        .keys()
        .chain(ledger.sanctions_by_edge.keys())
        .chain(ledger.trade_by_edge.keys())
        .find(|key| !scenario.are_adjacent(key.low(), key.high()));
    if let Some(key) = off_border {
        return Err(InvariantViolation::LedgerOffBorder(*key));
    }

    if state.events.len() > config.event_log_cap {
        return Err(InvariantViolation::EventLogOverflow {
            len: state.events.len(),
            cap: config.event_log_cap,
        });
    }

    let mut per_actor_turn: AHashMap<(CountryCode, Turn), usize> = AHashMap::new();
    for event in state.events.iter().filter(|e| e.executed_action().is_some()) {
        let count = per_actor_turn.entry((event.actor, event.turn)).or_default();
        *count += 1;
        if *count > 1 {
            return Err(InvariantViolation::MultipleActions {
                code: event.actor,
                turn: event.turn,
            });
        }
    }

    Ok(())
}

/// Aggregate fingerprint of a state, printed as a colon-joined line
#[derive(Clone, Debug, PartialEq)]
pub struct Checksum {
    pub turn: Turn,
    pub sum_gdp: f64,
    pub sum_military_pct: f64,
    pub event_count: usize,
    pub sum_influence: i64,
    pub sum_rel: i64,
    pub sum_tension: i64,
    pub sum_trust: i64,
    pub hostile_edges: usize,
    pub active_guarantees: usize,
    pub active_sanctions: usize,
    pub active_trade_pacts: usize,
    /// Executed actions still in the event log, by type
    pub action_counts: BTreeMap<ActionKind, usize>,
}

impl Checksum {
    pub fn compute(state: &SimState) -> Self {
        let mut sum_gdp = 0.0;
        let mut sum_military_pct = 0.0;
        let mut sum_influence = 0i64;
        for country in state.countries.values() {
            sum_gdp += country.gdp;
            sum_military_pct += country.military_pct;
            sum_influence += i64::from(country.influence);
        }

        let (mut sum_rel, mut sum_tension, mut sum_trust, mut hostile_edges) = (0i64, 0i64, 0i64, 0usize);
        for (_, edge) in state.relations.iter() {
            sum_rel += i64::from(edge.rel);
            sum_tension += i64::from(edge.tension);
            sum_trust += i64::from(edge.trust);
            if edge.posture() == Posture::Hostile {
                hostile_edges += 1;
            }
        }

        let mut action_counts = BTreeMap::new();
        for action in state.events.iter().filter_map(|e| e.executed_action()) {
            *action_counts.entry(action).or_insert(0) += 1;
        }

        Self {
            turn: state.turn,
            sum_gdp,
            sum_military_pct,
            event_count: state.events.len(),
            sum_influence,
            sum_rel,
            sum_tension,
            sum_trust,
            hostile_edges,
            active_guarantees: state.effects.active_guarantees(state.turn),
            active_sanctions: state.effects.active_sanctions(state.turn),
            active_trade_pacts: state.effects.active_trade_pacts(state.turn),
            action_counts,
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:.0}:{:.4}:{}:{:.4}:{}:{}:{}:{}:{}:{}:{}:",
            self.turn,
            round_half_up(self.sum_gdp),
            self.sum_military_pct,
            self.event_count,
            self.sum_influence as f64,
            self.sum_rel,
            self.sum_tension,
            self.sum_trust,
            self.hostile_edges,
            self.active_guarantees,
            self.active_sanctions,
            self.active_trade_pacts,
        )?;
        let summary: Vec<String> = self
            .action_counts
            .iter()
            .map(|(action, count)| format!("{action}:{count}"))
            .collect();
        f.write_str(&summary.join(","))
    }
}
