//! Snapshot export and tolerant rehydration
//!
//! `Snapshot` is the trusted export format. Incoming snapshots are treated as
//! untrusted `serde_json::Value`s: every field is read on its own, clamped,
//! defaulted or dropped, and derived data (power, spend, postures) is
//! recomputed. Rehydration never fails and never panics.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::Result;
use crate::core::types::{round_half_up, CountryCode, EdgeKey, Turn};
use crate::sim::diplomacy::{ActionKind, ActionRequest};
use crate::sim::economy::clamp_military_pct;
use crate::sim::effects::{Guarantee, RelationEffects, Sanction, TradePact};
use crate::sim::events::{Event, EventLog};
use crate::sim::policy::{focus_from_f64, Policy, Stance};
use crate::sim::relations::{PostureMap, RelationEdge, RelationModifier};
use crate::sim::state::{CountryState, SimState, DEFAULT_STABILITY};
use crate::world::Scenario;

/// Influence assumed for a country whose snapshot entry lacks it
pub const REHYDRATE_DEFAULT_INFLUENCE: i32 = 5;

/// Restored turns are capped well below `Turn::MAX` so expiries never overflow
pub const MAX_RESTORED_TURN: Turn = Turn::MAX / 2;

/// Bound on a restored temporary growth modifier
const GROWTH_MOD_BOUND: f64 = 0.1;

/// Exported edge: `(a, b, rel, tension, trust, modifiers)`
pub type EdgeRow = (CountryCode, CountryCode, i32, i32, i32, Vec<RelationModifier>);

/// Serializable picture of a `SimState`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub seed: u64,
    pub turn: Turn,
    pub countries: BTreeMap<CountryCode, CountryState>,
    pub relation_edges: Vec<EdgeRow>,
    pub relation_effects: RelationEffects,
    pub events: EventLog,
    pub postures: PostureMap,
    pub queued_action: Option<ActionRequest>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl SimState {
    pub fn snapshot(&self) -> Snapshot {
        let relation_edges = self
            .relations
            .iter()
            .map(|(key, edge)| {
                (
                    key.low(),
                    key.high(),
                    edge.rel,
                    edge.tension,
                    edge.trust,
                    edge.modifiers.clone(),
                )
            })
            .collect();

        Snapshot {
            seed: self.seed,
            turn: self.turn,
            countries: self.countries.clone(),
            relation_edges,
            relation_effects: self.effects.clone(),
            events: self.events.clone(),
            postures: self.postures.clone(),
            queued_action: self.queued_action,
        }
    }
}

/// Parse snapshot text and rehydrate it; fails only on invalid JSON syntax
pub fn rehydrate_str(scenario: Arc<Scenario>, json: &str) -> Result<SimState> {
    let value: Value = serde_json::from_str(json)?;
    Ok(rehydrate(scenario, &value))
}

/// Build a valid state from a snapshot of unknown shape
pub fn rehydrate(scenario: Arc<Scenario>, value: &Value) -> SimState {
    let seed = read_seed(value.get("seed"));
    let turn = value
        .get("turn")
        .and_then(read_count)
        .unwrap_or(0)
        .min(MAX_RESTORED_TURN);
    let mut state = SimState::from_parts(scenario.clone(), seed, turn);

    let dynamic = value
        .get("countries")
        .or_else(|| value.get("dynamic"))
        .and_then(Value::as_object);
    let empty = Map::new();
    let dynamic = dynamic.unwrap_or(&empty);
    let max_influence = scenario.config().influence.max_influence;
    for facts in scenario.countries().values() {
        let entry = dynamic.get(facts.code.as_str()).and_then(Value::as_object).unwrap_or(&empty);
        let mut country = read_country(entry, CountryState::from_facts(facts), max_influence);
        country.recompute_derived(facts.population);
        state.countries.insert(facts.code, country);
    }
    let unknown = dynamic.keys().filter(|k| CountryCode::parse(k).map_or(true, |c| !scenario.contains(c))).count();
    if unknown > 0 {
        tracing::warn!(unknown, "dropped snapshot entries for unknown countries");
    }

    let rows = value
        .get("relationEdges")
        .or_else(|| value.get("relationsEdges"))
        .and_then(Value::as_array);
    for row in rows.into_iter().flatten() {
        if let Some((key, edge)) = read_edge_row(row, &scenario, turn) {
            state.relations.insert(key, edge);
        }
    }
    for key in scenario.edges() {
        if state.relations.get_by_key(key).is_none() {
            let edge = RelationEdge {
                last_turn_updated: turn,
                ..RelationEdge::default()
            };
            state.relations.insert(*key, edge);
        }
    }
    state.postures = state.relations.postures();

    state.effects = value
        .get("relationEffects")
        .and_then(Value::as_object)
        .map(|ledger| read_ledger(ledger, &scenario))
        .unwrap_or_default();
    state.effects.retain_countries(|code| scenario.contains(code));

    let cap = scenario.config().event_log_cap;
    let mut acted = AHashSet::new();
    let events: Vec<Event> = value
        .get("events")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|raw| serde_json::from_value::<Event>(raw.clone()).ok())
        .filter(|e| scenario.contains(e.actor) && e.secondary.map_or(true, |s| scenario.contains(s)))
        .filter(|e| e.turn <= turn)
        .filter(|e| e.executed_action().is_none() || acted.insert((e.actor, e.turn)))
        .collect();
    state.events.extend_capped(events, cap);

    state.queued_action = value
        .get("queuedAction")
        .and_then(|raw| serde_json::from_value::<ActionRequest>(raw.clone()).ok())
        .filter(|request| state.check_player_action(request).is_ok());

    state.reclamp_countries();
    state
}

// ============================================================================
// FIELD READERS
// ============================================================================

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Non-negative integer (rounded), saturating at `u32::MAX`
fn read_count(value: &Value) -> Option<u32> {
    let number = value.as_f64().filter(|v| v.is_finite())?;
    Some(round_half_up(number).clamp(0.0, f64::from(u32::MAX)) as u32)
}

fn read_int(value: Option<&Value>) -> Option<i32> {
    finite(value).map(|v| round_half_up(v).clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
}

fn read_code(value: Option<&Value>) -> Option<CountryCode> {
    value.and_then(Value::as_str).and_then(|s| CountryCode::parse(s).ok())
}

fn read_seed(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn read_country(entry: &Map<String, Value>, baseline: CountryState, max_influence: i32) -> CountryState {
    let mut country = baseline;

    if let Some(gdp) = finite(entry.get("gdp")).filter(|g| *g >= 0.0) {
        country.gdp = gdp;
    }
    if let Some(pct) = finite(entry.get("militaryPct")) {
        country.military_pct = clamp_military_pct(pct);
    }
    country.stability = finite(entry.get("stability")).map_or(DEFAULT_STABILITY, |s| s.clamp(0.0, 1.0));
    country.influence = read_int(entry.get("influence")).map_or(REHYDRATE_DEFAULT_INFLUENCE, |i| {
        i.clamp(0, max_influence.max(0))
    });
    country.growth_mod = finite(entry.get("growthMod")).map_or(0.0, |g| g.clamp(-GROWTH_MOD_BOUND, GROWTH_MOD_BOUND));
    country.mod_turns = entry.get("modTurns").and_then(read_count).unwrap_or(0);
    country.growth_rate = finite(entry.get("growthRate")).unwrap_or(0.0);

    if let Some(policy) = entry.get("policy").and_then(Value::as_object) {
        country.policy = read_policy(policy);
    }

    country.action_used_turn = entry
        .get("actionUsedTurn")
        .and_then(Value::as_u64)
        .and_then(|t| Turn::try_from(t).ok());

    country.cooldowns = entry
        .get("cooldowns")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter_map(|(name, turns)| {
            let kind = name.parse::<ActionKind>().ok()?;
            let turns = read_count(turns)?;
            (turns > 0).then_some((kind, turns))
        })
        .collect();

    country
}

fn read_policy(raw: &Map<String, Value>) -> Policy {
    let defaults = Policy::default();
    Policy {
        mil_target_pct: finite(raw.get("milTargetPct")).unwrap_or(defaults.mil_target_pct),
        growth_focus: finite(raw.get("growthFocus")).map_or(defaults.growth_focus, |v| {
            focus_from_f64(v, defaults.growth_focus)
        }),
        stability_focus: finite(raw.get("stabilityFocus")).map_or(defaults.stability_focus, |v| {
            focus_from_f64(v, defaults.stability_focus)
        }),
        stance: raw
            .get("stance")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Stance>().ok())
            .unwrap_or_default(),
    }
    .clamped()
}

fn read_modifier(raw: &Value) -> Option<RelationModifier> {
    let turns = raw.get("turns").and_then(read_count)?;
    if turns == 0 {
        return None;
    }
    Some(RelationModifier {
        rel: read_int(raw.get("rel")).unwrap_or(0),
        tension: read_int(raw.get("tension")).unwrap_or(0),
        trust: read_int(raw.get("trust")).unwrap_or(0),
        turns,
        text: raw.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
    })
}

fn read_edge_row(row: &Value, scenario: &Scenario, turn: Turn) -> Option<(EdgeKey, RelationEdge)> {
    let row = row.as_array()?;
    let a = read_code(row.first())?;
    let b = read_code(row.get(1))?;
    if !scenario.are_adjacent(a, b) {
        return None;
    }
    let key = EdgeKey::new(a, b)?;
    let defaults = RelationEdge::default();
    let modifiers = row
        .get(5)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(read_modifier)
        .collect();

    let edge = RelationEdge {
        rel: read_int(row.get(2)).unwrap_or(defaults.rel),
        tension: read_int(row.get(3)).unwrap_or(defaults.tension),
        trust: read_int(row.get(4)).unwrap_or(defaults.trust),
        last_turn_updated: turn,
        modifiers,
    };
    Some((key, edge))
}

/// Edge key that names a real border
fn read_edge_key(raw: &str, scenario: &Scenario) -> Option<EdgeKey> {
    EdgeKey::parse(raw)
        .ok()
        .filter(|key| scenario.are_adjacent(key.low(), key.high()))
}

/// Actor and target codes that both sit on `key`
fn read_parties(raw: &Value, key: &EdgeKey) -> Option<(CountryCode, CountryCode)> {
    let actor = read_code(raw.get("actor"))?;
    let target = read_code(raw.get("target"))?;
    (actor != target && key.contains(actor) && key.contains(target)).then_some((actor, target))
}

fn read_ledger(raw: &Map<String, Value>, scenario: &Scenario) -> RelationEffects {
    let config = &scenario.config().effects;
    let mut ledger = RelationEffects::new();
    let section = |name: &str| {
        raw.get(name)
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .filter_map(|(key, value)| read_edge_key(key, scenario).map(|key| (key, value)))
            .collect::<Vec<_>>()
    };

    for (key, list) in section("guaranteesByEdge") {
        let items: Vec<Guarantee> = list
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let (actor, target) = read_parties(item, &key)?;
                let expiry_turn = item.get("expiryTurn").and_then(read_count)?;
                Some(Guarantee {
                    actor,
                    target,
                    expiry_turn,
                })
            })
            .collect();
        if !items.is_empty() {
            ledger.guarantees_by_edge.insert(key, items);
        }
    }

    for (key, list) in section("sanctionsByEdge") {
        let items: Vec<Sanction> = list
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let (actor, target) = read_parties(item, &key)?;
                let expiry_turn = item.get("expiryTurn").and_then(read_count)?;
                Some(Sanction {
                    actor,
                    target,
                    expiry_turn,
                    growth_penalty_actor: finite(item.get("growthPenaltyActor"))
                        .unwrap_or(config.sanction_penalty_actor),
                    growth_penalty_target: finite(item.get("growthPenaltyTarget"))
                        .unwrap_or(config.sanction_penalty_target),
                })
            })
            .collect();
        if !items.is_empty() {
            ledger.sanctions_by_edge.insert(key, items);
        }
    }

    for (key, pact) in section("tradeByEdge") {
        let pact = TradePact {
            level: pact
                .get("level")
                .and_then(read_count)
                .map(|level| level.min(config.trade_max_level)),
            buff_expiry_turn: pact.get("buffExpiryTurn").and_then(read_count),
        };
        if !pact.is_empty() {
            ledger.trade_by_edge.insert(key, pact);
        }
    }

    ledger
}
