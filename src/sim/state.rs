//! Simulation state: the root aggregate and per-country dynamic state
//!
//! A `SimState` is a plain value. Stepping a turn borrows it immutably and
//! returns a new one, so older states stay valid for undo, snapshots or
//! concurrent readers. Static data is shared through `Arc<Scenario>`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::SimConfig;
use crate::core::types::{CountryCode, EdgeKey, Turn};
use crate::sim::diplomacy::{check_preconditions, ActionBoard, ActionKind, ActionRejected, ActionRequest};
use crate::sim::economy::{clamp_military_pct, compute_power, military_spend};
use crate::sim::effects::RelationEffects;
use crate::sim::events::EventLog;
use crate::sim::influence::{next_turn_gain_hint, InfluenceHint};
use crate::sim::policy::{Policy, PolicyRejected, PolicyUpdate};
use crate::sim::relations::{init_relations, Posture, PostureMap, RelationEdge, RelationGraph};
use crate::world::{CountryFacts, Scenario};

pub const INITIAL_INFLUENCE: i32 = 0;
pub const DEFAULT_STABILITY: f64 = 0.55;

/// Dynamic state of one country
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryState {
    pub gdp: f64,
    /// Military expenditure, % of GDP
    pub military_pct: f64,
    pub military_spend_abs: f64,
    pub power: f64,
    /// 0 to 1
    pub stability: f64,
    pub influence: i32,
    /// Temporary growth modifier from a shock or boom
    pub growth_mod: f64,
    pub mod_turns: u32,
    /// Growth applied last turn
    pub growth_rate: f64,
    pub policy: Policy,
    pub action_used_turn: Option<Turn>,
    /// Remaining turns per action type; zero entries are never stored
    pub cooldowns: BTreeMap<ActionKind, u32>,
}

impl CountryState {
    /// Turn-zero state seeded from static facts
    pub fn from_facts(facts: &CountryFacts) -> Self {
        let military_pct = clamp_military_pct(facts.military_pct_gdp);
        let mut state = Self {
            gdp: facts.gdp.max(0.0),
            military_pct,
            military_spend_abs: 0.0,
            power: 0.0,
            stability: DEFAULT_STABILITY,
            influence: INITIAL_INFLUENCE,
            growth_mod: 0.0,
            mod_turns: 0,
            growth_rate: 0.0,
            policy: Policy::for_baseline(military_pct),
            action_used_turn: None,
            cooldowns: BTreeMap::new(),
        };
        state.recompute_derived(facts.population);
        state
    }

    /// Refresh spend and power from GDP, military % and population
    pub fn recompute_derived(&mut self, population: f64) {
        self.military_spend_abs = military_spend(self.gdp, self.military_pct);
        self.power = compute_power(self.gdp, self.military_pct, population);
    }

    pub fn cooldown(&self, kind: ActionKind) -> u32 {
        self.cooldowns.get(&kind).copied().unwrap_or(0)
    }

    /// Count every cooldown down by one turn, dropping those that reach zero
    pub fn tick_cooldowns(&mut self) {
        self.cooldowns.retain(|_, turns| {
            *turns = turns.saturating_sub(1);
            *turns > 0
        });
    }
}

/// Turn-zero dynamic state for every country in the scenario
pub fn create_initial_sim_state(scenario: &Scenario) -> BTreeMap<CountryCode, CountryState> {
    scenario
        .countries()
        .values()
        .map(|facts| (facts.code, CountryState::from_facts(facts)))
        .collect()
}

/// Turn-zero relation graph over the scenario's borders
pub fn create_initial_relations(seed: u64, scenario: &Scenario) -> RelationGraph {
    init_relations(seed, scenario)
}

/// Empty relation-effects ledger
pub fn create_initial_relation_effects() -> RelationEffects {
    RelationEffects::new()
}

/// The whole simulation at one turn
#[derive(Clone, Debug)]
pub struct SimState {
    pub seed: u64,
    pub turn: Turn,
    pub countries: BTreeMap<CountryCode, CountryState>,
    pub relations: RelationGraph,
    pub events: EventLog,
    pub postures: PostureMap,
    pub effects: RelationEffects,
    /// Single player action slot, consumed by the next turn
    pub queued_action: Option<ActionRequest>,
    scenario: Arc<Scenario>,
}

impl SimState {
    /// Start a new game at turn 0
    pub fn new_game(scenario: Arc<Scenario>, seed: u64) -> Self {
        let countries = create_initial_sim_state(&scenario);
        let relations = create_initial_relations(seed, &scenario);
        let postures = relations.postures();
        tracing::info!(
            seed,
            countries = countries.len(),
            edges = relations.len(),
            "new game"
        );

        Self {
            seed,
            turn: 0,
            countries,
            relations,
            events: EventLog::new(),
            postures,
            effects: create_initial_relation_effects(),
            queued_action: None,
            scenario,
        }
    }

    /// Assemble a state from parts; used by rehydration
    pub(crate) fn from_parts(scenario: Arc<Scenario>, seed: u64, turn: Turn) -> Self {
        Self {
            seed,
            turn,
            countries: BTreeMap::new(),
            relations: RelationGraph::new(),
            events: EventLog::new(),
            postures: PostureMap::new(),
            effects: RelationEffects::new(),
            queued_action: None,
            scenario,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn scenario_arc(&self) -> &Arc<Scenario> {
        &self.scenario
    }

    pub fn config(&self) -> &SimConfig {
        self.scenario.config()
    }

    pub fn country(&self, code: CountryCode) -> Option<&CountryState> {
        self.countries.get(&code)
    }

    pub fn relation(&self, a: CountryCode, b: CountryCode) -> Option<&RelationEdge> {
        self.relations.get(a, b)
    }

    pub fn posture(&self, a: CountryCode, b: CountryCode) -> Option<Posture> {
        EdgeKey::new(a, b).and_then(|key| self.postures.get(&key).copied())
    }

    /// The view the next turn's actions will be checked against: turn + 1
    /// with every cooldown already ticked
    fn projected_countries(&self) -> BTreeMap<CountryCode, CountryState> {
        let mut countries = self.countries.clone();
        for country in countries.values_mut() {
            country.tick_cooldowns();
        }
        countries
    }

    /// Check an action against the next turn without queueing it
    pub fn check_player_action(&self, request: &ActionRequest) -> Result<(), ActionRejected> {
        let countries = self.projected_countries();
        let board = ActionBoard::new(self.turn + 1, &countries, &self.relations);
        check_preconditions(&board, request)
    }

    /// Queue a player action for the next turn
    ///
    /// Invalid actions leave the state untouched. A valid action replaces
    /// whatever was queued before.
    pub fn queue_player_action(
        &mut self,
        kind: ActionKind,
        target: CountryCode,
        actor: CountryCode,
    ) -> Result<(), ActionRejected> {
        let request = ActionRequest::new(actor, target, kind);
        self.check_player_action(&request)?;
        tracing::debug!(%actor, %target, %kind, "queued player action");
        self.queued_action = Some(request);
        Ok(())
    }

    pub fn clear_queued_action(&mut self) {
        self.queued_action = None;
    }

    /// Change one policy field of a country, re-clamping the result
    pub fn set_policy_field(&mut self, code: CountryCode, update: PolicyUpdate) -> Result<(), PolicyRejected> {
        let country = self
            .countries
            .get_mut(&code)
            .ok_or(PolicyRejected::UnknownCountry(code))?;
        country.policy = country.policy.with_update(update);
        Ok(())
    }

    /// Influence a country would gain from the next turn at current values
    pub fn next_turn_gain_hint(&self, code: CountryCode) -> Option<InfluenceHint> {
        next_turn_gain_hint(&self.countries, code, &self.config().influence)
    }

    pub fn total_gdp(&self) -> f64 {
        self.countries.values().map(|c| c.gdp).sum()
    }

    /// Clamp every country's numbers back into range
    pub(crate) fn reclamp_countries(&mut self) {
        let max_influence = self.config().influence.max_influence;
        for (code, country) in self.countries.iter_mut() {
            country.military_pct = clamp_military_pct(country.military_pct);
            country.stability = country.stability.clamp(0.0, 1.0);
            country.influence = country.influence.clamp(0, max_influence.max(0));
            country.policy = country.policy.clamped();
            country.cooldowns.retain(|_, turns| *turns > 0);
            country.recompute_derived(self.scenario.population(*code));
        }
    }
}
