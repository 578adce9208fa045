//! Turn orchestration
//!
//! Stage order within a turn:
//!
//! 1. relation-effects ledger tick
//! 2. policy, military and stability update, then drift and shocks
//! 3. action planning and application
//! 4. relation graph step
//! 5. hostility feedback
//! 6. GDP finalization
//! 7. influence accrual
//!
//! Countries are visited in code order and edges in key order throughout.

use std::collections::BTreeMap;

use crate::core::types::CountryCode;
use crate::sim::diplomacy::{apply_planned_actions, plan_actions, ActionBoard};
use crate::sim::economy::{apply_hostility_feedback, begin_country_turn, finalize_growth, PendingGrowth};
use crate::sim::effects::LedgerTick;
use crate::sim::events::Event;
use crate::sim::influence::accrue_influence;
use crate::sim::relations::{step_relations, RelationInputs};
use crate::sim::state::SimState;

/// Advance one turn, returning the new state; the input is left untouched
pub fn simulate_turn(state: &SimState) -> SimState {
    let turn = state.turn + 1;
    let span = tracing::debug_span!("turn", turn, seed = state.seed);
    let _enter = span.enter();

    let scenario = state.scenario();
    let config = scenario.config();

    let LedgerTick {
        effects: mut ledger,
        growth_delta,
    } = state.effects.tick(turn, &config.effects);

    let mut countries = BTreeMap::new();
    let mut pending: BTreeMap<CountryCode, PendingGrowth> = BTreeMap::new();
    let mut shock_events = Vec::new();
    for (&code, prev) in &state.countries {
        let (next, growth, event) = begin_country_turn(state.seed, turn, code, prev, scenario.population(code));
        countries.insert(code, next);
        pending.insert(code, growth);
        shock_events.extend(event);
    }

    let planned = plan_actions(
        &ActionBoard::new(turn, &countries, &state.relations),
        scenario,
        state.queued_action.as_ref(),
    );
    let mut relations = state.relations.clone();
    let action_events = apply_planned_actions(
        turn,
        &mut countries,
        &mut relations,
        &mut ledger,
        &config.effects,
        &planned,
    );

    let inputs: BTreeMap<CountryCode, RelationInputs> = countries
        .iter()
        .map(|(&code, country)| (code, country.policy.stance.relation_inputs()))
        .collect();
    let turn_events: Vec<Event> = shock_events.iter().chain(&action_events).cloned().collect();
    let step = step_relations(turn, state.seed, scenario, &relations, &countries, &turn_events, &inputs);

    apply_hostility_feedback(&mut countries, scenario, &step.postures);

    for (code, country) in countries.iter_mut() {
        let growth = pending.get(code).copied().unwrap_or_default();
        let ledger_growth = growth_delta.get(code).copied().unwrap_or(0.0);
        finalize_growth(country, growth, ledger_growth, scenario.population(*code));
    }

    accrue_influence(&mut countries, &config.influence);

    let mut events = state.events.clone();
    let new_events = shock_events.len() + action_events.len() + step.events.len();
    events.extend_capped(
        shock_events.into_iter().chain(action_events).chain(step.events),
        config.event_log_cap,
    );

    let mut next = SimState::from_parts(state.scenario_arc().clone(), state.seed, turn);
    next.countries = countries;
    next.relations = step.relations;
    next.postures = step.postures;
    next.effects = ledger;
    next.events = events;

    tracing::debug!(
        planned = planned.len(),
        events = new_events,
        total_gdp = next.total_gdp(),
        "turn complete"
    );
    next
}

/// Advance `turns` turns
pub fn simulate_turns(state: &SimState, turns: u32) -> SimState {
    let mut current = state.clone();
    for _ in 0..turns {
        current = simulate_turn(&current);
    }
    current
}
