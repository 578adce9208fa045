//! Diplomatic actions: catalog, preconditions, AI planning and application
//!
//! The catalog is a closed enum. Each kind carries its cost, cooldown and
//! scheduling priority as data (`ActionKind::profile`) and its check, effect and
//! AI score as `match` arms, so every rule can be tested in isolation.
//!
//! A turn's actions are resolved in two phases. `plan_actions` picks at most
//! one action per country against the policy-updated state, and
//! `apply_planned_actions` sorts them into a total order and applies them one
//! at a time, re-checking every precondition against the running state.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::EffectsConfig;
use crate::core::types::{CountryCode, Turn};
use crate::sim::effects::RelationEffects;
use crate::sim::events::{Event, EventKind};
use crate::sim::relations::{RelationEdge, RelationGraph, RelationModifier};
use crate::sim::state::CountryState;
use crate::world::Scenario;

/// Scheduling priority of the player's queued action; runs ahead of the catalog
pub const PLAYER_PRIORITY: i32 = -1;

/// Influence bounds used when debiting an action's cost
pub const ACTION_INFLUENCE_MAX: i32 = 100;

/// Threats need at least this share of the target's power
pub const THREATEN_POWER_RATIO: f64 = 0.9;

// ============================================================================
// CATALOG
// ============================================================================

/// Diplomatic action types
///
/// Variants are declared in name order so the derived `Ord` matches the
/// lexicographic order of the serialized names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Guarantee,
    ImproveRelations,
    OfferTradeDeal,
    Sanction,
    Threaten,
}

/// Static costs of an action type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionProfile {
    /// Influence spent
    pub cost: i32,
    /// Turns before the actor may use the same type again
    pub cooldown: u32,
    /// Lower runs first
    pub priority: i32,
}

/// Immediate edge change produced by an action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeEffect {
    pub rel: i32,
    pub tension: i32,
    pub trust: i32,
    pub modifier: RelationModifier,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Guarantee,
        ActionKind::ImproveRelations,
        ActionKind::OfferTradeDeal,
        ActionKind::Sanction,
        ActionKind::Threaten,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Guarantee => "guarantee",
            ActionKind::ImproveRelations => "improveRelations",
            ActionKind::OfferTradeDeal => "offerTradeDeal",
            ActionKind::Sanction => "sanction",
            ActionKind::Threaten => "threaten",
        }
    }

    pub fn profile(self) -> ActionProfile {
        let (cost, cooldown, priority) = match self {
            ActionKind::ImproveRelations => (6, 2, 2),
            ActionKind::OfferTradeDeal => (8, 3, 1),
            ActionKind::Threaten => (7, 2, 3),
            ActionKind::Guarantee => (10, 4, 0),
            ActionKind::Sanction => (9, 3, 4),
        };
        ActionProfile {
            cost,
            cooldown,
            priority,
        }
    }

    /// Kind-specific precondition on the edge and the two countries
    pub fn check(self, edge: &RelationEdge, actor: &CountryState, target: &CountryState) -> Result<(), ActionRejected> {
        use ActionRejected::*;

        match self {
            ActionKind::ImproveRelations if edge.rel >= 85 => Err(RelationsAlreadyHigh),
            ActionKind::OfferTradeDeal if edge.rel < -20 => Err(RelationsTooPoorForTrade),
            ActionKind::OfferTradeDeal if edge.tension > 75 => Err(TensionTooHighForTrade),
            ActionKind::Threaten if actor.power < target.power * THREATEN_POWER_RATIO => {
                Err(InsufficientPowerToThreaten)
            }
            ActionKind::Guarantee if edge.rel < 20 => Err(RelationsTooLowToGuarantee),
            ActionKind::Guarantee if edge.trust < 35 => Err(TrustTooLowToGuarantee),
            ActionKind::Sanction if edge.rel > 35 => Err(RelationsNotBadEnoughForSanctions),
            _ => Ok(()),
        }
    }

    /// New (unclamped) edge values and the modifier left behind
    pub fn effect(self, edge: &RelationEdge) -> EdgeEffect {
        let ((d_rel, d_tension, d_trust), modifier) = match self {
            ActionKind::ImproveRelations => ((10, -7, 6), RelationModifier::new(1, -1, 1, 2, "Goodwill outreach")),
            ActionKind::OfferTradeDeal => ((14, -10, 8), RelationModifier::new(2, -1, 1, 3, "Trade pact momentum")),
            ActionKind::Threaten => ((-12, 14, -10), RelationModifier::new(-1, 2, -1, 2, "Threat posture")),
            ActionKind::Guarantee => ((8, -8, 12), RelationModifier::new(1, -2, 2, 4, "Security guarantee pact")),
            ActionKind::Sanction => ((-15, 9, -12), RelationModifier::new(-2, 1, -1, 3, "Sanctions regime")),
        };
        EdgeEffect {
            rel: edge.rel + d_rel,
            tension: edge.tension + d_tension,
            trust: edge.trust + d_trust,
            modifier,
        }
    }

    /// AI desirability; higher is better
    pub fn score(self, edge: &RelationEdge) -> f64 {
        let (rel, tension, trust) = (f64::from(edge.rel), f64::from(edge.tension), f64::from(edge.trust));
        match self {
            ActionKind::ImproveRelations => (70.0 - rel) + tension * 0.2,
            ActionKind::OfferTradeDeal => rel + (100.0 - tension) * 0.4 + trust * 0.3,
            ActionKind::Threaten => (50.0 - rel) + tension,
            ActionKind::Guarantee => rel * 0.7 + trust - tension * 0.5,
            ActionKind::Sanction => -rel + tension * 0.6,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionRejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or(ActionRejected::UnknownActionType)
    }
}

/// Who issued an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSource {
    Player,
    Ai,
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionSource::Player => "Player",
            ActionSource::Ai => "AI",
        })
    }
}

/// Machine-readable reason an action was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionRejected {
    #[error("self-targeting-not-allowed")]
    SelfTargetingNotAllowed,
    #[error("unknown-actor-country")]
    UnknownActorCountry,
    #[error("unknown-target-country")]
    UnknownTargetCountry,
    #[error("unknown-action-type")]
    UnknownActionType,
    #[error("actor-already-used-action-this-turn")]
    ActorAlreadyUsedActionThisTurn,
    #[error("action-on-cooldown")]
    ActionOnCooldown,
    #[error("insufficient-influence")]
    InsufficientInfluence,
    #[error("countries-are-not-neighbours")]
    CountriesAreNotNeighbours,
    #[error("relations-already-high")]
    RelationsAlreadyHigh,
    #[error("relations-too-poor-for-trade")]
    RelationsTooPoorForTrade,
    #[error("tension-too-high-for-trade")]
    TensionTooHighForTrade,
    #[error("insufficient-power-to-threaten")]
    InsufficientPowerToThreaten,
    #[error("relations-too-low-to-guarantee")]
    RelationsTooLowToGuarantee,
    #[error("trust-too-low-to-guarantee")]
    TrustTooLowToGuarantee,
    #[error("relations-not-bad-enough-for-sanctions")]
    RelationsNotBadEnoughForSanctions,
}

// ============================================================================
// REQUESTS AND PLANS
// ============================================================================

/// An action someone wants taken
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor: CountryCode,
    pub target: CountryCode,
    pub kind: ActionKind,
}

impl ActionRequest {
    pub fn new(actor: CountryCode, target: CountryCode, kind: ActionKind) -> Self {
        Self { actor, target, kind }
    }
}

/// An action scheduled for application this turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub actor: CountryCode,
    pub target: CountryCode,
    pub kind: ActionKind,
    pub source: ActionSource,
    pub priority: i32,
}

impl PlannedAction {
    pub fn player(request: ActionRequest) -> Self {
        Self {
            actor: request.actor,
            target: request.target,
            kind: request.kind,
            source: ActionSource::Player,
            priority: PLAYER_PRIORITY,
        }
    }

    pub fn ai(actor: CountryCode, target: CountryCode, kind: ActionKind) -> Self {
        Self {
            actor,
            target,
            kind,
            source: ActionSource::Ai,
            priority: kind.profile().priority,
        }
    }

    pub fn request(&self) -> ActionRequest {
        ActionRequest::new(self.actor, self.target, self.kind)
    }

    /// Total application order
    fn sort_key(&self) -> (i32, CountryCode, CountryCode, ActionKind) {
        (self.priority, self.actor, self.target, self.kind)
    }
}

/// Read-only view that preconditions are checked against
#[derive(Clone, Copy, Debug)]
pub struct ActionBoard<'a> {
    pub turn: Turn,
    pub countries: &'a BTreeMap<CountryCode, CountryState>,
    pub relations: &'a RelationGraph,
}

impl<'a> ActionBoard<'a> {
    pub fn new(turn: Turn, countries: &'a BTreeMap<CountryCode, CountryState>, relations: &'a RelationGraph) -> Self {
        Self {
            turn,
            countries,
            relations,
        }
    }
}

/// Check every precondition of `request`, in order; the first failure wins
///
/// Has no side effects, so repeated calls on the same board agree.
pub fn check_preconditions(board: &ActionBoard<'_>, request: &ActionRequest) -> Result<(), ActionRejected> {
    if request.actor == request.target {
        return Err(ActionRejected::SelfTargetingNotAllowed);
    }
    let actor = board
        .countries
        .get(&request.actor)
        .ok_or(ActionRejected::UnknownActorCountry)?;
    let target = board
        .countries
        .get(&request.target)
        .ok_or(ActionRejected::UnknownTargetCountry)?;

    let profile = request.kind.profile();
    if actor.action_used_turn == Some(board.turn) {
        return Err(ActionRejected::ActorAlreadyUsedActionThisTurn);
    }
    if actor.cooldown(request.kind) > 0 {
        return Err(ActionRejected::ActionOnCooldown);
    }
    if actor.influence < profile.cost {
        return Err(ActionRejected::InsufficientInfluence);
    }

    let edge = board
        .relations
        .get(request.actor, request.target)
        .ok_or(ActionRejected::CountriesAreNotNeighbours)?;
    request.kind.check(edge, actor, target)
}

/// A passing candidate and its score
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub target: CountryCode,
    pub kind: ActionKind,
    pub score: f64,
}

/// Every action `actor` could take right now, best first
///
/// Ordered by score descending, then target code, then action name.
pub fn candidates_for(board: &ActionBoard<'_>, scenario: &Scenario, actor: CountryCode) -> Vec<ScoredCandidate> {
    let mut candidates = Vec::new();
    for &target in scenario.neighbours(actor) {
        let Some(edge) = board.relations.get(actor, target) else {
            continue;
        };
        for kind in ActionKind::ALL {
            if check_preconditions(board, &ActionRequest::new(actor, target, kind)).is_ok() {
                candidates.push(ScoredCandidate {
                    target,
                    kind,
                    score: kind.score(edge),
                });
            }
        }
    }
    candidates.sort_by_key(|c| (Reverse(OrderedFloat(c.score)), c.target, c.kind));
    candidates
}

/// Choose this turn's actions
///
/// The queued player action is accepted as-is (it was validated when queued).
/// Every other country, in code order, takes its single best candidate.
pub fn plan_actions(board: &ActionBoard<'_>, scenario: &Scenario, queued: Option<&ActionRequest>) -> Vec<PlannedAction> {
    let mut planned: Vec<PlannedAction> = queued.copied().map(PlannedAction::player).into_iter().collect();

    for &actor in board.countries.keys() {
        if planned.iter().any(|p| p.actor == actor) {
            continue;
        }
        if let Some(best) = candidates_for(board, scenario, actor).first() {
            planned.push(PlannedAction::ai(actor, best.target, best.kind));
        }
    }

    planned
}

/// Apply planned actions to working copies of the turn's state
///
/// Cooldowns of every country tick down first. Actions then run in
/// `(priority, actor, target, kind)` order; each is re-checked against the
/// running state and logged as taken or failed. Returns the action events in
/// application order.
pub fn apply_planned_actions(
    turn: Turn,
    countries: &mut BTreeMap<CountryCode, CountryState>,
    relations: &mut RelationGraph,
    ledger: &mut RelationEffects,
    config: &EffectsConfig,
    planned: &[PlannedAction],
) -> Vec<Event> {
    for country in countries.values_mut() {
        country.tick_cooldowns();
    }

    let mut ordered = planned.to_vec();
    ordered.sort_by_key(PlannedAction::sort_key);

    let mut events = Vec::with_capacity(ordered.len());
    for action in ordered {
        let request = action.request();
        let checked = check_preconditions(&ActionBoard::new(turn, countries, relations), &request);
        if let Err(reason) = checked {
            tracing::debug!(actor = %action.actor, target = %action.target, kind = %action.kind, %reason, "action failed");
            events.push(Event::new(
                turn,
                action.actor,
                Some(action.target),
                EventKind::ActionFailed {
                    action: action.kind,
                    reason,
                },
            ));
            continue;
        }

        // Both lookups succeeded inside the precondition check
        let Some(edge) = relations.get(action.actor, action.target) else {
            continue;
        };
        let effect = action.kind.effect(edge);
        let mut modifiers = edge.modifiers.clone();
        modifiers.push(effect.modifier);
        relations.set(
            action.actor,
            action.target,
            RelationEdge {
                rel: effect.rel,
                tension: effect.tension,
                trust: effect.trust,
                last_turn_updated: turn,
                modifiers,
            },
        );

        let profile = action.kind.profile();
        if let Some(actor) = countries.get_mut(&action.actor) {
            actor.influence = (actor.influence - profile.cost).clamp(0, ACTION_INFLUENCE_MAX);
            actor.action_used_turn = Some(turn);
            actor.cooldowns.insert(action.kind, profile.cooldown);
        }

        match action.kind {
            ActionKind::Guarantee => {
                ledger.add_guarantee(action.actor, action.target, turn.saturating_add(config.guarantee_turns));
            }
            ActionKind::Sanction => ledger.add_sanction(
                action.actor,
                action.target,
                turn.saturating_add(config.sanction_turns),
                config.sanction_penalty_actor,
                config.sanction_penalty_target,
            ),
            ActionKind::OfferTradeDeal => ledger.record_trade_deal(action.actor, action.target, turn, config),
            ActionKind::ImproveRelations | ActionKind::Threaten => {}
        }

        events.push(Event::new(
            turn,
            action.actor,
            Some(action.target),
            EventKind::ActionTaken {
                source: action.source,
                action: action.kind,
            },
        ));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimConfig;
    use crate::world::{Adjacency, CountryFacts};

    fn code(s: &str) -> CountryCode {
        CountryCode::parse(s).unwrap()
    }

    struct Fixture {
        scenario: Scenario,
        countries: BTreeMap<CountryCode, CountryState>,
        relations: RelationGraph,
    }

    /// DEU borders FRA and POL; ISL is isolated
    fn fixture() -> Fixture {
        let facts: Vec<CountryFacts> = ["DEU", "FRA", "ISL", "POL"]
            .iter()
            .map(|c| {
                CountryFacts::new(code(c), *c, "Europe")
                    .with_gdp(1e12)
                    .with_population(5e7)
            })
            .collect();
        let mut adjacency = Adjacency::new();
        adjacency.insert(code("DEU"), vec![code("FRA"), code("POL")]);
        let scenario = Scenario::new(facts, &adjacency, SimConfig::default());

        let countries = scenario
            .countries()
            .values()
            .map(|f| {
                let mut state = CountryState::from_facts(f);
                state.influence = 20;
                (f.code, state)
            })
            .collect();

        let mut relations = RelationGraph::new();
        relations.set(code("DEU"), code("FRA"), RelationEdge::new(30, 20, 50));
        relations.set(code("DEU"), code("POL"), RelationEdge::new(-30, 60, 30));

        Fixture {
            scenario,
            countries,
            relations,
        }
    }

    fn request(actor: &str, target: &str, kind: ActionKind) -> ActionRequest {
        ActionRequest::new(code(actor), code(target), kind)
    }

    #[test]
    fn test_catalog_values() {
        let costs: Vec<i32> = ActionKind::ALL.iter().map(|k| k.profile().cost).collect();
        assert_eq!(costs, vec![10, 6, 8, 9, 7]);
        assert_eq!(ActionKind::Guarantee.profile().priority, 0);
        assert_eq!(ActionKind::Sanction.profile().priority, 4);
        assert_eq!(ActionKind::Threaten.profile().cooldown, 2);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
        assert_eq!("declareWar".parse::<ActionKind>(), Err(ActionRejected::UnknownActionType));
    }

    #[test]
    fn test_enum_order_matches_name_order() {
        let mut names: Vec<&str> = ActionKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        let ordered: Vec<&str> = ActionKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ordered);
    }

    #[test]
    fn test_scores() {
        let edge = RelationEdge::new(10, 50, 40);
        let expected = [
            (ActionKind::ImproveRelations, 70.0),
            (ActionKind::OfferTradeDeal, 42.0),
            (ActionKind::Threaten, 90.0),
            (ActionKind::Guarantee, 22.0),
            (ActionKind::Sanction, 20.0),
        ];
        for (kind, score) in expected {
            assert!((kind.score(&edge) - score).abs() < 1e-9, "{kind}");
        }
    }

    #[test]
    fn test_generic_precondition_order() {
        let mut f = fixture();
        let board = ActionBoard::new(1, &f.countries, &f.relations);
        use ActionRejected::*;

        assert_eq!(
            check_preconditions(&board, &request("DEU", "DEU", ActionKind::Threaten)),
            Err(SelfTargetingNotAllowed)
        );
        assert_eq!(
            check_preconditions(&board, &request("XXX", "DEU", ActionKind::Threaten)),
            Err(UnknownActorCountry)
        );
        assert_eq!(
            check_preconditions(&board, &request("DEU", "XXX", ActionKind::Threaten)),
            Err(UnknownTargetCountry)
        );
        assert_eq!(
            check_preconditions(&board, &request("DEU", "ISL", ActionKind::Threaten)),
            Err(CountriesAreNotNeighbours)
        );

        let deu = f.countries.get_mut(&code("DEU")).unwrap();
        deu.influence = 7;
        deu.cooldowns.insert(ActionKind::ImproveRelations, 1);
        deu.action_used_turn = Some(2);

        let board = ActionBoard::new(1, &f.countries, &f.relations);
        assert_eq!(
            check_preconditions(&board, &request("DEU", "FRA", ActionKind::ImproveRelations)),
            Err(ActionOnCooldown)
        );
        assert_eq!(
            check_preconditions(&board, &request("DEU", "FRA", ActionKind::OfferTradeDeal)),
            Err(InsufficientInfluence)
        );
        assert_eq!(check_preconditions(&board, &request("DEU", "FRA", ActionKind::Threaten)), Ok(()));

        let board = ActionBoard::new(2, &f.countries, &f.relations);
        assert_eq!(
            check_preconditions(&board, &request("DEU", "FRA", ActionKind::Threaten)),
            Err(ActorAlreadyUsedActionThisTurn)
        );
    }

    #[test]
    fn test_kind_specific_checks() {
        let f = fixture();
        let deu = &f.countries[&code("DEU")];
        let mut weak = deu.clone();
        weak.power = deu.power * 0.5;
        use ActionRejected::*;

        let edge = RelationEdge::new(85, 10, 50);
        assert_eq!(ActionKind::ImproveRelations.check(&edge, deu, deu), Err(RelationsAlreadyHigh));
        assert_eq!(ActionKind::Sanction.check(&edge, deu, deu), Err(RelationsNotBadEnoughForSanctions));

        let edge = RelationEdge::new(-21, 10, 50);
        assert_eq!(ActionKind::OfferTradeDeal.check(&edge, deu, deu), Err(RelationsTooPoorForTrade));
        let edge = RelationEdge::new(0, 76, 50);
        assert_eq!(ActionKind::OfferTradeDeal.check(&edge, deu, deu), Err(TensionTooHighForTrade));

        let edge = RelationEdge::new(19, 10, 50);
        assert_eq!(ActionKind::Guarantee.check(&edge, deu, deu), Err(RelationsTooLowToGuarantee));
        let edge = RelationEdge::new(20, 10, 34);
        assert_eq!(ActionKind::Guarantee.check(&edge, deu, deu), Err(TrustTooLowToGuarantee));

        assert_eq!(ActionKind::Threaten.check(&edge, &weak, deu), Err(InsufficientPowerToThreaten));
        assert_eq!(ActionKind::Threaten.check(&edge, deu, &weak), Ok(()));
    }

    #[test]
    fn test_precondition_check_is_idempotent() {
        let f = fixture();
        let board = ActionBoard::new(1, &f.countries, &f.relations);
        for kind in ActionKind::ALL {
            let req = request("DEU", "POL", kind);
            assert_eq!(check_preconditions(&board, &req), check_preconditions(&board, &req));
        }
    }

    #[test]
    fn test_plan_picks_best_candidate_per_country() {
        let f = fixture();
        let board = ActionBoard::new(1, &f.countries, &f.relations);
        let plan = plan_actions(&board, &f.scenario, None);

        // DEU vs POL (-30/60/30): threaten scores 50+30+60 = 140
        let deu = plan.iter().find(|p| p.actor == code("DEU")).unwrap();
        assert_eq!((deu.target, deu.kind), (code("POL"), ActionKind::Threaten));
        assert_eq!(deu.source, ActionSource::Ai);
        assert_eq!(deu.priority, ActionKind::Threaten.profile().priority);

        assert!(plan.iter().all(|p| p.actor != code("ISL")));
        let actors: Vec<CountryCode> = plan.iter().map(|p| p.actor).collect();
        let mut sorted = actors.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(actors, sorted);
    }

    #[test]
    fn test_player_action_replaces_ai_choice() {
        let f = fixture();
        let board = ActionBoard::new(1, &f.countries, &f.relations);
        let queued = request("DEU", "FRA", ActionKind::ImproveRelations);
        let plan = plan_actions(&board, &f.scenario, Some(&queued));

        assert_eq!(plan[0], PlannedAction::player(queued));
        assert_eq!(plan.iter().filter(|p| p.actor == code("DEU")).count(), 1);
    }

    #[test]
    fn test_apply_updates_edge_actor_and_log() {
        let mut f = fixture();
        let mut ledger = RelationEffects::new();
        let planned = vec![PlannedAction::player(request("DEU", "FRA", ActionKind::OfferTradeDeal))];

        let events = apply_planned_actions(
            3,
            &mut f.countries,
            &mut f.relations,
            &mut ledger,
            &EffectsConfig::default(),
            &planned,
        );

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind.to_string(), "Player offerTradeDeal");
        let edge = f.relations.get(code("FRA"), code("DEU")).unwrap();
        assert_eq!((edge.rel, edge.tension, edge.trust), (44, 10, 58));
        assert_eq!(edge.last_turn_updated, 3);
        assert_eq!(edge.modifiers.last().unwrap().text, "Trade pact momentum");

        let deu = &f.countries[&code("DEU")];
        assert_eq!(deu.influence, 12);
        assert_eq!(deu.action_used_turn, Some(3));
        assert_eq!(deu.cooldown(ActionKind::OfferTradeDeal), 3);

        let pact = ledger.trade(code("DEU"), code("FRA")).unwrap();
        assert_eq!(pact.level, Some(1));
        assert_eq!(pact.buff_expiry_turn, Some(3 + EffectsConfig::default().trade_buff_turns));
    }

    #[test]
    fn test_apply_rechecks_running_state() {
        let mut f = fixture();
        f.countries.get_mut(&code("DEU")).unwrap().influence = 15;
        let mut ledger = RelationEffects::new();
        let planned = vec![
            PlannedAction::ai(code("DEU"), code("POL"), ActionKind::Sanction),
            PlannedAction::player(request("DEU", "FRA", ActionKind::ImproveRelations)),
        ];

        let events = apply_planned_actions(
            1,
            &mut f.countries,
            &mut f.relations,
            &mut ledger,
            &EffectsConfig::default(),
            &planned,
        );

        // Player action sorts first; DEU has then already acted
        assert_eq!(events[0].executed_action(), Some(ActionKind::ImproveRelations));
        assert_eq!(
            events[1].kind,
            EventKind::ActionFailed {
                action: ActionKind::Sanction,
                reason: ActionRejected::ActorAlreadyUsedActionThisTurn,
            }
        );
        assert_eq!(events[1].to_string(), "[T1] DEU / POL: Action failed (sanction): actor-already-used-action-this-turn");
        assert!(ledger.sanctions_by_edge.is_empty());
    }

    #[test]
    fn test_apply_ticks_cooldowns_first() {
        let mut f = fixture();
        {
            let fra = f.countries.get_mut(&code("FRA")).unwrap();
            fra.cooldowns.insert(ActionKind::ImproveRelations, 1);
            fra.cooldowns.insert(ActionKind::Threaten, 2);
        }
        let planned = vec![PlannedAction::ai(code("FRA"), code("DEU"), ActionKind::ImproveRelations)];
        let events = apply_planned_actions(
            1,
            &mut f.countries,
            &mut f.relations,
            &mut RelationEffects::new(),
            &EffectsConfig::default(),
            &planned,
        );

        assert_eq!(events[0].executed_action(), Some(ActionKind::ImproveRelations));
        let fra = &f.countries[&code("FRA")];
        assert_eq!(fra.cooldown(ActionKind::Threaten), 1);
        assert_eq!(fra.cooldown(ActionKind::ImproveRelations), 2);
    }

    #[test]
    fn test_apply_order_ignores_input_order() {
        let planned = vec![
            PlannedAction::ai(code("POL"), code("DEU"), ActionKind::Sanction),
            PlannedAction::ai(code("FRA"), code("DEU"), ActionKind::Guarantee),
            PlannedAction::ai(code("DEU"), code("FRA"), ActionKind::ImproveRelations),
        ];
        let mut reversed = planned.clone();
        reversed.reverse();

        let run = |plan: &[PlannedAction]| {
            let mut f = fixture();
            let mut ledger = RelationEffects::new();
            let events = apply_planned_actions(
                1,
                &mut f.countries,
                &mut f.relations,
                &mut ledger,
                &EffectsConfig::default(),
                plan,
            );
            (events, f.relations, ledger)
        };

        let (events_a, relations_a, ledger_a) = run(&planned);
        let (events_b, relations_b, ledger_b) = run(&reversed);
        assert_eq!(events_a, events_b);
        assert_eq!(relations_a, relations_b);
        assert_eq!(ledger_a, ledger_b);
        assert_eq!(events_a[0].executed_action(), Some(ActionKind::Guarantee));
        assert_eq!(ledger_a.active_guarantees(1), 1);
        assert_eq!(ledger_a.active_sanctions(1), 1);
    }

    #[test]
    fn test_ledger_expiries_saturate_near_turn_limit() {
        let mut f = fixture();
        let mut ledger = RelationEffects::new();
        let config = EffectsConfig {
            guarantee_turns: u32::MAX,
            sanction_turns: u32::MAX,
            trade_buff_turns: u32::MAX,
            ..EffectsConfig::default()
        };
        let planned = vec![
            PlannedAction::ai(code("FRA"), code("DEU"), ActionKind::Guarantee),
            PlannedAction::ai(code("POL"), code("DEU"), ActionKind::Sanction),
            PlannedAction::ai(code("DEU"), code("FRA"), ActionKind::OfferTradeDeal),
        ];

        let turn = u32::MAX - 3;
        let events = apply_planned_actions(turn, &mut f.countries, &mut f.relations, &mut ledger, &config, &planned);

        assert!(events.iter().all(|e| e.executed_action().is_some()));
        assert_eq!(ledger.guarantees(code("DEU"), code("FRA"))[0].expiry_turn, u32::MAX);
        assert_eq!(ledger.sanctions(code("DEU"), code("POL"))[0].expiry_turn, u32::MAX);
        assert_eq!(ledger.trade(code("DEU"), code("FRA")).unwrap().buff_expiry_turn, Some(u32::MAX));
    }
}
