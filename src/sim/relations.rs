//! Relationship graph: per-border relation, tension and trust
//!
//! Each border edge is stored once under its normalised `EdgeKey`, so the two
//! directions of a relationship can never disagree. The graph is stepped once
//! per turn; every edge update depends only on that edge's previous value, the
//! two endpoint countries and an edge-scoped random roll, so the result does
//! not depend on processing order.

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::rng::{pair_event_rng, pair_init_rng};
use crate::core::types::{round_half_up, CountryCode, EdgeKey, Turn};
use crate::sim::events::{Event, EventKind};
use crate::sim::state::CountryState;
use crate::world::Scenario;

pub const REL_MIN: i32 = -100;
pub const REL_MAX: i32 = 100;
pub const METER_MIN: i32 = 0;
pub const METER_MAX: i32 = 100;

/// Temporary adjustment applied to an edge every turn while `turns > 0`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationModifier {
    pub rel: i32,
    pub tension: i32,
    pub trust: i32,
    pub turns: u32,
    pub text: String,
}

impl RelationModifier {
    pub fn new(rel: i32, tension: i32, trust: i32, turns: u32, text: impl Into<String>) -> Self {
        Self {
            rel,
            tension,
            trust,
            turns,
            text: text.into(),
        }
    }
}

/// State of one border relationship
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    /// -100 (enemies) to +100 (allies)
    pub rel: i32,
    /// 0 to 100
    pub tension: i32,
    /// 0 to 100
    pub trust: i32,
    pub last_turn_updated: Turn,
    pub modifiers: Vec<RelationModifier>,
}

impl Default for RelationEdge {
    /// Used for an edge with no prior record
    fn default() -> Self {
        Self::new(0, 10, 50)
    }
}

impl RelationEdge {
    pub fn new(rel: i32, tension: i32, trust: i32) -> Self {
        Self {
            rel,
            tension,
            trust,
            last_turn_updated: 0,
            modifiers: Vec::new(),
        }
    }

    /// Clamp meters into range and drop spent modifiers
    pub fn clamped(mut self) -> Self {
        self.rel = self.rel.clamp(REL_MIN, REL_MAX);
        self.tension = self.tension.clamp(METER_MIN, METER_MAX);
        self.trust = self.trust.clamp(METER_MIN, METER_MAX);
        self.modifiers.retain(|m| m.turns > 0);
        self
    }

    pub fn posture(&self) -> Posture {
        Posture::classify(self.rel, self.tension)
    }

    pub fn in_bounds(&self) -> bool {
        (REL_MIN..=REL_MAX).contains(&self.rel)
            && (METER_MIN..=METER_MAX).contains(&self.tension)
            && (METER_MIN..=METER_MAX).contains(&self.trust)
    }
}

/// Coarse classification of an edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Posture {
    Hostile,
    Wary,
    Friendly,
}

impl Posture {
    pub fn classify(rel: i32, tension: i32) -> Self {
        if rel <= -40 || tension >= 70 {
            Posture::Hostile
        } else if rel >= 40 && tension < 40 {
            Posture::Friendly
        } else {
            Posture::Wary
        }
    }
}

/// Posture per border, keyed like the edges
pub type PostureMap = BTreeMap<EdgeKey, Posture>;

/// Random relation incidents rolled per edge per turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationIncident {
    BorderIncident,
    TradeDeal,
    Sanctions,
    JointExercise,
}

impl RelationIncident {
    /// Cumulative probability bands; the first band containing the roll wins
    pub fn from_roll(roll: f64) -> Option<Self> {
        if roll < 0.0025 {
            Some(Self::BorderIncident)
        } else if roll < 0.005 {
            Some(Self::TradeDeal)
        } else if roll < 0.007 {
            Some(Self::Sanctions)
        } else if roll < 0.009 {
            Some(Self::JointExercise)
        } else {
            None
        }
    }

    /// Immediate (rel, tension, trust) impact
    pub fn impact(self) -> (i32, i32, i32) {
        match self {
            Self::BorderIncident => (-10, 15, 0),
            Self::TradeDeal => (10, -10, 5),
            Self::Sanctions => (-15, 10, 0),
            Self::JointExercise => (5, 0, 10),
        }
    }

    /// Lingering modifier, first applied on the following turn
    pub fn aftermath(self) -> RelationModifier {
        match self {
            Self::BorderIncident => RelationModifier::new(-1, 2, -1, 3, "Border Incident aftermath"),
            Self::TradeDeal => RelationModifier::new(1, -1, 1, 3, "Trade momentum"),
            Self::Sanctions => RelationModifier::new(-1, 1, -1, 2, "Sanctions pressure"),
            Self::JointExercise => RelationModifier::new(1, -1, 1, 3, "Joint exercise confidence"),
        }
    }
}

impl fmt::Display for RelationIncident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BorderIncident => "Border Incident",
            Self::TradeDeal => "Trade Deal",
            Self::Sanctions => "Sanctions",
            Self::JointExercise => "Joint Exercise",
        })
    }
}

/// Per-country contributions added to every edge the country sits on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelationInputs {
    pub rel_delta: i32,
    pub tension_delta: i32,
    pub trust_delta: i32,
}

/// All border edges of a game
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationGraph {
    edges: BTreeMap<EdgeKey, RelationEdge>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup in either argument order
    pub fn get(&self, a: CountryCode, b: CountryCode) -> Option<&RelationEdge> {
        EdgeKey::new(a, b).and_then(|key| self.edges.get(&key))
    }

    pub fn get_by_key(&self, key: &EdgeKey) -> Option<&RelationEdge> {
        self.edges.get(key)
    }

    pub fn contains(&self, a: CountryCode, b: CountryCode) -> bool {
        self.get(a, b).is_some()
    }

    /// Store an edge (clamped) in either argument order. Self-pairs are ignored.
    pub fn set(&mut self, a: CountryCode, b: CountryCode, edge: RelationEdge) -> bool {
        match EdgeKey::new(a, b) {
            Some(key) => {
                self.insert(key, edge);
                true
            }
            None => false,
        }
    }

    pub fn insert(&mut self, key: EdgeKey, edge: RelationEdge) {
        self.edges.insert(key, edge.clamped());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &RelationEdge)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Postures of every stored edge
    pub fn postures(&self) -> PostureMap {
        self.edges.iter().map(|(key, edge)| (*key, edge.posture())).collect()
    }
}

/// Relation meters for every border at game start
pub fn init_relations(seed: u64, scenario: &Scenario) -> RelationGraph {
    let mut graph = RelationGraph::new();

    for key in scenario.edges() {
        let (a, b) = (key.low(), key.high());
        let mut rng = pair_init_rng(seed, a, b);
        let gaussianish = (rng.next_f64() + rng.next_f64() + rng.next_f64()) / 3.0;
        let mut rel = round_half_up((gaussianish - 0.5) * 60.0) as i32;
        if scenario.same_region(a, b) {
            rel += 5;
        }
        let rel = rel.clamp(-30, 30);
        let tension = 5 + (rng.next_f64() * 16.0).floor() as i32;
        let trust = 40 + (rng.next_f64() * 21.0).floor() as i32;

        graph.insert(*key, RelationEdge::new(rel, tension, trust));
    }

    graph
}

/// Everything one edge update depends on besides the edge itself
#[derive(Clone, Copy, Debug)]
pub struct EdgeStepContext {
    pub turn: Turn,
    pub power_a: f64,
    pub power_b: f64,
    /// An economic shock hit either endpoint this turn
    pub shock_nearby: bool,
    pub inputs_a: RelationInputs,
    pub inputs_b: RelationInputs,
    /// Uniform roll in [0, 1) deciding random incidents
    pub roll: f64,
}

/// Advance a single edge by one turn
pub fn step_edge(prev: &RelationEdge, ctx: &EdgeStepContext) -> (RelationEdge, Option<RelationIncident>) {
    // Modifiers count this turn, then tick down
    let (mut mod_rel, mut mod_tension, mut mod_trust) = (0, 0, 0);
    let mut next_modifiers = Vec::with_capacity(prev.modifiers.len() + 1);
    for modifier in &prev.modifiers {
        mod_rel += modifier.rel;
        mod_tension += modifier.tension;
        mod_trust += modifier.trust;
        if modifier.turns > 1 {
            next_modifiers.push(RelationModifier {
                turns: modifier.turns - 1,
                ..modifier.clone()
            });
        }
    }

    let reversion = (round_half_up(-f64::from(prev.rel) * 0.02) as i32).clamp(-1, 1);
    let mut rel = prev.rel + reversion;
    let mut tension = prev.tension;
    let mut trust = prev.trust;

    let denom = ctx.power_a.max(ctx.power_b).max(1.0);
    let imbalance = (ctx.power_a - ctx.power_b) / denom;

    let mut tension_delta = if rel < 0 { 1 } else { -1 }
        + i32::from(imbalance.abs() > 0.35)
        + i32::from(trust < 35)
        + i32::from(tension > 80)
        + i32::from(ctx.shock_nearby);

    let mut rel_delta = -i32::from(tension > 75) + i32::from(tension < 20 && trust > 60);

    let mut trust_delta = i32::from(rel > 25 && tension < 35) - i32::from(tension > 70) - i32::from(rel < -35);

    for inputs in [ctx.inputs_a, ctx.inputs_b] {
        rel_delta += inputs.rel_delta;
        tension_delta += inputs.tension_delta;
        trust_delta += inputs.trust_delta;
    }

    let incident = RelationIncident::from_roll(ctx.roll);
    if let Some(incident) = incident {
        let (d_rel, d_tension, d_trust) = incident.impact();
        rel += d_rel;
        tension += d_tension;
        trust += d_trust;
        next_modifiers.push(incident.aftermath());
    }

    rel += rel_delta + mod_rel;
    tension += tension_delta + mod_tension;
    trust += trust_delta + mod_trust;

    let edge = RelationEdge {
        rel,
        tension,
        trust,
        last_turn_updated: ctx.turn,
        modifiers: next_modifiers,
    }
    .clamped();

    (edge, incident)
}

/// Result of stepping the whole graph
#[derive(Clone, Debug, Default)]
pub struct RelationStep {
    pub relations: RelationGraph,
    pub postures: PostureMap,
    /// One event per edge that rolled an incident, in edge order
    pub events: Vec<Event>,
}

/// Advance every border edge by one turn
///
/// `events` are the events already produced this turn; economic shocks among
/// them raise tension on the affected countries' borders.
pub fn step_relations(
    turn: Turn,
    seed: u64,
    scenario: &Scenario,
    relations: &RelationGraph,
    countries: &BTreeMap<CountryCode, CountryState>,
    events: &[Event],
    inputs: &BTreeMap<CountryCode, RelationInputs>,
) -> RelationStep {
    let shocked: AHashSet<CountryCode> = events.iter().filter(|e| e.is_shock()).map(|e| e.actor).collect();
    let power = |code: CountryCode| countries.get(&code).map_or(0.0, |c| c.power);
    let inputs_of = |code: CountryCode| inputs.get(&code).copied().unwrap_or_default();

    let mut step = RelationStep::default();
    let default_edge = RelationEdge::default();

    for key in scenario.edges() {
        let (a, b) = (key.low(), key.high());
        let prev = relations.get_by_key(key).unwrap_or(&default_edge);
        let ctx = EdgeStepContext {
            turn,
            power_a: power(a),
            power_b: power(b),
            shock_nearby: shocked.contains(&a) || shocked.contains(&b),
            inputs_a: inputs_of(a),
            inputs_b: inputs_of(b),
            roll: pair_event_rng(seed, turn, a, b).next_f64(),
        };

        let (edge, incident) = step_edge(prev, &ctx);
        if let Some(incident) = incident {
            tracing::trace!(edge = %key, %incident, turn, "relation incident");
            step.events.push(Event::new(turn, a, Some(b), EventKind::Incident { incident }));
        }
        step.postures.insert(*key, edge.posture());
        step.relations.insert(*key, edge);
    }

    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimConfig;
    use crate::world::{Adjacency, CountryFacts};

    fn code(s: &str) -> CountryCode {
        CountryCode::parse(s).unwrap()
    }

    fn quiet_ctx() -> EdgeStepContext {
        EdgeStepContext {
            turn: 1,
            power_a: 100.0,
            power_b: 100.0,
            shock_nearby: false,
            inputs_a: RelationInputs::default(),
            inputs_b: RelationInputs::default(),
            roll: 0.5,
        }
    }

    fn europe() -> Scenario {
        let region = |c: &str| if c == "MAR" { "Africa" } else { "Europe" };
        let codes = ["AUT", "CHE", "DEU", "ESP", "FRA", "ITA", "MAR", "POL"];
        let facts: Vec<CountryFacts> = codes.iter().map(|c| CountryFacts::new(code(c), *c, region(c))).collect();
        let links = [
            ("AUT", "CHE"),
            ("AUT", "DEU"),
            ("AUT", "ITA"),
            ("CHE", "DEU"),
            ("CHE", "FRA"),
            ("CHE", "ITA"),
            ("DEU", "FRA"),
            ("DEU", "POL"),
            ("ESP", "FRA"),
            ("ESP", "MAR"),
            ("FRA", "ITA"),
        ];
        let mut adjacency = Adjacency::new();
        for (a, b) in links {
            adjacency.entry(code(a)).or_default().push(code(b));
        }
        Scenario::new(facts, &adjacency, SimConfig::default())
    }

    #[test]
    fn test_posture_thresholds() {
        assert_eq!(Posture::classify(-40, 0), Posture::Hostile);
        assert_eq!(Posture::classify(50, 70), Posture::Hostile);
        assert_eq!(Posture::classify(40, 39), Posture::Friendly);
        assert_eq!(Posture::classify(40, 40), Posture::Wary);
        assert_eq!(Posture::classify(39, 0), Posture::Wary);
        assert_eq!(Posture::classify(-39, 69), Posture::Wary);
    }

    #[test]
    fn test_incident_bands() {
        assert_eq!(RelationIncident::from_roll(0.0), Some(RelationIncident::BorderIncident));
        assert_eq!(RelationIncident::from_roll(0.0025), Some(RelationIncident::TradeDeal));
        assert_eq!(RelationIncident::from_roll(0.006), Some(RelationIncident::Sanctions));
        assert_eq!(RelationIncident::from_roll(0.0089), Some(RelationIncident::JointExercise));
        assert_eq!(RelationIncident::from_roll(0.009), None);
        assert_eq!(RelationIncident::from_roll(0.99), None);
    }

    #[test]
    fn test_init_relations_matches_reference_values() {
        let graph = init_relations(202501, &europe());
        let expected = [
            ("AUT", "CHE", 1, 15, 52),
            ("AUT", "DEU", 14, 5, 49),
            ("AUT", "ITA", 4, 15, 50),
            ("CHE", "DEU", 17, 6, 47),
            ("CHE", "FRA", -11, 10, 53),
            ("CHE", "ITA", 26, 15, 53),
            ("DEU", "FRA", -3, 8, 40),
            ("DEU", "POL", 22, 14, 59),
            ("ESP", "FRA", -3, 18, 56),
            ("ESP", "MAR", -13, 10, 48),
            ("FRA", "ITA", 11, 8, 53),
        ];

        assert_eq!(graph.len(), expected.len());
        for (a, b, rel, tension, trust) in expected {
            let edge = graph.get(code(b), code(a)).unwrap();
            assert_eq!((edge.rel, edge.tension, edge.trust), (rel, tension, trust), "{a}|{b}");
            assert!(edge.modifiers.is_empty());
        }
    }

    #[test]
    fn test_quiet_step_hand_computed() {
        // rel 10 -> reversion round(-0.2) = 0; tension delta -1 (rel >= 0);
        // trust 50, tension 20: no rel or trust delta
        let prev = RelationEdge::new(10, 20, 50);
        let (edge, incident) = step_edge(&prev, &quiet_ctx());
        assert_eq!(incident, None);
        assert_eq!((edge.rel, edge.tension, edge.trust), (10, 19, 50));
        assert_eq!(edge.last_turn_updated, 1);
    }

    #[test]
    fn test_hostile_step_hand_computed() {
        // rel -50 -> reversion round(1.0) = +1 -> -49
        // tension 85: +1 (rel<0) +1 (imbalance 0.5) +1 (trust<35) +1 (>80) +1 (shock) = +5
        // rel delta: -1 (tension > 75); trust delta: -1 (tension>70) -1 (rel<-35)
        let prev = RelationEdge::new(-50, 85, 30);
        let ctx = EdgeStepContext {
            power_a: 200.0,
            power_b: 100.0,
            shock_nearby: true,
            ..quiet_ctx()
        };
        let (edge, _) = step_edge(&prev, &ctx);
        assert_eq!((edge.rel, edge.tension, edge.trust), (-50, 90, 28));
    }

    #[test]
    fn test_friendly_step_with_stance_inputs() {
        // rel 30 -> round(-0.6) = -1 -> 29; tension 10 -> -1;
        // rel delta +1 (tension<20 && trust>60); trust delta +1 (rel>25 && tension<35)
        // conciliatory on both sides: trust +2
        let prev = RelationEdge::new(30, 10, 70);
        let conciliatory = RelationInputs {
            trust_delta: 1,
            ..RelationInputs::default()
        };
        let ctx = EdgeStepContext {
            inputs_a: conciliatory,
            inputs_b: conciliatory,
            ..quiet_ctx()
        };
        let (edge, _) = step_edge(&prev, &ctx);
        assert_eq!((edge.rel, edge.tension, edge.trust), (30, 9, 73));
    }

    #[test]
    fn test_modifiers_fold_in_and_decay() {
        let mut prev = RelationEdge::new(0, 50, 50);
        prev.modifiers.push(RelationModifier::new(2, -1, 1, 2, "lasting"));
        prev.modifiers.push(RelationModifier::new(1, 1, 1, 1, "expiring"));

        let (edge, _) = step_edge(&prev, &quiet_ctx());
        // rel 0 + 0 reversion + 3 modifiers; tension 50 -1 (rel>=0) + 0; trust 50 + 2
        assert_eq!((edge.rel, edge.tension, edge.trust), (3, 49, 52));
        assert_eq!(edge.modifiers.len(), 1);
        assert_eq!(edge.modifiers[0].turns, 1);
        assert_eq!(edge.modifiers[0].text, "lasting");
    }

    #[test]
    fn test_incident_applies_impact_and_leaves_modifier() {
        let prev = RelationEdge::new(0, 30, 50);
        let ctx = EdgeStepContext {
            roll: 0.001,
            ..quiet_ctx()
        };
        let (edge, incident) = step_edge(&prev, &ctx);
        assert_eq!(incident, Some(RelationIncident::BorderIncident));
        // rel 0 - 10; tension 30 + 15 - 1
        assert_eq!((edge.rel, edge.tension, edge.trust), (-10, 44, 50));
        assert_eq!(edge.modifiers, vec![RelationIncident::BorderIncident.aftermath()]);
    }

    #[test]
    fn test_step_clamps_to_bounds() {
        let prev = RelationEdge::new(-100, 100, 0);
        let ctx = EdgeStepContext {
            roll: 0.001,
            shock_nearby: true,
            ..quiet_ctx()
        };
        let (edge, _) = step_edge(&prev, &ctx);
        assert!(edge.in_bounds());
        assert_eq!(edge.tension, 100);
        assert_eq!(edge.trust, 0);
    }

    #[test]
    fn test_step_relations_is_deterministic_and_covers_every_edge() {
        let scenario = europe();
        let graph = init_relations(7, &scenario);
        let countries = BTreeMap::new();
        let inputs = BTreeMap::new();

        let first = step_relations(1, 7, &scenario, &graph, &countries, &[], &inputs);
        let second = step_relations(1, 7, &scenario, &graph, &countries, &[], &inputs);

        assert_eq!(first.relations, second.relations);
        assert_eq!(first.events, second.events);
        assert_eq!(first.relations.len(), scenario.edges().len());
        assert_eq!(first.postures.len(), scenario.edges().len());
    }

    #[test]
    fn test_missing_edge_uses_default() {
        let scenario = europe();
        let step = step_relations(1, 1, &scenario, &RelationGraph::new(), &BTreeMap::new(), &[], &BTreeMap::new());
        assert_eq!(step.relations.len(), scenario.edges().len());
        assert!(step.relations.iter().all(|(_, e)| e.in_bounds()));
    }

    #[test]
    fn test_graph_lookup_is_symmetric() {
        let mut graph = RelationGraph::new();
        assert!(graph.set(code("POL"), code("DEU"), RelationEdge::new(150, -5, 40)));
        assert!(!graph.set(code("POL"), code("POL"), RelationEdge::default()));

        let edge = graph.get(code("DEU"), code("POL")).unwrap();
        assert_eq!(edge, graph.get(code("POL"), code("DEU")).unwrap());
        assert_eq!((edge.rel, edge.tension), (100, 0));
    }
}
