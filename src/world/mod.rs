//! Static scenario data: country facts, neighbour adjacency and the border edge list
//!
//! A `Scenario` is built once per game and shared read-only (behind an `Arc`)
//! by every simulation state derived from it.

pub mod country;
pub mod loader;
pub mod synthetic;

use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::SimConfig;
use crate::core::types::{CountryCode, EdgeKey};

pub use country::CountryFacts;
pub use loader::{load_countries_json, load_neighbours_json, load_scenario};
pub use synthetic::generate_scenario;

/// Neighbour adjacency as supplied by the border pipeline
pub type Adjacency = BTreeMap<CountryCode, Vec<CountryCode>>;

/// Immutable game setup
#[derive(Debug, Clone)]
pub struct Scenario {
    countries: BTreeMap<CountryCode, CountryFacts>,
    neighbours: BTreeMap<CountryCode, Vec<CountryCode>>,
    edges: Vec<EdgeKey>,
    config: SimConfig,
}

impl Scenario {
    /// Build a scenario, normalising the adjacency
    ///
    /// Self-links and links to unknown countries are dropped, every link is
    /// made symmetric, and neighbour lists are deduplicated and sorted. The
    /// edge list is the sorted set of unordered pairs.
    pub fn new(
        countries: impl IntoIterator<Item = CountryFacts>,
        adjacency: &Adjacency,
        config: SimConfig,
    ) -> Self {
        let countries: BTreeMap<CountryCode, CountryFacts> = countries
            .into_iter()
            .map(|facts| (facts.code, facts.sanitized()))
            .collect();

        let mut edge_set = BTreeSet::new();
        let mut dropped = 0usize;
        for (&a, list) in adjacency {
            if !countries.contains_key(&a) {
                dropped += list.len();
                continue;
            }
            for &b in list {
                match EdgeKey::new(a, b) {
                    Some(key) if countries.contains_key(&b) => {
                        edge_set.insert(key);
                    }
                    _ => dropped += 1,
                }
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "ignored neighbour links to unknown countries or self");
        }

        let mut neighbours: BTreeMap<CountryCode, Vec<CountryCode>> =
            countries.keys().map(|&code| (code, Vec::new())).collect();
        for key in &edge_set {
            if let Some(list) = neighbours.get_mut(&key.low()) {
                list.push(key.high());
            }
            if let Some(list) = neighbours.get_mut(&key.high()) {
                list.push(key.low());
            }
        }
        for list in neighbours.values_mut() {
            list.sort();
        }

        Self {
            countries,
            neighbours,
            edges: edge_set.into_iter().collect(),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn countries(&self) -> &BTreeMap<CountryCode, CountryFacts> {
        &self.countries
    }

    pub fn country(&self, code: CountryCode) -> Option<&CountryFacts> {
        self.countries.get(&code)
    }

    pub fn contains(&self, code: CountryCode) -> bool {
        self.countries.contains_key(&code)
    }

    /// Country codes in lexicographic order
    pub fn codes(&self) -> impl Iterator<Item = CountryCode> + '_ {
        self.countries.keys().copied()
    }

    /// Sorted neighbour codes; empty for isolated or unknown countries
    pub fn neighbours(&self, code: CountryCode) -> &[CountryCode] {
        self.neighbours.get(&code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stable, sorted list of border edges
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    pub fn are_adjacent(&self, a: CountryCode, b: CountryCode) -> bool {
        EdgeKey::new(a, b).is_some_and(|key| self.edges.binary_search(&key).is_ok())
    }

    pub fn population(&self, code: CountryCode) -> f64 {
        self.country(code).map_or(0.0, |facts| facts.population)
    }

    pub fn same_region(&self, a: CountryCode, b: CountryCode) -> bool {
        match (self.country(a), self.country(b)) {
            (Some(x), Some(y)) => x.same_region(y),
            _ => false,
        }
    }
}
