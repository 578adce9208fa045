//! Static per-country facts that seed a game

use serde::{Deserialize, Serialize};

use crate::core::types::CountryCode;

/// Military share of GDP assumed when a dataset omits it
pub const DEFAULT_MILITARY_PCT_GDP: f64 = 2.0;

/// Immutable facts about a country, loaded once per game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountryFacts {
    pub code: CountryCode,
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub subregion: Option<String>,
    pub population: f64,
    /// Baseline GDP (current USD)
    pub gdp: f64,
    /// Baseline military expenditure as % of GDP
    pub military_pct_gdp: f64,
    /// Geographic bounding box `[min_lon, min_lat, max_lon, max_lat]`, passed through untouched
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}

impl CountryFacts {
    pub fn new(code: CountryCode, name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            region: region.into(),
            subregion: None,
            population: 0.0,
            gdp: 0.0,
            military_pct_gdp: DEFAULT_MILITARY_PCT_GDP,
            bbox: None,
        }
    }

    pub fn with_population(mut self, population: f64) -> Self {
        self.population = population;
        self
    }

    pub fn with_gdp(mut self, gdp: f64) -> Self {
        self.gdp = gdp;
        self
    }

    pub fn with_military_pct(mut self, military_pct_gdp: f64) -> Self {
        self.military_pct_gdp = military_pct_gdp;
        self
    }

    pub fn same_region(&self, other: &CountryFacts) -> bool {
        !self.region.is_empty() && self.region == other.region
    }

    /// Replace non-finite or negative figures so the simulation only ever sees sane inputs
    pub(crate) fn sanitized(mut self) -> Self {
        if !self.population.is_finite() || self.population < 0.0 {
            self.population = 0.0;
        }
        if !self.gdp.is_finite() || self.gdp < 0.0 {
            self.gdp = 0.0;
        }
        if !self.military_pct_gdp.is_finite() || self.military_pct_gdp < 0.0 {
            self.military_pct_gdp = DEFAULT_MILITARY_PCT_GDP;
        }
        self
    }
}
