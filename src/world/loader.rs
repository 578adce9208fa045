//! Load country facts and neighbour adjacency from JSON
//!
//! Accepts the payloads produced by the data pipeline: a country index keyed
//! by code (or an array of records carrying `cca3`), with economic figures
//! either at the top level or nested under `indicators`, and a neighbours map
//! optionally wrapped as `{"neighbours": {...}}`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::core::config::SimConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::CountryCode;
use crate::world::country::{CountryFacts, DEFAULT_MILITARY_PCT_GDP};
use crate::world::{Adjacency, Scenario};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawCountry {
    cca3: Option<String>,
    name: Option<RawName>,
    region: Option<String>,
    subregion: Option<String>,
    population: Option<f64>,
    gdp: Option<f64>,
    #[serde(alias = "military_pct_gdp")]
    military_percent_gdp: Option<f64>,
    indicators: Option<RawIndicators>,
    bbox: Option<[f64; 4]>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawName {
    Plain(String),
    Nested { common: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawIndicators {
    gdp: Option<f64>,
    military_percent_gdp: Option<f64>,
    population: Option<f64>,
}

impl RawCountry {
    fn into_facts(self, code: CountryCode) -> CountryFacts {
        let indicators = self.indicators.unwrap_or_default();
        let name = match self.name {
            Some(RawName::Plain(name)) | Some(RawName::Nested { common: name }) => name,
            None => code.to_string(),
        };

        CountryFacts {
            code,
            name,
            region: self.region.unwrap_or_default(),
            subregion: self.subregion,
            population: self.population.or(indicators.population).unwrap_or(0.0),
            gdp: indicators.gdp.or(self.gdp).unwrap_or(0.0),
            military_pct_gdp: indicators
                .military_percent_gdp
                .or(self.military_percent_gdp)
                .unwrap_or(DEFAULT_MILITARY_PCT_GDP),
            bbox: self.bbox,
        }
        .sanitized()
    }
}

fn parse_country(key: Option<&str>, value: &Value) -> Option<CountryFacts> {
    let raw: RawCountry = match serde_json::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(?key, %err, "skipping malformed country record");
            return None;
        }
    };
    let code_text = raw.cca3.clone().or_else(|| key.map(str::to_string))?;
    match CountryCode::parse(&code_text) {
        Ok(code) => Some(raw.into_facts(code)),
        Err(err) => {
            tracing::warn!(%err, "skipping country with invalid code");
            None
        }
    }
}

/// Parse a country index payload
pub fn load_countries_json(json: &str) -> Result<Vec<CountryFacts>> {
    let value: Value = serde_json::from_str(json)?;
    let mut facts = match &value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, record)| parse_country(Some(key), record))
            .collect::<Vec<_>>(),
        Value::Array(items) => items
            .iter()
            .filter_map(|record| parse_country(None, record))
            .collect::<Vec<_>>(),
        _ => {
            return Err(SimError::InvalidDataset(
                "country index must be an object or an array".into(),
            ))
        }
    };

    facts.sort_by_key(|f| f.code);
    facts.dedup_by_key(|f| f.code);
    Ok(facts)
}

/// Parse a neighbours payload into an adjacency map
///
/// Unparseable codes are skipped; symmetry is restored later by `Scenario::new`.
pub fn load_neighbours_json(json: &str) -> Result<Adjacency> {
    let value: Value = serde_json::from_str(json)?;
    let map = match value.get("neighbours").unwrap_or(&value) {
        Value::Object(map) => map.clone(),
        _ => {
            return Err(SimError::InvalidDataset(
                "neighbours payload must be an object".into(),
            ))
        }
    };

    let mut adjacency = Adjacency::new();
    for (key, list) in &map {
        let Ok(code) = CountryCode::parse(key) else {
            tracing::warn!(key = %key, "skipping neighbour entry with invalid code");
            continue;
        };
        let neighbours: Vec<CountryCode> = list
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|raw| CountryCode::parse(raw).ok())
                    .collect()
            })
            .unwrap_or_default();
        adjacency.entry(code).or_default().extend(neighbours);
    }
    Ok(adjacency)
}

/// Load a full scenario from a country index file and a neighbours file
pub fn load_scenario(countries_path: &Path, neighbours_path: &Path, config: SimConfig) -> Result<Scenario> {
    let countries = load_countries_json(&std::fs::read_to_string(countries_path)?)?;
    if countries.is_empty() {
        return Err(SimError::InvalidDataset(format!(
            "no usable countries in {}",
            countries_path.display()
        )));
    }
    let adjacency = load_neighbours_json(&std::fs::read_to_string(neighbours_path)?)?;
    tracing::info!(
        countries = countries.len(),
        linked = adjacency.len(),
        "loaded scenario data"
    );
    Ok(Scenario::new(countries, &adjacency, config))
}
