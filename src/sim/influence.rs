//! Influence: the spendable diplomatic currency
//!
//! Every country gains a base amount each turn, plus a bonus for high
//! stability and a bonus for ranking in the top GDP percentile.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ahash::AHashSet;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::config::InfluenceConfig;
use crate::core::types::CountryCode;
use crate::sim::state::CountryState;

/// Countries ranked by GDP, richest first; ties by code
pub fn rank_by_gdp(countries: &BTreeMap<CountryCode, CountryState>) -> Vec<CountryCode> {
    let mut ranking: Vec<(CountryCode, f64)> = countries.iter().map(|(code, c)| (*code, c.gdp)).collect();
    ranking.sort_by_key(|(code, gdp)| (Reverse(OrderedFloat(*gdp)), *code));
    ranking.into_iter().map(|(code, _)| code).collect()
}

/// The top `max(1, ceil(N * percentile))` countries by GDP
pub fn top_gdp_set(countries: &BTreeMap<CountryCode, CountryState>, percentile: f64) -> AHashSet<CountryCode> {
    let ranking = rank_by_gdp(countries);
    let count = ((ranking.len() as f64 * percentile).ceil() as usize).max(1);
    ranking.into_iter().take(count).collect()
}

pub fn influence_gain(country: &CountryState, in_top_gdp: bool, config: &InfluenceConfig) -> i32 {
    let mut gain = config.base_gain;
    if country.stability >= config.stability_threshold {
        gain += config.stability_gain;
    }
    if in_top_gdp {
        gain += config.top_gdp_gain;
    }
    gain
}

pub fn apply_influence_gain(influence: i32, gain: i32, max_influence: i32) -> i32 {
    (influence.max(0) + gain).min(max_influence)
}

/// Accrue influence for every country
pub fn accrue_influence(countries: &mut BTreeMap<CountryCode, CountryState>, config: &InfluenceConfig) {
    let top = top_gdp_set(countries, config.top_gdp_percentile);
    for (code, country) in countries.iter_mut() {
        let gain = influence_gain(country, top.contains(code), config);
        country.influence = apply_influence_gain(country.influence, gain, config.max_influence);
    }
}

/// Which bonuses apply to a gain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GainReasons {
    pub base: bool,
    pub stability: bool,
    pub top_gdp_percentile: bool,
}

/// Preview of the influence a country would gain if a turn ran now
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluenceHint {
    pub gain: i32,
    pub next_influence: i32,
    pub max_influence: i32,
    pub reasons: GainReasons,
}

pub fn next_turn_gain_hint(
    countries: &BTreeMap<CountryCode, CountryState>,
    code: CountryCode,
    config: &InfluenceConfig,
) -> Option<InfluenceHint> {
    let country = countries.get(&code)?;
    let in_top = top_gdp_set(countries, config.top_gdp_percentile).contains(&code);
    let gain = influence_gain(country, in_top, config);

    Some(InfluenceHint {
        gain,
        next_influence: apply_influence_gain(country.influence, gain, config.max_influence),
        max_influence: config.max_influence,
        reasons: GainReasons {
            base: true,
            stability: country.stability >= config.stability_threshold,
            top_gdp_percentile: in_top,
        },
    })
}
