//! Procedural scenario generation for benches, tests and offline runs

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimConfig;
use crate::core::types::CountryCode;
use crate::world::country::CountryFacts;
use crate::world::{Adjacency, Scenario};

const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

/// Chance that two grid-adjacent countries share a border
const LINK_CHANCE: f64 = 0.85;

/// Code for the `index`-th synthetic country: AAA, AAB, ..., ZZZ
pub fn synthetic_code(index: usize) -> CountryCode {
    let index = index % (26 * 26 * 26);
    let letters = [
        b'A' + (index / (26 * 26)) as u8,
        b'A' + ((index / 26) % 26) as u8,
        b'A' + (index % 26) as u8,
    ];
    let text = String::from_utf8_lossy(&letters).into_owned();
    CountryCode::parse(&text).unwrap_or_else(|_| unreachable!("generated codes are ASCII letters"))
}

/// Generate `count` countries laid out on a square grid with mostly-connected borders
pub fn generate_scenario(count: usize, seed: u64, config: SimConfig) -> Scenario {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let count = count.clamp(1, 26 * 26 * 26);
    let width = (count as f64).sqrt().ceil() as usize;

    let mut countries = Vec::with_capacity(count);
    for index in 0..count {
        let (x, y) = (index % width, index / width);
        let region = REGIONS[usize::from(x >= width / 2) + 2 * usize::from(y >= width / 2)];
        let code = synthetic_code(index);
        countries.push(
            CountryFacts::new(code, format!("Country {code}"), region)
                .with_population(10f64.powf(rng.gen_range(5.5..9.0)))
                .with_gdp(10f64.powf(rng.gen_range(9.5..13.5)))
                .with_military_pct(rng.gen_range(0.4..6.0)),
        );
    }

    let mut adjacency = Adjacency::new();
    for index in 0..count {
        let (x, y) = (index % width, index / width);
        let code = synthetic_code(index);
        let right = (x + 1 < width && index + 1 < count).then_some(index + 1);
        let down = (y + 1) * width + x;
        let down = (down < count).then_some(down);

        for other in [right, down].into_iter().flatten() {
            if rng.gen_bool(LINK_CHANCE) {
                adjacency.entry(code).or_default().push(synthetic_code(other));
            }
        }
    }

    Scenario::new(countries, &adjacency, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_codes() {
        assert_eq!(synthetic_code(0).as_str(), "AAA");
        assert_eq!(synthetic_code(1).as_str(), "AAB");
        assert_eq!(synthetic_code(26).as_str(), "ABA");
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_scenario(30, 7, SimConfig::default());
        let b = generate_scenario(30, 7, SimConfig::default());
        assert_eq!(a.edges(), b.edges());
        assert_eq!(a.countries(), b.countries());
        assert_eq!(a.countries().len(), 30);
    }

    #[test]
    fn test_generated_edges_connect_known_countries() {
        let scenario = generate_scenario(50, 3, SimConfig::default());
        assert!(!scenario.edges().is_empty());
        for key in scenario.edges() {
            assert!(scenario.contains(key.low()));
            assert!(scenario.contains(key.high()));
        }
    }
}
