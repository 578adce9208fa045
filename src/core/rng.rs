//! Keyed deterministic random streams
//!
//! Every random draw in the simulation comes from a fresh stream whose seed is
//! the FNV-1a hash of a composite key such as `"{seed}:{turn}:{code}:{channel}"`.
//! No generator state is shared across countries, edges or turns, so a draw is
//! reproducible from its key alone regardless of iteration order.

use rand::RngCore;

use crate::core::types::{CountryCode, Turn};

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over the UTF-16 code units of `input`
pub fn hash_string(input: &str) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for unit in input.encode_utf16() {
        h ^= u32::from(unit);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Unordered pair key `"AAA|BBB"` with the codes sorted
pub fn pair_key(a: CountryCode, b: CountryCode) -> String {
    if a < b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

/// mulberry32 counter-based generator
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from the hash of a composite key
    pub fn from_key(key: &str) -> Self {
        Self::new(hash_string(key))
    }

    /// Uniform float in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32());
        let lo = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Per-country, per-turn stream on a named channel
pub fn country_turn_rng(seed: u64, turn: Turn, code: CountryCode, channel: &str) -> Mulberry32 {
    Mulberry32::from_key(&format!("{seed}:{turn}:{code}:{channel}"))
}

/// Stream used once per edge when relations are initialised
pub fn pair_init_rng(seed: u64, a: CountryCode, b: CountryCode) -> Mulberry32 {
    Mulberry32::from_key(&format!("pair:{seed}:{}", pair_key(a, b)))
}

/// Stream used for the per-turn random incident roll of an edge
pub fn pair_event_rng(seed: u64, turn: Turn, a: CountryCode, b: CountryCode) -> Mulberry32 {
    Mulberry32::from_key(&format!("evt:{seed}:{turn}:{}", pair_key(a, b)))
}
