//! Total War Sim - deterministic turn-based geopolitical simulation

pub mod core;
pub mod sim;
pub mod world;

pub use crate::core::{CountryCode, EdgeKey, Result, SimConfig, SimError, Turn};
pub use crate::sim::{simulate_turn, simulate_turns, Checksum, SimState};
pub use crate::world::Scenario;
