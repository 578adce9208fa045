pub mod config;
pub mod error;
pub mod rng;
pub mod types;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use types::{CountryCode, EdgeKey, Turn};
