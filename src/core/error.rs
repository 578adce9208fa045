use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Unknown country: {0}")]
    UnknownCountry(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invariant violated: {0}")]
    Invariant(#[from] crate::sim::audit::InvariantViolation),
}

pub type Result<T> = std::result::Result<T, SimError>;
