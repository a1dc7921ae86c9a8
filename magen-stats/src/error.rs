//! Statistics error types

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("flavor or name must be provided")]
    MissingNameOrFlavor,

    #[error("Unknown flavor: {flavor_type}.{flavor_opt}")]
    UnknownFlavor {
        flavor_type: String,
        flavor_opt: String,
    },

    /// Flavor string not of the form `Type.OPTION`
    #[error("Invalid flavor string: {0}")]
    InvalidFlavor(String),
}

pub type StatsResult<T> = Result<T, StatsError>;
