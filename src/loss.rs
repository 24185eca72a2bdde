pub mod dense;
pub mod sparse;

use std::str::FromStr;

use thiserror::Error;

pub use dense::CrossEntropy;
pub use sparse::SparseCrossEntropy;

/// Label value that marks a sample as contributing no loss and no gradient.
pub const DEFAULT_IGNORE_INDEX: i64 = -1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("loss reduction 'none' is not implemented")]
    UnreducedLoss,
    #[error("unknown loss reduction '{0}'")]
    UnknownReduction(String),
}

/// Whether the summed loss is divided by the total weight mass (`Mean`)
/// or left as-is (`Sum`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    #[default]
    Mean,
}

impl FromStr for Reduction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "none" => Err(ConfigError::UnreducedLoss),
            _ => Err(ConfigError::UnknownReduction(s.to_string())),
        }
    }
}
