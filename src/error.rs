use thiserror::Error;

use crate::lp::LpError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A product cannot be cut even once from a bar.
    #[error("product '{product}' of length {length} does not fit in bar of size {bar_size}")]
    SeedPatternInfeasible {
        product: String,
        length: f64,
        bar_size: f64,
    },

    #[error("pattern {pattern} uses length {used} which exceeds bar size {bar_size}")]
    CapacityViolation {
        pattern: String,
        used: f64,
        bar_size: f64,
    },

    #[error("{stage} master problem is infeasible")]
    MasterInfeasible { stage: &'static str },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("solver failure: {0}")]
    Solver(#[from] LpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error was caused by the caller's data rather than a defect.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::SeedPatternInfeasible { .. } | Error::InvalidInput(_) | Error::Json(_)
        )
    }
}
