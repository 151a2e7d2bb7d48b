//! One-dimensional cutting stock by column generation.
//!
//! A restricted master LP chooses how many bars to cut with each known pattern;
//! its shadow prices drive a knapsack pricing problem that proposes new patterns
//! until none can lower the bar count. The integer master is then solved once
//! over the final pattern pool.

pub mod column_generation;
pub mod config;
pub mod error;
pub mod input;
pub mod lp;
pub mod master;
pub mod pricing;
pub mod report;
pub mod types;

pub use column_generation::{ColumnGeneration, Outcome, Phase, optimize};
pub use config::Settings;
pub use error::{Error, Result};
pub use lp::{LpSolver, MicroLpSolver};
pub use types::{CuttingPattern, PatternPool, Problem, Product};
