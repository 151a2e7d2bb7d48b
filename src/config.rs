use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tunables of one column-generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Numerical tolerance: master quantities below it are treated as zero, and a
    /// pricing value must beat the column cost by more than it.
    pub epsilon: f64,
    /// Objective coefficient of every pattern in the master problem. It is also
    /// the reduced-cost threshold a new pattern's pricing value must exceed.
    pub bar_cost: f64,
    /// Optional safety bound on pattern-generation iterations. `None` means the
    /// loop runs until the pricing problem certifies optimality.
    pub max_iterations: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            epsilon: 1e-6,
            bar_cost: 1.0,
            max_iterations: None,
        }
    }
}

impl Settings {
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(Error::InvalidInput(format!(
                "epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        if !(self.bar_cost.is_finite() && self.bar_cost > 0.0) {
            return Err(Error::InvalidInput(format!(
                "bar cost must be a positive number, got {}",
                self.bar_cost
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.bar_cost, 1.0);
        assert_eq!(settings.max_iterations, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let settings = Settings {
            bar_cost: 0.0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
        let settings = Settings {
            epsilon: -1.0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"max_iterations": 5}"#).unwrap();
        assert_eq!(settings.max_iterations, Some(5));
        assert_eq!(settings.bar_cost, 1.0);
    }
}
