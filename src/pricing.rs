//! The pricing problem: given shadow prices, find the single-bar pattern of
//! greatest total value.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::error::Result;
use crate::lp::{ComparisonOp, LinearModel, LpSolver, Sense, VarDomain};
use crate::types::{Problem, ShadowPrices};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingOutcome {
    /// Counts of the improving pattern, or `None` when no pattern beats the cost
    /// of a bar.
    pub pattern: Option<IndexMap<String, u32>>,
    /// Shadow-price value of the best pattern found.
    pub value: f64,
}

impl PricingOutcome {
    pub fn is_improving(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Value of a bar cut with `counts` under the given prices.
pub fn pattern_value(counts: &IndexMap<String, u32>, prices: &ShadowPrices) -> f64 {
    counts
        .iter()
        .map(|(id, &n)| prices.get(id).copied().unwrap_or(0.0) * f64::from(n))
        .sum()
}

/// Solve the knapsack `max sum(price * n) s.t. sum(length * n) <= bar size` over
/// non-negative integer counts. A pattern is only proposed when its value is
/// strictly greater than the bar cost, i.e. its reduced cost is negative.
pub fn solve_pricing<S: LpSolver>(
    problem: &Problem,
    prices: &ShadowPrices,
    settings: &Settings,
    solver: &S,
) -> Result<PricingOutcome> {
    let mut model = LinearModel::new(Sense::Maximize);
    let vars: Vec<_> = problem
        .products()
        .iter()
        .map(|p| {
            let price = prices.get(&p.id).copied().unwrap_or(0.0);
            let bound = f64::from(p.max_per_bar(problem.bar_size()));
            (p, model.add_var(VarDomain::Integer, (0.0, bound), price))
        })
        .collect();
    model.add_constraint(
        vars.iter().map(|&(p, var)| (var, p.length)),
        ComparisonOp::Le,
        problem.bar_size(),
    );

    let solution = solver.solve(&model)?;
    let mut counts: IndexMap<String, u32> = IndexMap::new();
    for &(p, var) in &vars {
        let n = solution.value(var)?.round().max(0.0) as u32;
        if n > 0 {
            counts.insert(p.id.clone(), n);
        }
    }
    let value = pattern_value(&counts, prices);

    debug!(value, solver_objective = solution.objective, ?counts, "pricing solved");
    let pattern = (value > settings.bar_cost + settings.epsilon).then_some(counts);
    Ok(PricingOutcome { pattern, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::lp::{LpError, LpSolution, MicroLpSolver};
    use crate::types::Product;

    fn prices(entries: &[(&str, f64)]) -> ShadowPrices {
        entries.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    /// Best value over every feasible count vector, by enumeration.
    fn brute_force(problem: &Problem, prices: &ShadowPrices) -> f64 {
        fn go(problem: &Problem, prices: &ShadowPrices, idx: usize, room: f64, acc: f64) -> f64 {
            let Some(p) = problem.products().get(idx) else {
                return acc;
            };
            let price = prices.get(&p.id).copied().unwrap_or(0.0);
            let mut best = f64::NEG_INFINITY;
            let mut n = 0.0;
            while n * p.length <= room + 1e-9 {
                best = best.max(go(problem, prices, idx + 1, room - n * p.length, acc + n * price));
                n += 1.0;
            }
            best
        }
        go(problem, prices, 0, problem.bar_size(), 0.0)
    }

    fn sample() -> Problem {
        Problem::new(
            vec![Product::new("A", 3.0, 5.0), Product::new("B", 4.0, 3.0)],
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_finds_mixed_pattern() {
        let problem = sample();
        let p = prices(&[("A", 1.0 / 3.0), ("B", 0.5)]);
        let outcome = solve_pricing(&problem, &p, &Settings::default(), &MicroLpSolver::new()).unwrap();
        let pattern = outcome.pattern.unwrap();
        assert_eq!(pattern.get("A"), Some(&2));
        assert_eq!(pattern.get("B"), Some(&1));
        assert!((outcome.value - 7.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_solution_is_a_solver_error() {
        struct EmptySolver;
        impl LpSolver for EmptySolver {
            fn solve(&self, _model: &LinearModel) -> std::result::Result<LpSolution, LpError> {
                Ok(LpSolution { values: Vec::new(), objective: 2.0, duals: None })
            }
        }

        let problem = sample();
        let p = prices(&[("A", 1.0 / 3.0), ("B", 0.5)]);
        let err = solve_pricing(&problem, &p, &Settings::default(), &EmptySolver).unwrap_err();
        assert!(matches!(err, Error::Solver(LpError::Backend(_))));
    }

    #[test]
    fn test_no_pattern_when_value_below_one() {
        let problem = sample();
        let p = prices(&[("A", 0.1), ("B", 0.2)]);
        let outcome = solve_pricing(&problem, &p, &Settings::default(), &MicroLpSolver::new()).unwrap();
        assert!(!outcome.is_improving());
        assert!(outcome.value <= 1.0);
    }

    #[test]
    fn test_value_exactly_one_is_not_improving() {
        let problem = Problem::new(vec![Product::new("A", 10.0, 4.0)], 10.0).unwrap();
        let p = prices(&[("A", 1.0)]);
        let outcome = solve_pricing(&problem, &p, &Settings::default(), &MicroLpSolver::new()).unwrap();
        assert!(outcome.pattern.is_none());
        assert!((outcome.value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_follows_bar_cost() {
        let problem = sample();
        let p = prices(&[("A", 1.0 / 3.0), ("B", 0.5)]);
        let settings = Settings {
            bar_cost: 2.0,
            ..Settings::default()
        };
        let outcome = solve_pricing(&problem, &p, &settings, &MicroLpSolver::new()).unwrap();
        assert!(outcome.pattern.is_none());
    }

    #[test]
    fn test_matches_brute_force() {
        let problem = Problem::new(
            vec![
                Product::new("A", 3.0, 1.0),
                Product::new("B", 5.0, 1.0),
                Product::new("C", 7.0, 1.0),
            ],
            17.0,
        )
        .unwrap();
        let cases = [
            prices(&[("A", 0.2), ("B", 0.3), ("C", 0.45)]),
            prices(&[("A", 0.35), ("B", 0.2), ("C", 0.1)]),
            prices(&[("A", 0.0), ("B", 0.5), ("C", 0.5)]),
        ];
        for p in &cases {
            let outcome = solve_pricing(&problem, p, &Settings::default(), &MicroLpSolver::new()).unwrap();
            let best = brute_force(&problem, p);
            assert!((outcome.value - best).abs() < 1e-6, "got {}, best {}", outcome.value, best);
        }
    }

    #[test]
    fn test_pattern_value_ignores_unknown_prices() {
        let counts = IndexMap::from([("A".to_string(), 2), ("Z".to_string(), 5)]);
        let p = prices(&[("A", 0.25)]);
        assert_eq!(pattern_value(&counts, &p), 0.5);
    }
}
