//! The restricted master problem: choose how many bars to cut with each known
//! pattern so that every product's demand is covered.

use indexmap::IndexMap;
use tracing::debug;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::lp::{ComparisonOp, LinearModel, LpError, LpSolver, Sense, VarDomain, VarId};
use crate::types::{IntegerSolution, PatternPool, Problem, RelaxedSolution, ShadowPrices};

struct MasterModel {
    model: LinearModel,
    /// Pattern id and its quantity variable, in pool order.
    vars: Vec<(String, VarId)>,
    /// Product id and the row index of its demand constraint.
    rows: Vec<(String, usize)>,
}

fn build(problem: &Problem, pool: &PatternPool, settings: &Settings, domain: VarDomain) -> MasterModel {
    let upper = match domain {
        VarDomain::Continuous => f64::INFINITY,
        VarDomain::Integer => integer_upper_bound(problem),
    };

    let mut model = LinearModel::new(Sense::Minimize);
    let vars: Vec<(String, VarId)> = pool
        .iter()
        .map(|pattern| {
            let var = model.add_var(domain, (0.0, upper), settings.bar_cost);
            (pattern.id.clone(), var)
        })
        .collect();

    let rows = problem
        .products()
        .iter()
        .map(|product| {
            let terms = pool
                .iter()
                .zip(&vars)
                .filter_map(|(pattern, &(_, var))| {
                    let n = pattern.count(&product.id);
                    (n > 0).then(|| (var, f64::from(n)))
                });
            let row = model.add_constraint(terms, ComparisonOp::Ge, product.demand);
            (product.id.clone(), row)
        })
        .collect();

    MasterModel { model, vars, rows }
}

/// No optimal integer plan cuts any single pattern more often than the plan that
/// covers every product with its own seed pattern uses bars in total.
fn integer_upper_bound(problem: &Problem) -> f64 {
    problem
        .products()
        .iter()
        .map(|p| (p.demand / f64::from(p.max_per_bar(problem.bar_size()).max(1))).ceil())
        .sum()
}

fn master_error(err: LpError, stage: &'static str) -> Error {
    match err {
        LpError::Infeasible => Error::MasterInfeasible { stage },
        other => Error::Solver(other),
    }
}

/// Solve the continuous relaxation and return the positive pattern quantities
/// together with the shadow price of every product's demand constraint.
pub fn solve_relaxed<S: LpSolver>(
    problem: &Problem,
    pool: &PatternPool,
    settings: &Settings,
    solver: &S,
) -> Result<(RelaxedSolution, ShadowPrices)> {
    let master = build(problem, pool, settings, VarDomain::Continuous);
    let solution = solver
        .solve(&master.model)
        .map_err(|err| master_error(err, "relaxed"))?;

    let mut quantities: IndexMap<String, f64> = IndexMap::new();
    for (id, var) in &master.vars {
        let q = solution.value(*var)?;
        if q > settings.epsilon {
            quantities.insert(id.clone(), q);
        }
    }

    let duals = solution
        .duals
        .as_ref()
        .ok_or_else(|| LpError::DualsUnavailable("relaxed master solve returned no duals".to_string()))?;
    // Demand rows of a minimization have non-negative duals; anything below is noise.
    let prices = master
        .rows
        .iter()
        .map(|(id, row)| {
            let dual = duals.get(*row).ok_or_else(|| {
                LpError::Backend(format!("no dual value returned for demand row of '{id}'"))
            })?;
            Ok((id.clone(), dual.max(0.0)))
        })
        .collect::<Result<ShadowPrices>>()?;

    debug!(objective = solution.objective, ?prices, "relaxed master solved");
    Ok((
        RelaxedSolution {
            quantities,
            objective: solution.objective,
        },
        prices,
    ))
}

/// Solve the master problem with integer quantities over the final pool.
pub fn solve_integer<S: LpSolver>(
    problem: &Problem,
    pool: &PatternPool,
    settings: &Settings,
    solver: &S,
) -> Result<IntegerSolution> {
    let master = build(problem, pool, settings, VarDomain::Integer);
    let solution = solver
        .solve(&master.model)
        .map_err(|err| master_error(err, "integer"))?;

    let mut quantities: IndexMap<String, u64> = IndexMap::new();
    for (id, var) in &master.vars {
        let q = solution.value(*var)?.round().max(0.0) as u64;
        if q > 0 {
            quantities.insert(id.clone(), q);
        }
    }
    let objective = settings.bar_cost * quantities.values().sum::<u64>() as f64;

    debug!(objective, "integer master solved");
    Ok(IntegerSolution {
        quantities,
        objective,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{LpSolution, MicroLpSolver};
    use crate::types::Product;

    fn sample() -> (Problem, PatternPool) {
        let problem = Problem::new(
            vec![Product::new("A", 3.0, 5.0), Product::new("B", 4.0, 3.0)],
            10.0,
        )
        .unwrap();
        let pool = PatternPool::initialize(&problem).unwrap();
        (problem, pool)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_relaxed_seed_pool() {
        let (problem, pool) = sample();
        let (solution, prices) =
            solve_relaxed(&problem, &pool, &Settings::default(), &MicroLpSolver::new()).unwrap();

        // 3 * x1 >= 5, 2 * x2 >= 3
        assert!(close(solution.quantities["P1"], 5.0 / 3.0));
        assert!(close(solution.quantities["P2"], 1.5));
        assert!(close(solution.objective, 5.0 / 3.0 + 1.5));
        assert!(close(prices["A"], 1.0 / 3.0));
        assert!(close(prices["B"], 0.5));
    }

    #[test]
    fn test_integer_seed_pool_covers_demand() {
        let (problem, pool) = sample();
        let solution =
            solve_integer(&problem, &pool, &Settings::default(), &MicroLpSolver::new()).unwrap();
        assert_eq!(solution.quantities["P1"], 2);
        assert_eq!(solution.quantities["P2"], 2);
        assert_eq!(solution.bar_count(), 4);
        assert!(close(solution.objective, 4.0));
    }

    #[test]
    fn test_zero_quantities_are_dropped() {
        let problem = Problem::new(
            vec![Product::new("A", 3.0, 6.0), Product::new("B", 4.0, 0.0)],
            10.0,
        )
        .unwrap();
        let pool = PatternPool::initialize(&problem).unwrap();
        let (relaxed, prices) =
            solve_relaxed(&problem, &pool, &Settings::default(), &MicroLpSolver::new()).unwrap();
        assert!(!relaxed.quantities.contains_key("P2"));
        assert!(close(prices["A"], 1.0 / 3.0));
        assert!(prices["B"] >= 0.0);

        let integer =
            solve_integer(&problem, &pool, &Settings::default(), &MicroLpSolver::new()).unwrap();
        assert_eq!(integer.quantities.len(), 1);
        assert_eq!(integer.quantities["P1"], 2);
    }

    struct InfeasibleSolver;

    impl LpSolver for InfeasibleSolver {
        fn solve(&self, _model: &LinearModel) -> std::result::Result<LpSolution, LpError> {
            Err(LpError::Infeasible)
        }
    }

    #[test]
    fn test_infeasible_maps_to_master_error() {
        let (problem, pool) = sample();
        let err = solve_relaxed(&problem, &pool, &Settings::default(), &InfeasibleSolver).unwrap_err();
        assert!(matches!(err, Error::MasterInfeasible { stage: "relaxed" }));
        let err = solve_integer(&problem, &pool, &Settings::default(), &InfeasibleSolver).unwrap_err();
        assert!(matches!(err, Error::MasterInfeasible { stage: "integer" }));
    }

    /// Answers every model with empty value and dual vectors.
    struct TruncatingSolver;

    impl LpSolver for TruncatingSolver {
        fn solve(&self, model: &LinearModel) -> std::result::Result<LpSolution, LpError> {
            Ok(LpSolution {
                values: Vec::new(),
                objective: 0.0,
                duals: (!model.has_integer_vars()).then(Vec::new),
            })
        }
    }

    #[test]
    fn test_short_solution_is_a_solver_error() {
        let (problem, pool) = sample();
        let err = solve_relaxed(&problem, &pool, &Settings::default(), &TruncatingSolver).unwrap_err();
        assert!(matches!(err, Error::Solver(LpError::Backend(_))));
        let err = solve_integer(&problem, &pool, &Settings::default(), &TruncatingSolver).unwrap_err();
        assert!(matches!(err, Error::Solver(LpError::Backend(_))));
    }

    #[test]
    fn test_missing_dual_is_a_solver_error() {
        struct NoDualRows;
        impl LpSolver for NoDualRows {
            fn solve(&self, model: &LinearModel) -> std::result::Result<LpSolution, LpError> {
                let mut solution = MicroLpSolver::new().solve(model)?;
                if let Some(duals) = solution.duals.as_mut() {
                    duals.truncate(1);
                }
                Ok(solution)
            }
        }

        let (problem, pool) = sample();
        let err = solve_relaxed(&problem, &pool, &Settings::default(), &NoDualRows).unwrap_err();
        assert!(matches!(err, Error::Solver(LpError::Backend(ref msg)) if msg.contains("'B'")));
    }

    #[test]
    fn test_integer_bound_from_seed_plan() {
        let (problem, _) = sample();
        // ceil(5 / 3) + ceil(3 / 2)
        assert_eq!(integer_upper_bound(&problem), 4.0);
    }
}
