//! The column-generation loop: alternate relaxed master solves and pricing
//! solves, growing the pattern pool until no pattern can lower the bar count,
//! then solve the integer master once over the final pool.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::lp::LpSolver;
use crate::master;
use crate::pricing;
use crate::types::{IntegerSolution, PatternPool, Problem, ShadowPrices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Generating,
    Converged,
}

/// Summary of one generation iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub relaxed_objective: f64,
    pub pricing_value: f64,
    /// Id of the pattern added in this iteration, if any.
    pub new_pattern: Option<String>,
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub solution: IntegerSolution,
    pub pool: PatternPool,
    /// Shadow prices of the last relaxed master solve.
    pub shadow_prices: ShadowPrices,
    /// Objective of the last relaxed master solve, a lower bound on the bar count.
    pub relaxed_objective: f64,
    pub iterations: usize,
    /// `false` when generation stopped before the pricing problem certified
    /// optimality: the iteration bound was hit, or pricing re-proposed a pattern
    /// already in the pool.
    pub converged: bool,
    pub history: Vec<IterationRecord>,
}

pub struct ColumnGeneration<S> {
    problem: Problem,
    settings: Settings,
    solver: S,
    pool: PatternPool,
    stop_new_pattern_generation: bool,
    certified: bool,
    shadow_prices: ShadowPrices,
    relaxed_objective: f64,
    history: Vec<IterationRecord>,
}

impl<S: LpSolver> ColumnGeneration<S> {
    /// Seed the pattern pool. Fails before any solve if a product does not fit
    /// in a bar.
    pub fn new(problem: Problem, settings: Settings, solver: S) -> Result<Self> {
        settings.validate()?;
        let pool = PatternPool::initialize(&problem)?;
        info!(
            products = problem.products().len(),
            bar_size = problem.bar_size(),
            "seeded {} patterns",
            pool.len()
        );
        Ok(Self {
            problem,
            settings,
            solver,
            pool,
            stop_new_pattern_generation: false,
            certified: false,
            shadow_prices: ShadowPrices::new(),
            relaxed_objective: f64::NAN,
            history: Vec::new(),
        })
    }

    pub fn phase(&self) -> Phase {
        if self.stop_new_pattern_generation {
            Phase::Converged
        } else {
            Phase::Generating
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn pool(&self) -> &PatternPool {
        &self.pool
    }

    pub fn shadow_prices(&self) -> &ShadowPrices {
        &self.shadow_prices
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Run one generation iteration. Does nothing once converged.
    pub fn step(&mut self) -> Result<Phase> {
        if self.stop_new_pattern_generation {
            return Ok(Phase::Converged);
        }
        let iteration = self.history.len() + 1;

        let (relaxed, prices) = master::solve_relaxed(&self.problem, &self.pool, &self.settings, &self.solver)?;
        debug!(iteration, ?prices, "shadow prices");
        self.shadow_prices = prices;
        self.relaxed_objective = relaxed.objective;

        let outcome = pricing::solve_pricing(&self.problem, &self.shadow_prices, &self.settings, &self.solver)?;

        let new_pattern = match outcome.pattern {
            Some(counts) if self.pool.contains_counts(&counts) => {
                // Not a certificate: the value still exceeds the bar cost.
                warn!(
                    iteration,
                    value = outcome.value,
                    "pricing proposed a pattern already in the pool, stopping without certificate"
                );
                self.stop_new_pattern_generation = true;
                None
            }
            Some(counts) => {
                let pattern = self.pool.append(&self.problem, counts)?;
                info!(iteration, value = outcome.value, "new pattern {pattern}");
                Some(pattern.id.clone())
            }
            None => {
                self.stop_new_pattern_generation = true;
                self.certified = true;
                info!(iteration, "no improving pattern, column generation converged");
                None
            }
        };

        info!(
            iteration,
            relaxed_objective = relaxed.objective,
            pricing_value = outcome.value,
            patterns = self.pool.len(),
            "iteration finished"
        );

        self.history.push(IterationRecord {
            iteration,
            relaxed_objective: relaxed.objective,
            pricing_value: outcome.value,
            new_pattern,
        });

        Ok(self.phase())
    }

    /// Generate patterns until convergence (or the iteration bound), then solve
    /// the integer master over the final pool.
    pub fn run(mut self) -> Result<Outcome> {
        while self.step()? == Phase::Generating {
            if let Some(max) = self.settings.max_iterations
                && self.history.len() >= max
            {
                warn!(max, patterns = self.pool.len(), "iteration bound reached before convergence");
                self.stop_new_pattern_generation = true;
            }
        }

        let solution = master::solve_integer(&self.problem, &self.pool, &self.settings, &self.solver)?;
        info!(
            bars = solution.bar_count(),
            relaxed_bound = self.relaxed_objective,
            iterations = self.history.len(),
            "integer master solved"
        );

        Ok(Outcome {
            solution,
            pool: self.pool,
            shadow_prices: self.shadow_prices,
            relaxed_objective: self.relaxed_objective,
            iterations: self.history.len(),
            converged: self.certified,
            history: self.history,
        })
    }
}

/// Run column generation on `problem` end to end.
pub fn optimize<S: LpSolver>(problem: Problem, settings: Settings, solver: S) -> Result<Outcome> {
    ColumnGeneration::new(problem, settings, solver)?.run()
}
