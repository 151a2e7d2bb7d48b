use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::column_generation::Outcome;
use crate::types::{CAPACITY_TOLERANCE, IntegerSolution, PatternPool, Problem};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternUsage {
    pub pattern: String,
    pub quantity: u64,
    pub counts: IndexMap<String, u32>,
    pub used_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCoverage {
    pub product: String,
    pub demand: f64,
    pub produced: u64,
}

impl ProductCoverage {
    pub fn is_met(&self) -> bool {
        self.produced as f64 >= self.demand
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarUsage {
    pub pattern: String,
    pub used_length: f64,
    pub bar_size: f64,
}

impl BarUsage {
    pub fn fits(&self) -> bool {
        self.used_length <= self.bar_size + CAPACITY_TOLERANCE
    }
}

/// Demand coverage and bar-size checks for a final integer plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub bars: u64,
    pub bar_size: f64,
    pub waste_percent: f64,
    /// Patterns cut at least once.
    pub patterns: Vec<PatternUsage>,
    pub coverage: Vec<ProductCoverage>,
    /// Used length of every pattern in the pool.
    pub bar_usage: Vec<BarUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relaxed_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,
}

impl Report {
    pub fn new(problem: &Problem, pool: &PatternPool, solution: &IntegerSolution) -> Self {
        let patterns: Vec<PatternUsage> = pool
            .iter()
            .filter_map(|p| {
                solution.quantities.get(&p.id).map(|&quantity| PatternUsage {
                    pattern: p.id.clone(),
                    quantity,
                    counts: p.counts.clone(),
                    used_length: p.used_length(problem),
                })
            })
            .collect();

        let coverage = problem
            .products()
            .iter()
            .map(|product| ProductCoverage {
                product: product.id.clone(),
                demand: product.demand,
                produced: patterns
                    .iter()
                    .map(|u| u64::from(u.counts.get(&product.id).copied().unwrap_or(0)) * u.quantity)
                    .sum(),
            })
            .collect();

        let bar_usage: Vec<BarUsage> = pool
            .iter()
            .map(|p| BarUsage {
                pattern: p.id.clone(),
                used_length: p.used_length(problem),
                bar_size: problem.bar_size(),
            })
            .collect();

        let bars = solution.bar_count();
        let total = bars as f64 * problem.bar_size();
        let used: f64 = patterns.iter().map(|u| u.quantity as f64 * u.used_length).sum();
        let waste_percent = if total > 0.0 {
            (total - used) / total * 100.0
        } else {
            0.0
        };

        Report {
            bars,
            bar_size: problem.bar_size(),
            waste_percent,
            patterns,
            coverage,
            bar_usage,
            relaxed_bound: None,
            iterations: None,
            converged: None,
        }
    }

    pub fn from_outcome(problem: &Problem, outcome: &Outcome) -> Self {
        Report {
            relaxed_bound: Some(outcome.relaxed_objective),
            iterations: Some(outcome.iterations),
            converged: Some(outcome.converged),
            ..Report::new(problem, &outcome.pool, &outcome.solution)
        }
    }

    pub fn all_demand_met(&self) -> bool {
        self.coverage.iter().all(ProductCoverage::is_met)
    }

    pub fn all_patterns_fit(&self) -> bool {
        self.bar_usage.iter().all(BarUsage::fits)
    }

    /// Plain-text tables for the terminal.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "Total number of bars: {}", self.bars)?;
        if let Some(bound) = self.relaxed_bound {
            writeln!(out, "Relaxed lower bound: {bound:.3}")?;
        }
        if let (Some(iterations), Some(converged)) = (self.iterations, self.converged) {
            let status = if converged { "converged" } else { "stopped early" };
            writeln!(out, "Column generation: {iterations} iteration{} ({status})", plural(iterations))?;
        }
        writeln!(out)?;

        writeln!(out, "Patterns in use")?;
        writeln!(out, "  {:<8} {:>8}  Products", "Pattern", "Quantity")?;
        for u in &self.patterns {
            let mix: Vec<String> = u.counts.iter().map(|(p, n)| format!("{p} x{n}")).collect();
            writeln!(out, "  {:<8} {:>8}  {}", u.pattern, u.quantity, mix.join(", "))?;
        }
        writeln!(out)?;

        writeln!(out, "Demand satisfaction")?;
        writeln!(out, "  {:<12} {:>10} {:>10}", "Product", "Demand", "Produced")?;
        for c in &self.coverage {
            let flag = if c.is_met() { "" } else { "  SHORT" };
            writeln!(out, "  {:<12} {:>10} {:>10}{flag}", c.product, c.demand, c.produced)?;
        }
        writeln!(out)?;

        writeln!(out, "Bar size check per pattern")?;
        writeln!(out, "  {:<8} {:>10} {:>10}", "Pattern", "Bar size", "Used")?;
        for b in &self.bar_usage {
            let flag = if b.fits() { "" } else { "  OVER" };
            writeln!(out, "  {:<8} {:>10} {:>10}{flag}", b.pattern, b.bar_size, b.used_length)?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "Summary: {} bar{} used, {:.1}% waste",
            self.bars,
            plural(self.bars as usize),
            self.waste_percent
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
