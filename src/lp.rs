//! Linear and integer program models, and the solver capability that answers them.
//!
//! The column-generation code only ever talks to [`LpSolver`]; [`MicroLpSolver`] is
//! the default backend, built on the pure-Rust `microlp` simplex/branch-and-bound.

use microlp::OptimizationDirection;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDomain {
    Continuous,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Le,
    Ge,
    Eq,
}

impl ComparisonOp {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            ComparisonOp::Le => lhs <= rhs,
            ComparisonOp::Ge => lhs >= rhs,
            ComparisonOp::Eq => lhs == rhs,
        }
    }
}

/// Handle to a variable of a [`LinearModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct VarDef {
    domain: VarDomain,
    lower: f64,
    upper: f64,
    objective: f64,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub terms: Vec<(VarId, f64)>,
    pub op: ComparisonOp,
    pub rhs: f64,
}

/// A declarative optimization problem: bounded variables, linear constraints and
/// a linear objective.
#[derive(Debug, Clone)]
pub struct LinearModel {
    sense: Sense,
    vars: Vec<VarDef>,
    constraints: Vec<Constraint>,
}

impl LinearModel {
    pub fn new(sense: Sense) -> Self {
        Self {
            sense,
            vars: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Add a variable with inclusive `(lower, upper)` bounds. Use infinities for
    /// missing bounds.
    pub fn add_var(&mut self, domain: VarDomain, (lower, upper): (f64, f64), objective: f64) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            domain,
            lower,
            upper,
            objective,
        });
        id
    }

    /// Add a constraint and return its row index. Repeated variables in `terms`
    /// are merged.
    pub fn add_constraint(
        &mut self,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        op: ComparisonOp,
        rhs: f64,
    ) -> usize {
        let mut merged: Vec<(VarId, f64)> = Vec::new();
        for (var, coeff) in terms {
            match merged.iter_mut().find(|(v, _)| *v == var) {
                Some((_, c)) => *c += coeff,
                None => merged.push((var, coeff)),
            }
        }
        self.constraints.push(Constraint {
            terms: merged,
            op,
            rhs,
        });
        self.constraints.len() - 1
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn has_integer_vars(&self) -> bool {
        self.vars.iter().any(|v| v.domain == VarDomain::Integer)
    }

    /// Build the dual of a continuous model whose variables are all bounded as
    /// `[0, +inf)`. The dual has one variable per constraint, in row order, and
    /// its optimum is the vector of constraint shadow prices.
    fn dual(&self) -> Result<LinearModel, LpError> {
        if let Some(pos) = self.vars.iter().position(|v| {
            v.domain != VarDomain::Continuous || v.lower != 0.0 || v.upper != f64::INFINITY
        }) {
            return Err(LpError::DualsUnavailable(format!(
                "variable {pos} is not a continuous variable bounded as [0, inf)"
            )));
        }

        let (dual_sense, row_op) = match self.sense {
            Sense::Minimize => (Sense::Maximize, ComparisonOp::Le),
            Sense::Maximize => (Sense::Minimize, ComparisonOp::Ge),
        };

        let mut dual = LinearModel::new(dual_sense);
        let mut columns: Vec<Vec<(VarId, f64)>> = vec![Vec::new(); self.vars.len()];
        for row in &self.constraints {
            // Sign of each multiplier follows whether raising the rhs relaxes or
            // tightens the primal.
            let bounds = match (self.sense, row.op) {
                (_, ComparisonOp::Eq) => (f64::NEG_INFINITY, f64::INFINITY),
                (Sense::Minimize, ComparisonOp::Ge) | (Sense::Maximize, ComparisonOp::Le) => {
                    (0.0, f64::INFINITY)
                }
                (Sense::Minimize, ComparisonOp::Le) | (Sense::Maximize, ComparisonOp::Ge) => {
                    (f64::NEG_INFINITY, 0.0)
                }
            };
            let y = dual.add_var(VarDomain::Continuous, bounds, row.rhs);
            for &(var, coeff) in &row.terms {
                columns[var.0].push((y, coeff));
            }
        }
        for (column, var) in columns.into_iter().zip(&self.vars) {
            dual.add_constraint(column, row_op, var.objective);
        }
        Ok(dual)
    }
}

#[derive(Debug, Clone)]
pub struct LpSolution {
    /// Primal values, indexed like the model's variables.
    pub values: Vec<f64>,
    pub objective: f64,
    /// Dual value per constraint, in row order. Only present for models without
    /// integer variables.
    pub duals: Option<Vec<f64>>,
}

impl LpSolution {
    /// Primal value of `var`. A solution shorter than the model is a backend defect.
    pub fn value(&self, var: VarId) -> Result<f64, LpError> {
        self.values.get(var.0).copied().ok_or_else(|| {
            LpError::Backend(format!("no value returned for variable {}", var.0))
        })
    }

    pub fn dual(&self, row: usize) -> Option<f64> {
        self.duals.as_ref().and_then(|d| d.get(row).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LpError {
    #[error("model is infeasible")]
    Infeasible,
    #[error("model is unbounded")]
    Unbounded,
    #[error("dual values unavailable: {0}")]
    DualsUnavailable(String),
    #[error("solver backend error: {0}")]
    Backend(String),
}

impl From<microlp::Error> for LpError {
    fn from(err: microlp::Error) -> Self {
        match err {
            microlp::Error::Infeasible => LpError::Infeasible,
            microlp::Error::Unbounded => LpError::Unbounded,
            microlp::Error::InternalError(msg) => LpError::Backend(msg),
        }
    }
}

/// Capability to solve a [`LinearModel`]. Implementations must report
/// infeasibility as [`LpError::Infeasible`], never as an optimum.
pub trait LpSolver {
    fn solve(&self, model: &LinearModel) -> Result<LpSolution, LpError>;
}

impl<S: LpSolver + ?Sized> LpSolver for &S {
    fn solve(&self, model: &LinearModel) -> Result<LpSolution, LpError> {
        (**self).solve(model)
    }
}

/// Solver backed by `microlp`.
///
/// `microlp` does not expose constraint duals, so for continuous models the dual
/// program is built and solved as a second linear program.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }

    fn solve_primal(&self, model: &LinearModel) -> Result<(Vec<f64>, f64), LpError> {
        let direction = match model.sense {
            Sense::Minimize => OptimizationDirection::Minimize,
            Sense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = microlp::Problem::new(direction);
        let vars: Vec<microlp::Variable> = model
            .vars
            .iter()
            .map(|v| match v.domain {
                VarDomain::Continuous => problem.add_var(v.objective, (v.lower, v.upper)),
                // float-to-int casts saturate, so infinite bounds clamp to the i32 range
                VarDomain::Integer => {
                    problem.add_integer_var(v.objective, (v.lower.ceil() as i32, v.upper.floor() as i32))
                }
            })
            .collect();

        for row in &model.constraints {
            if row.terms.is_empty() {
                if row.op.holds(0.0, row.rhs) {
                    continue;
                }
                return Err(LpError::Infeasible);
            }
            let op = match row.op {
                ComparisonOp::Le => microlp::ComparisonOp::Le,
                ComparisonOp::Ge => microlp::ComparisonOp::Ge,
                ComparisonOp::Eq => microlp::ComparisonOp::Eq,
            };
            let terms = row.terms.iter().map(|&(var, coeff)| (vars[var.0], coeff));
            problem.add_constraint(terms, op, row.rhs);
        }

        let solution = problem.solve()?;
        let values = vars.iter().map(|&v| *solution.var_value(v)).collect();
        Ok((values, solution.objective()))
    }
}

impl LpSolver for MicroLpSolver {
    fn solve(&self, model: &LinearModel) -> Result<LpSolution, LpError> {
        let (values, objective) = self.solve_primal(model)?;

        let duals = if model.has_integer_vars() {
            None
        } else {
            let dual = model.dual()?;
            let (prices, _) = self.solve_primal(&dual).map_err(|err| {
                LpError::DualsUnavailable(format!("dual program could not be solved: {err}"))
            })?;
            Some(prices)
        };

        Ok(LpSolution {
            values,
            objective,
            duals,
        })
    }
}
