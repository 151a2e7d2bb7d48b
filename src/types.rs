use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Slack allowed when comparing a pattern's used length against the bar size.
pub const CAPACITY_TOLERANCE: f64 = 1e-9;

/// A product to be cut from bars: its length and how many pieces are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub length: f64,
    pub demand: f64,
}

impl Product {
    pub fn new(id: impl Into<String>, length: f64, demand: f64) -> Self {
        Self {
            id: id.into(),
            length,
            demand,
        }
    }

    /// How many pieces of this product fit in a bar on their own.
    pub fn max_per_bar(&self, bar_size: f64) -> u32 {
        ((bar_size + CAPACITY_TOLERANCE) / self.length).floor() as u32
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (length {}, demand {})", self.id, self.length, self.demand)
    }
}

/// Immutable input of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    products: Vec<Product>,
    bar_size: f64,
}

impl Problem {
    pub fn new(products: Vec<Product>, bar_size: f64) -> Result<Self> {
        if !(bar_size.is_finite() && bar_size > 0.0) {
            return Err(Error::InvalidInput(format!(
                "bar size must be a positive number, got {bar_size}"
            )));
        }
        if products.is_empty() {
            return Err(Error::InvalidInput("at least one product is required".to_string()));
        }
        for (i, p) in products.iter().enumerate() {
            if products[..i].iter().any(|q| q.id == p.id) {
                return Err(Error::InvalidInput(format!("duplicate product id '{}'", p.id)));
            }
            if !(p.length.is_finite() && p.length > 0.0) {
                return Err(Error::InvalidInput(format!(
                    "product '{}' must have a positive length, got {}",
                    p.id, p.length
                )));
            }
            if !(p.demand.is_finite() && p.demand >= 0.0) {
                return Err(Error::InvalidInput(format!(
                    "product '{}' must have a non-negative demand, got {}",
                    p.id, p.demand
                )));
            }
        }
        Ok(Self { products, bar_size })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn bar_size(&self) -> f64 {
        self.bar_size
    }

    /// Total length of the given counts, or `None` if a product id is unknown.
    pub fn used_length(&self, counts: &IndexMap<String, u32>) -> Option<f64> {
        counts
            .iter()
            .map(|(id, &n)| self.product(id).map(|p| p.length * f64::from(n)))
            .sum()
    }
}

/// A way of cutting one bar: how many pieces of each product it yields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuttingPattern {
    pub id: String,
    /// Only products with a positive count, in product input order.
    pub counts: IndexMap<String, u32>,
}

impl CuttingPattern {
    pub fn count(&self, product: &str) -> u32 {
        self.counts.get(product).copied().unwrap_or(0)
    }

    pub fn used_length(&self, problem: &Problem) -> f64 {
        problem.used_length(&self.counts).unwrap_or(f64::INFINITY)
    }
}

impl std::fmt::Display for CuttingPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={{", self.id)?;
        for (i, (product, n)) in self.counts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{product}:{n}")?;
        }
        write!(f, "}}")
    }
}

/// Append-only, ordered collection of cutting patterns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct PatternPool {
    patterns: Vec<CuttingPattern>,
}

impl PatternPool {
    /// Seed one pattern per product holding as many pieces of it as fit in a bar.
    pub fn initialize(problem: &Problem) -> Result<Self> {
        let mut pool = PatternPool::default();
        for product in problem.products() {
            if product.length > problem.bar_size() + CAPACITY_TOLERANCE {
                return Err(Error::SeedPatternInfeasible {
                    product: product.id.clone(),
                    length: product.length,
                    bar_size: problem.bar_size(),
                });
            }
            let counts = IndexMap::from([(product.id.clone(), product.max_per_bar(problem.bar_size()))]);
            pool.append(problem, counts)?;
        }
        Ok(pool)
    }

    /// Add a new pattern with the next sequential id (`P1`, `P2`, ...). Zero
    /// counts are dropped and the rest are ordered like the problem's products.
    pub fn append(&mut self, problem: &Problem, counts: IndexMap<String, u32>) -> Result<&CuttingPattern> {
        let id = format!("P{}", self.patterns.len() + 1);

        if let Some(unknown) = counts.keys().find(|k| problem.product(k).is_none()) {
            return Err(Error::InvalidInput(format!(
                "pattern {id} refers to unknown product '{unknown}'"
            )));
        }
        let counts: IndexMap<String, u32> = problem
            .products()
            .iter()
            .filter_map(|p| counts.get(&p.id).filter(|&&n| n > 0).map(|&n| (p.id.clone(), n)))
            .collect();

        let used = problem.used_length(&counts).unwrap_or(f64::INFINITY);
        if used > problem.bar_size() + CAPACITY_TOLERANCE {
            return Err(Error::CapacityViolation {
                pattern: id,
                used,
                bar_size: problem.bar_size(),
            });
        }

        self.patterns.push(CuttingPattern { id, counts });
        Ok(&self.patterns[self.patterns.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CuttingPattern> {
        self.patterns.iter()
    }

    pub fn get(&self, id: &str) -> Option<&CuttingPattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Whether some pattern already yields exactly these positive counts.
    pub fn contains_counts(&self, counts: &IndexMap<String, u32>) -> bool {
        let wanted = || counts.iter().filter(|&(_, &n)| n > 0);
        self.patterns.iter().any(|p| {
            p.counts.len() == wanted().count() && wanted().all(|(k, &n)| p.count(k) == n)
        })
    }

    pub fn count(&self, pattern: &str, product: &str) -> u32 {
        self.get(pattern).map(|p| p.count(product)).unwrap_or(0)
    }

    /// The sparse `(pattern, product) -> count` table, in insertion order.
    pub fn table(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.patterns
            .iter()
            .flat_map(|p| p.counts.iter().map(move |(product, &n)| (p.id.as_str(), product.as_str(), n)))
    }
}

/// Marginal value of one more unit of each product, from the latest relaxed
/// master solve.
pub type ShadowPrices = IndexMap<String, f64>;

/// Quantity to cut per pattern (only strictly positive quantities) and the
/// total objective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterSolution<Q> {
    pub quantities: IndexMap<String, Q>,
    pub objective: f64,
}

pub type RelaxedSolution = MasterSolution<f64>;
pub type IntegerSolution = MasterSolution<u64>;

impl IntegerSolution {
    pub fn bar_count(&self) -> u64 {
        self.quantities.values().sum()
    }
}
