//! Loading problems from JSON files and command-line shorthand.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Problem, Product};

/// On-disk problem description.
///
/// ```json
/// {
///   "sProducts": ["A", "B"],
///   "pProductSize": {"A": 3, "B": 4},
///   "pProductDemand": {"A": 5, "B": 3},
///   "pBarSize": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemFile {
    #[serde(rename = "sProducts")]
    pub products: Vec<String>,
    #[serde(rename = "pProductSize")]
    pub product_size: IndexMap<String, f64>,
    #[serde(rename = "pProductDemand")]
    pub product_demand: IndexMap<String, f64>,
    #[serde(rename = "pBarSize")]
    pub bar_size: f64,
}

impl ProblemFile {
    pub fn into_problem(self) -> Result<Problem> {
        for (table, map) in [("size", &self.product_size), ("demand", &self.product_demand)] {
            if let Some(unknown) = map.keys().find(|k| !self.products.contains(*k)) {
                return Err(Error::InvalidInput(format!(
                    "{table} given for unknown product '{unknown}'"
                )));
            }
        }

        let products = self
            .products
            .iter()
            .map(|id| {
                let length = self
                    .product_size
                    .get(id)
                    .ok_or_else(|| Error::InvalidInput(format!("missing size for product '{id}'")))?;
                let demand = self
                    .product_demand
                    .get(id)
                    .ok_or_else(|| Error::InvalidInput(format!("missing demand for product '{id}'")))?;
                Ok(Product::new(id.clone(), *length, *demand))
            })
            .collect::<Result<Vec<_>>>()?;

        Problem::new(products, self.bar_size)
    }
}

impl From<&Problem> for ProblemFile {
    fn from(problem: &Problem) -> Self {
        let products = problem.products();
        ProblemFile {
            products: products.iter().map(|p| p.id.clone()).collect(),
            product_size: products.iter().map(|p| (p.id.clone(), p.length)).collect(),
            product_demand: products.iter().map(|p| (p.id.clone(), p.demand)).collect(),
            bar_size: problem.bar_size(),
        }
    }
}

pub fn parse_problem(json: &str) -> Result<Problem> {
    serde_json::from_str::<ProblemFile>(json)?.into_problem()
}

pub fn load_problem(path: impl AsRef<Path>) -> Result<Problem> {
    let contents = std::fs::read_to_string(path)?;
    parse_problem(&contents)
}

/// Parse a product given as `ID:LENGTH:DEMAND`, e.g. `A:3:5`.
pub fn parse_product(s: &str) -> Result<Product> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 || parts[0].is_empty() {
        return Err(Error::InvalidInput(format!(
            "invalid product '{s}', expected ID:LENGTH:DEMAND"
        )));
    }
    let length = parts[1]
        .parse::<f64>()
        .map_err(|_| Error::InvalidInput(format!("invalid length in '{s}'")))?;
    let demand = parts[2]
        .parse::<f64>()
        .map_err(|_| Error::InvalidInput(format!("invalid demand in '{s}'")))?;
    Ok(Product::new(parts[0], length, demand))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "sProducts": ["A", "B"],
        "pProductSize": {"A": 3, "B": 4},
        "pProductDemand": {"A": 5, "B": 3},
        "pBarSize": 10
    }"#;

    #[test]
    fn test_parse_sample_file() {
        let problem = parse_problem(SAMPLE).unwrap();
        assert_eq!(problem.bar_size(), 10.0);
        assert_eq!(
            problem.products(),
            &[Product::new("A", 3.0, 5.0), Product::new("B", 4.0, 3.0)]
        );
    }

    #[test]
    fn test_product_order_follows_list() {
        let json = r#"{
            "sProducts": ["B", "A"],
            "pProductSize": {"A": 3, "B": 4},
            "pProductDemand": {"A": 5, "B": 3},
            "pBarSize": 10
        }"#;
        let problem = parse_problem(json).unwrap();
        let ids: Vec<_> = problem.products().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_missing_demand() {
        let json = r#"{
            "sProducts": ["A", "B"],
            "pProductSize": {"A": 3, "B": 4},
            "pProductDemand": {"A": 5},
            "pBarSize": 10
        }"#;
        let err = parse_problem(json).unwrap_err();
        assert!(err.to_string().contains("missing demand for product 'B'"));
    }

    #[test]
    fn test_unknown_size_key() {
        let json = r#"{
            "sProducts": ["A"],
            "pProductSize": {"A": 3, "Q": 4},
            "pProductDemand": {"A": 5},
            "pBarSize": 10
        }"#;
        assert!(matches!(parse_problem(json), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_problem("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_round_trip_through_file_format() {
        let problem = parse_problem(SAMPLE).unwrap();
        let file = ProblemFile::from(&problem);
        assert_eq!(file.into_problem().unwrap(), problem);
    }

    #[test]
    fn test_parse_product() {
        assert_eq!(parse_product("A:3:5").unwrap(), Product::new("A", 3.0, 5.0));
        assert_eq!(parse_product("rod:2.5:0").unwrap(), Product::new("rod", 2.5, 0.0));
        assert!(parse_product("A:3").is_err());
        assert!(parse_product(":3:5").is_err());
        assert!(parse_product("A:x:5").is_err());
    }
}
