//! Search configuration and the errors raised while validating inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::{Length, Time};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Evaluate every assignment.
    BruteForce,
    #[default]
    BranchAndBound,
}

/// Relaxation used by branch-and-bound to bound the coverage unused stations can still add.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimationMethod {
    /// 0/1 knapsack under the remaining cost budget, limited to the remaining positions.
    #[default]
    Ilp,
    /// 0/1 knapsack under the remaining cost budget.
    Knapsack,
    /// Fractional knapsack.
    Lp,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("unknown search method `{0}`")]
    UnknownMethod(String),
    #[error("unknown estimation method `{0}`")]
    UnknownEstimation(String),
    #[error(
        "relative_deviation ({deviation}) and last_optimal_noncoverage ({noncoverage}) cannot both be set"
    )]
    ConflictingIncumbent { deviation: f64, noncoverage: f64 },
    #[error("relative_deviation must be a finite non-negative share, got {0}")]
    InvalidDeviation(f64),
    #[error("last_optimal_noncoverage must be finite and non-negative, got {0}")]
    InvalidNoncoverage(f64),
    #[error("gateway needs two coordinates, got {0}")]
    MissingGateway(usize),
    #[error("gateway coordinates must be strictly ascending, got [{left}, {right}]")]
    GatewayNotAscending { left: f64, right: f64 },
    #[error("placement {index} is not strictly after the one before it")]
    PlacementNotAscending { index: usize },
    #[error("placement {index} at {position} lies outside the gateway segment")]
    PlacementOutsideSegment { index: usize, position: f64 },
    #[error("`{field}` must be a finite number, got {value}")]
    NonFinite { field: String, value: f64 },
    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: String, value: f64 },
    #[error("average packet size must be positive, got {0}")]
    InvalidPacketSize(f64),
    #[error("{stations} stations but radio tables for {radios}")]
    ShapeMismatch { stations: usize, radios: usize },
}

pub fn parse_method(s: &str) -> Result<Method, ConfigurationError> {
    use Method::*;

    Ok(match s.to_lowercase().as_str() {
        "brute-force" | "brute_force" | "bruteforce" | "bf" => BruteForce,
        "branch-and-bound" | "branch_and_bound" | "bab" | "bnb" => BranchAndBound,
        _ => return Err(ConfigurationError::UnknownMethod(s.to_owned())),
    })
}

pub fn parse_estimation(s: &str) -> Result<EstimationMethod, ConfigurationError> {
    use EstimationMethod::*;

    Ok(match s.to_lowercase().as_str() {
        "ilp" => Ilp,
        "knapsack" => Knapsack,
        "lp" => Lp,
        _ => return Err(ConfigurationError::UnknownEstimation(s.to_owned())),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub method: Method,
    /// Require every station to be placed.
    pub place_all_stations: bool,
    pub estimation: EstimationMethod,
    /// Report alternatives scoring within this share of the segment length of the best.
    pub relative_deviation: Option<f64>,
    /// Known optimum of an earlier run, only assignments at or below it are accepted.
    pub last_optimal_noncoverage: Option<Length>,
    pub node_limit: Option<u64>,
    pub time_limit: Option<Time>,
    pub parallel: bool,
    pub alternatives_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            place_all_stations: false,
            estimation: EstimationMethod::default(),
            relative_deviation: None,
            last_optimal_noncoverage: None,
            node_limit: None,
            time_limit: None,
            parallel: false,
            alternatives_limit: 100,
        }
    }
}

impl SearchConfig {
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_estimation(mut self, estimation: EstimationMethod) -> Self {
        self.estimation = estimation;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(deviation) = self.relative_deviation {
            if !deviation.is_finite() || deviation < 0.0 {
                return Err(ConfigurationError::InvalidDeviation(deviation));
            }
        }

        if let Some(noncoverage) = self.last_optimal_noncoverage {
            if !noncoverage.is_finite() || noncoverage < Length::ZERO {
                return Err(ConfigurationError::InvalidNoncoverage(noncoverage.metres()));
            }
        }

        if let (Some(deviation), Some(noncoverage)) =
            (self.relative_deviation, self.last_optimal_noncoverage)
        {
            return Err(ConfigurationError::ConflictingIncumbent {
                deviation,
                noncoverage: noncoverage.metres(),
            });
        }

        if let Some(limit) = self.time_limit {
            if !limit.is_finite() || limit < Time::ZERO {
                return Err(ConfigurationError::Negative {
                    field: "time_limit".to_owned(),
                    value: limit.seconds(),
                });
            }
        }

        Ok(())
    }
}
