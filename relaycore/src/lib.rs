//! Relay station placement along a line between two gateways.
//!
//! Radio hardware figures are turned into reach distances by [`radio`], datasets are
//! validated into a [`problem::PlacementProblem`] by [`dataset`], and [`search`] finds the
//! assignment of stations to candidate positions that leaves the least of the line uncovered
//! while keeping within cost and delay limits.
//!
//! ## Choosing a method
//! Brute force scores every assignment and is only practical for a handful of positions.
//! Branch-and-bound returns the same placement, pruning with a knapsack estimate of how much
//! coverage the unused stations can still add (see [`config::EstimationMethod`]).

pub mod combinatorics;
pub mod config;
pub mod dataset;
pub mod feasibility;
pub mod file;
pub mod problem;
pub mod radio;
pub mod search;
pub mod units;
pub mod verification;

use std::fmt::Debug;

/// Scores closer than this are treated as equal.
pub const SCORE_EPSILON: f64 = 1e-9;

/// Checks two values are within 0.001% of each other.
#[allow(unused)]
fn assert_close<T>(a: T, b: T)
where
    T: Into<f64> + Copy + Debug,
{
    let float_a: f64 = a.into();
    let float_b: f64 = b.into();

    if float_a == 0. || float_b == 0. {
        assert!(float_a == float_b, "{a:?} and {b:?} are not close.");
        return;
    }

    let percent_diff = (float_a - float_b).abs() / float_a.abs();

    assert!(percent_diff < 0.00001, "{a:?} and {b:?} are not close.");
}
