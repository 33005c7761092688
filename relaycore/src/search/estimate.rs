//! Optimistic estimates of how much more of the line unused stations can cover.
//!
//! A station placed further along the chain covers at most twice its coverage radius
//! (once towards each neighbour), so its value is `2 * coverage`. Choosing which unused
//! stations to count is a 0/1 knapsack over the cost still available; the estimation
//! method picks how that knapsack is relaxed.

use crate::{config::EstimationMethod, problem::PlacementProblem, units::Length};

/// Largest knapsack table worth filling. Beyond this the fractional relaxation is used.
const CELL_LIMIT: usize = 1 << 22;

#[derive(Debug, Clone)]
pub struct CoverageEstimator {
    method: EstimationMethod,
    place_all: bool,
    values: Vec<f64>,
    costs: Vec<u64>,
}

struct Item {
    value: f64,
    cost: u64,
}

impl CoverageEstimator {
    pub fn new(problem: &PlacementProblem, method: EstimationMethod, place_all: bool) -> Self {
        Self {
            method,
            place_all,
            values: problem
                .radio()
                .coverage()
                .iter()
                .map(|c| 2.0 * c.metres())
                .collect(),
            costs: problem.stations().iter().map(|s| s.cost).collect(),
        }
    }

    /// Upper bound on the coverage the stations not in `used` can still add
    /// with `budget` cost left and `positions` positions undecided.
    pub fn extra_coverage(&self, used: &[bool], budget: u64, positions: usize) -> Length {
        let items = || {
            (0..self.values.len()).filter(|&s| !used[s]).map(|s| Item {
                value: self.values[s],
                cost: self.costs[s],
            })
        };

        if self.place_all {
            return Length::from_metres(items().map(|i| i.value).sum());
        }

        if positions == 0 {
            return Length::ZERO;
        }

        let items: Vec<Item> = items().filter(|i| i.cost <= budget).collect();
        let value = match self.method {
            EstimationMethod::Lp => fractional(&items, budget),
            EstimationMethod::Knapsack => knapsack(&items, budget, None),
            EstimationMethod::Ilp => knapsack(&items, budget, Some(positions)),
        };

        Length::from_metres(value)
    }
}

fn fractional(items: &[Item], budget: u64) -> f64 {
    let mut order: Vec<&Item> = items.iter().collect();
    // Free items have an infinite ratio and come first.
    order.sort_by(|a, b| {
        let ratio = |i: &Item| i.value / i.cost as f64;
        ratio(b).total_cmp(&ratio(a))
    });

    let mut left = budget as f64;
    let mut total = 0.0;
    for item in order {
        if item.cost == 0 {
            total += item.value;
            continue;
        }
        if left <= 0.0 {
            break;
        }
        let share = (left / item.cost as f64).min(1.0);
        total += share * item.value;
        left -= share * item.cost as f64;
    }
    total
}

/// Exact 0/1 knapsack, with at most `count` items if given.
fn knapsack(items: &[Item], budget: u64, count: Option<usize>) -> f64 {
    let total_cost = items.iter().map(|i| i.cost).fold(0u64, u64::saturating_add);
    let count = count.map(|c| c.min(items.len()));

    if total_cost <= budget {
        let mut values: Vec<f64> = items.iter().map(|i| i.value).collect();
        values.sort_by(|a, b| b.total_cmp(a));
        return values.iter().take(count.unwrap_or(values.len())).sum();
    }

    let budget = budget.min(total_cost) as usize;
    let layers = count.map_or(1, |c| c + 1);
    let cells = items.len().saturating_mul(layers).saturating_mul(budget + 1);
    if cells > CELL_LIMIT {
        return fractional(items, budget as u64);
    }

    let width = budget + 1;
    // table[k * width + b]: best value using at most k items and at most b cost.
    let mut table = vec![0.0f64; layers * width];

    for item in items {
        let cost = item.cost as usize;
        for k in (0..layers).rev() {
            let k_prev = match count {
                Some(_) if k == 0 => continue,
                Some(_) => k - 1,
                None => k,
            };
            for b in (cost..width).rev() {
                let candidate = table[k_prev * width + b - cost] + item.value;
                if candidate > table[k * width + b] {
                    table[k * width + b] = candidate;
                }
            }
        }
    }

    table[(layers - 1) * width + budget]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(list: &[(f64, u64)]) -> Vec<Item> {
        list.iter()
            .map(|&(value, cost)| Item { value, cost })
            .collect()
    }

    #[test]
    fn knapsack_exact() {
        let list = items(&[(60.0, 10), (100.0, 20), (120.0, 30)]);
        assert_eq!(knapsack(&list, 50, None), 220.0);
        assert_eq!(knapsack(&list, 60, None), 280.0);
        assert_eq!(knapsack(&list, 5, None), 0.0);
    }

    #[test]
    fn cardinality_limit() {
        let list = items(&[(60.0, 10), (100.0, 20), (120.0, 30)]);
        assert_eq!(knapsack(&list, 50, Some(1)), 120.0);
        assert_eq!(knapsack(&list, 100, Some(2)), 220.0);
    }

    #[test]
    fn lp_relaxation_dominates() {
        let list = items(&[(60.0, 10), (100.0, 20), (120.0, 30)]);
        assert_eq!(fractional(&list, 50), 240.0);
        assert!(fractional(&list, 50) >= knapsack(&list, 50, None));
    }

    #[test]
    fn free_items_always_count() {
        let list = items(&[(10.0, 0), (60.0, 10)]);
        assert_eq!(fractional(&list, 0), 10.0);
        assert_eq!(knapsack(&list, 0, None), 10.0);
        assert_eq!(knapsack(&list, 5, Some(1)), 10.0);
    }

    #[test]
    fn knapsack_in_same_table_as_ilp() {
        // with no cardinality limit, both tables agree
        let list = items(&[(5.0, 3), (4.0, 2), (3.0, 2), (7.0, 4)]);
        assert_eq!(knapsack(&list, 6, None), knapsack(&list, 6, Some(4)));
        assert_eq!(knapsack(&list, 6, None), 11.0);
    }
}
