use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatistics {
    /// Total nodes taken off the stack, or visited by brute force.
    pub nodes_explored: u64,
    /// Complete assignments scored.
    pub leaves_evaluated: u64,
    /// Pruned for breaking cost, delay, reach or slot rules.
    pub prunings_infeasible: u64,
    /// Pruned because the bound could not beat the incumbent.
    pub prunings_bound: u64,
    /// Times the incumbent improved.
    pub solutions_found: u64,
    pub max_depth: u64,
    pub time_total: Duration,
}

impl SearchStatistics {
    #[inline]
    pub fn on_node_explored(&mut self) {
        self.nodes_explored = self.nodes_explored.saturating_add(1);
    }

    #[inline]
    pub fn on_leaf_evaluated(&mut self) {
        self.leaves_evaluated = self.leaves_evaluated.saturating_add(1);
    }

    #[inline]
    pub fn on_pruning_infeasible(&mut self) {
        self.prunings_infeasible = self.prunings_infeasible.saturating_add(1);
    }

    #[inline]
    pub fn on_pruning_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add(1);
    }

    #[inline]
    pub fn on_solution_found(&mut self) {
        self.solutions_found = self.solutions_found.saturating_add(1);
    }

    #[inline]
    pub fn on_depth_update(&mut self, depth: usize) {
        self.max_depth = self.max_depth.max(depth as u64);
    }

    #[inline]
    pub fn set_total_time(&mut self, duration: Duration) {
        self.time_total = duration;
    }

    /// Adds the counters of a subtree searched elsewhere.
    pub fn absorb(&mut self, other: &SearchStatistics) {
        self.nodes_explored = self.nodes_explored.saturating_add(other.nodes_explored);
        self.leaves_evaluated = self.leaves_evaluated.saturating_add(other.leaves_evaluated);
        self.prunings_infeasible = self
            .prunings_infeasible
            .saturating_add(other.prunings_infeasible);
        self.prunings_bound = self.prunings_bound.saturating_add(other.prunings_bound);
        self.solutions_found = self.solutions_found.saturating_add(other.solutions_found);
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

impl std::fmt::Display for SearchStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Placement Search Statistics:")?;
        writeln!(f, "  Nodes explored:        {}", self.nodes_explored)?;
        writeln!(f, "  Leaves evaluated:      {}", self.leaves_evaluated)?;
        writeln!(f, "  Max depth reached:     {}", self.max_depth)?;
        writeln!(f, "  Prunings (infeasible): {}", self.prunings_infeasible)?;
        writeln!(f, "  Prunings (bound):      {}", self.prunings_bound)?;
        writeln!(f, "  Solutions found:       {}", self.solutions_found)?;
        writeln!(f, "  Total time:            {:.2?}", self.time_total)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_adds_counters() {
        let mut a = SearchStatistics::default();
        a.on_node_explored();
        a.on_depth_update(3);

        let mut b = SearchStatistics::default();
        b.on_node_explored();
        b.on_node_explored();
        b.on_pruning_bound();
        b.on_depth_update(5);

        a.absorb(&b);
        assert_eq!(a.nodes_explored, 3);
        assert_eq!(a.prunings_bound, 1);
        assert_eq!(a.max_depth, 5);
    }
}
