use tracing::trace;

use super::{
    budget::Budget,
    incumbent::RecordSchedule,
    outcome::{Assignment, Placement},
    stats::SearchStatistics,
};
use crate::problem::PlacementProblem;

/// Scores every assignment from scratch, in the same order branch-and-bound expands them.
pub fn search(
    problem: &PlacementProblem,
    place_all: bool,
    schedule: &mut RecordSchedule,
    budget: &Budget,
    stats: &mut SearchStatistics,
) {
    let mut enumeration = Enumeration {
        problem,
        place_all,
        schedule,
        budget,
        stats,
        slots: Vec::with_capacity(problem.position_count()),
        used: vec![false; problem.station_count()],
    };
    enumeration.visit();
}

struct Enumeration<'a> {
    problem: &'a PlacementProblem,
    place_all: bool,
    schedule: &'a mut RecordSchedule,
    budget: &'a Budget,
    stats: &'a mut SearchStatistics,
    slots: Vec<Option<usize>>,
    used: Vec<bool>,
}

impl Enumeration<'_> {
    /// Returns `false` once the budget runs out.
    fn visit(&mut self) -> bool {
        if !self.budget.tick() {
            return false;
        }
        self.stats.on_node_explored();
        self.stats.on_depth_update(self.slots.len());

        if self.slots.len() == self.problem.position_count() {
            self.leaf();
            return true;
        }

        for station in 0..self.problem.station_count() {
            if self.used[station] {
                continue;
            }

            self.used[station] = true;
            self.slots.push(Some(station));
            let go_on = self.visit();
            self.slots.pop();
            self.used[station] = false;

            if !go_on {
                return false;
            }
        }

        self.slots.push(None);
        let go_on = self.visit();
        self.slots.pop();
        go_on
    }

    fn leaf(&mut self) {
        self.stats.on_leaf_evaluated();

        match self.problem.evaluate(&self.slots, self.place_all) {
            Ok(evaluation) => {
                let placement =
                    Placement::new(self.problem, Assignment::new(self.slots.clone()), evaluation);
                if self.schedule.offer(placement) {
                    self.stats.on_solution_found();
                }
            }
            Err(violation) => {
                trace!(%violation, "assignment rejected");
                self.stats.on_pruning_infeasible();
            }
        }
    }
}
