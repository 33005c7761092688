use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::stats::SearchStatistics;
use crate::{
    combinatorics::{arrangements, log10_arrangements},
    feasibility::Rejection,
    problem::{Evaluation, PlacementProblem},
    units::{Length, Time},
};

/// Station chosen for each candidate position, `None` where the position is left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(Vec<Option<usize>>);

impl Assignment {
    pub fn new(slots: Vec<Option<usize>>) -> Self {
        Assignment(slots)
    }

    pub fn slots(&self) -> &[Option<usize>] {
        &self.0
    }

    pub fn placed(&self) -> usize {
        self.0.iter().flatten().count()
    }

    /// `(position index, station index)` for each occupied position.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(slot, station)| station.map(|s| (slot, s)))
    }
}

impl From<Vec<Option<usize>>> for Assignment {
    fn from(value: Vec<Option<usize>>) -> Self {
        Assignment(value)
    }
}

/// Stations are shown 1-based, empty positions as `-`.
impl Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, slot) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match slot {
                Some(s) => write!(f, "S{}", s + 1)?,
                None => write!(f, "-")?,
            }
        }
        write!(f, "]")
    }
}

/// A feasible assignment with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub assignment: Assignment,
    /// Uncovered length of the gateway segment.
    pub noncoverage: Length,
    /// `noncoverage` as a share of the segment length.
    pub noncoverage_ratio: f64,
    pub cost: u64,
    pub delay: Time,
}

impl Placement {
    pub fn new(problem: &PlacementProblem, assignment: Assignment, evaluation: Evaluation) -> Self {
        let length = problem.gateway().length();
        let noncoverage_ratio = if length > Length::ZERO {
            evaluation.noncoverage / length
        } else {
            0.0
        };

        Self {
            assignment,
            noncoverage: evaluation.noncoverage,
            noncoverage_ratio,
            cost: evaluation.cost,
            delay: evaluation.delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    /// The whole tree was searched and `best` is optimal.
    Optimal,
    /// The search stopped early; `best` is the best found so far.
    Feasible,
    /// The pre-check ruled out every placement, no search was run.
    NoPlacementPossible,
    NothingFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Exhausted,
    NodeLimit,
    TimeLimit,
    /// Rejected before the search.
    NotStarted,
}

/// Ordered ways of placing every station, reported when all stations must be placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementCount {
    /// `None` when it does not fit a `u64`.
    pub exact: Option<u64>,
    /// `None` when there are no arrangements.
    pub log10: Option<f64>,
}

impl PlacementCount {
    pub fn new(positions: usize, stations: usize) -> Self {
        Self {
            exact: arrangements(positions as u64, stations as u64),
            log10: Some(log10_arrangements(positions as u64, stations as u64))
                .filter(|l| l.is_finite()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub best: Option<Placement>,
    /// Other placements within the requested deviation of `best`, best first.
    pub alternatives: Vec<Placement>,
    pub exhaustive: bool,
    pub termination: Termination,
    pub rejection: Option<Rejection>,
    pub feasible_placement_count: Option<PlacementCount>,
    pub statistics: SearchStatistics,
}

impl SearchOutcome {
    pub fn is_feasible(&self) -> bool {
        self.best.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_display() {
        let a = Assignment::new(vec![None, Some(0), None, Some(3)]);
        assert_eq!(a.to_string(), "[-, S1, -, S4]");
        assert_eq!(Assignment::default().to_string(), "[]");
    }

    #[test]
    fn occupied_positions() {
        let a = Assignment::new(vec![Some(2), None, Some(0)]);
        assert_eq!(a.occupied().collect::<Vec<_>>(), vec![(0, 2), (2, 0)]);
        assert_eq!(a.placed(), 2);
    }

    #[test]
    fn placement_count() {
        let count = PlacementCount::new(5, 2);
        assert_eq!(count.exact, Some(20));
        assert_eq!(PlacementCount::new(2, 3).exact, Some(0));
        assert_eq!(PlacementCount::new(2, 3).log10, None);
        assert_eq!(PlacementCount::new(40, 30).exact, None);
    }

    #[test]
    fn assignment_serialises_as_list() {
        let a = Assignment::new(vec![None, Some(1)]);
        assert_eq!(serde_json::to_string(&a).unwrap(), "[null,1]");
    }
}
