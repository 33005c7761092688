use serde::{Deserialize, Serialize};

use super::estimate::CoverageEstimator;
use crate::{
    problem::{Anchor, Evaluation, PlacementProblem, noncoverage_between},
    units::{Length, Time},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneReason {
    Cost,
    Delay,
    Saturated,
    /// The new station cannot hear the previous member of the chain.
    OutOfReach,
    /// The chain can neither close at the right gateway nor reach another candidate.
    DeadEnd,
    /// Too few positions left for the stations that still have to be placed.
    Slots,
    Bound,
}

impl PruneReason {
    pub fn is_bound(self) -> bool {
        self == PruneReason::Bound
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeState {
    Root,
    /// Undecided positions remain; no completion scores below `bound`.
    Open { bound: Length },
    /// Every position decided and the chain closes.
    Leaf { score: Length },
    Pruned(PruneReason),
}

/// The decided prefix of an assignment and what it has used up.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub slots: Vec<Option<usize>>,
    pub used: Vec<bool>,
    /// Last placed station, or the left gateway.
    pub anchor: Anchor,
    /// Non-coverage from the left gateway up to the anchor.
    pub settled: Length,
    pub cost: u64,
    pub delay: Time,
    pub placed: usize,
}

impl Chain {
    fn empty(problem: &PlacementProblem) -> Self {
        Self {
            slots: Vec::with_capacity(problem.position_count()),
            used: vec![false; problem.station_count()],
            anchor: Anchor::Gateway,
            settled: Length::ZERO,
            cost: 0,
            delay: Time::ZERO,
            placed: 0,
        }
    }

    fn skip(&self) -> Self {
        let mut chain = self.clone();
        chain.slots.push(None);
        chain
    }

    /// Puts `station` on the next position.
    fn place(&self, problem: &PlacementProblem, station: usize) -> Result<Self, PruneReason> {
        let slot = self.slots.len();
        let position = problem.placements()[slot];
        let from = problem.anchor_position(self.anchor);

        if from.distance_to(position) > problem.hop_reach(self.anchor, station) {
            return Err(PruneReason::OutOfReach);
        }

        let restriction = problem.restriction();
        let cost = self
            .cost
            .checked_add(problem.stations()[station].cost)
            .filter(|&cost| cost <= restriction.cost_limit)
            .ok_or(PruneReason::Cost)?;

        let delay = self.delay
            + problem
                .station_delay(station, self.placed + 1)
                .ok_or(PruneReason::Saturated)?;
        if delay > restriction.delay_limit {
            return Err(PruneReason::Delay);
        }

        let mut chain = self.clone();
        chain.settled += noncoverage_between(
            from,
            position,
            problem.anchor_coverage(self.anchor),
            problem.radio().coverage()[station],
        );
        chain.slots.push(Some(station));
        chain.used[station] = true;
        chain.anchor = Anchor::Station { slot, station };
        chain.cost = cost;
        chain.delay = delay;
        chain.placed += 1;
        Ok(chain)
    }

    /// Score once the chain is closed at the right gateway.
    pub fn closing_score(&self, problem: &PlacementProblem) -> Length {
        self.settled
            + noncoverage_between(
                problem.anchor_position(self.anchor),
                problem.gateway().right,
                problem.anchor_coverage(self.anchor),
                Length::ZERO,
            )
    }

    pub fn evaluation(&self, problem: &PlacementProblem) -> Evaluation {
        Evaluation {
            noncoverage: self.closing_score(problem),
            cost: self.cost,
            delay: self.delay,
            placed: self.placed,
        }
    }

    /// Longest hop the anchor could make to any unused station.
    fn best_reach(&self, problem: &PlacementProblem) -> Option<Length> {
        (0..problem.station_count())
            .filter(|&s| !self.used[s])
            .map(|s| problem.hop_reach(self.anchor, s))
            .reduce(Length::max)
    }
}

/// Rules that stay fixed for one search.
#[derive(Debug, Clone)]
pub struct Expansion<'a> {
    pub problem: &'a PlacementProblem,
    pub estimator: CoverageEstimator,
    pub place_all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchNode {
    /// Positions decided so far.
    pub depth: usize,
    pub chain: Chain,
    pub state: NodeState,
}

impl SearchNode {
    pub fn root(rules: &Expansion) -> Self {
        let chain = Chain::empty(rules.problem);
        let state = match rules.classify(&chain) {
            NodeState::Open { .. } => NodeState::Root,
            other => other,
        };

        Self {
            depth: 0,
            chain,
            state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, NodeState::Leaf { .. } | NodeState::Pruned(_))
    }

    /// Children in expansion order: each unused station by ascending index, then leaving the position empty.
    pub fn expand(&self, rules: &Expansion) -> Vec<SearchNode> {
        let problem = rules.problem;
        let mut children = Vec::with_capacity(problem.station_count() + 1);

        for station in 0..problem.station_count() {
            if self.chain.used[station] {
                continue;
            }

            let child = match self.chain.place(problem, station) {
                Ok(chain) => {
                    let state = rules.classify(&chain);
                    SearchNode {
                        depth: self.depth + 1,
                        chain,
                        state,
                    }
                }
                Err(reason) => SearchNode {
                    depth: self.depth + 1,
                    chain: self.chain.clone(),
                    state: NodeState::Pruned(reason),
                },
            };
            children.push(child);
        }

        let chain = self.chain.skip();
        let state = rules.classify(&chain);
        children.push(SearchNode {
            depth: self.depth + 1,
            chain,
            state,
        });

        children
    }
}

impl Expansion<'_> {
    fn classify(&self, chain: &Chain) -> NodeState {
        let problem = self.problem;
        let depth = chain.slots.len();
        let remaining = problem.position_count() - depth;
        let unused = problem.station_count() - chain.placed;

        if self.place_all && unused > remaining {
            return NodeState::Pruned(PruneReason::Slots);
        }

        let closes = problem.closes_to_right(chain.anchor);

        if remaining == 0 {
            return if closes {
                NodeState::Leaf {
                    score: chain.closing_score(problem),
                }
            } else {
                NodeState::Pruned(PruneReason::OutOfReach)
            };
        }

        if !closes {
            let next = problem.placements()[depth];
            let gap = problem.anchor_position(chain.anchor).distance_to(next);
            if chain.best_reach(problem).is_none_or(|reach| gap > reach) {
                return NodeState::Pruned(PruneReason::DeadEnd);
            }
        }

        NodeState::Open {
            bound: self.bound(chain, remaining),
        }
    }

    /// `settled + max(R - c - E, 0)`: the rest of the line from the anchor,
    /// less the anchor's coverage and the most unused stations could cover.
    fn bound(&self, chain: &Chain, remaining: usize) -> Length {
        let problem = self.problem;
        let rest = problem
            .anchor_position(chain.anchor)
            .distance_to(problem.gateway().right);
        let budget = problem.restriction().cost_limit.saturating_sub(chain.cost);
        let extra = self.estimator.extra_coverage(&chain.used, budget, remaining);

        chain.settled + (rest - problem.anchor_coverage(chain.anchor) - extra).max(Length::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EstimationMethod, problem::tests::line};

    fn rules(problem: &PlacementProblem, place_all: bool) -> Expansion<'_> {
        Expansion {
            problem,
            estimator: CoverageEstimator::new(problem, EstimationMethod::Ilp, place_all),
            place_all,
        }
    }

    #[test]
    fn expansion_order() {
        let p = line(20.0, &[5.0, 10.0, 15.0], &[30.0, 30.0], &[1.0, 1.0], &[1, 1]);
        let rules = rules(&p, false);
        let root = SearchNode::root(&rules);
        assert_eq!(root.state, NodeState::Root);

        let children = root.expand(&rules);
        let firsts: Vec<_> = children.iter().map(|c| c.chain.slots[0]).collect();
        assert_eq!(firsts, vec![Some(0), Some(1), None]);
        assert!(children.iter().all(|c| c.depth == 1));
    }

    #[test]
    fn out_of_reach_pruned() {
        let p = line(40.0, &[15.0, 25.0], &[10.0, 20.0], &[0.0, 0.0], &[1, 1]);
        let rules = rules(&p, false);
        let children = SearchNode::root(&rules).expand(&rules);

        assert_eq!(children[0].state, NodeState::Pruned(PruneReason::OutOfReach));
        assert!(matches!(children[1].state, NodeState::Open { .. }));
        // skipping the first position leaves 25 m to the nearest candidate, out of every reach
        assert_eq!(children[2].state, NodeState::Pruned(PruneReason::DeadEnd));
    }

    #[test]
    fn bound_never_exceeds_leaf() {
        let p = line(100.0, &[25.0, 50.0, 75.0], &[40.0, 40.0, 40.0], &[5.0, 10.0, 3.0], &[1, 1, 1]);
        let rules = rules(&p, false);

        let mut stack = vec![SearchNode::root(&rules)];
        while let Some(node) = stack.pop() {
            let children = node.expand(&rules);
            for child in children {
                if let NodeState::Open { bound } = child.state {
                    let mut inner = vec![child.clone()];
                    while let Some(n) = inner.pop() {
                        match n.state {
                            NodeState::Leaf { score } => assert!(bound <= score),
                            NodeState::Open { .. } => inner.extend(n.expand(&rules)),
                            _ => {}
                        }
                    }
                    stack.push(child);
                }
            }
        }
    }

    #[test]
    fn place_all_needs_room() {
        let p = line(20.0, &[10.0], &[30.0, 30.0], &[1.0, 1.0], &[1, 1]);
        let rules = rules(&p, true);
        assert_eq!(
            SearchNode::root(&rules).state,
            NodeState::Pruned(PruneReason::Slots)
        );
    }

    #[test]
    fn leaf_score() {
        let p = line(20.0, &[10.0], &[10.0], &[4.0], &[1]);
        let rules = rules(&p, false);
        let children = SearchNode::root(&rules).expand(&rules);

        assert_eq!(
            children[0].state,
            NodeState::Leaf {
                score: Length::from_metres(12.0)
            }
        );
        assert_eq!(children[1].state, NodeState::Pruned(PruneReason::OutOfReach));
    }
}
