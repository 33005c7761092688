//! Depth-first branch-and-bound over the placement tree.
//!
//! Nodes live on an explicit stack and are dropped when popped, so a subtree is freed
//! as soon as it is backtracked out of. Children are pushed in reverse, which makes the
//! pop order the expansion order and keeps the first-found tie-break of brute force.

use rayon::prelude::*;
use tracing::{debug, trace};

use super::{
    budget::Budget,
    incumbent::{RecordSchedule, SharedBound},
    node::{Expansion, NodeState, PruneReason, SearchNode},
    outcome::{Assignment, Placement},
    stats::SearchStatistics,
};
use crate::SCORE_EPSILON;

/// Depth at which the tree is cut into independent subtrees for parallel search.
const SPLIT_DEPTH: usize = 2;

pub fn search(
    rules: &Expansion,
    template: &RecordSchedule,
    budget: &Budget,
) -> (RecordSchedule, SearchStatistics) {
    explore(rules, SearchNode::root(rules), template.for_task(0), None, budget)
}

/// Splits the tree at [`SPLIT_DEPTH`] and searches the subtrees on the rayon pool.
///
/// Workers share only the record score. Each subtree keeps its own records, which are
/// merged in expansion order afterwards, so the result matches [`search`].
pub fn search_parallel(
    rules: &Expansion,
    template: &RecordSchedule,
    budget: &Budget,
) -> (RecordSchedule, SearchStatistics) {
    let mut stats = SearchStatistics::default();
    let tasks = frontier(rules, budget, &mut stats);
    debug!(subtrees = tasks.len(), "split search tree");

    let shared = SharedBound::new();
    let results: Vec<(RecordSchedule, SearchStatistics)> = tasks
        .into_par_iter()
        .enumerate()
        .map(|(task, node)| explore(rules, node, template.for_task(task), Some(&shared), budget))
        .collect();

    let mut schedules = Vec::with_capacity(results.len());
    for (schedule, task_stats) in results {
        stats.absorb(&task_stats);
        schedules.push(schedule);
    }

    (RecordSchedule::merge(template, schedules), stats)
}

/// Nodes at the split depth, plus leaves above it, in expansion order.
fn frontier(rules: &Expansion, budget: &Budget, stats: &mut SearchStatistics) -> Vec<SearchNode> {
    let mut out = Vec::new();
    let mut stack = vec![SearchNode::root(rules)];

    while let Some(node) = stack.pop() {
        if node.is_terminal() || node.depth >= SPLIT_DEPTH {
            out.push(node);
            continue;
        }

        if !budget.tick() {
            break;
        }
        stats.on_node_explored();
        stats.on_depth_update(node.depth);

        for child in node.expand(rules).into_iter().rev() {
            match child.state {
                NodeState::Pruned(reason) => on_pruned(stats, child.depth, reason),
                _ => stack.push(child),
            }
        }
    }

    out
}

fn on_pruned(stats: &mut SearchStatistics, depth: usize, reason: PruneReason) {
    trace!(depth, ?reason, "pruned");
    if reason.is_bound() {
        stats.on_pruning_bound();
    } else {
        stats.on_pruning_infeasible();
    }
}

fn explore(
    rules: &Expansion,
    root: SearchNode,
    mut schedule: RecordSchedule,
    shared: Option<&SharedBound>,
    budget: &Budget,
) -> (RecordSchedule, SearchStatistics) {
    let problem = rules.problem;
    let mut stats = SearchStatistics::default();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !budget.tick() {
            break;
        }
        stats.on_node_explored();
        stats.on_depth_update(node.depth);

        let cutoff = schedule.cutoff_with(shared.and_then(SharedBound::get)).metres() + SCORE_EPSILON;

        match node.state {
            NodeState::Pruned(reason) => on_pruned(&mut stats, node.depth, reason),
            NodeState::Leaf { score } => {
                stats.on_leaf_evaluated();
                let evaluation = node.chain.evaluation(problem);
                let placement = Placement::new(problem, Assignment::new(node.chain.slots), evaluation);
                let assignment = placement.assignment.to_string();

                if schedule.offer(placement) {
                    stats.on_solution_found();
                    debug!(%score, %assignment, "new incumbent");
                    if let Some(shared) = shared {
                        shared.tighten(score);
                    }
                }
            }
            NodeState::Open { bound } if bound.metres() > cutoff => {
                // the record improved since this node was pushed
                on_pruned(&mut stats, node.depth, PruneReason::Bound);
            }
            NodeState::Open { .. } | NodeState::Root => {
                for child in node.expand(rules).into_iter().rev() {
                    let beaten = match child.state {
                        NodeState::Open { bound } => bound.metres() > cutoff,
                        NodeState::Leaf { score } => score.metres() > cutoff,
                        _ => false,
                    };

                    match child.state {
                        NodeState::Pruned(reason) => on_pruned(&mut stats, child.depth, reason),
                        _ if beaten => on_pruned(&mut stats, child.depth, PruneReason::Bound),
                        _ => stack.push(child),
                    }
                }
            }
        }
    }

    (schedule, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EstimationMethod,
        problem::{PlacementProblem, tests::line},
        search::estimate::CoverageEstimator,
    };

    fn rules(problem: &PlacementProblem) -> Expansion<'_> {
        Expansion {
            problem,
            estimator: CoverageEstimator::new(problem, EstimationMethod::Ilp, false),
            place_all: false,
        }
    }

    fn best(schedule: &RecordSchedule) -> Option<String> {
        schedule.best().map(|r| r.placement.assignment.to_string())
    }

    #[test]
    fn finds_single_relay() {
        let p = line(20.0, &[0.0, 10.0, 20.0], &[10.0], &[0.0], &[1]);
        let template = RecordSchedule::new(None, None, 0);
        let (schedule, stats) = search(&rules(&p), &template, &Budget::unlimited());

        assert_eq!(best(&schedule), Some("[-, S1, -]".to_owned()));
        assert_eq!(stats.solutions_found, 1);
    }

    #[test]
    fn parallel_matches_sequential() {
        let p = line(
            100.0,
            &[15.0, 30.0, 45.0, 60.0, 75.0, 90.0],
            &[35.0, 30.0, 40.0, 25.0],
            &[6.0, 9.0, 4.0, 9.0],
            &[3, 5, 2, 4],
        );
        let template = RecordSchedule::new(None, Some(crate::units::Length::from_metres(5.0)), 50);
        let rules = rules(&p);

        let (a, _) = search(&rules, &template, &Budget::unlimited());
        let (b, _) = search_parallel(&rules, &template, &Budget::unlimited());

        assert_eq!(best(&a), best(&b));
        assert_eq!(a.clone().into_parts(), b.clone().into_parts());
    }

    #[test]
    fn frontier_in_expansion_order() {
        let p = line(30.0, &[10.0, 20.0], &[15.0, 15.0], &[1.0, 1.0], &[1, 1]);
        let rules = rules(&p);
        let mut stats = SearchStatistics::default();
        let nodes = frontier(&rules, &Budget::unlimited(), &mut stats);

        let slots: Vec<_> = nodes.iter().map(|n| Assignment::new(n.chain.slots.clone()).to_string()).collect();
        assert_eq!(slots, vec!["[S1, S2]", "[S2, S1]"]);
    }
}
