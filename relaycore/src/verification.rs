//! Checks to run on search outcomes to make sure the search is working correctly.
//! Each public function, other than [`verify_all`], is a property that should hold for every outcome.

use tracing::warn;

use crate::{
    SCORE_EPSILON,
    problem::PlacementProblem,
    search::{Placement, SearchOutcome, SearchStatus},
};

pub fn verify_all(problem: &PlacementProblem, outcome: &SearchOutcome, place_all: bool) -> bool {
    status_consistent(outcome)
        && outcome
            .best
            .iter()
            .chain(outcome.alternatives.iter())
            .all(|p| verify_placement(problem, p, place_all))
        && alternatives_not_better(outcome)
}

pub fn verify_placement(problem: &PlacementProblem, placement: &Placement, place_all: bool) -> bool {
    stations_used_once(problem, placement)
        && within_cost_limit(problem, placement)
        && hops_close(problem, placement)
        && score_reproducible(problem, placement, place_all)
}

/// The status agrees with what was found and how far the search got.
pub fn status_consistent(outcome: &SearchOutcome) -> bool {
    let ok = match outcome.status {
        SearchStatus::Optimal => outcome.best.is_some() && outcome.exhaustive,
        SearchStatus::Feasible => outcome.best.is_some() && !outcome.exhaustive,
        SearchStatus::NoPlacementPossible => outcome.best.is_none() && outcome.rejection.is_some(),
        SearchStatus::NothingFound => outcome.best.is_none(),
    };

    if !ok {
        warn!(status = ?outcome.status, exhaustive = outcome.exhaustive, "inconsistent outcome status");
    }
    ok
}

/// No station is placed twice, and every placed station exists.
pub fn stations_used_once(problem: &PlacementProblem, placement: &Placement) -> bool {
    let mut seen = vec![false; problem.station_count()];

    for (slot, station) in placement.assignment.occupied() {
        if station >= seen.len() || seen[station] {
            warn!(slot, station, assignment = %placement.assignment, "station reused or unknown");
            return false;
        }
        seen[station] = true;
    }

    placement.assignment.slots().len() == problem.position_count()
}

pub fn within_cost_limit(problem: &PlacementProblem, placement: &Placement) -> bool {
    let cost = placement
        .assignment
        .occupied()
        .try_fold(0u64, |total, (_, s)| total.checked_add(problem.stations()[s].cost));

    let ok = cost.is_some_and(|cost| cost == placement.cost && cost <= problem.restriction().cost_limit);
    if !ok {
        warn!(?cost, reported = placement.cost, "cost does not hold");
    }
    ok
}

/// Consecutive members of the chain, gateways included, can hear each other.
pub fn hops_close(problem: &PlacementProblem, placement: &Placement) -> bool {
    let radio = problem.radio();
    let gateway = problem.gateway();
    let chain: Vec<(usize, usize)> = placement.assignment.occupied().collect();

    let Some(&(first_slot, first)) = chain.first() else {
        return problem.position_count() == 0;
    };
    let Some(&(last_slot, last)) = chain.last() else {
        return false;
    };

    let placements = problem.placements();
    if gateway.left.distance_to(placements[first_slot]) > radio.gateway_reach(first) {
        warn!(station = first, "left gateway hop open");
        return false;
    }
    if placements[last_slot].distance_to(gateway.right) > radio.gateway_reach(last) {
        warn!(station = last, "right gateway hop open");
        return false;
    }

    chain.windows(2).all(|pair| {
        let (a_slot, a) = pair[0];
        let (b_slot, b) = pair[1];
        let ok = placements[a_slot].distance_to(placements[b_slot]) <= radio.mutual_link(a, b);
        if !ok {
            warn!(a, b, "station hop open");
        }
        ok
    })
}

/// Evaluating the assignment from scratch gives the reported score.
pub fn score_reproducible(problem: &PlacementProblem, placement: &Placement, place_all: bool) -> bool {
    match problem.evaluate(placement.assignment.slots(), place_all) {
        Ok(evaluation) => {
            let diff = (evaluation.noncoverage - placement.noncoverage).abs().metres();
            if diff > SCORE_EPSILON {
                warn!(
                    reported = %placement.noncoverage,
                    recomputed = %evaluation.noncoverage,
                    "score differs"
                );
                return false;
            }
            true
        }
        Err(violation) => {
            warn!(%violation, assignment = %placement.assignment, "reported placement is infeasible");
            false
        }
    }
}

pub fn alternatives_not_better(outcome: &SearchOutcome) -> bool {
    let Some(best) = &outcome.best else {
        return outcome.alternatives.is_empty();
    };

    outcome
        .alternatives
        .iter()
        .all(|alt| alt.noncoverage.metres() >= best.noncoverage.metres() - SCORE_EPSILON)
}
