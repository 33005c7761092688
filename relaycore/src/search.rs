//! Placement search: which station, if any, goes on each candidate position.
//!
//! [`find_placement`] runs the feasibility pre-check and then either brute force or
//! branch-and-bound, as configured. Both visit assignments in the same order (for each
//! position: every unused station by ascending index, then leaving it empty) and keep
//! the first of equally scored placements, so they return the same result on the same input.
//!
//! ```
//! # use relaycore::{config::SearchConfig, problem::*, radio::RadioMatrices, search::*, units::*};
//! let problem = PlacementProblem::new(
//!     GatewayPair::new(Length::ZERO, Length::from_metres(20.0)),
//!     vec![Length::ZERO, Length::from_metres(10.0), Length::from_metres(20.0)],
//!     vec![Station { cost: 1, throughput: 1.0e6 }],
//!     RadioMatrices::uniform(1, Length::from_metres(10.0), Length::ZERO),
//!     Restriction { cost_limit: 1, delay_limit: Time::from_seconds(1.0) },
//!     Arrival { rate: 1.0, packet_size: 1000.0 },
//! )
//! .unwrap();
//!
//! let outcome = find_placement(&problem, &SearchConfig::default()).unwrap();
//! assert_eq!(outcome.status, SearchStatus::Optimal);
//! assert_eq!(outcome.best.unwrap().assignment.to_string(), "[-, S1, -]");
//! ```

mod branch_and_bound;
mod brute_force;
pub mod budget;
pub mod estimate;
pub mod incumbent;
pub mod node;
mod outcome;
mod stats;

use std::time::{Duration, Instant};

use tracing::info;

pub use outcome::{
    Assignment, Placement, PlacementCount, SearchOutcome, SearchStatus, Termination,
};
pub use stats::SearchStatistics;

use crate::{
    config::{ConfigurationError, Method, SearchConfig},
    feasibility,
    problem::PlacementProblem,
};
use budget::Budget;
use estimate::CoverageEstimator;
use incumbent::RecordSchedule;
use node::Expansion;

pub fn find_placement(
    problem: &PlacementProblem,
    config: &SearchConfig,
) -> Result<SearchOutcome, ConfigurationError> {
    config.validate()?;
    let start = Instant::now();

    info!(
        method = ?config.method,
        positions = problem.position_count(),
        stations = problem.station_count(),
        place_all = config.place_all_stations,
        "placement search started"
    );

    let feasible_placement_count = config
        .place_all_stations
        .then(|| PlacementCount::new(problem.position_count(), problem.station_count()));

    if let Some(rejection) = feasibility::rejection(problem) {
        info!(?rejection, "no placement possible");
        return Ok(SearchOutcome {
            status: SearchStatus::NoPlacementPossible,
            best: None,
            alternatives: Vec::new(),
            exhaustive: true,
            termination: Termination::NotStarted,
            rejection: Some(rejection),
            feasible_placement_count,
            statistics: SearchStatistics::default(),
        });
    }

    let line = problem.gateway().length();
    let template = RecordSchedule::new(
        config.last_optimal_noncoverage,
        config.relative_deviation.map(|share| line * share),
        config.alternatives_limit,
    );

    let deadline = config
        .time_limit
        .map(|t| start + Duration::from_secs_f64(t.seconds()));
    let budget = Budget::new(config.node_limit, deadline);

    let (schedule, mut statistics) = match config.method {
        Method::BruteForce => {
            let mut schedule = template.for_task(0);
            let mut statistics = SearchStatistics::default();
            brute_force::search(
                problem,
                config.place_all_stations,
                &mut schedule,
                &budget,
                &mut statistics,
            );
            (schedule, statistics)
        }
        Method::BranchAndBound => {
            let rules = Expansion {
                problem,
                estimator: CoverageEstimator::new(
                    problem,
                    config.estimation,
                    config.place_all_stations,
                ),
                place_all: config.place_all_stations,
            };
            if config.parallel {
                branch_and_bound::search_parallel(&rules, &template, &budget)
            } else {
                branch_and_bound::search(&rules, &template, &budget)
            }
        }
    };

    statistics.set_total_time(start.elapsed());
    let exhaustive = !budget.is_stopped();
    let (best, alternatives) = schedule.into_parts();

    let status = match (&best, exhaustive) {
        (Some(_), true) => SearchStatus::Optimal,
        (Some(_), false) => SearchStatus::Feasible,
        (None, _) => SearchStatus::NothingFound,
    };

    info!(
        ?status,
        noncoverage = ?best.as_ref().map(|b| b.noncoverage.metres()),
        nodes = statistics.nodes_explored,
        elapsed = ?statistics.time_total,
        "placement search finished"
    );

    Ok(SearchOutcome {
        status,
        best,
        alternatives,
        exhaustive,
        termination: budget.termination(),
        rejection: None,
        feasible_placement_count,
        statistics,
    })
}
