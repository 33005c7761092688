//! Quick necessary conditions for a placement to exist, checked before any search.
//!
//! Each public function, other than [`exists_possible_placement`] and [`rejection`],
//! is one condition every feasible dataset satisfies. Passing all of them does not
//! mean a placement exists.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{problem::PlacementProblem, units::Length};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rejection {
    /// Candidates exist but there is no station to place on them.
    NoStations,
    /// The first or last candidate is out of reach of its gateway for every station.
    GatewayOutOfReach { slot: usize, distance: Length },
    /// Two neighbouring candidates are further apart than any single hop.
    GapTooWide { slot: usize, gap: Length },
}

pub fn exists_possible_placement(problem: &PlacementProblem) -> bool {
    rejection(problem).is_none()
}

/// First condition `problem` fails, if any.
pub fn rejection(problem: &PlacementProblem) -> Option<Rejection> {
    let rejection = if problem.placements().is_empty() {
        None
    } else if !has_stations(problem) {
        Some(Rejection::NoStations)
    } else if let Some((slot, distance)) = unreachable_end(problem) {
        Some(Rejection::GatewayOutOfReach { slot, distance })
    } else if let Some((slot, gap)) = widest_impossible_gap(problem) {
        Some(Rejection::GapTooWide { slot, gap })
    } else {
        None
    };

    if let Some(reason) = rejection {
        debug!(?reason, "no placement possible");
    }

    rejection
}

pub fn has_stations(problem: &PlacementProblem) -> bool {
    problem.station_count() > 0 || problem.placements().is_empty()
}

/// Both end candidates lie within the best station-to-gateway and the best
/// gateway-to-station reach of their gateway.
pub fn ends_within_gateway_reach(problem: &PlacementProblem) -> bool {
    unreachable_end(problem).is_none()
}

/// No two neighbouring candidates are further apart than the longest single hop.
pub fn gaps_within_hop_reach(problem: &PlacementProblem) -> bool {
    widest_impossible_gap(problem).is_none()
}

fn unreachable_end(problem: &PlacementProblem) -> Option<(usize, Length)> {
    let placements = problem.placements();
    let (Some(&first), Some(&last)) = (placements.first(), placements.last()) else {
        return None;
    };

    let radio = problem.radio();
    let uplink = radio.best_gateway_link().map(|(_, d)| d)?;
    let downlink = radio.gateway_to_station().iter().copied().reduce(Length::max)?;
    let reach = uplink.min(downlink);

    let gateway = problem.gateway();
    let ends = [
        (0, first.distance_to(gateway.left)),
        (placements.len() - 1, last.distance_to(gateway.right)),
    ];

    ends.into_iter().find(|&(_, distance)| distance > reach)
}

fn widest_impossible_gap(problem: &PlacementProblem) -> Option<(usize, Length)> {
    let reach = problem.radio().max_single_hop()?;

    problem
        .placements()
        .windows(2)
        .enumerate()
        .map(|(i, pair)| (i + 1, pair[0].distance_to(pair[1])))
        .find(|&(_, gap)| gap > reach)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::tests::line;

    #[test]
    fn empty_candidates_pass() {
        let p = line(20.0, &[], &[], &[], &[]);
        assert!(exists_possible_placement(&p));
    }

    #[test]
    fn no_stations_fail() {
        let p = line(20.0, &[10.0], &[], &[], &[]);
        assert_eq!(rejection(&p), Some(Rejection::NoStations));
    }

    #[test]
    fn far_end_rejected() {
        let p = line(100.0, &[10.0, 40.0], &[30.0, 20.0], &[0.0, 0.0], &[1, 1]);
        assert_eq!(
            rejection(&p),
            Some(Rejection::GatewayOutOfReach {
                slot: 1,
                distance: Length::from_metres(60.0)
            })
        );
        assert!(!ends_within_gateway_reach(&p));
    }

    #[test]
    fn wide_gap_rejected() {
        let p = line(100.0, &[20.0, 50.0, 80.0], &[25.0, 25.0], &[0.0, 0.0], &[1, 1]);
        assert!(ends_within_gateway_reach(&p));
        assert!(!gaps_within_hop_reach(&p));
        assert_eq!(
            rejection(&p),
            Some(Rejection::GapTooWide {
                slot: 1,
                gap: Length::from_metres(30.0)
            })
        );
    }

    #[test]
    fn reachable_line_passes() {
        let p = line(20.0, &[0.0, 10.0, 20.0], &[10.0], &[0.0], &[1]);
        assert!(exists_possible_placement(&p));
    }
}
