//! The placement problem on a line between two gateways, and the rules any assignment is judged by.
//!
//! Stations placed on the candidate positions form a chain running from the left
//! gateway through the stations in ascending position to the right gateway. Each
//! consecutive pair in the chain must hear each other, and the gaps that no
//! station's coverage reaches make up the non-coverage of the assignment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::ConfigurationError,
    radio::RadioMatrices,
    units::{Length, Time},
};

/// Utilisation above which a station queue is considered unstable.
pub const MAX_UTILISATION: f64 = 0.9;

/// Ends of the line the stations relay across.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatewayPair {
    pub left: Length,
    pub right: Length,
}

impl GatewayPair {
    pub fn new(left: Length, right: Length) -> Self {
        Self { left, right }
    }

    pub fn length(&self) -> Length {
        self.right - self.left
    }

    pub fn contains(&self, x: Length) -> bool {
        self.left <= x && x <= self.right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub cost: u64,
    /// Bits per second.
    pub throughput: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Restriction {
    pub cost_limit: u64,
    pub delay_limit: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    /// Packets per second entering each station.
    pub rate: f64,
    /// Bits.
    pub packet_size: f64,
}

/// A member of the relay chain a hop starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    Gateway,
    Station { slot: usize, station: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChainEnd {
    Station { slot: usize, station: usize },
    RightGateway,
}

/// Why an assignment is not a valid placement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("assignment has {got} positions, problem has {expected}")]
    WrongLength { expected: usize, got: usize },
    #[error("station {0} does not exist")]
    UnknownStation(usize),
    #[error("station {0} is placed more than once")]
    StationReused(usize),
    #[error("no station placed between the gateways")]
    NoStations,
    #[error("{placed} of {required} stations placed")]
    StationsLeftOver { placed: usize, required: usize },
    #[error("hop {from:?} -> {to:?} spans {distance} m")]
    HopOpen {
        from: Anchor,
        to: ChainEnd,
        distance: Length,
    },
    #[error("cost {cost} over limit {limit}")]
    CostExceeded { cost: u64, limit: u64 },
    #[error("station {station} is saturated")]
    Saturated { station: usize },
    #[error("delay {delay} s over limit {limit} s")]
    DelayExceeded { delay: Time, limit: Time },
}

/// Score and resource use of a valid assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub noncoverage: Length,
    pub cost: u64,
    pub delay: Time,
    pub placed: usize,
}

/// Uncovered length between two chain members `a` and `b` with coverage radii `cov_a` and `cov_b`.
pub fn noncoverage_between(a: Length, b: Length, cov_a: Length, cov_b: Length) -> Length {
    (a.distance_to(b) - cov_a - cov_b).max(Length::ZERO)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementProblem {
    gateway: GatewayPair,
    placements: Vec<Length>,
    stations: Vec<Station>,
    radio: RadioMatrices,
    restriction: Restriction,
    arrival: Arrival,
}

impl PlacementProblem {
    pub fn new(
        gateway: GatewayPair,
        placements: Vec<Length>,
        stations: Vec<Station>,
        radio: RadioMatrices,
        restriction: Restriction,
        arrival: Arrival,
    ) -> Result<Self, ConfigurationError> {
        finite("gateway_placement[0]", gateway.left.metres())?;
        finite("gateway_placement[1]", gateway.right.metres())?;
        if gateway.left >= gateway.right {
            return Err(ConfigurationError::GatewayNotAscending {
                left: gateway.left.metres(),
                right: gateway.right.metres(),
            });
        }

        for (index, &position) in placements.iter().enumerate() {
            finite(&format!("placement[{index}]"), position.metres())?;
            if !gateway.contains(position) {
                return Err(ConfigurationError::PlacementOutsideSegment {
                    index,
                    position: position.metres(),
                });
            }
            if index > 0 && placements[index - 1] >= position {
                return Err(ConfigurationError::PlacementNotAscending { index });
            }
        }

        if stations.len() != radio.station_count() {
            return Err(ConfigurationError::ShapeMismatch {
                stations: stations.len(),
                radios: radio.station_count(),
            });
        }

        for (s, station) in stations.iter().enumerate() {
            non_negative(&format!("sta[{s}].throughput"), station.throughput)?;
        }

        for s in 0..radio.station_count() {
            non_negative(&format!("coverage[{s}]"), radio.coverage()[s].metres())?;
            non_negative(&format!("station_to_gateway[{s}]"), radio.station_to_gateway()[s].metres())?;
            non_negative(&format!("gateway_to_station[{s}]"), radio.gateway_to_station()[s].metres())?;
            for (t, d) in radio.station_to_station().row(s).iter().enumerate() {
                non_negative(&format!("station_to_station[{s}][{t}]"), d.metres())?;
            }
        }

        non_negative("delay_limit", restriction.delay_limit.seconds())?;
        non_negative("arrival_rate", arrival.rate)?;
        finite("average_packet_size", arrival.packet_size)?;
        if arrival.packet_size <= 0.0 {
            return Err(ConfigurationError::InvalidPacketSize(arrival.packet_size));
        }

        Ok(Self {
            gateway,
            placements,
            stations,
            radio,
            restriction,
            arrival,
        })
    }

    pub fn gateway(&self) -> GatewayPair {
        self.gateway
    }

    pub fn placements(&self) -> &[Length] {
        &self.placements
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn radio(&self) -> &RadioMatrices {
        &self.radio
    }

    pub fn restriction(&self) -> Restriction {
        self.restriction
    }

    pub fn arrival(&self) -> Arrival {
        self.arrival
    }

    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn position_count(&self) -> usize {
        self.placements.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Most stations an assignment can hold.
    pub fn slot_limit(&self) -> usize {
        self.position_count().min(self.station_count())
    }

    pub fn anchor_position(&self, anchor: Anchor) -> Length {
        match anchor {
            Anchor::Gateway => self.gateway.left,
            Anchor::Station { slot, .. } => self.placements[slot],
        }
    }

    pub fn anchor_coverage(&self, anchor: Anchor) -> Length {
        match anchor {
            Anchor::Gateway => Length::ZERO,
            Anchor::Station { station, .. } => self.radio.coverage()[station],
        }
    }

    /// How far a hop from `anchor` to `station` may span.
    pub fn hop_reach(&self, anchor: Anchor, station: usize) -> Length {
        match anchor {
            Anchor::Gateway => self.radio.gateway_reach(station),
            Anchor::Station { station: from, .. } => self.radio.mutual_link(from, station),
        }
    }

    /// Whether `anchor` can close the chain at the right gateway.
    pub fn closes_to_right(&self, anchor: Anchor) -> bool {
        match anchor {
            Anchor::Gateway => self.placements.is_empty(),
            Anchor::Station { slot, station } => {
                self.placements[slot].distance_to(self.gateway.right) <= self.radio.gateway_reach(station)
            }
        }
    }

    /// Delay added by `station` when it is the `k`-th station of the chain (1-based).
    /// `None` once its queue is saturated.
    pub fn station_delay(&self, station: usize, k: usize) -> Option<Time> {
        let rate = self.arrival.rate * k as f64;
        if rate == 0.0 {
            return Some(Time::ZERO);
        }

        let departure = self.stations[station].throughput / self.arrival.packet_size;
        let utilisation = rate / departure;
        if !(utilisation <= MAX_UTILISATION) {
            return None;
        }

        let mean_system_size = utilisation / (1.0 - utilisation);
        Some(Time::from_seconds(mean_system_size / rate))
    }

    /// Non-coverage when every gap along the whole line is uncovered.
    pub fn full_noncoverage(&self) -> Length {
        self.gateway.length()
    }

    /// Checks `assignment` from scratch against every rule.
    pub fn evaluate(
        &self,
        assignment: &[Option<usize>],
        place_all: bool,
    ) -> Result<Evaluation, Violation> {
        if assignment.len() != self.position_count() {
            return Err(Violation::WrongLength {
                expected: self.position_count(),
                got: assignment.len(),
            });
        }

        let mut used = vec![false; self.station_count()];
        for &station in assignment.iter().flatten() {
            if station >= self.station_count() {
                return Err(Violation::UnknownStation(station));
            }
            if std::mem::replace(&mut used[station], true) {
                return Err(Violation::StationReused(station));
            }
        }

        let placed = used.iter().filter(|&&u| u).count();
        if placed == 0 && !self.placements.is_empty() {
            return Err(Violation::NoStations);
        }
        if place_all && placed < self.station_count() {
            return Err(Violation::StationsLeftOver {
                placed,
                required: self.station_count(),
            });
        }

        let mut anchor = Anchor::Gateway;
        let mut noncoverage = Length::ZERO;
        let mut cost = 0u64;
        let mut delay = Time::ZERO;
        let mut k = 0;

        for (slot, station) in assignment.iter().enumerate() {
            let Some(station) = *station else { continue };

            let distance = self.anchor_position(anchor).distance_to(self.placements[slot]);
            if distance > self.hop_reach(anchor, station) {
                return Err(Violation::HopOpen {
                    from: anchor,
                    to: ChainEnd::Station { slot, station },
                    distance,
                });
            }

            noncoverage += noncoverage_between(
                self.anchor_position(anchor),
                self.placements[slot],
                self.anchor_coverage(anchor),
                self.radio.coverage()[station],
            );

            k += 1;
            cost = cost
                .checked_add(self.stations[station].cost)
                .ok_or(Violation::CostExceeded {
                    cost: u64::MAX,
                    limit: self.restriction.cost_limit,
                })?;
            delay += self
                .station_delay(station, k)
                .ok_or(Violation::Saturated { station })?;

            anchor = Anchor::Station { slot, station };
        }

        if !self.closes_to_right(anchor) {
            return Err(Violation::HopOpen {
                from: anchor,
                to: ChainEnd::RightGateway,
                distance: self.anchor_position(anchor).distance_to(self.gateway.right),
            });
        }

        noncoverage += noncoverage_between(
            self.anchor_position(anchor),
            self.gateway.right,
            self.anchor_coverage(anchor),
            Length::ZERO,
        );

        if cost > self.restriction.cost_limit {
            return Err(Violation::CostExceeded {
                cost,
                limit: self.restriction.cost_limit,
            });
        }

        if delay > self.restriction.delay_limit {
            return Err(Violation::DelayExceeded {
                delay,
                limit: self.restriction.delay_limit,
            });
        }

        Ok(Evaluation {
            noncoverage,
            cost,
            delay,
            placed,
        })
    }
}

fn finite(field: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::NonFinite {
            field: field.to_owned(),
            value,
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigurationError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigurationError::Negative {
            field: field.to_owned(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{assert_close, radio::DistanceMatrix};

    pub(crate) fn line(
        right: f64,
        placements: &[f64],
        link: &[f64],
        coverage: &[f64],
        cost: &[u64],
    ) -> PlacementProblem {
        let n = link.len();
        let radio = RadioMatrices::from_parts(
            DistanceMatrix::from_fn(n, |i, j| Length::from_metres(link[i].min(link[j]))),
            link.iter().copied().map(Length::from_metres).collect(),
            link.iter().copied().map(Length::from_metres).collect(),
            coverage.iter().copied().map(Length::from_metres).collect(),
        )
        .unwrap();

        PlacementProblem::new(
            GatewayPair::new(Length::ZERO, Length::from_metres(right)),
            placements.iter().copied().map(Length::from_metres).collect(),
            cost.iter()
                .map(|&cost| Station {
                    cost,
                    throughput: 1.0e6,
                })
                .collect(),
            radio,
            Restriction {
                cost_limit: 1000,
                delay_limit: Time::from_seconds(10.0),
            },
            Arrival {
                rate: 5.0,
                packet_size: 12000.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn chain_noncoverage() {
        let p = line(100.0, &[30.0, 60.0], &[50.0, 50.0], &[10.0, 5.0], &[1, 1]);

        // 0 -> 30: 30 - 10 = 20, 30 -> 60: 30 - 15 = 15, 60 -> 100: 40 - 5 = 35
        let eval = p.evaluate(&[Some(0), Some(1)], false).unwrap();
        assert_close(eval.noncoverage, Length::from_metres(70.0));
        assert_eq!(eval.cost, 2);
        assert_eq!(eval.placed, 2);
    }

    #[test]
    fn open_hop() {
        let p = line(100.0, &[30.0, 60.0], &[35.0, 35.0], &[10.0, 5.0], &[1, 1]);

        let err = p.evaluate(&[Some(0), None], false).unwrap_err();
        assert!(matches!(
            err,
            Violation::HopOpen {
                to: ChainEnd::RightGateway,
                ..
            }
        ));
        assert!(p.evaluate(&[Some(0), Some(1)], false).is_err());
    }

    #[test]
    fn reuse_and_empty() {
        let p = line(20.0, &[10.0, 12.0], &[30.0, 30.0], &[1.0, 1.0], &[1, 1]);

        assert_eq!(
            p.evaluate(&[Some(1), Some(1)], false),
            Err(Violation::StationReused(1))
        );
        assert_eq!(p.evaluate(&[None, None], false), Err(Violation::NoStations));
        assert!(matches!(
            p.evaluate(&[Some(0), None], true),
            Err(Violation::StationsLeftOver { placed: 1, required: 2 })
        ));
    }

    #[test]
    fn cost_limit() {
        let p = line(20.0, &[10.0], &[30.0], &[1.0], &[7]);
        assert!(p.evaluate(&[Some(0)], false).is_ok());

        let p = p.with_restriction(Restriction {
            cost_limit: 6,
            delay_limit: Time::from_seconds(10.0),
        });
        assert_eq!(
            p.evaluate(&[Some(0)], false),
            Err(Violation::CostExceeded { cost: 7, limit: 6 })
        );
    }

    #[test]
    fn cost_overflow_exceeds_limit() {
        let half = u64::MAX / 2 + 1;
        let p = line(20.0, &[5.0, 15.0], &[10.0, 10.0], &[2.0, 2.0], &[half, half]).with_restriction(
            Restriction {
                cost_limit: u64::MAX,
                delay_limit: Time::from_seconds(10.0),
            },
        );

        assert_eq!(
            p.evaluate(&[Some(0), Some(1)], false),
            Err(Violation::CostExceeded {
                cost: u64::MAX,
                limit: u64::MAX
            })
        );
    }

    #[test]
    fn queue_delay() {
        let p = line(20.0, &[10.0], &[30.0], &[1.0], &[1]);

        // mu = 1e6 / 12000, rho = 5 / mu = 0.06
        let rho = 5.0 / (1.0e6 / 12000.0);
        let expected = (rho / (1.0 - rho)) / 5.0;
        assert_close(p.station_delay(0, 1).unwrap().seconds(), expected);

        // 17 stations worth of traffic saturates a 1 Mbit/s station
        assert!(p.station_delay(0, 17).is_none());
        assert!(p.station_delay(0, 14).is_some());
    }

    #[test]
    fn zero_placements() {
        let p = line(20.0, &[], &[30.0], &[1.0], &[1]);
        let eval = p.evaluate(&[], false).unwrap();
        assert_eq!(eval.noncoverage, Length::from_metres(20.0));
        assert_eq!(eval.placed, 0);
    }

    #[test]
    fn rejects_bad_geometry() {
        let radio = RadioMatrices::uniform(1, Length::from_metres(10.0), Length::ZERO);
        let restriction = Restriction {
            cost_limit: 0,
            delay_limit: Time::ZERO,
        };
        let arrival = Arrival {
            rate: 0.0,
            packet_size: 1.0,
        };
        let station = vec![Station {
            cost: 0,
            throughput: 1.0,
        }];
        let gateway = GatewayPair::new(Length::ZERO, Length::from_metres(20.0));

        let outside = PlacementProblem::new(
            gateway,
            vec![Length::from_metres(25.0)],
            station.clone(),
            radio.clone(),
            restriction,
            arrival,
        );
        assert!(matches!(
            outside,
            Err(ConfigurationError::PlacementOutsideSegment { index: 0, .. })
        ));

        let unordered = PlacementProblem::new(
            gateway,
            vec![Length::from_metres(10.0), Length::from_metres(5.0)],
            station.clone(),
            radio.clone(),
            restriction,
            arrival,
        );
        assert_eq!(
            unordered,
            Err(ConfigurationError::PlacementNotAscending { index: 1 })
        );

        let collapsed = PlacementProblem::new(
            GatewayPair::new(Length::from_metres(20.0), Length::from_metres(20.0)),
            vec![],
            station.clone(),
            radio.clone(),
            restriction,
            arrival,
        );
        assert!(matches!(
            collapsed,
            Err(ConfigurationError::GatewayNotAscending { .. })
        ));

        let shape = PlacementProblem::new(gateway, vec![], vec![], radio, restriction, arrival);
        assert!(matches!(shape, Err(ConfigurationError::ShapeMismatch { .. })));
    }
}
