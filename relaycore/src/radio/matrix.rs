use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::link_budget::{LinkBudget, NumericDomainError, OperatingMargin, Receiver, RfParameterSet};
use crate::units::Length;

/// Radio hardware of a single relay station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationRadio {
    /// Station-to-station and station-to-gateway endpoint.
    pub link: RfParameterSet,
    /// Receiver that serves user devices.
    pub coverage: Receiver,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub link: OperatingMargin,
    pub coverage: OperatingMargin,
}

/// Which derivation an entry belonged to when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    StationPair { from: usize, to: usize },
    StationToGateway(usize),
    GatewayToStation(usize),
    Coverage(usize),
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::StationPair { from, to } => write!(f, "station {from} -> station {to}"),
            Endpoint::StationToGateway(s) => write!(f, "station {s} -> gateway"),
            Endpoint::GatewayToStation(s) => write!(f, "gateway -> station {s}"),
            Endpoint::Coverage(s) => write!(f, "user device -> station {s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot derive reach for {endpoint}")]
pub struct MatrixBuildError {
    pub endpoint: Endpoint,
    #[source]
    pub source: NumericDomainError,
}

/// Square grid of directional reach, `get(i, j)` being how far `i` can transmit to `j`.
/// The diagonal is always zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    size: usize,
    cells: Vec<Length>,
}

impl DistanceMatrix {
    fn zeroed(size: usize) -> Self {
        Self {
            size,
            cells: vec![Length::ZERO; size * size],
        }
    }

    /// Builds a matrix from `f(i, j)` for every off-diagonal pair.
    pub fn from_fn<F>(size: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Length,
    {
        let mut matrix = Self::zeroed(size);
        for i in 0..size {
            for j in 0..size {
                if i != j {
                    matrix.cells[i * size + j] = f(i, j);
                }
            }
        }
        matrix
    }

    fn try_from_fn<F, E>(size: usize, mut f: F) -> Result<Self, E>
    where
        F: FnMut(usize, usize) -> Result<Length, E>,
    {
        let mut matrix = Self::zeroed(size);
        for i in 0..size {
            for j in 0..size {
                if i != j {
                    matrix.cells[i * size + j] = f(i, j)?;
                }
            }
        }
        Ok(matrix)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, from: usize, to: usize) -> Length {
        self.cells[from * self.size + to]
    }

    pub fn row(&self, from: usize) -> &[Length] {
        &self.cells[from * self.size..(from + 1) * self.size]
    }

    pub fn max_off_diagonal(&self) -> Option<Length> {
        (0..self.size)
            .flat_map(|i| (0..self.size).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| self.get(i, j))
            .reduce(Length::max)
    }

    /// Largest distance any two distinct stations can span in both directions.
    pub fn max_mutual_reach(&self) -> Option<Length> {
        (0..self.size)
            .flat_map(|i| ((i + 1)..self.size).map(move |j| (i, j)))
            .map(|(i, j)| self.get(i, j).min(self.get(j, i)))
            .reduce(Length::max)
    }
}

/// Everything the placement search needs to know about radio reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioMatrices {
    station_to_station: DistanceMatrix,
    station_to_gateway: Vec<Length>,
    gateway_to_station: Vec<Length>,
    coverage: Vec<Length>,
}

impl RadioMatrices {
    /// Assembles precomputed tables. Returns `None` if their lengths disagree.
    pub fn from_parts(
        station_to_station: DistanceMatrix,
        station_to_gateway: Vec<Length>,
        gateway_to_station: Vec<Length>,
        coverage: Vec<Length>,
    ) -> Option<Self> {
        let n = station_to_station.len();
        if station_to_gateway.len() != n || gateway_to_station.len() != n || coverage.len() != n {
            return None;
        }

        Some(Self {
            station_to_station,
            station_to_gateway,
            gateway_to_station,
            coverage,
        })
    }

    /// `stations` identical stations whose every link spans `link` and which cover `coverage`.
    pub fn uniform(stations: usize, link: Length, coverage: Length) -> Self {
        Self {
            station_to_station: DistanceMatrix::from_fn(stations, |_, _| link),
            station_to_gateway: vec![link; stations],
            gateway_to_station: vec![link; stations],
            coverage: vec![coverage; stations],
        }
    }

    pub fn station_count(&self) -> usize {
        self.coverage.len()
    }

    pub fn station_to_station(&self) -> &DistanceMatrix {
        &self.station_to_station
    }

    pub fn station_to_gateway(&self) -> &[Length] {
        &self.station_to_gateway
    }

    pub fn gateway_to_station(&self) -> &[Length] {
        &self.gateway_to_station
    }

    pub fn coverage(&self) -> &[Length] {
        &self.coverage
    }

    /// Distance at which station `s` and the gateway hear each other.
    pub fn gateway_reach(&self, s: usize) -> Length {
        self.station_to_gateway[s].min(self.gateway_to_station[s])
    }

    /// Distance at which stations `a` and `b` hear each other.
    pub fn mutual_link(&self, a: usize, b: usize) -> Length {
        self.station_to_station
            .get(a, b)
            .min(self.station_to_station.get(b, a))
    }

    /// Station with the largest station-to-gateway reach, first index on ties.
    pub fn best_gateway_link(&self) -> Option<(usize, Length)> {
        self.station_to_gateway
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, d)| match best {
                Some((_, b)) if b >= d => best,
                _ => Some((i, d)),
            })
    }

    /// Largest single hop any placed station could make, to a peer or a gateway.
    pub fn max_single_hop(&self) -> Option<Length> {
        let gateway = (0..self.station_count())
            .map(|s| self.gateway_reach(s))
            .reduce(Length::max);

        match (self.station_to_station.max_mutual_reach(), gateway) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Derives every reach table from radio hardware.
///
/// Link entries use `margins.link`, coverage entries `margins.coverage`.
/// Any entry that cannot be computed aborts the whole build.
pub fn build_matrices(
    budget: &LinkBudget,
    gateway: &RfParameterSet,
    user_device: &RfParameterSet,
    stations: &[StationRadio],
    margins: Margins,
) -> Result<RadioMatrices, MatrixBuildError> {
    let n = stations.len();
    let link = |endpoint, tx, rx, margin| {
        budget
            .distance(tx, rx, margin)
            .map_err(|source| MatrixBuildError { endpoint, source })
    };

    let station_to_station = DistanceMatrix::try_from_fn(n, |i, j| {
        link(
            Endpoint::StationPair { from: i, to: j },
            &stations[i].link.transmit,
            &stations[j].link.receive,
            margins.link,
        )
    })?;

    let mut station_to_gateway = Vec::with_capacity(n);
    let mut gateway_to_station = Vec::with_capacity(n);
    let mut coverage = Vec::with_capacity(n);

    for (s, station) in stations.iter().enumerate() {
        station_to_gateway.push(link(
            Endpoint::StationToGateway(s),
            &station.link.transmit,
            &gateway.receive,
            margins.link,
        )?);
        gateway_to_station.push(link(
            Endpoint::GatewayToStation(s),
            &gateway.transmit,
            &station.link.receive,
            margins.link,
        )?);
        coverage.push(link(
            Endpoint::Coverage(s),
            &user_device.transmit,
            &station.coverage,
            margins.coverage,
        )?);
    }

    Ok(RadioMatrices {
        station_to_station,
        station_to_gateway,
        gateway_to_station,
        coverage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert_close,
        radio::{DistanceRounding, Transmitter},
        units::{Decibel, Frequency},
    };

    fn endpoint(power: f64, sensitivity: f64, gain: f64) -> RfParameterSet {
        RfParameterSet {
            transmit: Transmitter {
                power: Decibel::from_db(power),
                loss: Decibel::from_db(1.0),
                gain: Decibel::from_db(gain),
            },
            receive: Receiver {
                sensitivity: Decibel::from_db(sensitivity),
                loss: Decibel::from_db(1.0),
                gain: Decibel::from_db(gain),
            },
        }
    }

    fn station(power: f64) -> StationRadio {
        StationRadio {
            link: endpoint(power, -70.0, 5.0),
            coverage: Receiver {
                sensitivity: Decibel::from_db(-75.0),
                loss: Decibel::from_db(1.0),
                gain: Decibel::from_db(3.0),
            },
        }
    }

    fn budget() -> LinkBudget {
        LinkBudget::new(Frequency::from_MHz(2437.0)).with_rounding(DistanceRounding::Exact)
    }

    fn margins() -> Margins {
        Margins {
            link: OperatingMargin::from_db(10),
            coverage: OperatingMargin::from_db(14),
        }
    }

    #[test]
    fn diagonal_is_zero() {
        let stations = [station(20.0), station(17.0), station(23.0)];
        let m = build_matrices(&budget(), &endpoint(20.0, -80.0, 8.0), &endpoint(15.0, -80.0, 1.0), &stations, margins())
            .unwrap();

        for i in 0..stations.len() {
            assert_eq!(m.station_to_station().get(i, i), Length::ZERO);
        }
        assert_eq!(m.station_count(), 3);
    }

    #[test]
    fn directional_entries() {
        let stations = [station(20.0), station(14.0)];
        let m = build_matrices(&budget(), &endpoint(20.0, -80.0, 8.0), &endpoint(15.0, -80.0, 1.0), &stations, margins())
            .unwrap();

        let matrix = m.station_to_station();
        assert!(matrix.get(0, 1) > matrix.get(1, 0));
        assert_eq!(m.mutual_link(0, 1), matrix.get(1, 0));
        assert_eq!(m.mutual_link(1, 0), matrix.get(1, 0));

        let direct = budget()
            .distance(&stations[0].link.transmit, &stations[1].link.receive, margins().link)
            .unwrap();
        assert_close(matrix.get(0, 1), direct);
    }

    #[test]
    fn coverage_uses_coverage_margin() {
        let stations = [station(20.0)];
        let user = endpoint(15.0, -80.0, 1.0);
        let m = build_matrices(&budget(), &endpoint(20.0, -80.0, 8.0), &user, &stations, margins()).unwrap();

        let expected = budget()
            .distance(&user.transmit, &stations[0].coverage, OperatingMargin::from_db(14))
            .unwrap();
        assert_close(m.coverage()[0], expected);
    }

    #[test]
    fn best_gateway_link_first_on_ties() {
        let m = RadioMatrices::from_parts(
            DistanceMatrix::from_fn(3, |_, _| Length::from_metres(5.0)),
            vec![Length::from_metres(4.0), Length::from_metres(9.0), Length::from_metres(9.0)],
            vec![Length::from_metres(1.0); 3],
            vec![Length::ZERO; 3],
        )
        .unwrap();

        assert_eq!(m.best_gateway_link(), Some((1, Length::from_metres(9.0))));
        assert_eq!(m.gateway_reach(1), Length::from_metres(1.0));
        assert_eq!(m.max_single_hop(), Some(Length::from_metres(5.0)));
    }

    #[test]
    fn mismatched_parts_rejected() {
        let m = RadioMatrices::from_parts(
            DistanceMatrix::from_fn(2, |_, _| Length::ZERO),
            vec![Length::ZERO; 2],
            vec![Length::ZERO; 1],
            vec![Length::ZERO; 2],
        );
        assert!(m.is_none());
    }

    #[test]
    fn no_stations() {
        let m = RadioMatrices::uniform(0, Length::from_metres(10.0), Length::ZERO);
        assert_eq!(m.best_gateway_link(), None);
        assert_eq!(m.max_single_hop(), None);
        assert_eq!(m.station_to_station().max_off_diagonal(), None);
    }

    #[test]
    fn bad_frequency_names_endpoint() {
        let stations = [station(20.0), station(20.0)];
        let bad = LinkBudget::new(Frequency::from_hz(-1.0));
        let err = build_matrices(&bad, &endpoint(20.0, -80.0, 8.0), &endpoint(15.0, -80.0, 1.0), &stations, margins())
            .unwrap_err();

        assert_eq!(err.endpoint, Endpoint::StationPair { from: 0, to: 1 });
        assert_eq!(err.source, NumericDomainError::InvalidFrequency(-1.0));
    }

    #[test]
    fn single_station_has_no_pairs() {
        let stations = [station(20.0)];
        let bad = LinkBudget::new(Frequency::from_hz(0.0));
        let err = build_matrices(&bad, &endpoint(20.0, -80.0, 8.0), &endpoint(15.0, -80.0, 1.0), &stations, margins())
            .unwrap_err();

        assert_eq!(err.endpoint, Endpoint::StationToGateway(0));
    }
}
