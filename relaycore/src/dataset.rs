//! Input records as they appear in dataset files, and their conversion into a
//! [`PlacementProblem`] and [`SearchConfig`].
//!
//! Field names follow the dataset format exactly, so RF fields keep their
//! `Ptr_link`-style spelling on the wire.

pub mod generation;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{ConfigurationError, Method, SearchConfig, parse_estimation, parse_method},
    dataset::generation::DatasetGenerator,
    problem::{Arrival, GatewayPair, PlacementProblem, Restriction, Station},
    radio::{
        LinkBudget, Margins, MatrixBuildError, OperatingMargin, Receiver, RfParameterSet,
        StationRadio, Transmitter, build_matrices,
    },
    units::{Decibel, Frequency, Length, Time},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum DatasetIdentity {
    Generated {
        generator: DatasetGenerator,
        seed: u64,
    },
    /// Written by hand or by another tool.
    #[default]
    Custom,
}

impl DatasetIdentity {
    /// Regenerates the dataset, `None` for custom ones.
    pub fn create(&self) -> Option<Dataset> {
        match self {
            DatasetIdentity::Custom => None,
            DatasetIdentity::Generated { generator, seed } => Some(generator.generate(*seed)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    /// `"brute-force"` or `"branch-and-bound"`.
    pub method: String,
    #[serde(default)]
    pub place_all_station: bool,
    /// `"ILP"`, `"knapsack"` or `"LP"`. Only read for branch-and-bound.
    #[serde(default)]
    pub estimation_method: Option<String>,
    /// Share of the gateway segment length. Zero means unset.
    #[serde(default)]
    pub relative_deviation: Option<f64>,
    /// Metres. Zero means unset.
    #[serde(default)]
    pub last_optimal_noncoverage: Option<f64>,
    /// Accepted for compatibility, nothing is drawn.
    #[serde(default)]
    pub drawing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub cost: u64,
    /// Bits per second.
    pub throughput: f64,
    #[serde(rename = "Ptr_link")]
    pub ptr_link: f64,
    #[serde(rename = "Gtr_link")]
    pub gtr_link: f64,
    #[serde(rename = "Precv_link")]
    pub precv_link: f64,
    #[serde(rename = "L_link")]
    pub l_link: f64,
    #[serde(rename = "L_coverage")]
    pub l_coverage: f64,
    #[serde(rename = "Precv_coverage")]
    pub precv_coverage: f64,
    #[serde(rename = "Grecv_coverage")]
    pub grecv_coverage: f64,
}

impl StationRecord {
    pub fn radio(&self) -> StationRadio {
        StationRadio {
            link: RfParameterSet {
                transmit: Transmitter {
                    power: Decibel::from_db(self.ptr_link),
                    loss: Decibel::from_db(self.l_link),
                    gain: Decibel::from_db(self.gtr_link),
                },
                receive: Receiver {
                    sensitivity: Decibel::from_db(self.precv_link),
                    loss: Decibel::from_db(self.l_link),
                    gain: Decibel::from_db(self.gtr_link),
                },
            },
            coverage: Receiver {
                sensitivity: Decibel::from_db(self.precv_coverage),
                loss: Decibel::from_db(self.l_coverage),
                gain: Decibel::from_db(self.grecv_coverage),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatewayRecord {
    #[serde(rename = "Ptr")]
    pub ptr: f64,
    #[serde(rename = "Gtr")]
    pub gtr: f64,
    #[serde(rename = "Precv")]
    pub precv: f64,
    #[serde(rename = "Grecv")]
    pub grecv: f64,
    #[serde(rename = "Lrecv")]
    pub lrecv: f64,
}

impl GatewayRecord {
    pub fn radio(&self) -> RfParameterSet {
        RfParameterSet {
            transmit: Transmitter {
                power: Decibel::from_db(self.ptr),
                loss: Decibel::from_db(self.lrecv),
                gain: Decibel::from_db(self.gtr),
            },
            receive: Receiver {
                sensitivity: Decibel::from_db(self.precv),
                loss: Decibel::from_db(self.lrecv),
                gain: Decibel::from_db(self.grecv),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserDeviceRecord {
    #[serde(rename = "Ptr")]
    pub ptr: f64,
    #[serde(rename = "Gtr")]
    pub gtr: f64,
    #[serde(rename = "Ltr")]
    pub ltr: f64,
}

impl UserDeviceRecord {
    /// User devices only transmit, the receive side is never used.
    pub fn radio(&self) -> RfParameterSet {
        RfParameterSet {
            transmit: Transmitter {
                power: Decibel::from_db(self.ptr),
                loss: Decibel::from_db(self.ltr),
                gain: Decibel::from_db(self.gtr),
            },
            receive: Receiver {
                sensitivity: Decibel::ZERO,
                loss: Decibel::ZERO,
                gain: Decibel::ZERO,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub identity: DatasetIdentity,

    /// Coordinates of the two gateways, in metres.
    pub gateway_placement: Vec<f64>,
    /// Candidate coordinates, in metres.
    pub placement: Vec<f64>,
    pub configuration: ConfigurationRecord,

    /// Seconds.
    pub delay_limit: f64,
    pub cost_limit: u64,
    /// Packets per second.
    pub arrival_rate: f64,
    /// Bits.
    pub average_packet_size: f64,

    pub sta: Vec<StationRecord>,
    pub gateway: GatewayRecord,
    pub user_device: UserDeviceRecord,
    /// MHz.
    pub frequency: f64,
    pub link_som: i32,
    pub coverage_som: i32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Radio(#[from] MatrixBuildError),
}

/// A validated dataset, ready to search.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDataset {
    pub problem: PlacementProblem,
    pub config: SearchConfig,
}

/// Either a single dataset or several keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetFile {
    One(Box<Dataset>),
    Many(BTreeMap<String, Dataset>),
}

impl DatasetFile {
    /// Datasets with their names, a single dataset being named `default_name`.
    pub fn into_named(self, default_name: &str) -> Vec<(String, Dataset)> {
        match self {
            DatasetFile::One(dataset) => vec![(default_name.to_owned(), *dataset)],
            DatasetFile::Many(map) => map.into_iter().collect(),
        }
    }
}

fn unset_if_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|&v| v != 0.0)
}

impl Dataset {
    pub fn search_config(&self) -> Result<SearchConfig, ConfigurationError> {
        let record = &self.configuration;
        let method = parse_method(&record.method)?;

        let estimation = match (method, &record.estimation_method) {
            (Method::BranchAndBound, Some(name)) => parse_estimation(name)?,
            _ => Default::default(),
        };

        let config = SearchConfig {
            method,
            place_all_stations: record.place_all_station,
            estimation,
            relative_deviation: unset_if_zero(record.relative_deviation),
            last_optimal_noncoverage: unset_if_zero(record.last_optimal_noncoverage)
                .map(Length::from_metres),
            ..Default::default()
        };
        config.validate()?;

        Ok(config)
    }

    pub fn link_budget(&self) -> LinkBudget {
        LinkBudget::new(Frequency::from_MHz(self.frequency))
    }

    pub fn margins(&self) -> Margins {
        Margins {
            link: OperatingMargin::from_db(self.link_som),
            coverage: OperatingMargin::from_db(self.coverage_som),
        }
    }

    pub fn prepare(&self) -> Result<PreparedDataset, DatasetError> {
        let config = self.search_config()?;

        let gateway = match self.gateway_placement.as_slice() {
            [left, right, ..] => GatewayPair::new(Length::from_metres(*left), Length::from_metres(*right)),
            other => return Err(ConfigurationError::MissingGateway(other.len()).into()),
        };

        let stations: Vec<StationRadio> = self.sta.iter().map(StationRecord::radio).collect();
        let radio = build_matrices(
            &self.link_budget(),
            &self.gateway.radio(),
            &self.user_device.radio(),
            &stations,
            self.margins(),
        )?;

        if !self.delay_limit.is_finite() {
            return Err(ConfigurationError::NonFinite {
                field: "delay_limit".to_owned(),
                value: self.delay_limit,
            }
            .into());
        }

        let problem = PlacementProblem::new(
            gateway,
            self.placement.iter().copied().map(Length::from_metres).collect(),
            self.sta
                .iter()
                .map(|s| Station {
                    cost: s.cost,
                    throughput: s.throughput,
                })
                .collect(),
            radio,
            Restriction {
                cost_limit: self.cost_limit,
                delay_limit: Time::from_seconds(self.delay_limit),
            },
            Arrival {
                rate: self.arrival_rate,
                packet_size: self.average_packet_size,
            },
        )?;

        Ok(PreparedDataset { problem, config })
    }
}
