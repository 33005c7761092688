//! Seeded random datasets, for benchmarks, tests and batch runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::{
    ConfigurationRecord, Dataset, DatasetIdentity, GatewayRecord, StationRecord, UserDeviceRecord,
};
use crate::units::Length;

/// How station hardware and prices vary across a generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMix {
    /// dBm, mean before rounding to 0.5 dB.
    pub mean_link_power: f64,
    pub std_link_power: f64,
    /// dBm
    pub mean_coverage_sensitivity: f64,
    pub std_coverage_sensitivity: f64,
    /// Inclusive.
    pub cost_range: (u64, u64),
    /// Bits per second.
    pub throughput_range: (f64, f64),
}

impl Default for StationMix {
    fn default() -> Self {
        Self {
            mean_link_power: 20.0,
            std_link_power: 2.0,
            mean_coverage_sensitivity: -75.0,
            std_coverage_sensitivity: 2.0,
            cost_range: (1, 5),
            throughput_range: (1.0e6, 5.0e6),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetGenerator {
    /// Candidates drawn uniformly along the line.
    UniformLine {
        length: Length,
        positions: usize,
        stations: usize,
        mix: StationMix,
        cost_limit: u64,
        /// Seconds.
        delay_limit: f64,
    },
    /// Evenly spaced candidates, each moved by up to `jitter`.
    JitteredLine {
        length: Length,
        positions: usize,
        stations: usize,
        jitter: Length,
        mix: StationMix,
        cost_limit: u64,
        delay_limit: f64,
    },
}

impl DatasetGenerator {
    /// Small enough for brute force to finish quickly.
    pub fn small() -> Self {
        DatasetGenerator::UniformLine {
            length: Length::from_metres(600.0),
            positions: 5,
            stations: 3,
            mix: StationMix::default(),
            cost_limit: 9,
            delay_limit: 1.0,
        }
    }

    pub fn generate(&self, seed: u64) -> Dataset {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let mut dataset = match self {
            DatasetGenerator::UniformLine {
                length,
                positions,
                stations,
                mix,
                cost_limit,
                delay_limit,
            } => {
                let span = length.metres();
                let mut placement: Vec<f64> = (0..*positions)
                    .map(|_| rng.random_range(0.0..span).round())
                    .collect();
                placement.sort_by(f64::total_cmp);
                placement.dedup();

                build(span, placement, *stations, mix, *cost_limit, *delay_limit, &mut rng)
            }
            DatasetGenerator::JitteredLine {
                length,
                positions,
                stations,
                jitter,
                mix,
                cost_limit,
                delay_limit,
            } => {
                let span = length.metres();
                let step = span / (*positions as f64 + 1.0);
                let jitter = jitter.metres().min(step / 2.0).max(0.0);
                let placement = (1..=*positions)
                    .map(|i| {
                        let offset = if jitter > 0.0 {
                            rng.random_range(-jitter..jitter)
                        } else {
                            0.0
                        };
                        (step * i as f64 + offset).round()
                    })
                    .collect();

                build(span, placement, *stations, mix, *cost_limit, *delay_limit, &mut rng)
            }
        };

        dataset.identity = DatasetIdentity::Generated {
            generator: self.clone(),
            seed,
        };
        dataset
    }
}

fn normal(mean: f64, std: f64, rng: &mut ChaCha12Rng) -> f64 {
    match Normal::new(mean, std) {
        Ok(dist) => rng.sample(dist),
        Err(_) => mean,
    }
}

fn build(
    span: f64,
    placement: Vec<f64>,
    stations: usize,
    mix: &StationMix,
    cost_limit: u64,
    delay_limit: f64,
    rng: &mut ChaCha12Rng,
) -> Dataset {
    let (cost_lo, cost_hi) = mix.cost_range;
    let (tp_lo, tp_hi) = mix.throughput_range;

    let sta = (0..stations)
        .map(|_| StationRecord {
            cost: rng.random_range(cost_lo..=cost_hi.max(cost_lo)),
            throughput: if tp_hi > tp_lo {
                rng.random_range(tp_lo..tp_hi).round()
            } else {
                tp_lo
            },
            ptr_link: (normal(mix.mean_link_power, mix.std_link_power, rng) * 2.0).round() / 2.0,
            gtr_link: 5.0,
            precv_link: -70.0,
            l_link: 1.0,
            l_coverage: 1.0,
            precv_coverage: normal(
                mix.mean_coverage_sensitivity,
                mix.std_coverage_sensitivity,
                rng,
            )
            .round(),
            grecv_coverage: 3.0,
        })
        .collect();

    Dataset {
        identity: DatasetIdentity::Custom,
        gateway_placement: vec![0.0, span],
        placement,
        configuration: ConfigurationRecord {
            method: "branch-and-bound".to_owned(),
            place_all_station: false,
            estimation_method: Some("ILP".to_owned()),
            relative_deviation: None,
            last_optimal_noncoverage: None,
            drawing: false,
        },
        delay_limit,
        cost_limit,
        arrival_rate: 5.0,
        average_packet_size: 12000.0,
        sta,
        gateway: GatewayRecord {
            ptr: 20.0,
            gtr: 8.0,
            precv: -75.0,
            grecv: 8.0,
            lrecv: 1.0,
        },
        user_device: UserDeviceRecord {
            ptr: 15.0,
            gtr: 1.0,
            ltr: 0.0,
        },
        frequency: 2437.0,
        link_som: 10,
        coverage_som: 14,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_dataset() {
        let generator = DatasetGenerator::small();
        assert_eq!(generator.generate(7), generator.generate(7));
        assert_ne!(generator.generate(7), generator.generate(8));
    }

    #[test]
    fn generated_datasets_prepare() {
        let generators = [
            DatasetGenerator::small(),
            DatasetGenerator::JitteredLine {
                length: Length::from_km(1.0),
                positions: 8,
                stations: 4,
                jitter: Length::from_metres(30.0),
                mix: StationMix::default(),
                cost_limit: 12,
                delay_limit: 1.0,
            },
        ];

        for generator in generators {
            for seed in 0..10 {
                let dataset = generator.generate(seed);
                assert!(dataset.prepare().is_ok(), "seed {seed}: {:?}", dataset.prepare());
            }
        }
    }

    #[test]
    fn identity_regenerates() {
        let dataset = DatasetGenerator::small().generate(11);
        assert_eq!(dataset.identity.create(), Some(dataset.clone()));
    }
}
