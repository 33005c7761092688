//! Free-space link budget.
//!
//! A link closes while
//!
//! ```text
//! Ptr - Ltr + Gtr - Lfs + Grecv - Lrecv >= SOM + Precv
//! ```
//!
//! and the free-space path loss grows with distance as
//!
//! ```text
//! Lfs = 20·log10(F) + 20·log10(R) + K
//! ```
//!
//! Solving the second equation for `R` at the largest loss the first one allows
//! gives the reach of the link. `K` fixes the units `F` and `R` are expressed in,
//! see [`PathLossConvention`].
//! <https://en.wikipedia.org/wiki/Free-space_path_loss>

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::{Decibel, Frequency, Length};

/// Transmitting side of a radio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transmitter {
    /// Output power in dBm.
    pub power: Decibel,
    /// Feeder and connector losses in dB.
    pub loss: Decibel,
    /// Antenna gain in dBi.
    pub gain: Decibel,
}

/// Receiving side of a radio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    /// Receiver sensitivity in dBm.
    pub sensitivity: Decibel,
    pub loss: Decibel,
    pub gain: Decibel,
}

/// Both directions of one radio endpoint (a station, the gateway or a user device).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfParameterSet {
    pub transmit: Transmitter,
    pub receive: Receiver,
}

/// System operating margin reserved above bare link closure, in whole dB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatingMargin(i32);

impl OperatingMargin {
    pub const fn from_db(n: i32) -> Self {
        OperatingMargin(n)
    }

    pub fn db(self) -> Decibel {
        Decibel::from_db(self.0 as f64)
    }
}

/// Unit convention of the free-space path loss constant `K`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathLossConvention {
    /// Frequency in GHz, distance in km.
    GhzKm,
    /// Frequency in MHz, distance in km.
    MhzKm,
    /// Frequency in MHz, distance in m.
    #[default]
    MhzM,
}

impl PathLossConvention {
    pub fn constant(self) -> f64 {
        match self {
            PathLossConvention::GhzKm => 92.45,
            PathLossConvention::MhzKm => 32.4,
            PathLossConvention::MhzM => -27.55,
        }
    }

    fn frequency_value(self, frequency: Frequency) -> f64 {
        match self {
            PathLossConvention::GhzKm => frequency.GHz(),
            PathLossConvention::MhzKm | PathLossConvention::MhzM => frequency.MHz(),
        }
    }

    fn length_from(self, distance: f64) -> Length {
        match self {
            PathLossConvention::GhzKm | PathLossConvention::MhzKm => Length::from_km(distance),
            PathLossConvention::MhzM => Length::from_metres(distance),
        }
    }
}

/// What to do with the solved distance before it is handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceRounding {
    /// Round to the nearest whole unit of the convention.
    #[default]
    Nearest,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericDomainError {
    #[error("frequency must be finite and positive, got {0} Hz")]
    InvalidFrequency(f64),
    #[error("link budget input `{field}` is not finite ({value})")]
    NonFinite { field: &'static str, value: f64 },
    #[error("link budget slack of {slack} dB does not give a finite distance")]
    UnboundedDistance { slack: f64 },
}

/// Everything about a link that is shared by all endpoint pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkBudget {
    pub frequency: Frequency,
    pub convention: PathLossConvention,
    pub rounding: DistanceRounding,
}

impl LinkBudget {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            convention: PathLossConvention::default(),
            rounding: DistanceRounding::default(),
        }
    }

    pub fn with_convention(mut self, convention: PathLossConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_rounding(mut self, rounding: DistanceRounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Largest free-space path loss the link can absorb and still close.
    pub fn max_path_loss(
        &self,
        tx: &Transmitter,
        rx: &Receiver,
        margin: OperatingMargin,
    ) -> Decibel {
        tx.power - tx.loss + tx.gain + rx.gain - rx.loss - rx.sensitivity - margin.db()
    }

    /// Longest distance across which `tx` still reaches `rx` with `margin` to spare.
    ///
    /// ```
    /// # use relaycore::radio::*;
    /// # use relaycore::units::*;
    /// let budget = LinkBudget::new(Frequency::from_MHz(2437.0));
    /// let tx = Transmitter {
    ///     power: Decibel::from_db(20.0),
    ///     loss: Decibel::from_db(1.0),
    ///     gain: Decibel::from_db(5.0),
    /// };
    /// let rx = Receiver {
    ///     sensitivity: Decibel::from_db(-67.0),
    ///     loss: Decibel::from_db(0.0),
    ///     gain: Decibel::from_db(1.0),
    /// };
    /// let reach = budget.distance(&tx, &rx, OperatingMargin::from_db(14)).unwrap();
    /// assert_eq!(reach, Length::from_metres(78.0));
    /// ```
    pub fn distance(
        &self,
        tx: &Transmitter,
        rx: &Receiver,
        margin: OperatingMargin,
    ) -> Result<Length, NumericDomainError> {
        let frequency = self.convention.frequency_value(self.frequency);
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(NumericDomainError::InvalidFrequency(self.frequency.hz()));
        }

        for (field, value) in [
            ("transmit power", tx.power),
            ("transmit loss", tx.loss),
            ("transmit gain", tx.gain),
            ("receive sensitivity", rx.sensitivity),
            ("receive loss", rx.loss),
            ("receive gain", rx.gain),
        ] {
            if !value.is_finite() {
                return Err(NumericDomainError::NonFinite {
                    field,
                    value: value.db(),
                });
            }
        }

        let slack = self.max_path_loss(tx, rx, margin).db();
        let exponent = (slack - 20.0 * frequency.log10() - self.convention.constant()) / 20.0;
        let distance = 10f64.powf(exponent);

        if !distance.is_finite() {
            return Err(NumericDomainError::UnboundedDistance { slack });
        }

        let distance = match self.rounding {
            DistanceRounding::Nearest => distance.round(),
            DistanceRounding::Exact => distance,
        };

        Ok(self.convention.length_from(distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_close;

    fn tx(power: f64, loss: f64, gain: f64) -> Transmitter {
        Transmitter {
            power: Decibel::from_db(power),
            loss: Decibel::from_db(loss),
            gain: Decibel::from_db(gain),
        }
    }

    fn rx(sensitivity: f64, loss: f64, gain: f64) -> Receiver {
        Receiver {
            sensitivity: Decibel::from_db(sensitivity),
            loss: Decibel::from_db(loss),
            gain: Decibel::from_db(gain),
        }
    }

    fn wifi() -> LinkBudget {
        LinkBudget::new(Frequency::from_MHz(2437.0)).with_rounding(DistanceRounding::Exact)
    }

    #[test]
    fn known_reach() {
        let budget = wifi();
        let reach = budget
            .distance(&tx(20.0, 1.0, 5.0), &rx(-67.0, 0.0, 1.0), OperatingMargin::from_db(14))
            .unwrap();
        assert_close(reach.metres(), 77.73999);

        let reach = budget
            .distance(&tx(9.0, 0.0, 1.0), &rx(-77.0, 1.0, 5.0), OperatingMargin::from_db(14))
            .unwrap();
        assert_close(reach.metres(), 69.28584);
    }

    #[test]
    fn nearest_rounding() {
        let budget = wifi().with_rounding(DistanceRounding::Nearest);
        let reach = budget
            .distance(&tx(9.0, 0.0, 1.0), &rx(-77.0, 1.0, 5.0), OperatingMargin::from_db(14))
            .unwrap();
        assert_eq!(reach, Length::from_metres(69.0));
    }

    #[test]
    fn deterministic() {
        let budget = wifi();
        let a = budget.distance(&tx(17.0, 2.0, 3.0), &rx(-80.0, 1.0, 2.0), OperatingMargin::from_db(10));
        let b = budget.distance(&tx(17.0, 2.0, 3.0), &rx(-80.0, 1.0, 2.0), OperatingMargin::from_db(10));
        assert_eq!(a, b);
    }

    #[test]
    fn conventions_agree() {
        let metres = wifi();
        let km = wifi().with_convention(PathLossConvention::GhzKm);

        let a = metres
            .distance(&tx(20.0, 1.0, 5.0), &rx(-90.0, 1.0, 5.0), OperatingMargin::from_db(10))
            .unwrap();
        let b = km
            .distance(&tx(20.0, 1.0, 5.0), &rx(-90.0, 1.0, 5.0), OperatingMargin::from_db(10))
            .unwrap();

        assert_close(a, b);
    }

    #[test]
    fn monotone_in_power_gain_loss_and_margin() {
        let budget = wifi();
        let margin = OperatingMargin::from_db(10);
        let base = budget
            .distance(&tx(15.0, 2.0, 3.0), &rx(-75.0, 2.0, 3.0), margin)
            .unwrap();

        for step in [0.5, 1.0, 6.0] {
            let more_power = budget
                .distance(&tx(15.0 + step, 2.0, 3.0), &rx(-75.0, 2.0, 3.0), margin)
                .unwrap();
            let more_tx_gain = budget
                .distance(&tx(15.0, 2.0, 3.0 + step), &rx(-75.0, 2.0, 3.0), margin)
                .unwrap();
            let more_rx_gain = budget
                .distance(&tx(15.0, 2.0, 3.0), &rx(-75.0, 2.0, 3.0 + step), margin)
                .unwrap();
            let more_tx_loss = budget
                .distance(&tx(15.0, 2.0 + step, 3.0), &rx(-75.0, 2.0, 3.0), margin)
                .unwrap();
            let more_rx_loss = budget
                .distance(&tx(15.0, 2.0, 3.0), &rx(-75.0, 2.0 + step, 3.0), margin)
                .unwrap();
            let more_margin = budget
                .distance(
                    &tx(15.0, 2.0, 3.0),
                    &rx(-75.0, 2.0, 3.0),
                    OperatingMargin::from_db(10 + step.ceil() as i32),
                )
                .unwrap();

            assert!(more_power >= base);
            assert!(more_tx_gain >= base);
            assert!(more_rx_gain >= base);
            assert!(more_tx_loss <= base);
            assert!(more_rx_loss <= base);
            assert!(more_margin <= base);
        }
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let budget = LinkBudget::new(Frequency::from_hz(0.0));
        let result = budget.distance(&tx(20.0, 1.0, 5.0), &rx(-67.0, 0.0, 1.0), OperatingMargin::default());
        assert_eq!(result, Err(NumericDomainError::InvalidFrequency(0.0)));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let budget = wifi();
        let result = budget.distance(
            &tx(f64::NAN, 1.0, 5.0),
            &rx(-67.0, 0.0, 1.0),
            OperatingMargin::default(),
        );
        assert!(matches!(
            result,
            Err(NumericDomainError::NonFinite { field: "transmit power", .. })
        ));
    }

    #[test]
    fn huge_slack_is_rejected() {
        let budget = wifi();
        let result = budget.distance(&tx(1.0e6, 0.0, 0.0), &rx(-67.0, 0.0, 0.0), OperatingMargin::default());
        assert!(matches!(result, Err(NumericDomainError::UnboundedDistance { .. })));
    }
}
