use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub},
};

use serde::{Deserialize, Serialize};

pub trait Unit: Into<f64> {
    fn inner(self) -> f64 {
        self.into()
    }
}

macro_rules! Quantity {
    ($name: ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(f64);

        impl From<f64> for $name {
            fn from(value: f64) -> Self {
                $name(value)
            }
        }

        impl From<$name> for f64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Unit for $name {}

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl Add for $name {
            type Output = $name;

            fn add(self, rhs: Self) -> Self::Output {
                $name(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold($name(0.0), |a, b| a + b)
            }
        }

        impl Sub for $name {
            type Output = $name;

            fn sub(self, rhs: Self) -> Self::Output {
                $name(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = $name;

            fn neg(self) -> Self::Output {
                $name(-self.0)
            }
        }

        /// Ratio of two quantities of the same kind.
        impl Div for $name {
            type Output = f64;

            fn div(self, rhs: Self) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl Div<f64> for $name {
            type Output = $name;

            fn div(self, rhs: f64) -> Self::Output {
                $name(self.0 / rhs)
            }
        }

        impl Mul<f64> for $name {
            type Output = $name;

            fn mul(self, rhs: f64) -> Self::Output {
                $name(self.0 * rhs)
            }
        }

        impl Mul<$name> for f64 {
            type Output = $name;

            fn mul(self, rhs: $name) -> Self::Output {
                $name(self * rhs.0)
            }
        }

        impl $name {
            pub const ZERO: $name = $name(0.0);

            #[inline]
            pub fn map<F>(self, f: F) -> Self
            where
                F: FnOnce(f64) -> f64,
            {
                Self(f(self.0))
            }

            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }
    };
}

Quantity!(Length);
pub const KM: Length = Length::from_metres(1000.0);
impl Length {
    pub const fn from_metres(n: f64) -> Self {
        Length(n)
    }

    pub const fn from_km(n: f64) -> Self {
        Length(n * 1000.0)
    }

    pub fn metres(self) -> f64 {
        self.0
    }

    pub fn km(self) -> f64 {
        self.0 / 1000.0
    }

    /// Distance between two positions on the placement line.
    pub fn distance_to(self, other: Length) -> Length {
        (other - self).abs()
    }
}

Quantity!(Frequency);
impl Frequency {
    pub const fn from_hz(n: f64) -> Self {
        Frequency(n)
    }

    #[allow(non_snake_case)]
    pub const fn from_MHz(n: f64) -> Self {
        Frequency(n * 1000.0 * 1000.0)
    }

    pub fn hz(self) -> f64 {
        self.0
    }

    #[allow(non_snake_case)]
    pub fn MHz(self) -> f64 {
        self.0 / (1000.0 * 1000.0)
    }

    #[allow(non_snake_case)]
    pub fn GHz(self) -> f64 {
        self.0 / (1000.0 * 1000.0 * 1000.0)
    }
}

Quantity!(Time);
impl Time {
    pub const fn from_seconds(n: f64) -> Self {
        Time(n)
    }

    pub fn seconds(self) -> f64 {
        self.0
    }
}

// dBm powers, dBi gains and dB losses all live on the same logarithmic axis,
// so the link budget can add and subtract them directly.
Quantity!(Decibel);
impl Decibel {
    pub const fn from_db(n: f64) -> Self {
        Decibel(n)
    }

    pub fn db(self) -> f64 {
        self.0
    }

    /// From a linear power ratio.
    /// This will apply the `10 * log(value)` transform.
    pub fn from_ratio(ratio: f64) -> Self {
        Decibel(10.0 * ratio.log10())
    }

    pub fn as_ratio(self) -> f64 {
        10f64.powf(self.0 / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_close;

    #[test]
    fn length_conversions() {
        assert_close(Length::from_km(1.5).metres(), 1500.0);
        assert_close((2.0 * KM).km(), 2.0);
        assert_close(Length::from_metres(30.0).distance_to(Length::from_metres(12.0)).metres(), 18.0);
    }

    #[test]
    fn frequency_conversions() {
        let f = Frequency::from_MHz(2437.0);
        assert_close(f.GHz(), 2.437);
        assert_close(f.hz(), 2_437_000_000.0);
    }

    #[test]
    fn decibel_ratio_round_trip() {
        assert_close(Decibel::from_ratio(100.0).db(), 20.0);
        assert_close(Decibel::from_db(3.0).as_ratio(), 1.9952623);
    }

    #[test]
    fn length_sum() {
        let total: Length = [1.0, 2.0, 3.5].into_iter().map(Length::from_metres).sum();
        assert_close(total, Length::from_metres(6.5));
    }
}
