//! Radio reach derived from RF hardware figures.
//!
//! [`link_budget`] solves the free-space link budget for the longest distance a
//! transmitter/receiver pair can close. [`matrix`] applies it to every station,
//! the gateway and the user device to produce the distance tables the placement
//! search reads.

pub mod link_budget;
pub mod matrix;

pub use link_budget::{
    DistanceRounding, LinkBudget, NumericDomainError, OperatingMargin, PathLossConvention,
    Receiver, RfParameterSet, Transmitter,
};
pub use matrix::{
    DistanceMatrix, Endpoint, Margins, MatrixBuildError, RadioMatrices, StationRadio,
    build_matrices,
};
