// src/error.rs

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while preparing a design or computing estimates.
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Invalid {option}: '{value}'")]
    InvalidOption { option: &'static str, value: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Stratified design requested but no stratum was provided")]
    MissingStratum,

    #[error("Length mismatch for {field}: expected {expected}, got {got}")]
    LengthMismatch { field: &'static str, expected: usize, got: usize },

    #[error("Ratio estimation requires a secondary (denominator) value")]
    MissingSecondary,

    #[error("Only one PSU in stratum '{stratum}'")]
    SinglePsu { stratum: String },

    #[error("BRR requires 2 PSUs per stratum, stratum '{stratum}' has {count}")]
    BrrPsuCount { stratum: String, count: usize },

    #[error("Bootstrap resample size is not positive in stratum '{stratum}': {psus} PSUs, size gap {gap}")]
    BootstrapSize { stratum: String, psus: usize, gap: usize },

    #[error("No Hadamard matrix available for order {order}")]
    NoHadamardMatrix { order: usize },

    #[error("Sum of weights is zero")]
    ZeroWeightSum,

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Coarse classification of [`SurveyError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An enumerated option or a parameter outside its domain.
    Configuration,
    /// Inputs that do not describe a usable design.
    Structural,
    /// A stratum holds a single PSU and no fallback is configured.
    SinglePsu,
    /// Numerical failure or an error from a collaborator library.
    Computation,
}

impl SurveyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOption { .. } | Self::InvalidParameter(_) => ErrorKind::Configuration,
            Self::MissingStratum
            | Self::LengthMismatch { .. }
            | Self::MissingSecondary
            | Self::BrrPsuCount { .. }
            | Self::BootstrapSize { .. } => ErrorKind::Structural,
            Self::SinglePsu { .. } => ErrorKind::SinglePsu,
            Self::NoHadamardMatrix { .. }
            | Self::ZeroWeightSum
            | Self::Distribution(_)
            | Self::Polars(_) => ErrorKind::Computation,
        }
    }

    pub(crate) fn invalid_option(option: &'static str, value: &str) -> Self {
        Self::InvalidOption { option, value: value.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, SurveyError>;
