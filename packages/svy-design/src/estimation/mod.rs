// src/estimation/mod.rs
pub mod estimator;
pub mod replication;
pub mod taylor;

pub use estimator::{critical_value, CiMethod, Estimate, EstimateOptions, Level, Statistic, TaylorEstimator, Value};
pub use replication::{replicate_variance, VarianceCenter};
pub use taylor::{
    // Point estimates
    point_estimate_mean, point_estimate_ratio, point_estimate_total,
    // Linearization scores
    scores_mean, scores_ratio, scores_total,
    // Taylor variance
    degrees_of_freedom, taylor_variance, SinglePsuPolicy,
    // SRS variance
    srs_variance_mean, srs_variance_ratio, srs_variance_total,
};
