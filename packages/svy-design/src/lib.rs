// src/lib.rs
//! Design-based estimation for complex survey samples.
//!
//! A [`SurveyDesign`] carries the response, weights and the stratum, PSU,
//! SSU and domain labels of each unit. [`TaylorEstimator`] turns it into an
//! [`Estimate`] of a total, mean, ratio or proportion whose variance is
//! computed by Taylor linearization. [`ReplicateWeightGenerator`] builds
//! jackknife, BRR or bootstrap replicate weights from the same structure,
//! and [`ReplicateWeightSet::estimate`] gives the replicate variance.
//!
//! ```no_run
//! use svy_design::{EstimateOptions, Statistic, SurveyDesign, TaylorEstimator};
//!
//! let design = SurveyDesign::new(vec![1.0, 0.0, 1.0, 1.0], vec![10.0, 12.0, 8.0, 9.0])
//!     .with_stratum(["a", "a", "b", "b"])
//!     .with_psu([1, 2, 1, 2]);
//! let estimate = TaylorEstimator::new(Statistic::Mean, 0.05)?
//!     .estimate(&design, EstimateOptions::default())?;
//! println!("{}", estimate.to_frame()?);
//! # Ok::<(), svy_design::SurveyError>(())
//! ```

pub mod design;
pub mod error;
pub mod estimation;
pub mod frame;
pub mod weighting;

pub use design::{ContextOptions, DesignContext, Domain, Fpc, PsuKey, SurveyDesign};
pub use error::{ErrorKind, Result, SurveyError};
pub use estimation::{
    CiMethod, Estimate, EstimateOptions, Level, SinglePsuPolicy, Statistic, TaylorEstimator, Value, VarianceCenter,
};
pub use frame::{design_from_frame, FrameColumns, ReplicateFrameNames};
pub use weighting::{RepMethod, ReplicateWeightGenerator, ReplicateWeightSet};
