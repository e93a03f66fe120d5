// src/weighting/mod.rs

pub mod hadamard;
pub mod replication;

pub use hadamard::{brr_number_reps, hadamard};
pub use replication::{RepMethod, ReplicateWeightGenerator, ReplicateWeightSet, DEFAULT_BOOTSTRAP_REPS};
