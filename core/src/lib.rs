//! Temporal fusion core for the counter-UAS sensor trials.
//!
//! Ground truth from the drone's flight log forms the reference timeline;
//! each sensor kind is normalized, aligned onto it by nearest time within a
//! tolerance window, and scored against it.

pub mod adapter;
pub mod alignment;
pub mod config;
pub mod estimation;
pub mod fusion;
pub mod math;
pub mod prelude;
pub mod table;
pub mod telemetry;

pub use prelude::{
    FusionConfig, FusionEngine, FusionError, FusionOutput, FusionResult, PerformanceSummary,
    RecordSet, Timestamp,
};
