pub use crate::adapter::{AdapterConfig, Capability, MappedAdapter, SensorAdapter, SensorStream};
pub use crate::alignment::{Aligner, MatchPolicy};
pub use crate::config::FusionConfig;
pub use crate::estimation::ErrorModel;
pub use crate::fusion::{FusionEngine, FusionOutput, PerformanceSummary, SensorOutcome};
pub use crate::table::{Column, ColumnData, RecordSet, Timestamp, Value};

/// Common error type for table operations and fusion passes.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("no reference timeline: ground truth is missing or empty")]
    MissingReferenceData,
    #[error("no usable data for sensor kind {kind}")]
    MissingSensorData { kind: String },
    #[error("inputs not sorted: {label} timestamps are not ascending")]
    UnsortedInput { label: String },
    #[error("feature unsupported for this input: {kind} expects field {field}")]
    SchemaMismatch { kind: String, field: String },
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("column {column} is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
    #[error("column {column} has {actual} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type FusionResult<T> = Result<T, FusionError>;
