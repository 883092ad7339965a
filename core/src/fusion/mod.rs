pub mod engine;
pub mod summary;

pub use engine::{FusionEngine, FusionOutput, SensorOutcome, SensorStatus};
pub use summary::{Contribution, PerformanceSummary, SensorMetrics, SensorPerformance};
