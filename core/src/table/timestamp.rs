use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Nanosecond-precision instant used as the ordering key of every table.
///
/// The epoch is whatever the loader chose (Unix epoch for wall-clock logs,
/// scenario start for synthetic runs); only differences matter to the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9).round() as i64)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Absolute distance between two instants in nanoseconds.
    pub fn abs_diff(self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }

    pub fn offset(self, delta: Duration) -> Self {
        Self(self.0.saturating_add(delta.as_nanos() as i64))
    }
}
