use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub aligned: usize,
    pub skipped: usize,
    pub matched_rows: usize,
}

#[derive(Default)]
struct Metrics {
    aligned: usize,
    skipped: usize,
    matched_rows: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_aligned(&self, matched_rows: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.aligned += 1;
            metrics.matched_rows += matched_rows;
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.skipped += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                aligned: metrics.aligned,
                skipped: metrics.skipped,
                matched_rows: metrics.matched_rows,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = MetricsRecorder::new();
        metrics.record_aligned(3);
        metrics.record_aligned(2);
        metrics.record_skipped();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                aligned: 2,
                skipped: 1,
                matched_rows: 5,
            }
        );
    }
}
