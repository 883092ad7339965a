use std::time::Duration;

use crate::adapter::SensorStream;
use crate::alignment::MatchPolicy;
use crate::prelude::FusionResult;
use crate::table::{Column, RecordSet, Timestamp};
use crate::telemetry::log::LogManager;

/// Reference timeline widened with one sensor's columns.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub table: RecordSet,
    pub matched: usize,
}

/// Index of the entry in `sorted` closest to `target` within `tolerance_ns`.
/// Equidistant candidates resolve to the earlier one.
fn nearest_within(
    sorted: &[Timestamp],
    target: Timestamp,
    tolerance_ns: u64,
) -> Option<(usize, u64)> {
    let upper = sorted.partition_point(|&t| t < target);
    let before = upper
        .checked_sub(1)
        .map(|idx| (idx, target.abs_diff(sorted[idx])));
    let after = sorted.get(upper).map(|&t| (upper, target.abs_diff(t)));

    let best = match (before, after) {
        (Some(b), Some(a)) => Some(if a.1 < b.1 { a } else { b }),
        (b, a) => b.or(a),
    }?;
    (best.1 <= tolerance_ns).then_some(best)
}

/// For each reference instant, the index of the sensor row attached to it.
///
/// Both slices must be sorted ascending.
pub fn match_indices(
    reference: &[Timestamp],
    sensor: &[Timestamp],
    tolerance: Duration,
    policy: MatchPolicy,
) -> Vec<Option<usize>> {
    let tolerance_ns = u64::try_from(tolerance.as_nanos()).unwrap_or(u64::MAX);
    match policy {
        MatchPolicy::Nearest => reference
            .iter()
            .map(|&t| nearest_within(sensor, t, tolerance_ns).map(|(idx, _)| idx))
            .collect(),
        MatchPolicy::Exclusive => {
            let mut claims: Vec<Option<(usize, u64)>> = vec![None; reference.len()];
            for (sensor_idx, &t) in sensor.iter().enumerate() {
                let Some((ref_idx, distance)) = nearest_within(reference, t, tolerance_ns) else {
                    continue;
                };
                let slot = &mut claims[ref_idx];
                // strict comparison keeps the earlier detection on ties
                if slot.map_or(true, |(_, held)| distance < held) {
                    *slot = Some((sensor_idx, distance));
                }
            }
            claims
                .into_iter()
                .map(|claim| claim.map(|(idx, _)| idx))
                .collect()
        }
    }
}

/// Nearest-time join of sensor streams onto a reference timeline.
pub struct Aligner {
    logger: LogManager,
}

impl Aligner {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("align"),
        }
    }

    /// Returns `reference` with every column of `stream` appended.
    ///
    /// Row count and order of `reference` are preserved; reference rows with no
    /// detection inside the tolerance window get nulls. Sensor values are
    /// copied from a single sample, never interpolated.
    pub fn align(&self, reference: &RecordSet, stream: &SensorStream) -> FusionResult<Alignment> {
        reference.ensure_sorted("reference timeline")?;
        stream.records.ensure_sorted(&stream.kind)?;

        let indices = match_indices(
            reference.timestamps(),
            stream.records.timestamps(),
            stream.tolerance,
            stream.policy,
        );
        let matched = indices.iter().filter(|idx| idx.is_some()).count();

        let columns = stream
            .records
            .columns()
            .iter()
            .map(|column| Column::new(column.name.clone(), column.data.gather(&indices)))
            .collect();
        let table = reference.widen(columns)?;

        self.logger.record(&format!(
            "{}: matched {} of {} reference rows within {:?}",
            stream.kind,
            matched,
            reference.len(),
            stream.tolerance
        ));

        Ok(Alignment { table, matched })
    }
}

impl Default for Aligner {
    fn default() -> Self {
        Self::new()
    }
}
