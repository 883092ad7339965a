use crate::data_io::{format_timestamp, fused_records};
use fusioncore::fusion::SensorStatus;
use fusioncore::{FusionOutput, FusionResult, PerformanceSummary, RecordSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

type ColumnStat = fn(&RecordSet, &str) -> FusionResult<Option<f64>>;

/// Degrees added around the ground-truth extent for map display.
const BOUNDS_PADDING_DEG: f64 = 0.001;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayBounds {
    pub lat_min: Option<f64>,
    pub lat_max: Option<f64>,
    pub lon_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub alt_min: Option<f64>,
    pub alt_max: Option<f64>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub total_frames: usize,
}

impl DisplayBounds {
    pub fn from_fused(fused: &RecordSet) -> Self {
        let stat = |column: &str, f: ColumnStat| f(fused, column).ok().flatten();
        let (time_start, time_end) = fused
            .time_range()
            .map(|(first, last)| (Some(format_timestamp(first)), Some(format_timestamp(last))))
            .unwrap_or_default();
        Self {
            lat_min: stat("gt_latitude", RecordSet::min).map(|v| v - BOUNDS_PADDING_DEG),
            lat_max: stat("gt_latitude", RecordSet::max).map(|v| v + BOUNDS_PADDING_DEG),
            lon_min: stat("gt_longitude", RecordSet::min).map(|v| v - BOUNDS_PADDING_DEG),
            lon_max: stat("gt_longitude", RecordSet::max).map(|v| v + BOUNDS_PADDING_DEG),
            alt_min: stat("gt_altitude", RecordSet::min),
            alt_max: stat("gt_altitude", RecordSet::max),
            time_start,
            time_end,
            total_frames: fused.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub status: String,
    pub total_records: usize,
    pub sensors_active: Vec<String>,
    pub sensors_skipped: Vec<String>,
    pub time_range: Option<(String, String)>,
}

/// Snapshot of a finished fusion run as served to the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualizationModel {
    pub status: BridgeStatus,
    pub summary: PerformanceSummary,
    pub records: Vec<Map<String, Value>>,
    pub bounds: DisplayBounds,
}

impl VisualizationModel {
    pub fn from_output(output: &FusionOutput) -> Self {
        let sensors_skipped = output
            .outcomes
            .iter()
            .filter(|outcome| !matches!(outcome.status, SensorStatus::Fused { .. }))
            .map(|outcome| outcome.kind.clone())
            .collect();
        let status = BridgeStatus {
            status: "ready".into(),
            total_records: output.fused.len(),
            sensors_active: output
                .contributing_kinds()
                .into_iter()
                .map(String::from)
                .collect(),
            sensors_skipped,
            time_range: output
                .fused
                .time_range()
                .map(|(first, last)| (format_timestamp(first), format_timestamp(last))),
        };
        Self {
            status,
            summary: output.summary.clone(),
            records: fused_records(output),
            bounds: DisplayBounds::from_fused(&output.fused),
        }
    }
}
