use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapter::{Aggregate, Capability};
use crate::prelude::FusionResult;
use crate::table::RecordSet;
use crate::telemetry::log::LogManager;

/// Per-kind accuracy figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorMetrics {
    Spatial {
        mean_pos_error_m: Option<f64>,
        max_pos_error_m: Option<f64>,
        std_pos_error_m: Option<f64>,
        mean_alt_error_m: Option<f64>,
    },
    Signal {
        values: BTreeMap<String, Option<f64>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPerformance {
    pub kind: String,
    pub detections: usize,
    /// Percentage of reference rows carrying a detection.
    pub detection_rate: f64,
    pub metrics: SensorMetrics,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_records: usize,
    pub time_span_secs: f64,
    pub sensors: Vec<SensorPerformance>,
}

/// What the summary needs to know about an aligned sensor kind.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub kind: String,
    pub capability: Capability,
    pub presence_field: String,
}

/// Aggregate that reads as "no value" when the column is missing or unusable.
fn optional_stat(
    fused: &RecordSet,
    column: &str,
    stat: impl Fn(&RecordSet, &str) -> FusionResult<Option<f64>>,
) -> Option<f64> {
    match stat(fused, column) {
        Ok(value) => value,
        Err(err) => {
            LogManager::new("summary").warn(&format!("summary skips {column}: {err}"));
            None
        }
    }
}

fn aggregate(fused: &RecordSet, field: &str, aggregate: Aggregate) -> Option<f64> {
    match aggregate {
        Aggregate::Count => optional_stat(fused, field, |t, c| Ok(Some(t.count(c)? as f64))),
        Aggregate::Mean => optional_stat(fused, field, RecordSet::mean),
        Aggregate::Max => optional_stat(fused, field, RecordSet::max),
        Aggregate::StdDev => optional_stat(fused, field, RecordSet::std_dev),
    }
}

impl PerformanceSummary {
    pub fn compute(fused: &RecordSet, contributions: &[Contribution]) -> FusionResult<Self> {
        let total_records = fused.len();
        let time_span_secs = fused
            .time_range()
            .map_or(0.0, |(first, last)| last.as_secs_f64() - first.as_secs_f64());

        let mut sensors = Vec::with_capacity(contributions.len());
        for contribution in contributions {
            let kind = &contribution.kind;
            let detections = fused.count(&contribution.presence_field)?;
            let detection_rate = if total_records == 0 {
                0.0
            } else {
                detections as f64 / total_records as f64 * 100.0
            };

            let metrics = match &contribution.capability {
                Capability::Spatial => {
                    let pos = format!("{kind}_pos_error_m");
                    let alt = format!("{kind}_alt_error_m");
                    SensorMetrics::Spatial {
                        mean_pos_error_m: aggregate(fused, &pos, Aggregate::Mean),
                        max_pos_error_m: aggregate(fused, &pos, Aggregate::Max),
                        std_pos_error_m: aggregate(fused, &pos, Aggregate::StdDev),
                        mean_alt_error_m: aggregate(fused, &alt, Aggregate::Mean),
                    }
                }
                Capability::Signal { metrics } => SensorMetrics::Signal {
                    values: metrics
                        .iter()
                        .map(|m| (m.name.clone(), aggregate(fused, &m.field, m.aggregate)))
                        .collect(),
                },
            };

            sensors.push(SensorPerformance {
                kind: kind.clone(),
                detections,
                detection_rate,
                metrics,
            });
        }

        Ok(Self {
            total_records,
            time_span_secs,
            sensors,
        })
    }

    pub fn sensor(&self, kind: &str) -> Option<&SensorPerformance> {
        self.sensors.iter().find(|sensor| sensor.kind == kind)
    }
}
