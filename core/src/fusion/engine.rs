use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapter::{MappedAdapter, SensorAdapter};
use crate::alignment::Aligner;
use crate::config::FusionConfig;
use crate::fusion::summary::{Contribution, PerformanceSummary};
use crate::prelude::{FusionError, FusionResult};
use crate::table::RecordSet;
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};

/// What happened to one configured sensor kind during a fusion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SensorStatus {
    /// Aligned onto the reference timeline; `matched` may be zero.
    Fused { matched: usize },
    /// No input table was supplied for this kind.
    NotProvided,
    /// The input lacks the presence field.
    SchemaMismatch { field: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorOutcome {
    pub kind: String,
    #[serde(flatten)]
    pub status: SensorStatus,
}

#[derive(Debug, Clone)]
pub struct FusionOutput {
    pub fused: RecordSet,
    pub summary: PerformanceSummary,
    pub outcomes: Vec<SensorOutcome>,
}

impl FusionOutput {
    /// Kinds whose columns made it into the fused table.
    pub fn contributing_kinds(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, SensorStatus::Fused { .. }))
            .map(|outcome| outcome.kind.as_str())
            .collect()
    }

    pub fn outcome(&self, kind: &str) -> Option<&SensorOutcome> {
        self.outcomes.iter().find(|outcome| outcome.kind == kind)
    }
}

/// Accumulator threaded through the per-sensor fold.
struct FoldState {
    table: RecordSet,
    outcomes: Vec<SensorOutcome>,
    contributions: Vec<Contribution>,
}

/// Drives adapters, aligner and error model over every configured sensor kind.
pub struct FusionEngine {
    config: FusionConfig,
    adapters: Vec<Box<dyn SensorAdapter>>,
    aligner: Aligner,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> FusionResult<Self> {
        config.validate()?;
        let adapters = config
            .sensors
            .iter()
            .cloned()
            .map(|sensor| {
                MappedAdapter::new(sensor).map(|a| Box::new(a) as Box<dyn SensorAdapter>)
            })
            .collect::<FusionResult<Vec<_>>>()?;
        Ok(Self {
            config,
            adapters,
            aligner: Aligner::new(),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("engine"),
        })
    }

    /// Registers an additional sensor kind implemented in code.
    pub fn with_adapter(mut self, adapter: Box<dyn SensorAdapter>) -> FusionResult<Self> {
        if self.adapters.iter().any(|a| a.kind() == adapter.kind()) {
            return Err(FusionError::InvalidConfig(format!(
                "sensor kind {} configured twice",
                adapter.kind()
            )));
        }
        self.adapters.push(adapter);
        Ok(self)
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Ground truth with canonical names, sorted by time.
    pub fn reference_timeline(&self, ground_truth: Option<&RecordSet>) -> FusionResult<RecordSet> {
        let ground_truth = match ground_truth {
            Some(table) if !table.is_empty() => table,
            _ => return Err(FusionError::MissingReferenceData),
        };
        let mut mapping = self.config.ground_truth_fields.clone();
        if ground_truth.time_column() != self.config.time_column {
            mapping.insert(
                ground_truth.time_column().to_string(),
                self.config.time_column.clone(),
            );
        }
        Ok(ground_truth.rename(&mapping).sort_by_time())
    }

    /// Fuses every configured sensor kind onto the ground-truth timeline.
    ///
    /// Only a missing reference timeline is fatal; per-kind problems are
    /// reported in [`FusionOutput::outcomes`] and the kind is left out.
    pub fn fuse(
        &self,
        ground_truth: Option<&RecordSet>,
        raw_sensors: &BTreeMap<String, RecordSet>,
    ) -> FusionResult<FusionOutput> {
        let reference = self.reference_timeline(ground_truth)?;
        self.logger.record(&format!(
            "reference timeline: {} rows, columns {:?}",
            reference.len(),
            reference.column_names()
        ));

        for kind in raw_sensors.keys() {
            if !self.adapters.iter().any(|a| a.kind() == kind.as_str()) {
                self.logger
                    .warn(&format!("{kind}: no adapter configured, input ignored"));
            }
        }

        let seed = FoldState {
            table: reference,
            outcomes: Vec::with_capacity(self.adapters.len()),
            contributions: Vec::new(),
        };
        let aligned = self.adapters.iter().fold(seed, |state, adapter| {
            self.fold_sensor(state, adapter.as_ref(), raw_sensors.get(adapter.kind()))
        });

        let scored = aligned
            .contributions
            .iter()
            .filter(|c| c.capability.is_spatial())
            .fold(aligned.table, |table, contribution| {
                match self.config.error_model.apply(&table, &contribution.kind) {
                    Ok(scored) => scored,
                    Err(err) => {
                        self.logger.warn(&format!(
                            "{}: position error skipped: {err}",
                            contribution.kind
                        ));
                        table
                    }
                }
            });

        let fused = scored.sort_by_time();
        let summary = PerformanceSummary::compute(&fused, &aligned.contributions)?;
        self.logger.record(&format!(
            "fusion complete: {} rows, contributing kinds {:?}",
            fused.len(),
            aligned
                .contributions
                .iter()
                .map(|c| c.kind.as_str())
                .collect::<Vec<_>>()
        ));

        Ok(FusionOutput {
            fused,
            summary,
            outcomes: aligned.outcomes,
        })
    }

    fn fold_sensor(
        &self,
        mut state: FoldState,
        adapter: &dyn SensorAdapter,
        raw: Option<&RecordSet>,
    ) -> FoldState {
        let kind = adapter.kind().to_string();
        let status = match raw {
            None => {
                let missing = FusionError::MissingSensorData { kind: kind.clone() };
                self.logger.warn(&missing.to_string());
                self.metrics.record_skipped();
                SensorStatus::NotProvided
            }
            Some(raw) => match adapter
                .normalize(raw)
                .and_then(|stream| Ok((self.aligner.align(&state.table, &stream)?, stream)))
            {
                Ok((alignment, stream)) => {
                    if stream.is_empty() {
                        self.logger
                            .warn(&format!("{kind}: no valid detections in input"));
                    }
                    self.metrics.record_aligned(alignment.matched);
                    state.table = alignment.table;
                    state.contributions.push(Contribution {
                        kind: kind.clone(),
                        capability: stream.capability,
                        presence_field: stream.presence_field,
                    });
                    SensorStatus::Fused {
                        matched: alignment.matched,
                    }
                }
                Err(FusionError::SchemaMismatch { field, .. }) => {
                    self.logger.warn(&format!(
                        "{kind}: feature unsupported, {field} not in input"
                    ));
                    self.metrics.record_skipped();
                    SensorStatus::SchemaMismatch { field }
                }
                Err(err) => {
                    self.logger.warn(&format!("{kind}: skipped: {err}"));
                    self.metrics.record_skipped();
                    SensorStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            },
        };
        state.outcomes.push(SensorOutcome { kind, status });
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::builtin;
    use crate::alignment::MatchPolicy;
    use crate::fusion::summary::SensorMetrics;
    use crate::table::{Column, Timestamp, Value};

    const T0: f64 = 1_601_388_656.0;

    fn at(offset: f64) -> Timestamp {
        Timestamp::from_secs_f64(T0 + offset)
    }

    fn ground_truth() -> RecordSet {
        RecordSet::from_columns(
            "datetime(utc)",
            vec![at(2.0), at(0.0), at(1.0)],
            vec![
                Column::float("latitude", vec![Some(10.0); 3]),
                Column::float("longitude", vec![Some(20.0); 3]),
                Column::float("altitude(m)", vec![Some(120.0); 3]),
                Column::float("battery_percent", vec![Some(80.0); 3]),
            ],
        )
        .unwrap()
    }

    fn alvira_raw(offsets: &[f64]) -> RecordSet {
        let n = offsets.len();
        RecordSet::from_columns(
            "datetime(utc)",
            offsets.iter().map(|&o| at(o)).collect(),
            vec![
                Column::float("AlviraTracksTrackPosition_Latitude", vec![Some(10.00002); n]),
                Column::float("AlviraTracksTrackPosition_Longitude", vec![Some(20.00001); n]),
                Column::float("AlviraTracksTrackPosition_Altitude", vec![Some(118.0); n]),
            ],
        )
        .unwrap()
    }

    fn alvira_only(tolerance_secs: f64, policy: MatchPolicy) -> FusionEngine {
        let mut alvira = builtin::alvira();
        alvira.tolerance_secs = tolerance_secs;
        alvira.policy = policy;
        FusionEngine::new(FusionConfig {
            sensors: vec![alvira],
            ..FusionConfig::default()
        })
        .unwrap()
    }

    fn inputs(pairs: Vec<(&str, RecordSet)>) -> BTreeMap<String, RecordSet> {
        pairs
            .into_iter()
            .map(|(kind, table)| (kind.to_string(), table))
            .collect()
    }

    #[test]
    fn single_detection_lands_on_its_nearest_reference_row() {
        let engine = alvira_only(5.0, MatchPolicy::Exclusive);
        let raw = inputs(vec![("alvira", alvira_raw(&[0.9]))]);
        let output = engine.fuse(Some(&ground_truth()), &raw).unwrap();
        let fused = &output.fused;

        assert_eq!(fused.len(), 3);
        assert_eq!(fused.timestamps(), &[at(0.0), at(1.0), at(2.0)]);
        assert_eq!(fused.value("alvira_latitude", 0).unwrap(), Value::Null);
        assert_eq!(fused.value("alvira_latitude", 2).unwrap(), Value::Null);
        assert_eq!(fused.value("alvira_pos_error_m", 0).unwrap(), Value::Null);

        let error = fused.value("alvira_pos_error_m", 1).unwrap().as_f64().unwrap();
        assert!((error - 2.482).abs() < 0.01, "got {error}");
        assert_eq!(
            fused.value("alvira_alt_error_m", 1).unwrap(),
            Value::Float(2.0)
        );

        let alvira = output.summary.sensor("alvira").unwrap();
        assert_eq!(alvira.detections, 1);
        assert!((alvira.detection_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_policy_serves_every_reference_row_in_tolerance() {
        let engine = alvira_only(5.0, MatchPolicy::Nearest);
        let raw = inputs(vec![("alvira", alvira_raw(&[0.9]))]);
        let output = engine.fuse(Some(&ground_truth()), &raw).unwrap();
        assert_eq!(output.fused.count("alvira_latitude").unwrap(), 3);
        assert_eq!(output.summary.sensor("alvira").unwrap().detection_rate, 100.0);
    }

    #[test]
    fn detection_outside_tolerance_leaves_all_rows_null() {
        for policy in [MatchPolicy::Nearest, MatchPolicy::Exclusive] {
            let engine = alvira_only(0.5, policy);
            let raw = inputs(vec![("alvira", alvira_raw(&[2.6]))]);
            let output = engine.fuse(Some(&ground_truth()), &raw).unwrap();

            assert_eq!(output.fused.count("alvira_latitude").unwrap(), 0);
            assert_eq!(output.fused.count("alvira_pos_error_m").unwrap(), 0);
            let alvira = output.summary.sensor("alvira").unwrap();
            assert_eq!(alvira.detections, 0);
            assert_eq!(alvira.detection_rate, 0.0);
            assert_eq!(
                output.outcome("alvira").unwrap().status,
                SensorStatus::Fused { matched: 0 }
            );
        }
    }

    #[test]
    fn missing_ground_truth_is_fatal() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let raw = inputs(vec![("alvira", alvira_raw(&[0.0]))]);
        assert_eq!(
            engine.fuse(None, &raw).unwrap_err(),
            FusionError::MissingReferenceData
        );
        let empty = RecordSet::new("datetime(utc)", Vec::new());
        assert_eq!(
            engine.fuse(Some(&empty), &raw).unwrap_err(),
            FusionError::MissingReferenceData
        );
    }

    #[test]
    fn no_sensor_data_returns_ground_truth_only() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let output = engine.fuse(Some(&ground_truth()), &BTreeMap::new()).unwrap();

        assert_eq!(output.fused.len(), 3);
        assert_eq!(
            output.fused.column_names(),
            vec!["gt_latitude", "gt_longitude", "gt_altitude", "battery_percent"]
        );
        assert!(output.summary.sensors.is_empty());
        assert!(output.contributing_kinds().is_empty());
        assert!(output
            .outcomes
            .iter()
            .all(|o| o.status == SensorStatus::NotProvided));
        assert_eq!(engine.metrics().skipped, 4);
    }

    #[test]
    fn schema_mismatch_skips_only_that_kind() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let raw = inputs(vec![
            ("alvira", alvira_raw(&[1.0])),
            // DIANA input without its bearing field
            ("diana", alvira_raw(&[1.0])),
        ]);
        let output = engine.fuse(Some(&ground_truth()), &raw).unwrap();

        assert_eq!(output.contributing_kinds(), vec!["alvira"]);
        assert_eq!(
            output.outcome("diana").unwrap().status,
            SensorStatus::SchemaMismatch {
                field: "DianaTargetsTargetSignal_bearing_deg".into()
            }
        );
        assert!(!output.fused.has_column("diana_bearing"));
        assert!(output.summary.sensor("diana").is_none());
    }

    #[test]
    fn input_without_valid_rows_reports_zero_detections() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let venus = RecordSet::from_columns(
            "datetime(utc)",
            vec![at(0.0), at(1.0)],
            vec![
                Column::float("VenusTrigger_Azimuth", vec![None, None]),
                Column::float("VenusTrigger_Frequency", vec![Some(2.4e9), None]),
            ],
        )
        .unwrap();
        let output = engine
            .fuse(Some(&ground_truth()), &inputs(vec![("venus", venus)]))
            .unwrap();

        assert_eq!(output.fused.count("venus_azimuth").unwrap(), 0);
        let summary = output.summary.sensor("venus").unwrap();
        assert_eq!(summary.detections, 0);
        assert_eq!(summary.detection_rate, 0.0);
        match &summary.metrics {
            SensorMetrics::Signal { values } => assert_eq!(values["mean_frequency"], None),
            other => panic!("unexpected metrics {other:?}"),
        }
    }

    #[test]
    fn signal_sensors_get_no_position_error_fields() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let diana = RecordSet::from_columns(
            "datetime(utc)",
            vec![at(1.0)],
            vec![
                Column::float("DianaTargetsTargetSignal_bearing_deg", vec![Some(45.0)]),
                Column::float("DianaTargetsTargetSignal_snr_dB", vec![Some(12.5)]),
                Column::float("DianaTargetsTargetSignal_range_m", vec![Some(850.0)]),
            ],
        )
        .unwrap();
        let output = engine
            .fuse(Some(&ground_truth()), &inputs(vec![("diana", diana)]))
            .unwrap();

        assert!(output.fused.has_column("diana_snr"));
        assert!(!output.fused.has_column("diana_pos_error_m"));
        match &output.summary.sensor("diana").unwrap().metrics {
            SensorMetrics::Signal { values } => {
                assert_eq!(values["mean_snr"], Some(12.5));
                assert_eq!(values["max_range"], Some(850.0));
            }
            other => panic!("unexpected metrics {other:?}"),
        }
    }

    #[test]
    fn position_error_is_null_exactly_where_fixes_are_null() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let raw = inputs(vec![
            ("alvira", alvira_raw(&[0.1])),
            ("arcus", {
                let table = alvira_raw(&[1.9]);
                let mapping = [
                    ("AlviraTracksTrackPosition_Latitude", "ArcusTracksTrackPosition_Latitude"),
                    ("AlviraTracksTrackPosition_Longitude", "ArcusTracksTrackPosition_Longitude"),
                    ("AlviraTracksTrackPosition_Altitude", "ArcusTracksTrackPosition_Altitude"),
                ]
                .iter()
                .map(|&(a, b)| (a.to_string(), b.to_string()))
                .collect();
                table.rename(&mapping)
            }),
        ]);
        let output = engine.fuse(Some(&ground_truth()), &raw).unwrap();
        let fused = &output.fused;

        for kind in ["alvira", "arcus"] {
            for row in 0..fused.len() {
                let fix = fused.value(&format!("{kind}_latitude"), row).unwrap();
                let error = fused.value(&format!("{kind}_pos_error_m"), row).unwrap();
                assert_eq!(fix.is_null(), error.is_null());
                if let Some(error) = error.as_f64() {
                    assert!(error >= 0.0);
                }
            }
        }
    }

    #[test]
    fn fusion_is_deterministic() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let raw = inputs(vec![("alvira", alvira_raw(&[0.5, 1.5, 0.4]))]);
        let render = || {
            let output = engine.fuse(Some(&ground_truth()), &raw).unwrap();
            serde_json::to_string(&output.fused.to_records(|t| t.as_nanos().into())).unwrap()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn colliding_column_names_fail_only_that_kind() {
        let mut clash = builtin::venus();
        clash.kind = "gt".into();
        clash.fields = [
            ("VenusTrigger_Azimuth", "gt_azimuth"),
            ("VenusTrigger_Frequency", "gt_latitude"),
        ]
        .iter()
        .map(|&(a, b)| (a.to_string(), b.to_string()))
        .collect();
        let engine = alvira_only(5.0, MatchPolicy::Nearest)
            .with_adapter(Box::new(MappedAdapter::new(clash).unwrap()))
            .unwrap();
        let venus = RecordSet::from_columns(
            "datetime(utc)",
            vec![at(0.0)],
            vec![
                Column::float("VenusTrigger_Azimuth", vec![Some(1.0)]),
                Column::float("VenusTrigger_Frequency", vec![Some(2.0)]),
            ],
        )
        .unwrap();
        let raw = inputs(vec![("alvira", alvira_raw(&[1.0])), ("gt", venus)]);
        let output = engine.fuse(Some(&ground_truth()), &raw).unwrap();

        assert!(matches!(
            output.outcome("gt").unwrap().status,
            SensorStatus::Failed { .. }
        ));
        assert_eq!(output.contributing_kinds(), vec!["alvira"]);
        assert_eq!(engine.metrics().aligned, 1);
    }

    #[test]
    fn duplicate_adapter_kinds_are_rejected() {
        let engine = FusionEngine::new(FusionConfig::default()).unwrap();
        let again = MappedAdapter::new(builtin::arcus()).unwrap();
        assert!(engine.with_adapter(Box::new(again)).is_err());
    }
}
