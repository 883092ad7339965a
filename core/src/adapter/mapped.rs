use std::time::Duration;

use crate::adapter::{AdapterConfig, Capability, SensorAdapter, SensorStream};
use crate::prelude::{FusionError, FusionResult};
use crate::table::{Column, RecordSet};
use crate::telemetry::log::LogManager;

/// Adapter driven entirely by an [`AdapterConfig`].
pub struct MappedAdapter {
    config: AdapterConfig,
    tolerance: Duration,
    presence_field: String,
    logger: LogManager,
}

impl MappedAdapter {
    pub fn new(config: AdapterConfig) -> FusionResult<Self> {
        config.validate()?;
        let tolerance = config.tolerance()?;
        let presence_field = config
            .presence_field()
            .ok_or_else(|| {
                FusionError::InvalidConfig(format!("{}: no presence field", config.kind))
            })?
            .to_string();
        Ok(Self {
            config,
            tolerance,
            presence_field,
            logger: LogManager::new("adapter"),
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}

impl SensorAdapter for MappedAdapter {
    fn kind(&self) -> &str {
        &self.config.kind
    }

    fn capability(&self) -> &Capability {
        &self.config.capability
    }

    fn normalize(&self, raw: &RecordSet) -> FusionResult<SensorStream> {
        if !raw.has_column(&self.config.presence) {
            return Err(FusionError::SchemaMismatch {
                kind: self.config.kind.clone(),
                field: self.config.presence.clone(),
            });
        }

        let detections = raw
            .filter_non_null(&self.config.presence)?
            .rename(&self.config.fields);

        let mut columns = Vec::with_capacity(self.config.fields.len());
        for (raw_name, canonical) in &self.config.fields {
            match detections.column(canonical) {
                Some(column) => columns.push(column.clone()),
                None => {
                    self.logger.warn(&format!(
                        "{}: raw field {} absent, {} will be null",
                        self.config.kind, raw_name, canonical
                    ));
                    columns.push(Column::float(
                        canonical.clone(),
                        vec![None; detections.len()],
                    ));
                }
            }
        }

        let records = RecordSet::from_columns(
            detections.time_column(),
            detections.timestamps().to_vec(),
            columns,
        )?
        .sort_by_time();

        self.logger.record(&format!(
            "{}: {} of {} rows carry a detection",
            self.config.kind,
            records.len(),
            raw.len()
        ));

        Ok(SensorStream {
            kind: self.config.kind.clone(),
            capability: self.config.capability.clone(),
            tolerance: self.tolerance,
            policy: self.config.policy,
            presence_field: self.presence_field.clone(),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::builtin;
    use crate::table::{Timestamp, Value};

    fn raw_alvira() -> RecordSet {
        RecordSet::from_columns(
            "datetime(utc)",
            vec![
                Timestamp::from_secs_f64(2.0),
                Timestamp::from_secs_f64(0.0),
                Timestamp::from_secs_f64(1.0),
            ],
            vec![
                Column::float(
                    "AlviraTracksTrackPosition_Latitude",
                    vec![Some(10.1), None, Some(10.2)],
                ),
                Column::float(
                    "AlviraTracksTrackPosition_Longitude",
                    vec![Some(20.1), Some(20.0), Some(20.2)],
                ),
                Column::float(
                    "AlviraTracksTrackPosition_Altitude",
                    vec![Some(50.0), None, Some(55.0)],
                ),
                Column::text(
                    "AlviraTracksTrack_Classification",
                    vec![Some("DRONE".into()), None, Some("BIRD".into())],
                ),
                Column::float("AlviraStatus_Temperature", vec![Some(30.0); 3]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn normalize_keeps_only_detections_with_canonical_names() {
        let adapter = MappedAdapter::new(builtin::alvira()).unwrap();
        let stream = adapter.normalize(&raw_alvira()).unwrap();

        assert_eq!(stream.len(), 2);
        assert!(stream.records.is_sorted());
        assert_eq!(stream.presence_field, "alvira_latitude");
        assert!(stream.records.has_column("alvira_latitude"));
        assert!(stream.records.has_column("alvira_classification"));
        assert!(!stream.records.has_column("AlviraStatus_Temperature"));
        assert!(stream
            .records
            .column_names()
            .iter()
            .all(|name| name.starts_with("alvira_")));
        assert_eq!(
            stream.records.value("alvira_latitude", 0).unwrap(),
            Value::Float(10.2)
        );
    }

    #[test]
    fn absent_optional_fields_become_null_columns() {
        let adapter = MappedAdapter::new(builtin::alvira()).unwrap();
        let stream = adapter.normalize(&raw_alvira()).unwrap();
        assert_eq!(stream.records.count("alvira_speed").unwrap(), 0);
        assert_eq!(stream.records.count("alvira_score").unwrap(), 0);
    }

    #[test]
    fn missing_presence_column_is_a_schema_mismatch() {
        let adapter = MappedAdapter::new(builtin::diana()).unwrap();
        let err = adapter.normalize(&raw_alvira()).unwrap_err();
        assert_eq!(
            err,
            FusionError::SchemaMismatch {
                kind: "diana".into(),
                field: "DianaTargetsTargetSignal_bearing_deg".into(),
            }
        );
    }

    #[test]
    fn all_null_presence_yields_an_empty_stream() {
        let raw = RecordSet::from_columns(
            "datetime(utc)",
            vec![Timestamp::from_secs_f64(0.0)],
            vec![Column::float("VenusTrigger_Azimuth", vec![None])],
        )
        .unwrap();
        let adapter = MappedAdapter::new(builtin::venus()).unwrap();
        let stream = adapter.normalize(&raw).unwrap();
        assert!(stream.is_empty());
        assert!(stream.records.has_column("venus_frequency"));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = builtin::arcus();
        config.presence = "ArcusUnknown".into();
        assert!(MappedAdapter::new(config).is_err());
    }
}
