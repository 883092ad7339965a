use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::adapter::{builtin, AdapterConfig};
use crate::estimation::ErrorModel;
use crate::prelude::{FusionError, FusionResult};

pub const DEFAULT_TIME_COLUMN: &str = "datetime(utc)";

fn default_time_column() -> String {
    DEFAULT_TIME_COLUMN.to_string()
}

/// Flight-log field names mapped onto canonical `gt_` names.
pub fn default_ground_truth_fields() -> BTreeMap<String, String> {
    [
        ("latitude", "gt_latitude"),
        ("longitude", "gt_longitude"),
        ("altitude(m)", "gt_altitude"),
        ("velocityX(mps)", "gt_vel_x"),
        ("velocityY(mps)", "gt_vel_y"),
        ("velocityZ(mps)", "gt_vel_z"),
        ("speed(mps)", "gt_speed"),
    ]
    .iter()
    .map(|&(raw, canonical)| (raw.to_string(), canonical.to_string()))
    .collect()
}

/// Everything the fusion engine needs to know about its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub time_column: String,
    pub ground_truth_fields: BTreeMap<String, String>,
    /// Sensor kinds, aligned in this order.
    pub sensors: Vec<AdapterConfig>,
    pub error_model: ErrorModel,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            time_column: default_time_column(),
            ground_truth_fields: default_ground_truth_fields(),
            sensors: builtin::all(),
            error_model: ErrorModel::default(),
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> FusionResult<()> {
        let mut kinds = BTreeSet::new();
        for sensor in &self.sensors {
            sensor.validate()?;
            if !kinds.insert(sensor.kind.as_str()) {
                return Err(FusionError::InvalidConfig(format!(
                    "sensor kind {} configured twice",
                    sensor.kind
                )));
            }
        }
        let scale = self.error_model.meters_per_degree;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(FusionError::InvalidConfig(format!(
                "meters_per_degree must be positive, got {scale}"
            )));
        }
        Ok(())
    }

    pub fn sensor(&self, kind: &str) -> Option<&AdapterConfig> {
        self.sensors.iter().find(|sensor| sensor.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_covers_four_sensor_kinds() {
        let config = FusionConfig::default();
        config.validate().unwrap();
        let kinds: Vec<_> = config.sensors.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["alvira", "arcus", "diana", "venus"]);
        assert_eq!(config.sensor("diana").unwrap().tolerance_secs, 10.0);
        assert_eq!(config.sensor("alvira").unwrap().tolerance_secs, 5.0);
    }

    #[test]
    fn duplicate_kinds_are_rejected() {
        let mut config = FusionConfig::default();
        config.sensors.push(builtin::alvira());
        assert!(matches!(
            config.validate(),
            Err(FusionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: FusionConfig =
            serde_json::from_str(r#"{"error_model": {"meters_per_degree": 100000.0}}"#).unwrap();
        assert_eq!(config.time_column, DEFAULT_TIME_COLUMN);
        assert_eq!(config.sensors.len(), 4);
        assert_eq!(config.error_model.meters_per_degree, 100_000.0);
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let mut config = FusionConfig::default();
        config.error_model.meters_per_degree = 0.0;
        assert!(config.validate().is_err());
    }
}
