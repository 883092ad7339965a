//! Per-sensor schema normalization.
//!
//! Each sensor kind maps vendor column names onto canonical `<kind>_*`
//! names and drops rows without a detection before alignment.

pub mod builtin;
pub mod mapped;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alignment::MatchPolicy;
use crate::prelude::{FusionError, FusionResult};
use crate::table::RecordSet;

pub use mapped::MappedAdapter;

/// Column-wise reduction used for signal-only summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Count,
    Mean,
    Max,
    StdDev,
}

/// Named aggregate reported for a signal-only sensor, e.g. `mean_snr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetric {
    pub name: String,
    pub field: String,
    pub aggregate: Aggregate,
}

impl SignalMetric {
    pub fn new(name: impl Into<String>, field: impl Into<String>, aggregate: Aggregate) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            aggregate,
        }
    }
}

/// What a sensor kind can be scored on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Capability {
    /// Absolute position fix; gets `_pos_error_m` and `_alt_error_m` fields.
    Spatial,
    /// Bearing or signal strength only; summarized by its own aggregates.
    Signal {
        #[serde(default)]
        metrics: Vec<SignalMetric>,
    },
}

impl Capability {
    pub fn is_spatial(&self) -> bool {
        matches!(self, Capability::Spatial)
    }
}

/// Declarative description of one sensor kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub kind: String,
    /// Human-readable sensor type, e.g. "3D Radar".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw field whose nullness decides whether a row is a detection.
    pub presence: String,
    /// Raw field name -> canonical field name.
    pub fields: BTreeMap<String, String>,
    pub tolerance_secs: f64,
    pub capability: Capability,
    #[serde(default)]
    pub policy: MatchPolicy,
}

impl AdapterConfig {
    pub fn canonical(&self, suffix: &str) -> String {
        format!("{}_{}", self.kind, suffix)
    }

    /// Canonical name of the presence field.
    pub fn presence_field(&self) -> Option<&str> {
        self.fields.get(&self.presence).map(String::as_str)
    }

    pub fn tolerance(&self) -> FusionResult<Duration> {
        Duration::try_from_secs_f64(self.tolerance_secs).map_err(|_| {
            FusionError::InvalidConfig(format!(
                "{}: tolerance {} is not a valid duration",
                self.kind, self.tolerance_secs
            ))
        })
    }

    pub fn validate(&self) -> FusionResult<()> {
        if self.kind.is_empty() {
            return Err(FusionError::InvalidConfig("sensor kind is empty".into()));
        }
        self.tolerance()?;
        if self.presence_field().is_none() {
            return Err(FusionError::InvalidConfig(format!(
                "{}: presence field {} has no canonical mapping",
                self.kind, self.presence
            )));
        }
        let prefix = format!("{}_", self.kind);
        if let Some(bad) = self.fields.values().find(|name| !name.starts_with(&prefix)) {
            return Err(FusionError::InvalidConfig(format!(
                "{}: canonical field {} must start with {}",
                self.kind, bad, prefix
            )));
        }
        if self.capability.is_spatial() {
            for suffix in ["latitude", "longitude", "altitude"] {
                let expected = self.canonical(suffix);
                if !self.fields.values().any(|name| name.as_str() == expected) {
                    return Err(FusionError::InvalidConfig(format!(
                        "{}: spatial sensor must map a field to {}",
                        self.kind, expected
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Normalized detections of one sensor kind, sorted by time.
#[derive(Debug, Clone)]
pub struct SensorStream {
    pub kind: String,
    pub capability: Capability,
    pub tolerance: Duration,
    pub policy: MatchPolicy,
    /// Canonical presence field; non-null on every row.
    pub presence_field: String,
    pub records: RecordSet,
}

impl SensorStream {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Seam for sensor kinds. Configuration-driven kinds use [`MappedAdapter`].
pub trait SensorAdapter {
    fn kind(&self) -> &str;
    fn capability(&self) -> &Capability;
    fn normalize(&self, raw: &RecordSet) -> FusionResult<SensorStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_configs_validate() {
        for config in builtin::all() {
            config.validate().unwrap();
        }
    }

    #[test]
    fn spatial_config_without_altitude_is_rejected() {
        let mut config = builtin::alvira();
        config
            .fields
            .retain(|_, canonical| *canonical != "alvira_altitude");
        assert!(matches!(
            config.validate(),
            Err(FusionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unprefixed_canonical_names_are_rejected() {
        let mut config = builtin::venus();
        config
            .fields
            .insert("VenusTrigger_Extra".into(), "extra".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let mut config = builtin::diana();
        config.tolerance_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn capability_round_trips_through_json() {
        let capability = builtin::diana().capability;
        let json = serde_json::to_string(&capability).unwrap();
        assert!(json.contains("\"type\":\"signal\""));
        let parsed: Capability = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, capability);
    }
}
