//! Vendor schemas of the four counter-UAS sensors in the drone scenarios.

use std::collections::BTreeMap;

use crate::adapter::{AdapterConfig, Aggregate, Capability, SignalMetric};
use crate::alignment::MatchPolicy;

pub const RADAR_TOLERANCE_SECS: f64 = 5.0;
pub const RF_TOLERANCE_SECS: f64 = 10.0;

fn field_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
        .collect()
}

/// Track-reporting radars share one layout under different vendor prefixes.
fn radar_track(kind: &str, vendor: &str, description: &str) -> AdapterConfig {
    let raw = |suffix: &str| format!("{vendor}Tracks{suffix}");
    let canonical = |suffix: &str| format!("{kind}_{suffix}");
    let fields: BTreeMap<String, String> = [
        ("TrackPosition_Latitude", "latitude"),
        ("TrackPosition_Longitude", "longitude"),
        ("TrackPosition_Altitude", "altitude"),
        ("TrackVelocity_Speed", "speed"),
        ("Track_Classification", "classification"),
        ("Track_Score", "score"),
    ]
    .iter()
    .map(|&(r, c)| (raw(r), canonical(c)))
    .collect();

    AdapterConfig {
        kind: kind.to_string(),
        description: Some(description.to_string()),
        presence: raw("TrackPosition_Latitude"),
        fields,
        tolerance_secs: RADAR_TOLERANCE_SECS,
        capability: Capability::Spatial,
        policy: MatchPolicy::Nearest,
    }
}

/// ALVIRA 2D radar.
pub fn alvira() -> AdapterConfig {
    radar_track("alvira", "Alvira", "2D Radar")
}

/// ARCUS 3D radar.
pub fn arcus() -> AdapterConfig {
    radar_track("arcus", "Arcus", "3D Radar")
}

/// DIANA RF direction finder.
pub fn diana() -> AdapterConfig {
    AdapterConfig {
        kind: "diana".into(),
        description: Some("RF Direction Finding".into()),
        presence: "DianaTargetsTargetSignal_bearing_deg".into(),
        fields: field_map(&[
            ("DianaTargetsTargetSignal_bearing_deg", "diana_bearing"),
            ("DianaTargetsTargetSignal_range_m", "diana_range"),
            ("DianaTargetsTargetSignal_snr_dB", "diana_snr"),
            ("DianaTargetsTargetClassification_type", "diana_classification"),
            ("DianaTargetsTargetClassification_score", "diana_score"),
        ]),
        tolerance_secs: RF_TOLERANCE_SECS,
        capability: Capability::Signal {
            metrics: vec![
                SignalMetric::new("mean_snr", "diana_snr", Aggregate::Mean),
                SignalMetric::new("max_range", "diana_range", Aggregate::Max),
            ],
        },
        policy: MatchPolicy::Nearest,
    }
}

/// VENUS RF direction finder.
pub fn venus() -> AdapterConfig {
    AdapterConfig {
        kind: "venus".into(),
        description: Some("RF Direction Finding".into()),
        presence: "VenusTrigger_Azimuth".into(),
        fields: field_map(&[
            ("VenusTrigger_Azimuth", "venus_azimuth"),
            ("VenusTrigger_Frequency", "venus_frequency"),
            ("VenusTriggerVenusName_isThreat", "venus_threat_score"),
        ]),
        tolerance_secs: RF_TOLERANCE_SECS,
        capability: Capability::Signal {
            metrics: vec![SignalMetric::new(
                "mean_frequency",
                "venus_frequency",
                Aggregate::Mean,
            )],
        },
        policy: MatchPolicy::Nearest,
    }
}

pub fn all() -> Vec<AdapterConfig> {
    vec![alvira(), arcus(), diana(), venus()]
}
