use anyhow::{ensure, Context};
use fusioncore::config::DEFAULT_TIME_COLUMN;
use fusioncore::table::{Column, RecordSet, Timestamp};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::data_io::ScenarioData;

/// 2020-09-29 14:10:56 UTC, start of the reference flight.
const SCENARIO_EPOCH_SECS: f64 = 1_601_388_656.0;
const METERS_PER_DEGREE: f64 = 111_000.0;

/// Configuration for generating a synthetic drone flight and sensor logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub duration_secs: f64,
    pub rate_hz: f64,
    pub seed: u64,
    pub origin_latitude: f64,
    pub origin_longitude: f64,
    pub orbit_radius_m: f64,
    pub orbit_period_secs: f64,
    pub altitude_m: f64,
    /// Probability that a sensor report carries no fix.
    pub dropout: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            duration_secs: 300.0,
            rate_hz: 10.0,
            seed: 0,
            origin_latitude: 50.8503,
            origin_longitude: 4.3517,
            orbit_radius_m: 400.0,
            orbit_period_secs: 120.0,
            altitude_m: 80.0,
            dropout: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pose {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    east_m: f64,
    north_m: f64,
    velocity: (f64, f64, f64),
}

impl ScenarioConfig {
    fn pose(&self, t: f64) -> Pose {
        let omega = 2.0 * PI / self.orbit_period_secs;
        let angle = omega * t;
        let east_m = self.orbit_radius_m * angle.cos();
        let north_m = self.orbit_radius_m * angle.sin();
        let altitude = self.altitude_m + 10.0 * (angle * 2.0).sin();
        Pose {
            latitude: self.origin_latitude + north_m / METERS_PER_DEGREE,
            longitude: self.origin_longitude + east_m / METERS_PER_DEGREE,
            altitude,
            east_m,
            north_m,
            velocity: (
                -self.orbit_radius_m * omega * angle.sin(),
                self.orbit_radius_m * omega * angle.cos(),
                20.0 * omega * (angle * 2.0).cos(),
            ),
        }
    }

    fn sample_count(&self) -> anyhow::Result<usize> {
        ensure!(self.rate_hz > 0.0, "rate_hz must be positive");
        ensure!(self.duration_secs > 0.0, "duration_secs must be positive");
        ensure!(self.orbit_period_secs > 0.0, "orbit_period_secs must be positive");
        let count = (self.duration_secs * self.rate_hz).floor();
        ensure!(count.is_finite(), "sample count overflow");
        Ok(count as usize + 1)
    }
}

fn at(t: f64) -> Timestamp {
    Timestamp::from_secs_f64(SCENARIO_EPOCH_SECS + t)
}

fn build_ground_truth(config: &ScenarioConfig) -> anyhow::Result<RecordSet> {
    let count = config.sample_count()?;
    let times: Vec<f64> = (0..count).map(|i| i as f64 / config.rate_hz).collect();
    let poses: Vec<Pose> = times.iter().map(|&t| config.pose(t)).collect();
    let column = |name: &str, f: fn(&Pose) -> f64| {
        Column::float(name, poses.iter().map(|p| Some(f(p))).collect())
    };

    RecordSet::from_columns(
        DEFAULT_TIME_COLUMN,
        times.iter().map(|&t| at(t)).collect(),
        vec![
            column("latitude", |p| p.latitude),
            column("longitude", |p| p.longitude),
            column("altitude(m)", |p| p.altitude),
            column("velocityX(mps)", |p| p.velocity.0),
            column("velocityY(mps)", |p| p.velocity.1),
            column("velocityZ(mps)", |p| p.velocity.2),
            column("speed(mps)", |p| {
                (p.velocity.0.powi(2) + p.velocity.1.powi(2) + p.velocity.2.powi(2)).sqrt()
            }),
        ],
    )
    .context("assembling ground truth table")
}

/// Report instants at a fixed cadence with bounded jitter.
fn report_times(config: &ScenarioConfig, period: f64, rng: &mut StdRng) -> Vec<f64> {
    let jitter = period * 0.2;
    let count = (config.duration_secs / period).floor() as usize;
    (0..=count)
        .map(|i| (i as f64 * period + rng.gen_range(-jitter..=jitter)).max(0.0))
        .collect()
}

fn noisy(rng: &mut StdRng, sigma: f64) -> f64 {
    rng.gen_range(-sigma..=sigma)
}

/// Track radar report: position with noise plus track metadata.
fn build_radar(
    config: &ScenarioConfig,
    vendor: &str,
    period: f64,
    sigma_m: f64,
    rng: &mut StdRng,
) -> anyhow::Result<RecordSet> {
    let times = report_times(config, period, rng);
    let mut latitude = Vec::with_capacity(times.len());
    let mut longitude = Vec::with_capacity(times.len());
    let mut altitude = Vec::with_capacity(times.len());
    let mut speed = Vec::with_capacity(times.len());
    let mut classification = Vec::with_capacity(times.len());
    let mut score = Vec::with_capacity(times.len());

    for &t in &times {
        if rng.gen_bool(config.dropout) {
            latitude.push(None);
            longitude.push(None);
            altitude.push(None);
            speed.push(None);
            classification.push(None);
            score.push(None);
            continue;
        }
        let pose = config.pose(t);
        latitude.push(Some(pose.latitude + noisy(rng, sigma_m) / METERS_PER_DEGREE));
        longitude.push(Some(pose.longitude + noisy(rng, sigma_m) / METERS_PER_DEGREE));
        altitude.push(Some(pose.altitude + noisy(rng, sigma_m * 1.5)));
        speed.push(Some(
            (pose.velocity.0.powi(2) + pose.velocity.1.powi(2)).sqrt() + noisy(rng, 1.0),
        ));
        let confidence: f64 = rng.gen_range(0.4..1.0);
        let label = if confidence > 0.6 { "DRONE" } else { "UNKNOWN" };
        classification.push(Some(label.to_string()));
        score.push(Some(confidence));
    }

    let name = |suffix: &str| format!("{vendor}Tracks{suffix}");
    RecordSet::from_columns(
        DEFAULT_TIME_COLUMN,
        times.iter().map(|&t| at(t)).collect(),
        vec![
            Column::float(name("TrackPosition_Latitude"), latitude),
            Column::float(name("TrackPosition_Longitude"), longitude),
            Column::float(name("TrackPosition_Altitude"), altitude),
            Column::float(name("TrackVelocity_Speed"), speed),
            Column::text(name("Track_Classification"), classification),
            Column::float(name("Track_Score"), score),
        ],
    )
    .with_context(|| format!("assembling {vendor} table"))
}

/// Bearing (degrees clockwise from north) and range from a site offset from the origin.
fn bearing_and_range(pose: &Pose, site: (f64, f64)) -> (f64, f64) {
    let east = pose.east_m - site.0;
    let north = pose.north_m - site.1;
    let bearing = east.atan2(north).to_degrees().rem_euclid(360.0);
    (bearing, east.hypot(north))
}

fn build_diana(config: &ScenarioConfig, rng: &mut StdRng) -> anyhow::Result<RecordSet> {
    let times = report_times(config, 2.0, rng);
    let site = (-600.0, -300.0);
    let mut bearing = Vec::with_capacity(times.len());
    let mut range = Vec::with_capacity(times.len());
    let mut snr = Vec::with_capacity(times.len());
    let mut class = Vec::with_capacity(times.len());
    let mut score = Vec::with_capacity(times.len());

    for &t in &times {
        if rng.gen_bool(config.dropout) {
            bearing.push(None);
            range.push(None);
            snr.push(None);
            class.push(None);
            score.push(None);
            continue;
        }
        let (b, r) = bearing_and_range(&config.pose(t), site);
        bearing.push(Some((b + noisy(rng, 3.0)).rem_euclid(360.0)));
        range.push(Some(r + noisy(rng, 50.0)));
        snr.push(Some(30.0 - 10.0 * (r / 100.0).log10() + noisy(rng, 2.0)));
        class.push(Some("UAV".to_string()));
        score.push(Some(rng.gen_range(0.5..1.0)));
    }

    RecordSet::from_columns(
        DEFAULT_TIME_COLUMN,
        times.iter().map(|&t| at(t)).collect(),
        vec![
            Column::float("DianaTargetsTargetSignal_bearing_deg", bearing),
            Column::float("DianaTargetsTargetSignal_range_m", range),
            Column::float("DianaTargetsTargetSignal_snr_dB", snr),
            Column::text("DianaTargetsTargetClassification_type", class),
            Column::float("DianaTargetsTargetClassification_score", score),
        ],
    )
    .context("assembling DIANA table")
}

fn build_venus(config: &ScenarioConfig, rng: &mut StdRng) -> anyhow::Result<RecordSet> {
    let times = report_times(config, 5.0, rng);
    let site = (500.0, 200.0);
    let mut azimuth = Vec::with_capacity(times.len());
    let mut frequency = Vec::with_capacity(times.len());
    let mut threat = Vec::with_capacity(times.len());

    for &t in &times {
        if rng.gen_bool(config.dropout) {
            azimuth.push(None);
            frequency.push(None);
            threat.push(None);
            continue;
        }
        let (b, _) = bearing_and_range(&config.pose(t), site);
        azimuth.push(Some((b + noisy(rng, 5.0)).rem_euclid(360.0)));
        let carrier = if rng.gen_bool(0.7) { 2.4e9 } else { 5.8e9 };
        frequency.push(Some(carrier + noisy(rng, 20e6)));
        threat.push(Some(if rng.gen_bool(0.8) { 1.0 } else { 0.0 }));
    }

    RecordSet::from_columns(
        DEFAULT_TIME_COLUMN,
        times.iter().map(|&t| at(t)).collect(),
        vec![
            Column::float("VenusTrigger_Azimuth", azimuth),
            Column::float("VenusTrigger_Frequency", frequency),
            Column::float("VenusTriggerVenusName_isThreat", threat),
        ],
    )
    .context("assembling VENUS table")
}

/// Builds ground truth plus raw ALVIRA, ARCUS, DIANA and VENUS logs.
pub fn build_scenario(config: &ScenarioConfig) -> anyhow::Result<ScenarioData> {
    ensure!(
        (0.0..=1.0).contains(&config.dropout),
        "dropout must be within [0, 1]"
    );
    let ground_truth = build_ground_truth(config)?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut sensors = BTreeMap::new();
    sensors.insert(
        "alvira".to_string(),
        build_radar(config, "Alvira", 1.0, 15.0, &mut rng)?,
    );
    sensors.insert(
        "arcus".to_string(),
        build_radar(config, "Arcus", 0.5, 8.0, &mut rng)?,
    );
    sensors.insert("diana".to_string(), build_diana(config, &mut rng)?);
    sensors.insert("venus".to_string(), build_venus(config, &mut rng)?);

    Ok(ScenarioData {
        ground_truth: Some(ground_truth),
        sensors,
    })
}
