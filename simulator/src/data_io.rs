//! JSON record files in and out of [`RecordSet`].

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use fusioncore::table::{Column, ColumnData, RecordSet, Timestamp};
use fusioncore::{FusionOutput, PerformanceSummary};
use log::{info, warn};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::workflow::config::InputPaths;

pub const FUSED_FILE: &str = "fused_data.json";
pub const SUMMARY_FILE: &str = "performance_summary.json";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Raw input tables for one fusion run.
#[derive(Debug, Clone, Default)]
pub struct ScenarioData {
    pub ground_truth: Option<RecordSet>,
    /// Sensor kind -> raw vendor table.
    pub sensors: BTreeMap<String, RecordSet>,
}

/// Accepts naive `YYYY-MM-DD HH:MM:SS[.f]` (UTC), RFC 3339, or epoch seconds.
pub fn parse_timestamp(value: &JsonValue) -> anyhow::Result<Timestamp> {
    match value {
        JsonValue::Number(n) => n
            .as_f64()
            .map(Timestamp::from_secs_f64)
            .ok_or_else(|| anyhow!("timestamp {n} is not representable")),
        JsonValue::String(text) => {
            let text = text.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return to_timestamp(parsed.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .ok_or_else(|| anyhow!("unrecognized timestamp {text:?}"))
                .and_then(|naive| to_timestamp(Utc.from_utc_datetime(&naive)))
        }
        other => bail!("timestamp must be a string or number, got {other}"),
    }
}

fn to_timestamp(datetime: DateTime<Utc>) -> anyhow::Result<Timestamp> {
    datetime
        .timestamp_nanos_opt()
        .map(Timestamp::from_nanos)
        .ok_or_else(|| anyhow!("timestamp {datetime} out of range"))
}

/// `YYYY-MM-DD HH:MM:SS.ffffff`, UTC.
pub fn format_timestamp(timestamp: Timestamp) -> String {
    Utc.timestamp_nanos(timestamp.as_nanos())
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

/// Builds a table from flat JSON objects. A column is text when any of its
/// values is a string, float otherwise; missing keys read as null.
pub fn table_from_records(
    time_column: &str,
    records: &[Map<String, JsonValue>],
) -> anyhow::Result<RecordSet> {
    let mut timestamps = Vec::with_capacity(records.len());
    let mut names: Vec<&str> = Vec::new();
    for (row, record) in records.iter().enumerate() {
        let raw = record
            .get(time_column)
            .ok_or_else(|| anyhow!("row {row} has no {time_column} field"))?;
        timestamps.push(parse_timestamp(raw).with_context(|| format!("row {row}"))?);
        for key in record.keys() {
            if key != time_column && !names.contains(&key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let cells: Vec<Option<&JsonValue>> = records
            .iter()
            .map(|record| record.get(name).filter(|v| !v.is_null()))
            .collect();
        let data = if cells.iter().flatten().any(|v| v.is_string()) {
            ColumnData::Text(
                cells
                    .iter()
                    .map(|cell| {
                        cell.map(|v| match v {
                            JsonValue::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                    })
                    .collect(),
            )
        } else {
            let mut values = Vec::with_capacity(cells.len());
            for (row, cell) in cells.iter().enumerate() {
                values.push(match cell {
                    None => None,
                    Some(JsonValue::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
                    Some(v) => Some(v.as_f64().ok_or_else(|| {
                        anyhow!("column {name} row {row}: {v} is not numeric")
                    })?),
                });
            }
            ColumnData::Float(values)
        };
        columns.push(Column::new(name, data));
    }

    RecordSet::from_columns(time_column, timestamps, columns).context("assembling table")
}

pub fn load_table(path: &Path, time_column: &str) -> anyhow::Result<RecordSet> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<Map<String, JsonValue>> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {} as JSON records", path.display()))?;
    let table = table_from_records(time_column, &records)
        .with_context(|| format!("loading {}", path.display()))?;
    info!("loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Missing files are logged and left out so fusion can still run on the rest.
pub fn load_inputs(inputs: &InputPaths, time_column: &str) -> anyhow::Result<ScenarioData> {
    let ground_truth = match &inputs.ground_truth {
        Some(path) if path.exists() => Some(load_table(path, time_column)?),
        Some(path) => {
            warn!("ground truth file {} not found", path.display());
            None
        }
        None => None,
    };

    let mut sensors = BTreeMap::new();
    for (kind, path) in &inputs.sensors {
        if !path.exists() {
            warn!("{kind}: data file {} not found, skipping", path.display());
            continue;
        }
        sensors.insert(kind.clone(), load_table(path, time_column)?);
    }

    Ok(ScenarioData {
        ground_truth,
        sensors,
    })
}

pub fn fused_records(output: &FusionOutput) -> Vec<Map<String, JsonValue>> {
    output
        .fused
        .to_records(|ts| JsonValue::String(format_timestamp(ts)))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

/// Writes the fused table and summary, returning the two paths.
pub fn write_outputs(dir: &Path, output: &FusionOutput) -> anyhow::Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let fused_path = dir.join(FUSED_FILE);
    let summary_path = dir.join(SUMMARY_FILE);
    write_json(&fused_path, &fused_records(output))?;
    write_json::<PerformanceSummary>(&summary_path, &output.summary)?;
    info!(
        "wrote {} and {}",
        fused_path.display(),
        summary_path.display()
    );
    Ok((fused_path, summary_path))
}
