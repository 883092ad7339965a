use fusioncore::config::FusionConfig;
use fusioncore::fusion::{SensorMetrics, SensorStatus};
use fusioncore::FusionOutput;
use std::fmt::Write;

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}{unit}"))
}

/// Plain-text performance report, one block per sensor kind.
pub fn render_summary(config: &FusionConfig, output: &FusionOutput) -> String {
    let summary = &output.summary;
    let rule = "=".repeat(60);
    let mut text = String::new();
    let _ = writeln!(text, "\n{rule}\nSENSOR PERFORMANCE SUMMARY\n{rule}");
    let _ = writeln!(text, "Total Records: {}", summary.total_records);
    let _ = writeln!(text, "Time Span: {:.1} seconds", summary.time_span_secs);

    for sensor in &summary.sensors {
        let description = config
            .sensor(&sensor.kind)
            .and_then(|c| c.description.as_deref())
            .unwrap_or("sensor");
        let _ = writeln!(
            text,
            "\n{} ({}):",
            sensor.kind.to_uppercase(),
            description
        );
        let _ = writeln!(
            text,
            "  Detections: {} ({:.1}%)",
            sensor.detections, sensor.detection_rate
        );
        match &sensor.metrics {
            SensorMetrics::Spatial {
                mean_pos_error_m,
                max_pos_error_m,
                std_pos_error_m,
                mean_alt_error_m,
            } => {
                let _ = writeln!(
                    text,
                    "  Mean Position Error: {}",
                    fmt_opt(*mean_pos_error_m, "m")
                );
                let _ = writeln!(
                    text,
                    "  Max Position Error: {}",
                    fmt_opt(*max_pos_error_m, "m")
                );
                let _ = writeln!(
                    text,
                    "  Position Error Std Dev: {}",
                    fmt_opt(*std_pos_error_m, "m")
                );
                let _ = writeln!(
                    text,
                    "  Mean Altitude Error: {}",
                    fmt_opt(*mean_alt_error_m, "m")
                );
            }
            SensorMetrics::Signal { values } => {
                for (name, value) in values {
                    let _ = writeln!(text, "  {}: {}", name, fmt_opt(*value, ""));
                }
            }
        }
    }

    let skipped: Vec<String> = output
        .outcomes
        .iter()
        .filter_map(|outcome| match &outcome.status {
            SensorStatus::Fused { .. } => None,
            SensorStatus::NotProvided => Some(format!("{} (no data)", outcome.kind)),
            SensorStatus::SchemaMismatch { field } => {
                Some(format!("{} (missing {field})", outcome.kind))
            }
            SensorStatus::Failed { reason } => Some(format!("{} ({reason})", outcome.kind)),
        })
        .collect();
    if !skipped.is_empty() {
        let _ = writeln!(text, "\nSkipped: {}", skipped.join(", "));
    }
    text
}
