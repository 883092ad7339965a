use serde::{Deserialize, Serialize};

use crate::prelude::{FusionError, FusionResult};
use crate::table::{Column, RecordSet};

/// Approximate meters per degree of latitude/longitude near the test range.
pub const DEFAULT_METERS_PER_DEGREE: f64 = 111_000.0;

pub const GT_LATITUDE: &str = "gt_latitude";
pub const GT_LONGITUDE: &str = "gt_longitude";
pub const GT_ALTITUDE: &str = "gt_altitude";

/// Flat degree-to-meter error model.
///
/// Not a geodesic distance: both axes use the same scale factor, which is only
/// acceptable over small regional extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorModel {
    pub meters_per_degree: f64,
}

impl Default for ErrorModel {
    fn default() -> Self {
        Self {
            meters_per_degree: DEFAULT_METERS_PER_DEGREE,
        }
    }
}

fn float_column<'a>(table: &'a RecordSet, name: &str) -> Option<&'a [Option<f64>]> {
    table.column(name).and_then(|column| column.data.floats())
}

impl ErrorModel {
    pub fn planar_error(&self, truth: (f64, f64), fix: (f64, f64)) -> f64 {
        let d_lat = (truth.0 - fix.0) * self.meters_per_degree;
        let d_lon = (truth.1 - fix.1) * self.meters_per_degree;
        (d_lat * d_lat + d_lon * d_lon).sqrt()
    }

    pub fn altitude_error(&self, truth: f64, fix: f64) -> f64 {
        (truth - fix).abs()
    }

    /// Appends `<kind>_pos_error_m` and `<kind>_alt_error_m` to `table`.
    ///
    /// A row gets a null error whenever any input it depends on is null.
    pub fn apply(&self, table: &RecordSet, kind: &str) -> FusionResult<RecordSet> {
        let require = move |name: &str| {
            float_column(table, name).ok_or_else(|| FusionError::SchemaMismatch {
                kind: kind.to_string(),
                field: name.to_string(),
            })
        };
        let gt_lat = require(GT_LATITUDE)?;
        let gt_lon = require(GT_LONGITUDE)?;
        let lat = require(&format!("{kind}_latitude"))?;
        let lon = require(&format!("{kind}_longitude"))?;
        let gt_alt = float_column(table, GT_ALTITUDE);
        let alt = float_column(table, &format!("{kind}_altitude"));

        let pos_error = (0..table.len())
            .map(|row| match (gt_lat[row], gt_lon[row], lat[row], lon[row]) {
                (Some(a), Some(b), Some(c), Some(d)) => Some(self.planar_error((a, b), (c, d))),
                _ => None,
            })
            .collect();

        let alt_error = (0..table.len())
            .map(|row| {
                let truth = gt_alt.and_then(|col| col[row])?;
                let fix = alt.and_then(|col| col[row])?;
                Some(self.altitude_error(truth, fix))
            })
            .collect();

        table.widen(vec![
            Column::float(format!("{kind}_pos_error_m"), pos_error),
            Column::float(format!("{kind}_alt_error_m"), alt_error),
        ])
    }
}
