use std::collections::BTreeMap;

use crate::math::stats::StatsHelper;
use crate::prelude::{FusionError, FusionResult};
use crate::table::column::{Column, Value};
use crate::table::timestamp::Timestamp;

/// Ordered rows keyed by a designated timestamp column plus named typed columns.
///
/// Every operation returns a new table; the only in-place mutation is
/// [`RecordSet::push_column`], used while a table is being assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    time_column: String,
    timestamps: Vec<Timestamp>,
    columns: Vec<Column>,
}

impl RecordSet {
    pub fn new(time_column: impl Into<String>, timestamps: Vec<Timestamp>) -> Self {
        Self {
            time_column: time_column.into(),
            timestamps,
            columns: Vec::new(),
        }
    }

    /// Builds a table and validates every column against the timestamp count.
    pub fn from_columns(
        time_column: impl Into<String>,
        timestamps: Vec<Timestamp>,
        columns: Vec<Column>,
    ) -> FusionResult<Self> {
        let mut table = Self::new(time_column, timestamps);
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    pub fn push_column(&mut self, column: Column) -> FusionResult<()> {
        if column.name == self.time_column || self.has_column(&column.name) {
            return Err(FusionError::DuplicateColumn(column.name));
        }
        if column.data.len() != self.timestamps.len() {
            return Err(FusionError::LengthMismatch {
                column: column.name,
                expected: self.timestamps.len(),
                actual: column.data.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Returns a copy of this table extended with `columns`.
    pub fn widen(&self, columns: Vec<Column>) -> FusionResult<Self> {
        let mut widened = self.clone();
        for column in columns {
            widened.push_column(column)?;
        }
        Ok(widened)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    fn require(&self, name: &str) -> FusionResult<&Column> {
        self.column(name)
            .ok_or_else(|| FusionError::ColumnNotFound(name.to_string()))
    }

    pub fn value(&self, column: &str, row: usize) -> FusionResult<Value> {
        Ok(self.require(column)?.data.value(row))
    }

    /// Renames columns by exact name. Names absent from the table are ignored.
    pub fn rename(&self, mapping: &BTreeMap<String, String>) -> Self {
        let mut renamed = self.clone();
        if let Some(target) = mapping.get(&renamed.time_column) {
            renamed.time_column = target.clone();
        }
        for column in &mut renamed.columns {
            if let Some(target) = mapping.get(&column.name) {
                column.name = target.clone();
            }
        }
        renamed
    }

    /// Keeps only rows where `column` is non-null.
    pub fn filter_non_null(&self, column: &str) -> FusionResult<Self> {
        let data = &self.require(column)?.data;
        let keep: Vec<usize> = (0..self.len()).filter(|&row| !data.is_null(row)).collect();
        Ok(self.take(&keep))
    }

    /// Keeps the timestamp column plus `names`, in the order given.
    pub fn select(&self, names: &[&str]) -> FusionResult<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.require(name)?.clone());
        }
        Self::from_columns(self.time_column.clone(), self.timestamps.clone(), columns)
    }

    /// Stable sort by timestamp ascending.
    pub fn sort_by_time(&self) -> Self {
        if self.is_sorted() {
            return self.clone();
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&row| self.timestamps[row]);
        self.take(&order)
    }

    pub fn is_sorted(&self) -> bool {
        self.timestamps.windows(2).all(|pair| pair[0] <= pair[1])
    }

    pub fn ensure_sorted(&self, label: &str) -> FusionResult<()> {
        if self.is_sorted() {
            Ok(())
        } else {
            Err(FusionError::UnsortedInput {
                label: label.to_string(),
            })
        }
    }

    fn take(&self, rows: &[usize]) -> Self {
        Self {
            time_column: self.time_column.clone(),
            timestamps: rows.iter().map(|&row| self.timestamps[row]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
                .collect(),
        }
    }

    /// Non-null values of a float column.
    pub fn float_values(&self, column: &str) -> FusionResult<Vec<f64>> {
        let data = &self.require(column)?.data;
        let values = data.floats().ok_or_else(|| FusionError::ColumnType {
            column: column.to_string(),
            expected: "float",
        })?;
        Ok(values.iter().flatten().copied().collect())
    }

    /// Number of non-null cells.
    pub fn count(&self, column: &str) -> FusionResult<usize> {
        Ok(self.require(column)?.data.non_null_count())
    }

    pub fn mean(&self, column: &str) -> FusionResult<Option<f64>> {
        Ok(StatsHelper::mean(&self.float_values(column)?))
    }

    pub fn max(&self, column: &str) -> FusionResult<Option<f64>> {
        Ok(StatsHelper::max(&self.float_values(column)?))
    }

    pub fn min(&self, column: &str) -> FusionResult<Option<f64>> {
        Ok(StatsHelper::min(&self.float_values(column)?))
    }

    pub fn std_dev(&self, column: &str) -> FusionResult<Option<f64>> {
        Ok(StatsHelper::std_dev(&self.float_values(column)?))
    }

    /// Earliest and latest timestamp.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        let first = self.timestamps.iter().min()?;
        let last = self.timestamps.iter().max()?;
        Some((*first, *last))
    }

    /// Flattens the table into JSON objects, one per row.
    pub fn to_records<F>(&self, format_time: F) -> Vec<serde_json::Map<String, serde_json::Value>>
    where
        F: Fn(Timestamp) -> serde_json::Value,
    {
        (0..self.len())
            .map(|row| {
                let mut record = serde_json::Map::new();
                record.insert(self.time_column.clone(), format_time(self.timestamps[row]));
                for column in &self.columns {
                    let cell = match column.data.value(row) {
                        Value::Float(v) => serde_json::Value::from(v),
                        Value::Text(v) => serde_json::Value::String(v),
                        Value::Null => serde_json::Value::Null,
                    };
                    record.insert(column.name.clone(), cell);
                }
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: f64) -> Timestamp {
        Timestamp::from_secs_f64(secs)
    }

    fn sample() -> RecordSet {
        RecordSet::from_columns(
            "t",
            vec![ts(2.0), ts(0.0), ts(1.0), ts(0.0)],
            vec![
                Column::float("lat", vec![Some(1.0), None, Some(3.0), Some(4.0)]),
                Column::text(
                    "class",
                    vec![Some("a".into()), Some("b".into()), None, Some("d".into())],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rename_ignores_unknown_names() {
        let mut mapping = BTreeMap::new();
        mapping.insert("lat".to_string(), "gt_latitude".to_string());
        mapping.insert("missing".to_string(), "gt_missing".to_string());
        let renamed = sample().rename(&mapping);
        assert_eq!(renamed.column_names(), vec!["gt_latitude", "class"]);
    }

    #[test]
    fn filter_drops_null_rows_and_rejects_unknown_columns() {
        let filtered = sample().filter_non_null("lat").unwrap();
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered.count("lat").unwrap(), 3);
        assert_eq!(
            sample().filter_non_null("nope"),
            Err(FusionError::ColumnNotFound("nope".into()))
        );
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let sorted = sample().sort_by_time();
        assert!(sorted.is_sorted());
        // the two rows at t=0 keep their relative order ("b" then "d")
        assert_eq!(sorted.value("class", 0).unwrap(), Value::Text("b".into()));
        assert_eq!(sorted.value("class", 1).unwrap(), Value::Text("d".into()));
        assert_eq!(sorted.value("lat", 3).unwrap(), Value::Float(1.0));
    }

    #[test]
    fn select_keeps_requested_columns_in_order() {
        let selected = sample().select(&["class"]).unwrap();
        assert_eq!(selected.column_names(), vec!["class"]);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn aggregates_ignore_nulls() {
        let table = sample();
        assert_eq!(table.count("lat").unwrap(), 3);
        let mean = table.mean("lat").unwrap().unwrap();
        assert!((mean - 8.0 / 3.0).abs() < 1e-12);
        assert_eq!(table.max("lat").unwrap(), Some(4.0));
        assert!(table.std_dev("lat").unwrap().is_some());
        assert!(matches!(
            table.mean("class"),
            Err(FusionError::ColumnType { .. })
        ));
    }

    #[test]
    fn push_column_checks_length_and_duplicates() {
        let mut table = sample();
        assert!(matches!(
            table.push_column(Column::float("x", vec![None])),
            Err(FusionError::LengthMismatch { .. })
        ));
        assert_eq!(
            table.push_column(Column::float("lat", vec![None; 4])),
            Err(FusionError::DuplicateColumn("lat".into()))
        );
    }

    #[test]
    fn unsorted_tables_are_reported() {
        assert_eq!(
            sample().ensure_sorted("ground truth"),
            Err(FusionError::UnsortedInput {
                label: "ground truth".into()
            })
        );
        assert!(sample().sort_by_time().ensure_sorted("ground truth").is_ok());
    }

    #[test]
    fn records_use_null_for_missing_cells() {
        let records = sample().to_records(|t| serde_json::Value::from(t.as_secs_f64()));
        assert_eq!(records.len(), 4);
        assert_eq!(records[1]["lat"], serde_json::Value::Null);
        assert_eq!(records[0]["class"], serde_json::Value::from("a"));
        assert_eq!(records[0]["t"], serde_json::Value::from(2.0));
    }
}
