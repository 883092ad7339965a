use serde::Serialize;

/// Single cell value, borrowed out of a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Typed storage for one column. Nulls are `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnData::Float(_) => "float",
            ColumnData::Text(_) => "text",
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnData::Float(values) => values.get(row).map_or(true, Option::is_none),
            ColumnData::Text(values) => values.get(row).map_or(true, Option::is_none),
        }
    }

    pub fn non_null_count(&self) -> usize {
        match self {
            ColumnData::Float(values) => values.iter().filter(|v| v.is_some()).count(),
            ColumnData::Text(values) => values.iter().filter(|v| v.is_some()).count(),
        }
    }

    pub fn value(&self, row: usize) -> Value {
        match self {
            ColumnData::Float(values) => match values.get(row).copied().flatten() {
                Some(v) => Value::Float(v),
                None => Value::Null,
            },
            ColumnData::Text(values) => match values.get(row).cloned().flatten() {
                Some(v) => Value::Text(v),
                None => Value::Null,
            },
        }
    }

    pub fn floats(&self) -> Option<&[Option<f64>]> {
        match self {
            ColumnData::Float(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    /// An all-null column of the same type.
    pub fn nulls_like(&self, len: usize) -> ColumnData {
        match self {
            ColumnData::Float(_) => ColumnData::Float(vec![None; len]),
            ColumnData::Text(_) => ColumnData::Text(vec![None; len]),
        }
    }

    /// Builds a column by picking rows; `None` indices become null cells.
    pub fn gather(&self, indices: &[Option<usize>]) -> ColumnData {
        match self {
            ColumnData::Float(values) => ColumnData::Float(
                indices
                    .iter()
                    .map(|idx| idx.and_then(|i| values.get(i).copied().flatten()))
                    .collect(),
            ),
            ColumnData::Text(values) => ColumnData::Text(
                indices
                    .iter()
                    .map(|idx| idx.and_then(|i| values.get(i).cloned().flatten()))
                    .collect(),
            ),
        }
    }

    pub(crate) fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Float(values) => {
                ColumnData::Float(indices.iter().map(|&i| values[i]).collect())
            }
            ColumnData::Text(values) => {
                ColumnData::Text(indices.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }
}
