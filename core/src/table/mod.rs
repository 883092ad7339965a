pub mod column;
pub mod record_set;
pub mod timestamp;

pub use column::{Column, ColumnData, Value};
pub use record_set::RecordSet;
pub use timestamp::Timestamp;
