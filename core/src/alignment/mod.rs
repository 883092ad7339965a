pub mod aligner;

use serde::{Deserialize, Serialize};

pub use aligner::{match_indices, Aligner, Alignment};

/// How detections are attached to reference instants.
///
/// Ties in time distance always resolve to the earlier timestamp so that a
/// fixed input yields a fixed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every reference row takes its nearest in-tolerance detection; one
    /// detection may serve several reference rows.
    #[default]
    Nearest,
    /// Every detection is attached at most once, to its own nearest
    /// in-tolerance reference row. Competing detections for the same row
    /// resolve to the closest one.
    Exclusive,
}
