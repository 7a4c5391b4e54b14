//! # Topology Engine
//!
//! Normalizes the segments of one (net, layer) track group: colinear merge and intersection
//! splitting repeated to a fixed point, then island assignment. Running [`cleanup_group`] on
//! its own output changes nothing.

pub mod chain;
pub mod island;
pub mod merge;
pub mod split;

pub use chain::{make_polylines, Polyline};
pub use island::{assign_islands, Island, IslandArena, IslandId};
pub use merge::merge_colinear;
pub use split::split_intersections;

use crate::geometry::Segment;

/// Outcome of one cleanup run over a group.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Edits made by the colinear merge.
    pub merged: usize,
    /// Endpoint snaps plus splits made by intersection splitting.
    pub split: usize,
    pub islands: IslandArena,
}

impl CleanupReport {
    pub fn is_unchanged(&self) -> bool {
        self.merged == 0 && self.split == 0
    }
}

/// Merge and split rounds allowed before cleanup gives up on a group.
const MAX_ROUNDS: usize = 32;

/// Alternate colinear merge and intersection splitting until neither changes anything, then
/// assign islands.
pub fn cleanup_group(segments: &mut Vec<Segment>) -> CleanupReport {
    let mut merged = 0;
    let mut split = 0;
    let mut settled = false;

    for _ in 0..MAX_ROUNDS {
        let round_merged = merge_colinear(segments);
        let round_split = split_intersections(segments);
        merged += round_merged;
        split += round_split;
        if round_merged == 0 && round_split == 0 {
            settled = true;
            break;
        }
    }
    if !settled {
        log::warn!(
            "cleanup did not settle after {} rounds over {} segments",
            MAX_ROUNDS,
            segments.len()
        );
    }

    let islands = assign_islands(segments);
    log::debug!(
        "cleanup: {} merge edits, {} split edits, {} segments in {} islands",
        merged,
        split,
        segments.len(),
        islands.live_count()
    );
    CleanupReport {
        merged,
        split,
        islands,
    }
}
