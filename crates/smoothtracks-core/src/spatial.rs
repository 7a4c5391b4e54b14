use rstar::primitives::GeomWithData;
use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Point, Segment};

/// An entry in the segment R-tree, referencing a segment by its index in the group.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    /// Index into the track group's segment vector.
    pub segment_index: usize,
    /// Bounding box of the segment including half its width plus query slack.
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Box index over the segments of one track group.
///
/// Only a pruning aid: every query returns indices in ascending order, so callers visit
/// candidates in the same order an exhaustive scan would.
pub struct SegmentIndex {
    tree: RTree<SpatialEntry>,
}

impl SegmentIndex {
    /// Build the index, growing each segment's box by `expand`.
    pub fn build(segments: &[Segment], expand: f64) -> Self {
        let entries = segments
            .iter()
            .enumerate()
            .map(|(segment_index, s)| SpatialEntry {
                segment_index,
                bbox: s.bbox(expand),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices of all segments whose box overlaps `query`, ascending.
    pub fn query_box(&self, query: &BBox) -> Vec<usize> {
        let envelope = AABB::from_corners([query.min.x, query.min.y], [query.max.x, query.max.y]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.segment_index)
            .collect();
        hits.sort_unstable();
        hits
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

type EndpointEntry = GeomWithData<[f64; 2], usize>;

/// Point index over segment endpoints; each entry carries its segment's index.
pub struct PointIndex {
    tree: RTree<EndpointEntry>,
}

impl PointIndex {
    pub fn from_endpoints(segments: &[Segment]) -> Self {
        let entries = segments
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                [
                    EndpointEntry::new([s.start().x, s.start().y], i),
                    EndpointEntry::new([s.end().x, s.end().y], i),
                ]
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices of segments with at least one endpoint within `radius` of `center`, ascending
    /// and without duplicates.
    pub fn within_radius(&self, center: Point, radius: f64) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance([center.x, center.y], radius * radius)
            .map(|e| e.data)
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
