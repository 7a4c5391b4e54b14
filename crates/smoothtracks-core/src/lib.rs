//! # SmoothTracks Core
//!
//! Track-geometry engine for PCB copper layouts: segment primitives, R-tree spatial
//! indexing, the topology engine (colinear merge, intersection splitting, islands),
//! typed board records and the board model that ties them together.

pub mod geometry;
pub mod layer;
pub mod spatial;
pub mod topology;
pub mod record;
pub mod board;

pub use board::{Board, GroupKey, ShapeIds, TrackGroup};
pub use geometry::{BBox, Extent, Point, PointKey, Segment, Via, EPSILON};
pub use layer::{Layer, LayerId, SignalLayers};
pub use record::Record;
pub use topology::{cleanup_group, make_polylines, IslandArena, IslandId, Polyline};
