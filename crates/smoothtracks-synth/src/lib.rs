//! # SmoothTracks Synth
//!
//! Shape synthesis over a cleaned board: fillets on the inside corners of each group's copper
//! outline, teardrops where tracks enter vias and pads, and the pipeline that runs cleanup,
//! rounding, write-back and both synthesizers in order.
//!
//! Polygon booleans sit behind [`PolygonBoolean`]; the default implementation uses
//! `cavalier_contours`.

pub mod boolean;
pub mod fillet;
pub mod params;
pub mod pipeline;
pub mod shape;
pub mod teardrop;

pub use boolean::{CavalierBoolean, Contour, ContourVertex, PolygonBoolean, Region};
pub use fillet::{fillet_group, FilletMode, FilletParams};
pub use params::{RoundingParams, SmoothingParams};
pub use pipeline::{smooth_board, NoRounding, RoundingPass, SmoothingReport, Smoother};
pub use shape::{ArcPath, Outline, SynthShape, TEARDROP_FLAG};
pub use teardrop::{teardrops_for_group, TeardropParams};
