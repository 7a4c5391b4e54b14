//! Fillets for the inside corners of a group's copper outline.
//!
//! The group's tracks are stroked into one region, widest class first, so each outline vertex
//! knows the narrowest track that produced it. Every concave corner between two long enough
//! straight edges gets a circular fillet, either as an arc track hugging the corner or as a
//! closed solid region.

use std::collections::BTreeMap;

use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};

use smoothtracks_core::board::GroupKey;
use smoothtracks_core::geometry::{Point, PointKey, Segment};
use smoothtracks_core::topology::make_polylines;

use crate::boolean::{Contour, PolygonBoolean, Region};
use crate::shape::{ArcPath, Outline, SynthShape};

/// Corners must turn at least this much more than `min_angle`.
const ANGLE_MARGIN_DEG: f64 = 2.0;

// ── Parameters ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilletMode {
    /// An arc track of the corner's width, offset so its outer edge meets both copper edges.
    #[default]
    Arc,
    /// A solid region bounded by the fillet arc and the corner point.
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilletParams {
    /// Degrees.
    pub min_angle: f64,
    pub min_length: f64,
    pub mode: FilletMode,
}

impl Default for FilletParams {
    fn default() -> Self {
        Self {
            min_angle: 5.0,
            min_length: 2.5,
            mode: FilletMode::Arc,
        }
    }
}

impl FilletParams {
    pub fn with_mode(mut self, mode: FilletMode) -> Self {
        self.mode = mode;
        self
    }
}

// ── Copper outline ────────────────────────────────────────────────────

/// Track width claimed by each outline vertex.
#[derive(Debug, Clone, Default)]
pub struct WidthMap {
    widths: BTreeMap<PointKey, (Point, f64)>,
    index: RTree<GeomWithData<[f64; 2], PointKey>>,
}

impl WidthMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every vertex of `region` for `width`, replacing earlier claims.
    pub fn record(&mut self, region: &Region, width: f64) {
        for contour in region.contours() {
            for v in &contour.vertices {
                self.insert(v.point, width);
            }
        }
    }

    pub fn insert(&mut self, point: Point, width: f64) {
        let key = point.key();
        if let Some((old, _)) = self.widths.insert(key, (point, width)) {
            self.index.remove(&GeomWithData::new([old.x, old.y], key));
        }
        self.index.insert(GeomWithData::new([point.x, point.y], key));
    }

    /// The width claimed at `p`, or at the nearest claimed vertex when `p` was never recorded.
    pub fn width_at(&self, p: Point) -> Option<f64> {
        if let Some((_, w)) = self.widths.get(&p.key()) {
            return Some(*w);
        }
        let nearest = self.index.nearest_neighbor(&[p.x, p.y])?;
        self.widths.get(&nearest.data).map(|(_, w)| *w)
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

/// Stroke the group into one region. Wider classes are laid down first; each narrower class only
/// contributes the area the wider ones do not already cover, so its width wins at those vertices.
pub fn build_copper<B: PolygonBoolean>(segments: &[Segment], boolean: &B) -> (Region, WidthMap) {
    let mut classes: Vec<f64> = segments.iter().map(|s| s.width).filter(|w| *w > 0.0).collect();
    classes.sort_by(|a, b| b.total_cmp(a));
    classes.dedup();

    let mut combined = Region::default();
    let mut widths = WidthMap::new();

    for width in classes {
        let indices: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.width == width && !s.is_degenerate())
            .map(|(i, _)| i)
            .collect();

        let mut strokes = Region::default();
        for polyline in make_polylines(segments, &indices) {
            let stroke = boolean.stroke(&polyline.points, width * 0.5);
            strokes = boolean.union(&strokes, &stroke);
        }

        let remainder = if combined.is_empty() {
            strokes
        } else {
            boolean.subtract(&strokes, &combined)
        };
        widths.record(&remainder, width);
        combined = boolean.union(&combined, &remainder);
    }

    (combined, widths)
}

// ── Corners ───────────────────────────────────────────────────────────

/// A concave outline corner chosen for a fillet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilletCorner {
    pub corner: Point,
    pub prev: Point,
    pub next: Point,
    /// Distance from the corner to each tangent point.
    pub length: f64,
    /// Track width claimed at the corner.
    pub width: f64,
}

impl FilletCorner {
    /// The fillet arc. In arc mode the tangent points move `width / 2` into the copper and the
    /// radius grows by the same amount, so the arc track's outer edge is the true fillet.
    pub fn arc(&self, mode: FilletMode) -> ArcPath {
        let l0 = Segment::new(self.corner, self.prev, self.width, 0, "");
        let l1 = Segment::new(self.corner, self.next, self.width, 0, "");

        let cos2t = 0.5 + 0.5 * l0.dir().dot(l1.dir());
        let mut radius = self.length * (1.0 / cos2t - 1.0).max(0.0).sqrt();

        let (from, to) = match mode {
            FilletMode::Arc => {
                radius += self.width * 0.5;
                (
                    l0.point_on_line(self.length) + l0.vec_to_edge(-self.width),
                    l1.point_on_line(self.length) + l1.vec_to_edge(self.width),
                )
            }
            FilletMode::Fill => (l0.point_on_line(self.length), l1.point_on_line(self.length)),
        };

        ArcPath { from, to, radius }
    }
}

/// Fillet length for a corner with incoming edge `e_in` and outgoing edge `e_out`, or `None`
/// when the corner is convex, too shallow or sits between edges too short to round.
pub fn corner_fillet_length(e_in: Point, e_out: Point, half_width: f64, params: &FilletParams) -> Option<f64> {
    if e_in.cross(e_out) >= 0.0 {
        return None;
    }

    let l0sq = e_in.length_sq();
    let l1sq = e_out.length_sq();
    let min2_length_sq = 4.0 * params.min_length * params.min_length;
    if l0sq < min2_length_sq || l1sq < min2_length_sq {
        return None;
    }

    let dot = e_in.dot(e_out);
    let max_cos = (params.min_angle + ANGLE_MARGIN_DEG).to_radians().cos();
    if dot * dot >= max_cos * max_cos * l0sq * l1sq {
        return None;
    }

    let (l0, l1) = (l0sq.sqrt(), l1sq.sqrt());
    let shortest = l0.min(l1);
    // A short edge must still leave room for subdivision to shorten it.
    if shortest < 4.0 * params.min_length {
        let cos_half_theta = (0.5 + 0.5 * (dot / (l0 * l1)).abs()).sqrt();
        if shortest / (2.0 * cos_half_theta + 2.0) < params.min_length {
            return None;
        }
    }

    Some((l0 * 0.5).min(l1 * 0.5).min(0.5 + half_width * 0.5))
}

/// Pick the filleted corners of one closed contour.
pub fn fillet_contour(contour: &Contour, widths: &WidthMap, params: &FilletParams) -> Vec<FilletCorner> {
    let n = contour.len();
    if n < 3 {
        return Vec::new();
    }
    let vertex = |i: usize| contour.vertices[i % n];

    let mut lengths = vec![0.0; n];
    let mut corner_widths = vec![0.0; n];
    for i in 0..n {
        let prev = vertex(i + n - 1);
        let here = vertex(i);
        let next = vertex(i + 1);
        if !prev.is_straight() || !here.is_straight() {
            continue;
        }
        let Some(width) = widths.width_at(here.point) else {
            continue;
        };
        let e_in = here.point - prev.point;
        let e_out = next.point - here.point;
        if let Some(length) = corner_fillet_length(e_in, e_out, width * 0.5, params) {
            lengths[i] = length;
            corner_widths[i] = width;
        }
    }

    let edge_lengths: Vec<f64> = (0..n)
        .map(|i| vertex(i).point.distance_to(&vertex(i + n - 1).point))
        .collect();
    shrink_overlapping(&mut lengths, &edge_lengths);

    (0..n)
        .filter(|i| lengths[*i] > 0.0)
        .map(|i| FilletCorner {
            corner: vertex(i).point,
            prev: vertex(i + n - 1).point,
            next: vertex(i + 1).point,
            length: lengths[i],
            width: corner_widths[i],
        })
        .collect()
}

/// Two fillets on the same edge that would overlap are moved to meet halfway between their
/// tangent points. `edge_lengths[i]` is the length of the edge ending at vertex `i`.
pub fn shrink_overlapping(lengths: &mut [f64], edge_lengths: &[f64]) {
    let n = lengths.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let prev = (i + n - 1) % n;
        let (f0, f1) = (lengths[prev], lengths[i]);
        if f0 <= 0.0 || f1 <= 0.0 {
            continue;
        }
        let len = edge_lengths[i];
        if f0 + f1 > len {
            lengths[prev] = (f0 + len - f1) * 0.5;
            lengths[i] = len - lengths[prev];
        }
    }
}

// ── Group entry point ─────────────────────────────────────────────────

/// Fillet every eligible corner of a group's copper outline.
pub fn fillet_group<B: PolygonBoolean>(
    segments: &[Segment],
    key: &GroupKey,
    params: &FilletParams,
    boolean: &B,
) -> Vec<SynthShape> {
    let (copper, widths) = build_copper(segments, boolean);
    let shapes: Vec<SynthShape> = copper
        .contours()
        .flat_map(|contour| fillet_contour(contour, &widths, params))
        .map(|corner| corner_shape(&corner, key, params.mode))
        .collect();
    log::debug!(
        "{} on layer {}: {} fillets from {} outline contours",
        key.net,
        key.layer,
        shapes.len(),
        copper.outer.len() + copper.holes.len()
    );
    shapes
}

fn corner_shape(corner: &FilletCorner, key: &GroupKey, mode: FilletMode) -> SynthShape {
    let arc = corner.arc(mode);
    match mode {
        FilletMode::Arc => SynthShape::Arc {
            layer: key.layer,
            net: key.net.clone(),
            width: corner.width,
            arc,
        },
        FilletMode::Fill => SynthShape::Region {
            layer: key.layer,
            net: key.net.clone(),
            outline: Outline::Fillet {
                arc,
                corner: corner.corner,
            },
            // flagged like teardrops so a rerun replaces them
            teardrop: true,
        },
    }
}
