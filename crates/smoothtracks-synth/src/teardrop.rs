//! Teardrops where tracks enter vias and through-hole pads.
//!
//! For every track with exactly one endpoint inside a via, a polygon is grown from the via rim
//! back along the track: the sharp end sits `length_percent` of the via diameter out along the
//! track (possibly continuing onto chained tracks), and the wide end spans `width_percent` of the
//! via diameter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use smoothtracks_core::board::GroupKey;
use smoothtracks_core::geometry::{Point, PointKey, Segment, Via, EPSILON};
use smoothtracks_core::spatial::PointIndex;

use crate::shape::{Outline, SynthShape};

/// Tracks at least this fraction of the via diameter wide get no teardrop.
const MAX_WIDTH_RATIO: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeardropParams {
    /// Teardrop length as a percentage of the via diameter.
    pub length_percent: f64,
    /// Teardrop width at the via as a percentage of the via diameter.
    pub width_percent: f64,
    /// Points per curved leg; two or fewer gives straight legs.
    pub segments: usize,
    /// How many chained tracks the walk may continue onto when the first is too short.
    pub max_chain: usize,
}

impl Default for TeardropParams {
    fn default() -> Self {
        Self {
            length_percent: 50.0,
            width_percent: 90.0,
            segments: 10,
            max_chain: 1,
        }
    }
}

/// The five control points of a teardrop: A and B at the sharp end on either side of the track,
/// C and E on the via rim, D behind the via centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeardropPoints {
    pub a: Point,
    pub b: Point,
    pub c: Point,
    pub d: Point,
    pub e: Point,
    /// Direction of the track at the sharp end, pointing away from the via.
    pub track_dir: Point,
    /// Width percentage after any shrinking for a short walk.
    pub width_percent: f64,
}

type EndpointLookup = BTreeMap<PointKey, Vec<usize>>;

/// Teardrops for every via/track pair of one group.
pub fn teardrops_for_group(
    segments: &[Segment],
    vias: &[Via],
    key: &GroupKey,
    params: &TeardropParams,
) -> Vec<SynthShape> {
    if segments.is_empty() || vias.is_empty() {
        return Vec::new();
    }
    let lookup = endpoint_lookup(segments);
    let index = PointIndex::from_endpoints(segments);

    let mut shapes = Vec::new();
    for via in vias {
        for i in index.within_radius(via.position, via.radius()) {
            let track = &segments[i];
            if track.is_degenerate() || track.width >= via.diameter * MAX_WIDTH_RATIO {
                continue;
            }
            if via.contains(track.start()) == via.contains(track.end()) {
                continue;
            }
            let points = compute_points(segments, i, via, params, &lookup);
            shapes.push(SynthShape::Region {
                layer: key.layer,
                net: key.net.clone(),
                outline: Outline::Polygon(teardrop_outline(&points, via, track.width, params.segments)),
                teardrop: true,
            });
        }
    }
    log::debug!(
        "{} on layer {}: {} teardrops at {} vias",
        key.net,
        key.layer,
        shapes.len(),
        vias.len()
    );
    shapes
}

fn endpoint_lookup(segments: &[Segment]) -> EndpointLookup {
    let mut lookup: EndpointLookup = BTreeMap::new();
    for (i, s) in segments.iter().enumerate().filter(|(_, s)| !s.is_degenerate()) {
        lookup.entry(s.start().key()).or_default().push(i);
        lookup.entry(s.end().key()).or_default().push(i);
    }
    lookup
}

/// The other track at `end` when `current` and at most one other track meet there.
fn touching_track(current: usize, end: Point, lookup: &EndpointLookup) -> Option<usize> {
    let touching = lookup.get(&end.key())?;
    if touching.len() > 2 || !touching.contains(&current) {
        return None;
    }
    touching.iter().copied().find(|t| *t != current)
}

/// Walk out from the via along track `first` and place the teardrop's control points.
pub fn compute_points(
    segments: &[Segment],
    first: usize,
    via: &Via,
    params: &TeardropParams,
    lookup: &BTreeMap<PointKey, Vec<usize>>,
) -> TeardropPoints {
    let pos = via.position;
    let radius = via.radius();
    let radius_sq = radius * radius;
    let track = &segments[first];
    let w = track.width * 0.5;
    let mut width_percent = params.width_percent.min(100.0);

    let (mut start, mut end) = if track.start().distance_sq(&pos) > track.end().distance_sq(&pos) {
        (track.end(), track.start())
    } else {
        (track.start(), track.end())
    };

    let target = via.diameter * params.length_percent / 100.0;
    let mut walked = 0.0;
    let mut tear_dir = (start - pos).normalize();
    let mut track_dir = (end - start).normalize();
    let mut pos_on_track = 0.0;
    let mut current = first;
    let mut crossings = 0;

    loop {
        let d = end - start;
        let a = d.dot(d);
        let mut track_len = a.sqrt();
        if track_len < EPSILON {
            break;
        }
        track_dir = d * (1.0 / track_len);

        if end.distance_sq(&pos) >= radius_sq {
            let f = start - pos;
            let c = f.dot(f) - radius_sq;
            if walked == 0.0 && c < 0.0 {
                // move the inside end out to the via rim
                let b = 2.0 * f.dot(d);
                let t = ((b * b - 4.0 * a * c).sqrt() - b) / (2.0 * a);
                start = start + d * t;
                track_len = start.distance_to(&end);
                tear_dir = (start - pos).normalize();
            }
            pos_on_track = track_len.min(target - walked);
            walked += pos_on_track;
            if walked >= target {
                break;
            }
        } else {
            pos_on_track = track_len;
        }

        if crossings >= params.max_chain {
            break;
        }
        let Some(next) = touching_track(current, end, lookup) else {
            break;
        };
        let next_track = &segments[next];
        if next_track.width != segments[current].width {
            break;
        }
        crossings += 1;
        current = next;
        (start, end) = if end.distance_to(&next_track.start()) > end.distance_to(&next_track.end()) {
            (next_track.end(), next_track.start())
        } else {
            (next_track.start(), next_track.end())
        };
    }

    // a short walk narrows the teardrop toward the track width
    if walked < target {
        let min_percent = 100.0 * w / radius;
        let ratio = walked / target;
        width_percent = (width_percent * ratio + min_percent * (1.0 - ratio)).min(100.0);
    }

    let sharp = start + track_dir * pos_on_track;
    let a = sharp + Point::new(-track_dir.y * w, track_dir.x * w);
    let b = sharp + Point::new(track_dir.y * w, -track_dir.x * w);

    let s = radius * width_percent / 100.0;
    let c = (radius_sq - s * s).max(0.0).sqrt();
    let point_c = pos + Point::new(tear_dir.x * c + tear_dir.y * s, -tear_dir.x * s + tear_dir.y * c);
    let point_e = pos + Point::new(tear_dir.x * c - tear_dir.y * s, tear_dir.x * s + tear_dir.y * c);
    let point_d = pos - tear_dir * (radius * 0.5);

    TeardropPoints {
        a,
        b,
        c: point_c,
        d: point_d,
        e: point_e,
        track_dir,
        width_percent,
    }
}

/// The closed teardrop polygon. With more than two points per leg, B→C and E→A become cubic
/// Beziers whose via-side tangents follow the rim.
pub fn teardrop_outline(points: &TeardropPoints, via: &Via, track_width: f64, segs: usize) -> Vec<Point> {
    let TeardropPoints { a, b, c, d, e, .. } = *points;
    if segs <= 2 {
        return vec![a, b, c, d, e];
    }

    let radius = via.radius();
    let min_percent = track_width / via.diameter;
    let weaken = if 1.0 - min_percent <= f64::EPSILON {
        0.0
    } else {
        (points.width_percent / 100.0 - min_percent) / (1.0 - min_percent) / radius
    };

    let bias_bc = 0.5 * b.distance_to(&c);
    let bias_ae = 0.5 * e.distance_to(&a);

    let vec_c = c - via.position;
    let tangent_c = c + Point::new(-vec_c.y, vec_c.x) * (bias_bc * weaken);
    let vec_e = e - via.position;
    let tangent_e = e + Point::new(vec_e.y, -vec_e.x) * (bias_ae * weaken);
    let tangent_b = b - points.track_dir * bias_bc;
    let tangent_a = a - points.track_dir * bias_ae;

    let mut outline = bezier(b, tangent_b, tangent_c, c, segs);
    outline.push(d);
    outline.extend(bezier(e, tangent_e, tangent_a, a, segs));
    outline
}

/// `n` points along the cubic Bezier `p1 p2 p3 p4` at even parameter steps, by forward
/// differencing. The last point is exactly `p4`.
pub fn bezier(p1: Point, p2: Point, p3: Point, p4: Point, n: usize) -> Vec<Point> {
    if n < 2 {
        return vec![p1, p4];
    }
    let h = 1.0 / (n - 1) as f64;
    let mut d0 = (p2 - p1) * (h * 3.0);
    let mut d1 = (p1 - p2 * 2.0 + p3) * (h * h * 6.0);
    let d2 = ((p2 - p3) * 3.0 + p4 - p1) * (h * h * h);

    let mut points = Vec::with_capacity(n);
    let mut p = p1;
    points.push(p);
    for _ in 1..n - 1 {
        p = p + d0 + d1 * 0.5 + d2;
        d0 = d0 + d1 + d2 * 3.0;
        d1 = d1 + d2 * 6.0;
        points.push(p);
    }
    points.push(p4);
    points
}
