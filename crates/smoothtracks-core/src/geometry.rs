use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::layer::LayerId;
use crate::topology::IslandId;

/// Absolute distance below which two positions are treated as the same.
pub const EPSILON: f64 = 1e-4;

/// Coordinates are snapped to this many steps per board unit.
const GRID_STEPS: f64 = 1e5;

/// A 2D point (or vector) in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length_sq(&self) -> f64 {
        self.dot(*self)
    }

    pub fn length(&self) -> f64 {
        self.length_sq().sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalize(&self) -> Point {
        let len = self.length();
        if len < f64::EPSILON {
            return Point::ZERO;
        }
        *self * (1.0 / len)
    }

    /// Rotated a quarter turn counter-clockwise.
    pub fn perp(&self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (*self - *other).length()
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        (*self - *other).length_sq()
    }

    /// Round onto the coordinate grid used for adjacency.
    pub fn snapped(&self) -> Point {
        Point::new(
            (self.x * GRID_STEPS).round() / GRID_STEPS,
            (self.y * GRID_STEPS).round() / GRID_STEPS,
        )
    }

    /// The adjacency key of this point. Two endpoints are "the same" iff their keys match.
    pub fn key(&self) -> PointKey {
        PointKey(
            (self.x * GRID_STEPS).round() as i64,
            (self.y * GRID_STEPS).round() as i64,
        )
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Quantized coordinate used as a hash/ordering key for endpoint adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointKey(pub i64, pub i64);

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BBox::new(*first, *first);
        for p in &points[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    /// A square box of half-size `radius` around `center`.
    pub fn around(center: Point, radius: f64) -> Self {
        Self {
            min: Point::new(center.x - radius, center.y - radius),
            max: Point::new(center.x + radius, center.y + radius),
        }
    }

    pub fn expand(&self, amount: f64) -> Self {
        Self {
            min: Point::new(self.min.x - amount, self.min.y - amount),
            max: Point::new(self.max.x + amount, self.max.y + amount),
        }
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// Whether a projection onto a segment is clamped to its physical ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    Bounded,
    Unbounded,
}

/// A straight piece of copper track between two points.
///
/// The unit direction and length are derived from the endpoints and recomputed whenever an
/// endpoint moves. A segment shorter than [`EPSILON`] keeps its last valid direction and is
/// reported as degenerate; the topology passes drop such segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    start: Point,
    end: Point,
    dir: Point,
    length: f64,
    pub width: f64,
    pub layer: LayerId,
    pub net: String,
    /// Index of the record this segment was loaded from.
    pub source: Option<usize>,
    /// Shape id of the originating record.
    pub id: String,
    pub locked: bool,
    #[serde(skip)]
    pub island: Option<IslandId>,
}

impl Segment {
    pub fn new(start: Point, end: Point, width: f64, layer: LayerId, net: &str) -> Self {
        let mut segment = Self {
            start,
            end,
            dir: Point::ZERO,
            length: 0.0,
            width,
            layer,
            net: net.to_string(),
            source: None,
            id: String::new(),
            locked: false,
            island: None,
        };
        segment.update();
        segment
    }

    pub fn with_source(mut self, source: usize, id: &str) -> Self {
        self.source = Some(source);
        self.id = id.to_string();
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn dir(&self) -> Point {
        self.dir
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_degenerate(&self) -> bool {
        self.length < EPSILON
    }

    /// Recompute length and direction. Returns false if the segment became degenerate.
    fn update(&mut self) -> bool {
        let d = self.end - self.start;
        self.length = d.length();
        if self.length < EPSILON {
            return false;
        }
        self.dir = d * (1.0 / self.length);
        true
    }

    pub fn set_start(&mut self, p: Point) -> bool {
        self.start = p;
        self.update()
    }

    pub fn set_end(&mut self, p: Point) -> bool {
        self.end = p;
        self.update()
    }

    pub fn set_endpoints(&mut self, start: Point, end: Point) -> bool {
        self.start = start;
        self.end = end;
        self.update()
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        self.dir = -self.dir;
    }

    /// Perpendicular offset (to the left of the direction) of half of `w`.
    pub fn vec_to_edge(&self, w: f64) -> Point {
        Point::new(-self.dir.y * w * 0.5, self.dir.x * w * 0.5)
    }

    pub fn point_on_line(&self, d: f64) -> Point {
        self.start + self.dir * d
    }

    pub fn projected_length(&self, p: Point, extent: Extent) -> f64 {
        let d = self.dir.dot(p - self.start);
        match extent {
            Extent::Bounded => d.clamp(0.0, self.length),
            Extent::Unbounded => d,
        }
    }

    pub fn closest_point(&self, p: Point, extent: Extent) -> Point {
        self.point_on_line(self.projected_length(p, extent))
    }

    /// Distance from `p` to the segment (or its supporting line when unbounded).
    /// A degenerate segment has no direction and is infinitely far from everything.
    pub fn distance_to(&self, p: Point, extent: Extent) -> f64 {
        if self.is_degenerate() {
            return f64::INFINITY;
        }
        p.distance_to(&self.closest_point(p, extent))
    }

    /// Distance from `p` to the nearer endpoint.
    pub fn distance_from_end(&self, p: Point) -> f64 {
        p.distance_to(&self.start).min(p.distance_to(&self.end))
    }

    /// Split at `p`: this segment now ends at `p` and the returned sibling spans `[p, old end]`.
    pub fn split(&mut self, p: Point) -> Segment {
        let mut sibling = self.clone();
        sibling.set_start(p);
        self.set_end(p);
        sibling
    }

    pub fn bbox(&self, expand: f64) -> BBox {
        BBox::new(
            Point::new(self.start.x.min(self.end.x), self.start.y.min(self.end.y)),
            Point::new(self.start.x.max(self.end.x), self.start.y.max(self.end.y)),
        )
        .expand(self.width * 0.5 + expand)
    }

    /// True when any endpoint of `self` has the same key as an endpoint of `other`.
    pub fn shares_endpoint(&self, other: &Segment) -> bool {
        let (a, b) = (self.start.key(), self.end.key());
        let (c, d) = (other.start.key(), other.end.key());
        a == c || a == d || b == c || b == d
    }
}

/// Intersection of the lines through `t0` and `t1`.
///
/// With `bound0`/`bound1` set, the hit must lie within the respective segment (parametric
/// slack of [`EPSILON`]). Nearly parallel lines never intersect.
pub fn intersect(t0: &Segment, t1: &Segment, bound0: bool, bound1: bool) -> Option<Point> {
    let t1perp = Point::new(t1.end.y - t1.start.y, t1.start.x - t1.end.x);
    let t0vec = t0.end - t0.start;
    let t0proj = t0vec.dot(t1perp);
    if t0proj.abs() < EPSILON {
        return None;
    }
    let t0perp = Point::new(t0.end.y - t0.start.y, t0.start.x - t0.end.x);
    let t0t1 = t1.start - t0.start;
    let d1 = t0t1.dot(t1perp) / t0proj;
    if bound0 && !(-EPSILON..=1.0 + EPSILON).contains(&d1) {
        return None;
    }
    if bound1 {
        let d2 = t0t1.dot(t0perp) / t0proj;
        if !(-EPSILON..=1.0 + EPSILON).contains(&d2) {
            return None;
        }
    }
    Some(t0.start + t0vec * d1)
}

pub fn is_parallel(t: &Segment, t2: &Segment) -> bool {
    t.dir.dot(t2.dir).abs() > 0.9999
}

pub fn is_colinear(t: &Segment, t2: &Segment) -> bool {
    let ds = t2.start - t.start;
    let de = t2.end - t.start;
    ds.cross(de).abs() < EPSILON
}

/// A plated hole (via, or a through-hole pad) that tracks can terminate in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub position: Point,
    pub diameter: f64,
    pub hole_radius: f64,
    pub id: String,
}

impl Via {
    pub fn new(position: Point, diameter: f64, hole_radius: f64, id: &str) -> Self {
        Self {
            position,
            diameter,
            hole_radius,
            id: id.to_string(),
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter * 0.5
    }

    pub fn contains(&self, p: Point) -> bool {
        let r = self.radius();
        p.distance_sq(&self.position) < r * r
    }
}
