//! Polygon boolean capability used by the fillet synthesizer.
//!
//! [`PolygonBoolean`] is the seam; [`CavalierBoolean`] implements it over
//! `cavalier_contours` polylines, whose edges may be straight or circular arcs (bulges).

use cavalier_contours::polyline::{
    BooleanOp, BooleanResultInfo, PlineOrientation, PlineSource, PlineSourceMut, PlineVertex, Polyline,
};

use smoothtracks_core::geometry::{Point, EPSILON};

// ── Regions ───────────────────────────────────────────────────────────

/// A contour vertex; `bulge` describes the edge leaving it (0 for straight, tan(sweep/4) for arcs).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourVertex {
    pub point: Point,
    pub bulge: f64,
}

impl ContourVertex {
    pub fn new(point: Point, bulge: f64) -> Self {
        Self { point, bulge }
    }

    pub fn is_straight(&self) -> bool {
        self.bulge.abs() < 1e-12
    }
}

/// A closed boundary loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    pub vertices: Vec<ContourVertex>,
}

impl Contour {
    /// A polygon with straight edges only.
    pub fn from_points(points: &[Point]) -> Self {
        Self {
            vertices: points.iter().map(|p| ContourVertex::new(*p, 0.0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Signed area of the straight-edge polygon through the vertices (positive when CCW).
    pub fn chord_area(&self) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let a = self.vertices[i].point;
                let b = self.vertices[(i + 1) % n].point;
                a.cross(b)
            })
            .sum::<f64>()
            * 0.5
    }
}

/// Filled area: outer contours counter-clockwise, holes clockwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub outer: Vec<Contour>,
    pub holes: Vec<Contour>,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.outer.is_empty()
    }

    /// Every boundary loop, outers first.
    pub fn contours(&self) -> impl Iterator<Item = &Contour> {
        self.outer.iter().chain(self.holes.iter())
    }
}

/// Boolean operations on regions, plus stroking of polylines into regions.
pub trait PolygonBoolean {
    /// The area swept by a disc of radius `half_width` along the polyline (round joins and caps).
    fn stroke(&self, points: &[Point], half_width: f64) -> Region;

    fn union(&self, a: &Region, b: &Region) -> Region;

    fn subtract(&self, a: &Region, b: &Region) -> Region;
}

// ── cavalier_contours adapter ─────────────────────────────────────────

type Pline = Polyline<f64>;

#[derive(Debug, Clone, Copy, Default)]
pub struct CavalierBoolean;

impl CavalierBoolean {
    pub fn new() -> Self {
        Self
    }
}

impl PolygonBoolean for CavalierBoolean {
    fn stroke(&self, points: &[Point], half_width: f64) -> Region {
        if half_width <= 0.0 || points.is_empty() {
            return Region::default();
        }
        let mut capsules: Vec<Pline> = points
            .windows(2)
            .filter(|pair| pair[0].distance_to(&pair[1]) >= EPSILON)
            .map(|pair| capsule(pair[0], pair[1], half_width))
            .collect();
        if capsules.is_empty() {
            capsules.push(circle(points[0], half_width));
        }
        let (pos, neg) = union_pline_set_with_holes(capsules);
        to_region(pos, neg)
    }

    fn union(&self, a: &Region, b: &Region) -> Region {
        let outers: Vec<Pline> = a.outer.iter().chain(&b.outer).map(to_pline).collect();
        let (pos, mut neg) = union_pline_set_with_holes(outers);

        // Holes survive only where the other operand does not fill them.
        let b_outer: Vec<Pline> = b.outer.iter().map(to_pline).collect();
        let a_outer: Vec<Pline> = a.outer.iter().map(to_pline).collect();
        neg.extend(subtract_pline_set(a.holes.iter().map(to_pline).collect(), &b_outer).0);
        neg.extend(subtract_pline_set(b.holes.iter().map(to_pline).collect(), &a_outer).0);

        to_region(pos, union_pline_set(neg))
    }

    fn subtract(&self, a: &Region, b: &Region) -> Region {
        let cutters: Vec<Pline> = b.outer.iter().map(to_pline).collect();
        let a_holes: Vec<Pline> = a.holes.iter().map(to_pline).collect();
        let (pos, mut neg) = subtract_pline_set(a.outer.iter().map(to_pline).collect(), &cutters);
        neg.extend(a_holes.iter().cloned());
        let mut outer = union_pline_set(pos);
        let mut holes = union_pline_set(neg);

        // Whatever of `a` lies inside a hole of `b` was never cut. These islands sit inside a
        // hole of the result, so they stay out of the unions above, and `a`'s own holes still
        // apply to them.
        let mut islands: Vec<Pline> = Vec::new();
        for hole in &b.holes {
            let hole = to_pline(hole);
            for a_outer in &a.outer {
                let res = to_pline(a_outer).boolean(&hole, BooleanOp::And);
                islands.extend(res.pos_plines.into_iter().map(|p| simplify(p.pline)));
            }
        }
        let (islands, island_holes) = subtract_pline_set(islands, &a_holes);
        outer.extend(islands);
        holes.extend(island_holes);

        to_region(outer, holes)
    }
}

/// A segment stroked with round caps, counter-clockwise.
fn capsule(p0: Point, p1: Point, half_width: f64) -> Pline {
    let n = (p1 - p0).normalize().perp() * half_width;
    let corners = [(p0 - n, 0.0), (p1 - n, 1.0), (p1 + n, 0.0), (p0 + n, 1.0)];
    let mut pl = Polyline::new_closed();
    for (p, bulge) in corners {
        pl.vertex_data.push(PlineVertex::new(p.x, p.y, bulge));
    }
    pl
}

fn circle(center: Point, radius: f64) -> Pline {
    let mut pl = Polyline::new_closed();
    pl.vertex_data.push(PlineVertex::new(center.x - radius, center.y, 1.0));
    pl.vertex_data.push(PlineVertex::new(center.x + radius, center.y, 1.0));
    pl
}

fn to_pline(contour: &Contour) -> Pline {
    let mut pl = Polyline::new_closed();
    for v in &contour.vertices {
        pl.vertex_data.push(PlineVertex::new(v.point.x, v.point.y, v.bulge));
    }
    orient(pl, PlineOrientation::CounterClockwise)
}

fn to_contour(pl: &Pline) -> Contour {
    Contour {
        vertices: pl
            .vertex_data
            .iter()
            .map(|v| ContourVertex::new(Point::new(v.x, v.y), v.bulge))
            .collect(),
    }
}

fn to_region(pos: Vec<Pline>, neg: Vec<Pline>) -> Region {
    Region {
        outer: pos
            .into_iter()
            .map(|pl| to_contour(&orient(pl, PlineOrientation::CounterClockwise)))
            .collect(),
        holes: neg
            .into_iter()
            .map(|pl| to_contour(&orient(pl, PlineOrientation::Clockwise)))
            .collect(),
    }
}

fn orient(mut pl: Pline, desired: PlineOrientation) -> Pline {
    let orientation = pl.orientation();
    if orientation != PlineOrientation::Open && orientation != desired {
        pl.invert_direction_mut();
    }
    pl
}

fn simplify(pl: Pline) -> Pline {
    pl.remove_redundant(1e-6).unwrap_or(pl)
}

fn usable(pl: &Pline) -> bool {
    pl.is_closed() && pl.vertex_count() >= 2
}

/// Pairwise union until no two polylines overlap. Holes produced along the way are returned
/// separately, themselves merged.
fn union_pline_set_with_holes(plines: Vec<Pline>) -> (Vec<Pline>, Vec<Pline>) {
    let mut holes = Vec::new();
    let pos = merge_overlapping(plines, Some(&mut holes));
    (pos, union_pline_set(holes))
}

fn union_pline_set(plines: Vec<Pline>) -> Vec<Pline> {
    merge_overlapping(plines, None)
}

fn merge_overlapping(plines: Vec<Pline>, mut holes: Option<&mut Vec<Pline>>) -> Vec<Pline> {
    let mut plines: Vec<Pline> = plines.into_iter().filter(usable).map(simplify).collect();

    let mut i = 0usize;
    while i < plines.len() {
        let mut merged = false;
        let mut j = i + 1;
        while j < plines.len() {
            let res = plines[i].boolean(&plines[j], BooleanOp::Or);
            match res.result_info {
                BooleanResultInfo::Disjoint | BooleanResultInfo::InvalidInput => {
                    j += 1;
                }
                _ => {
                    let mut next: Vec<Pline> = res.pos_plines.into_iter().map(|p| simplify(p.pline)).collect();
                    if let Some(holes) = holes.as_deref_mut() {
                        holes.extend(res.neg_plines.into_iter().map(|p| simplify(p.pline)));
                    }
                    plines.swap_remove(j);
                    plines.swap_remove(i);
                    plines.append(&mut next);
                    merged = true;
                    break;
                }
            }
        }
        if merged {
            i = 0;
        } else {
            i += 1;
        }
    }
    plines
}

/// Cut every cutter out of every subject. Returns the remaining pieces and any holes the cuts
/// opened inside them.
fn subtract_pline_set(subjects: Vec<Pline>, cutters: &[Pline]) -> (Vec<Pline>, Vec<Pline>) {
    let mut out_pos: Vec<Pline> = Vec::new();
    let mut out_neg: Vec<Pline> = Vec::new();

    for subject in subjects.into_iter().filter(usable) {
        let mut cur_pos = vec![subject];
        for cutter in cutters {
            let mut next_pos: Vec<Pline> = Vec::new();
            for piece in cur_pos {
                let res = piece.boolean(cutter, BooleanOp::Not);
                next_pos.extend(res.pos_plines.into_iter().map(|p| simplify(p.pline)));
                out_neg.extend(res.neg_plines.into_iter().map(|p| simplify(p.pline)));
            }
            cur_pos = next_pos;
        }
        out_pos.extend(cur_pos);
    }

    (out_pos, out_neg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Region {
        Region {
            outer: vec![Contour::from_points(&[
                Point::new(x, y),
                Point::new(x + size, y),
                Point::new(x + size, y + size),
                Point::new(x, y + size),
            ])],
            holes: Vec::new(),
        }
    }

    #[test]
    fn test_chord_area_sign() {
        let ccw = Contour::from_points(&[Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(0.0, 2.0)]);
        assert!((ccw.chord_area() - 2.0).abs() < 1e-12);
        let cw = Contour::from_points(&[Point::new(0.0, 0.0), Point::new(0.0, 2.0), Point::new(2.0, 0.0)]);
        assert!(cw.chord_area() < 0.0);
    }

    #[test]
    fn test_capsule_is_counter_clockwise() {
        let pl = capsule(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 2.0);
        assert_eq!(pl.orientation(), PlineOrientation::CounterClockwise);
        assert_eq!(pl.vertex_count(), 4);
    }

    #[test]
    fn test_stroke_disjoint_segments_stay_apart() {
        let boolean = CavalierBoolean::new();
        let a = boolean.stroke(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 1.0);
        let b = boolean.stroke(&[Point::new(0.0, 50.0), Point::new(10.0, 50.0)], 1.0);
        let both = boolean.union(&a, &b);
        assert_eq!(both.outer.len(), 2);
        assert!(both.holes.is_empty());
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        let boolean = CavalierBoolean::new();
        let merged = boolean.union(&square(0.0, 0.0, 10.0), &square(5.0, 5.0, 10.0));
        assert_eq!(merged.outer.len(), 1);
        assert!(merged.outer[0].chord_area() > 0.0);
        assert!((merged.outer[0].chord_area() - 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_subtract_corner() {
        let boolean = CavalierBoolean::new();
        let rest = boolean.subtract(&square(0.0, 0.0, 10.0), &square(5.0, 5.0, 10.0));
        assert_eq!(rest.outer.len(), 1);
        assert!((rest.outer[0].chord_area() - 75.0).abs() < 1e-6);
    }

    #[test]
    fn test_subtract_everything() {
        let boolean = CavalierBoolean::new();
        let rest = boolean.subtract(&square(2.0, 2.0, 2.0), &square(0.0, 0.0, 10.0));
        assert!(rest.is_empty());
    }
    fn square_with_hole(size: f64, hole_at: f64, hole_size: f64) -> Region {
        let mut region = square(0.0, 0.0, size);
        region.holes = square(hole_at, hole_at, hole_size).outer;
        region
    }

    #[test]
    fn test_subtract_ring_keeps_clipped_island() {
        let boolean = CavalierBoolean::new();
        // a plate with a window at 15..25, minus a ring whose opening is 10..20
        let plate = square_with_hole(40.0, 15.0, 10.0);
        let mut ring = square(5.0, 5.0, 30.0);
        ring.holes = square(10.0, 10.0, 10.0).outer;

        let rest = boolean.subtract(&plate, &ring);
        let mut areas: Vec<f64> = rest.outer.iter().map(|c| c.chord_area()).collect();
        areas.sort_by(f64::total_cmp);
        assert_eq!(areas.len(), 2);
        // the opening loses the corner the window overlaps
        assert!((areas[0] - 75.0).abs() < 1e-6, "{areas:?}");
        assert!((areas[1] - 1600.0).abs() < 1e-6, "{areas:?}");
    }

    #[test]
    fn test_subtract_ring_keeps_window_inside_island() {
        let boolean = CavalierBoolean::new();
        let plate = square_with_hole(40.0, 12.0, 2.0);
        let mut ring = square(5.0, 5.0, 30.0);
        ring.holes = square(10.0, 10.0, 10.0).outer;

        let rest = boolean.subtract(&plate, &ring);
        assert_eq!(rest.outer.len(), 2);
        let window = rest
            .holes
            .iter()
            .any(|c| (c.chord_area().abs() - 4.0).abs() < 1e-6);
        assert!(window, "{:?}", rest.holes);
    }
}
