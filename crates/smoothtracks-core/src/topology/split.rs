use std::collections::BTreeMap;

use crate::geometry::{intersect, Extent, Point, PointKey, Segment, EPSILON};
use crate::spatial::SegmentIndex;

/// An intersection closer than this to an endpoint snaps the endpoint instead of splitting.
const MIN_SPLIT_DISTANCE: f64 = 0.1;

/// Resolve T-junctions and crossings between equal-width segments so that every meeting point
/// is a shared endpoint. Degenerate leftovers are dropped.
///
/// Returns the number of endpoint moves plus splits applied.
pub fn split_intersections(segments: &mut Vec<Segment>) -> usize {
    let snapped = snap_t_junctions(segments);
    let split = split_crossings(segments);
    let before = segments.len();
    segments.retain(|s| !s.is_degenerate());
    if segments.len() != before {
        log::debug!("dropped {} degenerate segments", before - segments.len());
    }
    snapped + split
}

/// Extend (or pull back) a segment end that stops just short of, or just past, the body of
/// another segment of the same width. Ends already joined to another segment stay put.
fn snap_t_junctions(segments: &mut [Segment]) -> usize {
    let reach = max_width(segments) + EPSILON;
    let index = SegmentIndex::build(segments, reach);
    let mut degree = endpoint_degrees(segments);
    let mut moves = 0;

    for j in 0..segments.len() {
        for i in index.query_box(&segments[j].bbox(reach)) {
            if i == j {
                continue;
            }
            let (t, t2) = (&segments[i], &segments[j]);
            if t.width != t2.width || t.is_degenerate() || t2.is_degenerate() {
                continue;
            }
            if t.shares_endpoint(t2) {
                continue;
            }
            let Some(ip) = intersect(t, t2, false, true) else {
                continue;
            };
            let d2 = t2.projected_length(ip, Extent::Unbounded);
            if d2 <= 0.0 || d2 >= t2.length() {
                continue;
            }
            let d = t.projected_length(ip, Extent::Unbounded);
            let half = t2.width * 0.5;
            let t = &mut segments[i];
            if d > -half && d < -EPSILON {
                if is_joined(&degree, t.start()) {
                    continue;
                }
                rekey(&mut degree, t.start(), ip);
                t.set_start(ip);
                moves += 1;
            } else if d > t.length() + EPSILON && d < t.length() + half {
                if is_joined(&degree, t.end()) {
                    continue;
                }
                rekey(&mut degree, t.end(), ip);
                t.set_end(ip);
                moves += 1;
            }
        }
    }
    moves
}

fn endpoint_degrees(segments: &[Segment]) -> BTreeMap<PointKey, usize> {
    let mut degree: BTreeMap<PointKey, usize> = BTreeMap::new();
    for s in segments {
        *degree.entry(s.start().key()).or_default() += 1;
        *degree.entry(s.end().key()).or_default() += 1;
    }
    degree
}

fn is_joined(degree: &BTreeMap<PointKey, usize>, p: Point) -> bool {
    degree.get(&p.key()).is_some_and(|&n| n > 1)
}

fn rekey(degree: &mut BTreeMap<PointKey, usize>, from: Point, to: Point) {
    if let Some(n) = degree.get_mut(&from.key()) {
        *n = n.saturating_sub(1);
    }
    *degree.entry(to.key()).or_default() += 1;
}

/// Split crossing segments at their intersection.
fn split_crossings(segments: &mut Vec<Segment>) -> usize {
    let reach = MIN_SPLIT_DISTANCE + EPSILON;
    let index = SegmentIndex::build(segments, reach);
    let mut pending: BTreeMap<usize, Vec<Point>> = BTreeMap::new();
    let mut moves = 0;

    for i in 0..segments.len() {
        for j in index.query_box(&segments[i].bbox(reach)) {
            if j <= i {
                continue;
            }
            let (a, b) = (&segments[i], &segments[j]);
            if a.width != b.width || a.is_degenerate() || b.is_degenerate() {
                continue;
            }
            let Some(ip) = intersect(a, b, true, true) else {
                continue;
            };
            let ip = snap_to_existing(ip, [a.start(), a.end(), b.start(), b.end()]);

            for k in [i, j] {
                let s = &mut segments[k];
                if s.start().distance_to(&ip) < MIN_SPLIT_DISTANCE {
                    if s.start() != ip {
                        s.set_start(ip);
                        moves += 1;
                    }
                } else if s.end().distance_to(&ip) < MIN_SPLIT_DISTANCE {
                    if s.end() != ip {
                        s.set_end(ip);
                        moves += 1;
                    }
                } else {
                    pending.entry(k).or_default().push(ip);
                }
            }
        }
    }

    let mut splits = 0;
    for (k, points) in pending {
        let mut cuts: Vec<(f64, Point)> = points
            .into_iter()
            .map(|p| (segments[k].projected_length(p, Extent::Unbounded), p))
            .collect();
        cuts.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (d, p) in cuts {
            if d <= EPSILON || d >= segments[k].length() - EPSILON {
                continue;
            }
            let sibling = segments[k].split(p);
            segments.push(sibling);
            splits += 1;
        }
    }
    moves + splits
}

/// Prefer an existing endpoint over a freshly computed intersection when they coincide.
fn snap_to_existing(ip: Point, candidates: [Point; 4]) -> Point {
    candidates
        .into_iter()
        .find(|c| c.distance_to(&ip) <= EPSILON)
        .unwrap_or(ip)
}

fn max_width(segments: &[Segment]) -> f64 {
    segments.iter().map(|s| s.width).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64, width: f64) -> Segment {
        Segment::new(Point::new(x0, y0), Point::new(x1, y1), width, 1, "N1")
    }

    fn has_endpoint(segments: &[Segment], p: Point) -> usize {
        segments
            .iter()
            .filter(|s| s.start().key() == p.key() || s.end().key() == p.key())
            .count()
    }

    #[test]
    fn test_crossing_split_into_four() {
        let mut segments = vec![seg(0.0, 0.0, 10.0, 0.0, 5.0), seg(5.0, -5.0, 5.0, 5.0, 5.0)];
        let changes = split_intersections(&mut segments);
        assert_eq!(changes, 2);
        assert_eq!(segments.len(), 4);
        assert_eq!(has_endpoint(&segments, Point::new(5.0, 0.0)), 4);
        let total: f64 = segments.iter().map(|s| s.length()).sum();
        assert!((total - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_t_junction_gap_closed() {
        // stem stops 2 units short of the bar; bar half-width is 2.5
        let mut segments = vec![seg(0.0, 0.0, 20.0, 0.0, 5.0), seg(10.0, 12.0, 10.0, 2.0, 5.0)];
        split_intersections(&mut segments);
        assert_eq!(segments.len(), 3);
        assert_eq!(has_endpoint(&segments, Point::new(10.0, 0.0)), 3);
    }

    #[test]
    fn test_joined_end_is_not_stretched() {
        // the first segment ends short of the bar but already turns a corner there
        let mut segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, 5.0),
            seg(10.0, 0.0, 10.0, 10.0, 5.0),
            seg(11.0, -10.0, 11.0, 10.0, 5.0),
        ];
        assert_eq!(split_intersections(&mut segments), 0);
        assert_eq!(segments.len(), 3);
        assert_eq!(has_endpoint(&segments, Point::new(10.0, 0.0)), 2);
    }

    #[test]
    fn test_far_gap_untouched() {
        let mut segments = vec![seg(0.0, 0.0, 20.0, 0.0, 5.0), seg(10.0, 12.0, 10.0, 5.0, 5.0)];
        assert_eq!(split_intersections(&mut segments), 0);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_near_end_snaps_instead_of_splitting() {
        let mut segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, 5.0),
            seg(10.05, -5.0, 10.05, 5.0, 5.0),
        ];
        split_intersections(&mut segments);
        assert_eq!(segments.len(), 3);
        let horizontal = segments.iter().find(|s| s.start() == Point::new(0.0, 0.0)).unwrap();
        assert!((horizontal.end().x - 10.05).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_crossings_on_one_segment() {
        let mut segments = vec![
            seg(0.0, 0.0, 30.0, 0.0, 5.0),
            seg(10.0, -5.0, 10.0, 5.0, 5.0),
            seg(20.0, -5.0, 20.0, 5.0, 5.0),
        ];
        split_intersections(&mut segments);
        assert_eq!(segments.len(), 7);
        let total: f64 = segments.iter().map(|s| s.length()).sum();
        assert!((total - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_different_widths_do_not_split() {
        let mut segments = vec![seg(0.0, 0.0, 10.0, 0.0, 5.0), seg(5.0, -5.0, 5.0, 5.0, 8.0)];
        assert_eq!(split_intersections(&mut segments), 0);
        assert_eq!(segments.len(), 2);
    }
}
