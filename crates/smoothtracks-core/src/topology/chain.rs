use crate::geometry::{Point, Segment};

/// A run of segments joined end to end.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    /// Indices of the segments that make up the run, in the order they were attached.
    pub members: Vec<usize>,
}

impl Polyline {
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => self.points.len() > 2 && a.key() == b.key(),
            _ => false,
        }
    }
}

/// Chain the segments named by `indices` into polylines.
///
/// Each polyline starts from the first unused segment, grows forward from its last point while
/// some segment ends there, then backward from its first point. Endpoints are matched by key.
pub fn make_polylines(segments: &[Segment], indices: &[usize]) -> Vec<Polyline> {
    let mut remaining: Vec<usize> = indices.to_vec();
    let mut polylines = Vec::new();

    while !remaining.is_empty() {
        let first = remaining.remove(0);
        let seed = &segments[first];
        let mut points = vec![seed.start(), seed.end()];
        let mut members = vec![first];

        loop {
            let tail = points[points.len() - 1];
            if let Some((pos, next)) = find_neighbour(segments, &remaining, tail) {
                members.push(remaining.remove(pos));
                points.push(next);
                continue;
            }
            if let Some((pos, prev)) = find_neighbour(segments, &remaining, points[0]) {
                members.push(remaining.remove(pos));
                points.insert(0, prev);
                continue;
            }
            break;
        }

        polylines.push(Polyline { points, members });
    }
    polylines
}

/// Position in `remaining` of a segment with an endpoint at `at`, and its opposite endpoint.
fn find_neighbour(segments: &[Segment], remaining: &[usize], at: Point) -> Option<(usize, Point)> {
    let key = at.key();
    remaining.iter().enumerate().find_map(|(pos, &i)| {
        let s = &segments[i];
        if s.start().key() == key {
            Some((pos, s.end()))
        } else if s.end().key() == key {
            Some((pos, s.start()))
        } else {
            None
        }
    })
}
