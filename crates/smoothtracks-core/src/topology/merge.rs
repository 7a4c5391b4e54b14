use crate::geometry::{is_colinear, is_parallel, Extent, Point, PointKey, Segment, EPSILON};
use crate::spatial::SegmentIndex;

/// What resolving one parallel pair did to the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairOutcome {
    /// An endpoint moved; indices are still valid.
    Clipped,
    /// A segment was removed or added; indices are stale.
    Restructured,
}

/// A pending edit to the group, computed from an immutable view and applied afterwards.
#[derive(Debug)]
enum MergeAction {
    /// `keep` takes the new endpoints, `remove` is absorbed.
    Absorb {
        keep: usize,
        remove: usize,
        start: Point,
        end: Point,
    },
    /// The narrower segment is rewritten, optionally leaving a tail fragment beyond the wider one.
    Clip {
        index: usize,
        clipped: Segment,
        tail: Option<Segment>,
    },
    Remove(usize),
}

/// Merge overlapping colinear equal-width segments and clip narrower segments hidden under
/// wider parallel ones, until a full scan changes nothing.
///
/// Returns the number of edits made.
pub fn merge_colinear(segments: &mut Vec<Segment>) -> usize {
    let mut edits = 0;
    let mut scans = 0;
    let limit = 16 + 4 * segments.len() * segments.len().max(1);

    loop {
        scans += 1;
        if scans > limit {
            log::warn!("colinear merge did not settle after {} scans", limit);
            break;
        }
        let reach = max_width(segments) + EPSILON;
        let index = SegmentIndex::build(segments, reach);
        let mut changed = false;
        let mut restructured = false;

        'scan: for i in 0..segments.len() {
            for j in index.query_box(&segments[i].bbox(reach)) {
                if i == j {
                    continue;
                }
                let Some(action) = resolve_pair(segments, i, j) else {
                    continue;
                };
                match apply(segments, action) {
                    PairOutcome::Clipped => {
                        edits += 1;
                        changed = true;
                    }
                    PairOutcome::Restructured => {
                        edits += 1;
                        changed = true;
                        restructured = true;
                        break 'scan;
                    }
                }
            }
        }

        if !changed {
            break;
        }
        if restructured {
            log::trace!("merge restructured group, rescanning {} segments", segments.len());
        }
    }

    edits
}

fn max_width(segments: &[Segment]) -> f64 {
    segments.iter().map(|s| s.width).fold(0.0, f64::max)
}

/// Number of segments with an endpoint at `key`.
fn endpoint_degree(segments: &[Segment], key: PointKey) -> usize {
    segments
        .iter()
        .filter(|s| s.start().key() == key || s.end().key() == key)
        .count()
}

fn resolve_pair(segments: &[Segment], i: usize, j: usize) -> Option<MergeAction> {
    let (t, t2) = (&segments[i], &segments[j]);
    if t.is_degenerate() || t2.is_degenerate() || !is_parallel(t, t2) {
        return None;
    }
    if t.width == t2.width {
        absorb_equal(segments, i, j)
    } else if t.width < t2.width {
        clip_narrower(segments, i, j)
    } else {
        clip_narrower(segments, j, i)
    }
}

/// `t2` (at `j`) grows to cover the union of both intervals and `t` (at `i`) goes away.
fn absorb_equal(segments: &[Segment], i: usize, j: usize) -> Option<MergeAction> {
    let (t, t2) = (&segments[i], &segments[j]);
    if !is_colinear(t, t2) {
        return None;
    }

    let mut near = (t.projected_length(t2.start(), Extent::Unbounded), t2.start());
    let mut far = (t.projected_length(t2.end(), Extent::Unbounded), t2.end());
    if near.0 > far.0 {
        std::mem::swap(&mut near, &mut far);
    }
    let (s, e) = (near.0, far.0);
    let overlap = e.min(t.length()) - s.max(0.0);
    if overlap < -EPSILON {
        return None;
    }
    if overlap <= EPSILON {
        let joint = if e.abs() <= EPSILON { t.start() } else { t.end() };
        if endpoint_degree(segments, joint.key()) > 2 {
            return None;
        }
    }

    // Reuse existing points so neighbours stay exactly connected.
    let start = if s < 0.0 { near.1 } else { t.start() };
    let end = if e > t.length() { far.1 } else { t.end() };
    Some(MergeAction::Absorb {
        keep: j,
        remove: i,
        start,
        end,
    })
}

/// Trim the narrower segment `n` wherever it runs inside the wider parallel segment `w`.
fn clip_narrower(segments: &[Segment], n: usize, w: usize) -> Option<MergeAction> {
    let (t, t2) = (&segments[n], &segments[w]);
    if t2.distance_to(t.start(), Extent::Unbounded) >= t2.width - t.width + EPSILON {
        return None;
    }

    let mut clipped = t.clone();
    let mut s = t2.projected_length(t.start(), Extent::Unbounded);
    let mut e = t2.projected_length(t.end(), Extent::Unbounded);
    if e < s {
        std::mem::swap(&mut s, &mut e);
        clipped.reverse();
    }
    let overlap = (t2.width - t.width) * 0.5;
    let far_edge = t2.length() + overlap;

    let mut tail = None;
    if s < -overlap {
        if e > far_edge {
            let mut fragment = clipped.clone();
            let from = clipped.closest_point(t2.point_on_line(far_edge), Extent::Bounded);
            if fragment.set_start(from) {
                tail = Some(fragment);
            }
        }
        if e > 0.0 {
            let to = clipped.closest_point(t2.point_on_line(-overlap), Extent::Bounded);
            clipped.set_end(to);
        }
    } else if e > far_edge {
        if s < far_edge {
            let from = clipped.closest_point(t2.point_on_line(far_edge), Extent::Bounded);
            clipped.set_start(from);
        }
    } else {
        return Some(MergeAction::Remove(n));
    }

    if tail.is_none() && !moved(t, &clipped) {
        return None;
    }
    Some(MergeAction::Clip {
        index: n,
        clipped,
        tail,
    })
}

/// True unless `after` has the same endpoints as `before`, in either orientation.
fn moved(before: &Segment, after: &Segment) -> bool {
    let close = |a: Point, b: Point| a.distance_to(&b) <= EPSILON;
    let same = close(before.start(), after.start()) && close(before.end(), after.end());
    let flipped = close(before.start(), after.end()) && close(before.end(), after.start());
    !(same || flipped)
}

fn apply(segments: &mut Vec<Segment>, action: MergeAction) -> PairOutcome {
    match action {
        MergeAction::Absorb {
            keep,
            remove,
            start,
            end,
        } => {
            segments[keep].set_endpoints(start, end);
            segments.remove(remove);
            PairOutcome::Restructured
        }
        MergeAction::Clip {
            index,
            clipped,
            tail,
        } => {
            if clipped.is_degenerate() {
                segments.remove(index);
                if let Some(tail) = tail {
                    segments.push(tail);
                }
                return PairOutcome::Restructured;
            }
            segments[index] = clipped;
            match tail {
                Some(tail) => {
                    segments.push(tail);
                    PairOutcome::Restructured
                }
                None => PairOutcome::Clipped,
            }
        }
        MergeAction::Remove(index) => {
            segments.remove(index);
            PairOutcome::Restructured
        }
    }
}
