use std::collections::HashMap;

use crate::geometry::{PointKey, Segment};

/// Index of an island in its [`IslandArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IslandId(pub usize);

/// A connectivity class: equal-width segments transitively joined at shared endpoints.
#[derive(Debug, Clone, Default)]
pub struct Island {
    pub width: f64,
    segments: Vec<usize>,
}

impl Island {
    /// Indices (into the group's segment vector) of the member segments.
    pub fn segments(&self) -> &[usize] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// An island emptied by being absorbed into a larger one.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Owns every island of one track group. Absorbed islands stay in place, empty, so that
/// ids handed out earlier remain valid indices.
#[derive(Debug, Clone, Default)]
pub struct IslandArena {
    islands: Vec<Island>,
}

impl IslandArena {
    pub fn get(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(id.0)
    }

    /// Islands that still own segments.
    pub fn live(&self) -> impl Iterator<Item = (IslandId, &Island)> {
        self.islands
            .iter()
            .enumerate()
            .filter(|(_, island)| !island.is_empty())
            .map(|(i, island)| (IslandId(i), island))
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    fn create(&mut self, width: f64) -> IslandId {
        self.islands.push(Island {
            width,
            segments: Vec::new(),
        });
        IslandId(self.islands.len() - 1)
    }

    fn size(&self, id: IslandId) -> usize {
        self.islands[id.0].segments.len()
    }

    /// Move every member of `from` into `into`, re-pointing segments and endpoint entries.
    fn absorb(
        &mut self,
        into: IslandId,
        from: IslandId,
        segments: &mut [Segment],
        lookup: &mut HashMap<PointKey, IslandId>,
    ) {
        let moved = std::mem::take(&mut self.islands[from.0].segments);
        for &i in &moved {
            let segment = &mut segments[i];
            segment.island = Some(into);
            lookup.insert(segment.start().key(), into);
            lookup.insert(segment.end().key(), into);
        }
        self.islands[into.0].segments.extend(moved);
    }
}

/// Partition the group into islands, one partition per width class.
///
/// Each segment's `island` field is set; the returned arena lists the members.
pub fn assign_islands(segments: &mut [Segment]) -> IslandArena {
    let mut arena = IslandArena::default();
    let mut by_width: HashMap<u64, HashMap<PointKey, IslandId>> = HashMap::new();

    for i in 0..segments.len() {
        let width = segments[i].width;
        let start = segments[i].start().key();
        let end = segments[i].end().key();
        let lookup = by_width.entry(width.to_bits()).or_default();

        let island = match (lookup.get(&start).copied(), lookup.get(&end).copied()) {
            (Some(a), Some(b)) if a != b => {
                if arena.size(a) < arena.size(b) {
                    arena.absorb(b, a, segments, lookup);
                    b
                } else {
                    arena.absorb(a, b, segments, lookup);
                    a
                }
            }
            (Some(a), _) => a,
            (None, Some(b)) => b,
            (None, None) => arena.create(width),
        };

        lookup.insert(start, island);
        lookup.insert(end, island);
        arena.islands[island.0].segments.push(i);
        segments[i].island = Some(island);
    }

    arena
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64, width: f64) -> Segment {
        Segment::new(Point::new(x0, y0), Point::new(x1, y1), width, 1, "N1")
    }

    #[test]
    fn test_chain_forms_one_island() {
        let mut segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, 5.0),
            seg(10.0, 0.0, 10.0, 10.0, 5.0),
            seg(10.0, 10.0, 20.0, 10.0, 5.0),
        ];
        let arena = assign_islands(&mut segments);
        assert_eq!(arena.live_count(), 1);
        assert!(segments.iter().all(|s| s.island == segments[0].island));
    }

    #[test]
    fn test_bridge_merges_smaller_into_larger() {
        let mut segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, 5.0),
            seg(10.0, 0.0, 20.0, 0.0, 5.0),
            seg(50.0, 0.0, 60.0, 0.0, 5.0),
            // joins the two chains
            seg(20.0, 0.0, 50.0, 0.0, 5.0),
        ];
        let arena = assign_islands(&mut segments);
        assert_eq!(arena.live_count(), 1);
        let (id, island) = arena.live().next().unwrap();
        assert_eq!(island.len(), 4);
        assert_eq!(id, IslandId(0));
        assert!(segments.iter().all(|s| s.island == Some(IslandId(0))));
    }

    #[test]
    fn test_width_classes_are_separate() {
        let mut segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, 5.0),
            seg(10.0, 0.0, 20.0, 0.0, 8.0),
        ];
        let arena = assign_islands(&mut segments);
        assert_eq!(arena.live_count(), 2);
        assert_ne!(segments[0].island, segments[1].island);
    }

    #[test]
    fn test_disconnected_runs_are_separate_islands() {
        let mut segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, 5.0),
            seg(10.0, 0.0, 20.0, 0.0, 5.0),
            seg(50.0, 0.0, 60.0, 0.0, 5.0),
        ];
        let arena = assign_islands(&mut segments);
        assert_eq!(arena.live_count(), 2);
        assert_eq!(segments[0].island, segments[1].island);
        assert_ne!(segments[0].island, segments[2].island);
        assert!(segments[2].island.is_some());
    }

    #[test]
    fn test_closed_loop_does_not_duplicate_members() {
        let mut segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, 5.0),
            seg(10.0, 0.0, 10.0, 10.0, 5.0),
            seg(10.0, 10.0, 0.0, 0.0, 5.0),
        ];
        let arena = assign_islands(&mut segments);
        assert_eq!(arena.live_count(), 1);
        assert_eq!(arena.live().next().unwrap().1.len(), 3);
    }
}
