use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Segment, Via};
use crate::layer::{LayerId, SignalLayers};
use crate::record::{shape_id_number, Record, TrackRecord, SHAPE_ID_PREFIX};
use crate::topology::{cleanup_group, make_polylines, IslandArena};

/// Tracks are grouped by net and layer; nothing interacts across groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub net: String,
    pub layer: LayerId,
}

impl GroupKey {
    pub fn new(net: &str, layer: LayerId) -> Self {
        Self {
            net: net.to_string(),
            layer,
        }
    }
}

/// The live segments of one (net, layer) pair and their islands.
#[derive(Debug, Clone, Default)]
pub struct TrackGroup {
    pub segments: Vec<Segment>,
    pub islands: IslandArena,
}

/// Hands out `gge<n>` ids above every id seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeIds {
    highest: u64,
}

impl ShapeIds {
    pub fn observe(&mut self, id: &str) {
        if let Some(n) = shape_id_number(id) {
            self.highest = self.highest.max(n);
        }
    }

    pub fn mint(&mut self) -> String {
        self.highest += 1;
        format!("{}{}", SHAPE_ID_PREFIX, self.highest)
    }

    pub fn highest(&self) -> u64 {
        self.highest
    }
}

/// A loaded board: the ordered record list plus the track and via views derived from it.
#[derive(Debug, Clone)]
pub struct Board {
    records: Vec<Record>,
    groups: BTreeMap<GroupKey, TrackGroup>,
    vias: BTreeMap<String, Vec<Via>>,
    /// Record indices of generated teardrop regions.
    teardrops: Vec<usize>,
    /// Record indices of the tracks that contributed at least one segment.
    track_sources: BTreeSet<usize>,
    ids: ShapeIds,
    signal_layers: SignalLayers,
}

impl Board {
    pub fn new(records: Vec<Record>, signal_layers: SignalLayers) -> Self {
        let mut board = Self {
            records,
            groups: BTreeMap::new(),
            vias: BTreeMap::new(),
            teardrops: Vec::new(),
            track_sources: BTreeSet::new(),
            ids: ShapeIds::default(),
            signal_layers,
        };
        board.load();
        board
    }

    fn load(&mut self) {
        for (index, record) in self.records.iter().enumerate() {
            for id in record.shape_ids() {
                self.ids.observe(id);
            }
            for (net, via) in record.vias() {
                self.vias.entry(net).or_default().push(via);
            }
            match record {
                Record::Track(track) if self.signal_layers.contains(track.layer) => {
                    let segments = track.segments(index);
                    if segments.is_empty() {
                        continue;
                    }
                    self.track_sources.insert(index);
                    self.groups
                        .entry(GroupKey::new(&track.net, track.layer))
                        .or_default()
                        .segments
                        .extend(segments);
                }
                record if record.is_teardrop() => self.teardrops.push(index),
                _ => {}
            }
        }
        log::info!(
            "loaded {} records: {} track groups, {} via nets, {} teardrops",
            self.records.len(),
            self.groups.len(),
            self.vias.len(),
            self.teardrops.len()
        );
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn signal_layers(&self) -> &SignalLayers {
        &self.signal_layers
    }

    pub fn group(&self, key: &GroupKey) -> Option<&TrackGroup> {
        self.groups.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &TrackGroup)> {
        self.groups.iter()
    }

    pub fn groups_mut(&mut self) -> impl Iterator<Item = (&GroupKey, &mut TrackGroup)> {
        self.groups.iter_mut()
    }

    /// Vias and plated pads of `net`.
    pub fn vias_for(&self, net: &str) -> &[Via] {
        self.vias.get(net).map(Vec::as_slice).unwrap_or_default()
    }

    /// Groups paired with the vias of their net, for passes that need both.
    pub fn groups_with_vias(&mut self) -> impl Iterator<Item = (&GroupKey, &mut TrackGroup, &[Via])> {
        let vias = &self.vias;
        self.groups.iter_mut().map(move |(key, group)| {
            let net_vias = vias.get(&key.net).map(Vec::as_slice).unwrap_or_default();
            (key, group, net_vias)
        })
    }

    pub fn teardrop_indices(&self) -> &[usize] {
        &self.teardrops
    }

    pub fn segment_count(&self) -> usize {
        self.groups.values().map(|g| g.segments.len()).sum()
    }

    // ── Shape ids ────────────────────────────────────────────────────

    pub fn next_shape_id(&mut self) -> String {
        self.ids.mint()
    }

    pub fn highest_shape_id(&self) -> u64 {
        self.ids.highest()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Normalize every track group. Returns the total number of edits.
    pub fn cleanup(&mut self) -> usize {
        let mut edits = 0;
        for (key, group) in self.groups.iter_mut() {
            let report = cleanup_group(&mut group.segments);
            log::debug!(
                "{}~{}: {} merge / {} split edits",
                key.net,
                key.layer,
                report.merged,
                report.split
            );
            edits += report.merged + report.split;
            group.islands = report.islands;
        }
        log::info!("cleanup made {} edits over {} groups", edits, self.groups.len());
        edits
    }

    /// Append a record and return its index.
    pub fn add_record(&mut self, record: Record) -> usize {
        let index = self.records.len();
        if let Some(id) = record.shape_id() {
            self.ids.observe(id);
        }
        if record.is_teardrop() {
            self.teardrops.push(index);
        }
        self.records.push(record);
        index
    }

    /// Remove every teardrop region. Returns how many were removed.
    pub fn remove_teardrops(&mut self) -> usize {
        let doomed: BTreeSet<usize> = self.teardrops.drain(..).collect();
        let count = doomed.len();
        self.remove_records(&doomed);
        if count > 0 {
            log::info!("removed {} existing teardrops", count);
        }
        count
    }

    /// Write the live segments back into TRACK records.
    ///
    /// Segments are regrouped by originating record and chained into polylines. A record whose
    /// only polyline still matches its points is left untouched; otherwise the first polyline
    /// takes over the record and its id, and further polylines become new records. Segments
    /// with no record get new records. Records whose segments all vanished are removed.
    pub fn save_tracks(&mut self) {
        let mut by_source: BTreeMap<(Option<usize>, GroupKey, u64), Vec<usize>> = BTreeMap::new();
        for (key, group) in &self.groups {
            for (i, s) in group.segments.iter().enumerate() {
                let width_class = if s.source.is_some() { 0 } else { s.width.to_bits() };
                by_source
                    .entry((s.source, key.clone(), width_class))
                    .or_default()
                    .push(i);
            }
        }

        let mut surviving = BTreeSet::new();
        let mut rewritten = 0;
        let mut appended = 0;

        for ((source, key, _), members) in by_source {
            let Some(group) = self.groups.get(&key) else {
                continue;
            };
            let polylines = make_polylines(&group.segments, &members);
            let template = &group.segments[members[0]];

            // (record to replace, new record, member segments)
            let mut pending: Vec<(Option<usize>, TrackRecord, Vec<usize>)> = Vec::new();
            let original = source.and_then(|s| match self.records.get(s) {
                Some(Record::Track(track)) => Some((s, track.clone())),
                _ => None,
            });

            match original {
                Some((index, track)) => {
                    surviving.insert(index);
                    let unchanged = polylines.len() == 1 && same_points(&track, &polylines[0].points);
                    if unchanged {
                        continue;
                    }
                    for (n, polyline) in polylines.into_iter().enumerate() {
                        let id = if n == 0 { track.id.clone() } else { self.ids.mint() };
                        let record = TrackRecord::new(track.width, track.layer, &track.net, polyline.points, &id)
                            .with_locked(&track.locked);
                        let target = (n == 0).then_some(index);
                        pending.push((target, record, polyline.members));
                    }
                }
                None => {
                    let locked = if template.locked { "1" } else { "0" };
                    for polyline in polylines {
                        let id = self.ids.mint();
                        let record = TrackRecord::new(template.width, key.layer, &key.net, polyline.points, &id)
                            .with_locked(locked);
                        pending.push((None, record, polyline.members));
                    }
                }
            }

            for (target, record, members) in pending {
                let id = record.id.clone();
                let index = match target {
                    Some(target) => {
                        rewritten += 1;
                        self.records[target] = Record::Track(record);
                        target
                    }
                    None => {
                        appended += 1;
                        self.records.push(Record::Track(record));
                        self.records.len() - 1
                    }
                };
                surviving.insert(index);
                self.track_sources.insert(index);
                if let Some(group) = self.groups.get_mut(&key) {
                    for &m in &members {
                        group.segments[m].source = Some(index);
                        group.segments[m].id = id.clone();
                    }
                }
            }
        }

        let vanished: BTreeSet<usize> = self.track_sources.difference(&surviving).copied().collect();
        log::info!(
            "saved tracks: {} rewritten, {} added, {} removed",
            rewritten,
            appended,
            vanished.len()
        );
        self.remove_records(&vanished);
    }

    /// Delete records by index and remap every stored record index.
    fn remove_records(&mut self, doomed: &BTreeSet<usize>) {
        if doomed.is_empty() {
            return;
        }
        let mut remap = Vec::with_capacity(self.records.len());
        let mut next = 0;
        for i in 0..self.records.len() {
            if doomed.contains(&i) {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }

        let mut index = 0;
        self.records.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });

        let lookup = |i: usize| remap.get(i).copied().flatten();
        for group in self.groups.values_mut() {
            for s in &mut group.segments {
                s.source = s.source.and_then(lookup);
            }
        }
        self.teardrops = self.teardrops.iter().filter_map(|&i| lookup(i)).collect();
        self.track_sources = self.track_sources.iter().filter_map(|&i| lookup(i)).collect();
    }
}

/// Whether `points` retraces the record's own points (compared on the adjacency grid).
fn same_points(track: &TrackRecord, points: &[Point]) -> bool {
    let original: Vec<_> = track
        .points
        .iter()
        .map(|p| p.key())
        .fold(Vec::new(), |mut acc, key| {
            if acc.last() != Some(&key) {
                acc.push(key);
            }
            acc
        });
    original.len() == points.len() && original.iter().zip(points).all(|(a, b)| *a == b.key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SolidRegionRecord, ViaRecord};

    fn track(points: &[(f64, f64)], id: &str) -> Record {
        let points = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let mut record = TrackRecord::new(10.0, 1, "GND", points, id);
        record.raw = Some(format!("TRACK~10~1~GND~...~{}~0", id));
        Record::Track(record)
    }

    fn via(x: f64, y: f64, id: &str) -> Record {
        Record::Via(ViaRecord {
            position: Point::new(x, y),
            diameter: 40.0,
            net: "GND".to_string(),
            drill: 12.0,
            id: id.to_string(),
            raw: String::new(),
        })
    }

    fn track_records(board: &Board) -> Vec<&TrackRecord> {
        board
            .records()
            .iter()
            .filter_map(|r| match r {
                Record::Track(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_load_groups_and_ids() {
        let board = Board::new(
            vec![
                track(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], "gge3"),
                via(0.0, 0.0, "gge8"),
                Record::Other("TEXT~L~0~0~gge20".to_string()),
            ],
            SignalLayers::new(),
        );
        let key = GroupKey::new("GND", 1);
        assert_eq!(board.group(&key).unwrap().segments.len(), 2);
        assert_eq!(board.vias_for("GND").len(), 1);
        assert!(board.vias_for("VCC").is_empty());
        assert_eq!(board.highest_shape_id(), 20);
    }

    #[test]
    fn test_non_signal_layer_ignored() {
        let mut record = TrackRecord::new(10.0, 3, "GND", vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)], "gge1");
        record.raw = Some(String::new());
        let board = Board::new(vec![Record::Track(record)], SignalLayers::new());
        assert_eq!(board.segment_count(), 0);
    }

    #[test]
    fn test_minted_ids_increase() {
        let mut board = Board::new(vec![track(&[(0.0, 0.0), (1.0, 0.0)], "gge41")], SignalLayers::new());
        assert_eq!(board.next_shape_id(), "gge42");
        assert_eq!(board.next_shape_id(), "gge43");
    }

    #[test]
    fn test_untouched_track_keeps_raw() {
        let mut board = Board::new(
            vec![track(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], "gge3")],
            SignalLayers::new(),
        );
        board.cleanup();
        board.save_tracks();
        let tracks = track_records(&board);
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].raw.is_some());
    }

    #[test]
    fn test_merged_track_record_removed() {
        let mut board = Board::new(
            vec![
                track(&[(0.0, 0.0), (10.0, 0.0)], "gge1"),
                track(&[(5.0, 0.0), (20.0, 0.0)], "gge2"),
                via(100.0, 100.0, "gge3"),
            ],
            SignalLayers::new(),
        );
        board.cleanup();
        board.save_tracks();
        let tracks = track_records(&board);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "gge2");
        assert_eq!(tracks[0].points.len(), 2);
        assert_eq!(board.record_count(), 2);

        // sources were remapped, so saving again is stable
        board.save_tracks();
        assert_eq!(track_records(&board).len(), 1);
        assert_eq!(board.record_count(), 2);
    }

    #[test]
    fn test_split_track_gets_extra_record() {
        // one record drawn as two disjoint pieces after the middle is absorbed by a wider track
        let mut narrow = TrackRecord::new(
            10.0,
            1,
            "GND",
            vec![Point::new(-50.0, 0.0), Point::new(150.0, 0.0)],
            "gge1",
        );
        narrow.raw = Some(String::new());
        let mut wide = TrackRecord::new(20.0, 1, "GND", vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)], "gge2");
        wide.raw = Some(String::new());
        let mut board = Board::new(vec![Record::Track(narrow), Record::Track(wide)], SignalLayers::new());
        board.cleanup();
        board.save_tracks();
        let tracks = track_records(&board);
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].id, "gge1");
        assert!(tracks[0].raw.is_none());
        assert_eq!(tracks[2].id, "gge3");
    }

    #[test]
    fn test_remove_teardrops_remaps_sources() {
        let region = SolidRegionRecord::new(1, "GND", "M 0 0 L 1 1 Z", "gge5").with_teardrop("1");
        let mut board = Board::new(
            vec![
                Record::SolidRegion(region),
                track(&[(0.0, 0.0), (10.0, 0.0)], "gge1"),
            ],
            SignalLayers::new(),
        );
        assert_eq!(board.teardrop_indices(), &[0]);
        assert_eq!(board.remove_teardrops(), 1);
        assert_eq!(board.record_count(), 1);
        let key = GroupKey::new("GND", 1);
        assert_eq!(board.group(&key).unwrap().segments[0].source, Some(0));
    }

    #[test]
    fn test_add_record_registers_teardrop() {
        let mut board = Board::new(Vec::new(), SignalLayers::new());
        let id = board.next_shape_id();
        let region = SolidRegionRecord::new(1, "GND", "M 0 0 Z", &id).with_teardrop("1");
        let index = board.add_record(Record::SolidRegion(region));
        assert_eq!(board.teardrop_indices(), &[index]);
    }
}
