//! The smoothing run: cleanup, corner rounding, track write-back, removal of previously
//! generated regions, fillets, then teardrops.

use serde::Serialize;

use smoothtracks_core::board::{Board, GroupKey, TrackGroup};
use smoothtracks_core::geometry::Via;

use crate::boolean::{CavalierBoolean, PolygonBoolean};
use crate::fillet::{fillet_group, FilletMode};
use crate::params::{RoundingParams, SmoothingParams};
use crate::shape::SynthShape;
use crate::teardrop::teardrops_for_group;

/// Rounds the corners of a track group in place, with access to the vias of the group's net.
pub trait RoundingPass {
    fn round(&mut self, key: &GroupKey, group: &mut TrackGroup, vias: &[Via], params: &RoundingParams);
}

/// Leaves every group as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRounding;

impl RoundingPass for NoRounding {
    fn round(&mut self, _key: &GroupKey, _group: &mut TrackGroup, _vias: &[Via], _params: &RoundingParams) {}
}

/// What a run did to the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SmoothingReport {
    pub cleanup_edits: usize,
    pub groups: usize,
    pub fillets: usize,
    /// Flagged regions dropped before synthesis: earlier teardrops and fill fillets.
    pub teardrops_removed: usize,
    pub teardrops: usize,
}

impl SmoothingReport {
    pub fn shapes_added(&self) -> usize {
        self.fillets + self.teardrops
    }
}

pub struct Smoother<B = CavalierBoolean, R = NoRounding> {
    params: SmoothingParams,
    boolean: B,
    rounding: R,
}

impl Smoother {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            params,
            boolean: CavalierBoolean::new(),
            rounding: NoRounding,
        }
    }
}

impl<B: PolygonBoolean, R: RoundingPass> Smoother<B, R> {
    pub fn with_boolean<B2: PolygonBoolean>(self, boolean: B2) -> Smoother<B2, R> {
        Smoother {
            params: self.params,
            boolean,
            rounding: self.rounding,
        }
    }

    pub fn with_rounding<R2: RoundingPass>(self, rounding: R2) -> Smoother<B, R2> {
        Smoother {
            params: self.params,
            boolean: self.boolean,
            rounding,
        }
    }

    pub fn params(&self) -> &SmoothingParams {
        &self.params
    }

    /// Run every enabled stage over `board`.
    pub fn run(&mut self, board: &mut Board) -> SmoothingReport {
        let mut report = SmoothingReport {
            cleanup_edits: board.cleanup(),
            groups: board.groups().count(),
            ..SmoothingReport::default()
        };

        if !self.params.no_subdivide {
            let rounding_params = self.params.rounding_params();
            for (key, group, vias) in board.groups_with_vias() {
                self.rounding.round(key, group, vias, &rounding_params);
            }
        }

        board.save_tracks();

        let mut shapes: Vec<SynthShape> = Vec::new();

        // fill fillets carry the teardrop flag, so both stages own the flagged regions
        let fill_fillets = !self.params.no_fillet && self.params.fillet_mode == FilletMode::Fill;
        if fill_fillets || !self.params.no_teardrops {
            report.teardrops_removed = board.remove_teardrops();
        }

        if !self.params.no_fillet {
            let fillet_params = self.params.fillet_params();
            for (key, group) in board.groups() {
                shapes.extend(fillet_group(&group.segments, key, &fillet_params, &self.boolean));
            }
            report.fillets = shapes.len();
            log::info!("synthesized {} fillets", report.fillets);
        }

        if !self.params.no_teardrops {
            let teardrop_params = self.params.teardrop_params();
            let before = shapes.len();
            for (key, group) in board.groups() {
                shapes.extend(teardrops_for_group(
                    &group.segments,
                    board.vias_for(&key.net),
                    key,
                    &teardrop_params,
                ));
            }
            report.teardrops = shapes.len() - before;
            log::info!("synthesized {} teardrops", report.teardrops);
        }

        for shape in shapes {
            let id = board.next_shape_id();
            board.add_record(shape.into_record(&id));
        }

        report
    }
}

/// Smooth `board` with the default polygon booleans and no corner rounding.
pub fn smooth_board(board: &mut Board, params: SmoothingParams) -> SmoothingReport {
    Smoother::new(params).run(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smoothtracks_core::geometry::Point;
    use smoothtracks_core::layer::SignalLayers;
    use smoothtracks_core::record::{Record, TrackRecord, ViaRecord};

    fn board() -> Board {
        let records = vec![
            Record::Track(TrackRecord::new(10.0, 1, "GND", vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)], "gge1")),
            Record::Via(ViaRecord {
                position: Point::new(0.0, 0.0),
                diameter: 40.0,
                net: "GND".to_string(),
                drill: 10.0,
                id: "gge2".to_string(),
                raw: "VIA~0~0~40~GND~10~gge2~0".to_string(),
            }),
        ];
        Board::new(records, SignalLayers::new())
    }

    /// Counts the groups it was handed.
    #[derive(Default)]
    struct CountingRounding {
        calls: usize,
        vias: usize,
    }

    impl RoundingPass for CountingRounding {
        fn round(&mut self, _key: &GroupKey, _group: &mut TrackGroup, vias: &[Via], params: &RoundingParams) {
            assert_eq!(params.passes, 3);
            self.calls += 1;
            self.vias += vias.len();
        }
    }

    #[test]
    fn test_all_stages_skipped() {
        let mut board = board();
        let params = SmoothingParams {
            no_subdivide: true,
            no_fillet: true,
            no_teardrops: true,
            ..SmoothingParams::default()
        };
        let report = smooth_board(&mut board, params);
        assert_eq!(report.shapes_added(), 0);
        assert_eq!(board.record_count(), 2);
    }

    #[test]
    fn test_rounding_pass_sees_vias() {
        let mut board = board();
        let mut smoother = Smoother::new(SmoothingParams::default()).with_rounding(CountingRounding::default());
        smoother.run(&mut board);
        assert_eq!(smoother.rounding.calls, 1);
        assert_eq!(smoother.rounding.vias, 1);
    }

    #[test]
    fn test_teardrop_gets_fresh_id() {
        let mut board = board();
        let report = smooth_board(&mut board, SmoothingParams::default());
        assert_eq!(report.teardrops, 1);
        assert_eq!(report.fillets, 0);
        let last = &board.records()[board.record_count() - 1];
        assert!(last.is_teardrop());
        assert_eq!(last.shape_id(), Some("gge3"));
    }
}
