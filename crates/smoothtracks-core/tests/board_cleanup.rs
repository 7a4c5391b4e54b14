use smoothtracks_core::record::{Record, TrackRecord, ViaRecord};
use smoothtracks_core::{Board, GroupKey, Point, SignalLayers};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn track(points: &[(f64, f64)], id: &str) -> Record {
    let points = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
    Record::Track(TrackRecord::new(10.0, 1, "GND", points, id))
}

#[test]
fn test_crossing_tracks_rewritten_through_junction() {
    init_logger();
    let records = vec![
        track(&[(0.0, 0.0), (100.0, 0.0)], "gge1"),
        track(&[(50.0, -50.0), (50.0, 50.0)], "gge2"),
        Record::Other("TEXT~L~0~0~0.8~0~0~3~~4.5~R1~M 0 0~~gge3~~0".to_string()),
    ];
    let mut board = Board::new(records, SignalLayers::new());
    assert!(board.cleanup() > 0);

    let key = GroupKey::new("GND", 1);
    let group = board.group(&key).unwrap();
    assert_eq!(group.segments.len(), 4);
    assert_eq!(group.islands.live_count(), 1);

    board.save_tracks();
    assert_eq!(board.record_count(), 3);
    match &board.records()[0] {
        Record::Track(t) => {
            assert_eq!(t.id, "gge1");
            assert_eq!(t.points.len(), 3);
            assert!(t.points[1].distance_to(&Point::new(50.0, 0.0)) < 1e-6);
        }
        other => panic!("expected a track, got {other:?}"),
    }
    assert!(matches!(&board.records()[2], Record::Other(_)));
}

#[test]
fn test_clean_board_is_untouched() {
    init_logger();
    let via = Record::Via(ViaRecord {
        position: Point::new(0.0, 0.0),
        diameter: 40.0,
        net: "GND".to_string(),
        drill: 10.0,
        id: "gge7".to_string(),
        raw: "VIA~0~0~40~GND~10~gge7~0".to_string(),
    });
    let records = vec![track(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)], "gge4"), via];
    let mut board = Board::new(records.clone(), SignalLayers::new());
    assert_eq!(board.cleanup(), 0);
    board.save_tracks();
    assert_eq!(board.records(), records.as_slice());
    assert_eq!(board.vias_for("GND").len(), 1);
    assert_eq!(board.next_shape_id(), "gge8");
}
