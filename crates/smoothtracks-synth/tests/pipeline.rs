use smoothtracks_core::record::{shape_id_number, Record};
use smoothtracks_io::{load_board, save_board, BoardDocument};
use smoothtracks_synth::{smooth_board, FilletMode, SmoothingParams};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const BOARD: &str = r#"{
    "head": {"docType": "3"},
    "shape": [
        "TRACK~10~1~GND~0 0 100 0 100 100~gge5~0",
        "VIA~0~0~40~GND~10~gge9~0",
        "TRACK~8~2~VCC~300 0 400 0~gge12~0",
        "SOLIDREGION~1~GND~M 0 0 L 5 0 L 0 5 Z~solid~gge20~1~~~0"
    ]
}"#;

fn teardrops_only() -> SmoothingParams {
    SmoothingParams {
        no_fillet: true,
        ..SmoothingParams::default()
    }
}

fn run(json: &str, params: SmoothingParams) -> (String, smoothtracks_synth::SmoothingReport) {
    let (document, mut board) = load_board(json).unwrap();
    let report = smooth_board(&mut board, params);
    (save_board(&document, &board).unwrap(), report)
}

#[test]
fn test_teardrops_replaced_on_rerun() {
    init_logger();
    let (first, report) = run(BOARD, teardrops_only());
    assert_eq!(report.teardrops_removed, 1);
    assert_eq!(report.teardrops, 1);

    let shapes = BoardDocument::from_json(&first).unwrap().shape;
    assert_eq!(shapes.len(), 4);
    assert!(shapes.iter().all(|s| !s.contains("~gge20~")));
    let teardrop = shapes.last().unwrap();
    assert!(teardrop.starts_with("SOLIDREGION~1~GND~M "));
    assert!(teardrop.contains("~gge21~1~"));

    let (second, report) = run(&first, teardrops_only());
    assert_eq!(report.cleanup_edits, 0);
    assert_eq!(report.teardrops_removed, 1);
    assert_eq!(report.teardrops, 1);
    let shapes = BoardDocument::from_json(&second).unwrap().shape;
    assert_eq!(shapes.len(), 4);
    assert!(shapes.last().unwrap().contains("~gge22~1~"));
}

#[test]
fn test_original_records_survive() {
    init_logger();
    let (saved, _) = run(BOARD, teardrops_only());
    let shapes = BoardDocument::from_json(&saved).unwrap().shape;
    assert_eq!(shapes[0], "TRACK~10~1~GND~0 0 100 0 100 100~gge5~0");
    assert_eq!(shapes[1], "VIA~0~0~40~GND~10~gge9~0");
    assert_eq!(shapes[2], "TRACK~8~2~VCC~300 0 400 0~gge12~0");
}

#[test]
fn test_new_ids_exceed_existing() {
    init_logger();
    let (saved, report) = run(BOARD, SmoothingParams::default());
    let document = BoardDocument::from_json(&saved).unwrap();
    let records = document.records().unwrap();
    assert_eq!(records.len(), 3 + report.shapes_added());

    for record in &records[3..] {
        let id = record.shape_id().unwrap();
        assert!(shape_id_number(id).unwrap() > 20, "{id}");
        match record {
            Record::Arc(arc) => {
                assert_eq!(arc.net, "GND");
                assert_eq!(arc.layer, 1);
                assert!(arc.path.starts_with("M "));
            }
            Record::SolidRegion(region) => assert!(region.is_teardrop()),
            other => panic!("unexpected synthesized record {other:?}"),
        }
    }
}

#[test]
fn test_disabled_stages_leave_board_alone() {
    init_logger();
    let params = SmoothingParams::from_json(r#"{"nofillet": true, "noteardrops": true, "nosubdivide": true}"#).unwrap();
    let (saved, report) = run(BOARD, params);
    assert_eq!(report.shapes_added(), 0);
    let shapes = BoardDocument::from_json(&saved).unwrap().shape;
    let original = BoardDocument::from_json(BOARD).unwrap().shape;
    assert_eq!(shapes, original);
}

fn solid_regions(json: &str) -> usize {
    BoardDocument::from_json(json)
        .unwrap()
        .shape
        .iter()
        .filter(|s| s.starts_with("SOLIDREGION"))
        .count()
}

#[test]
fn test_fill_fillets_replaced_on_rerun() {
    init_logger();
    let board = r#"{"head": {"docType": "3"}, "shape": ["TRACK~10~1~GND~0 0 100 0 100 100~gge5~0"]}"#;
    let fill = || SmoothingParams {
        no_teardrops: true,
        ..SmoothingParams::default().with_fillet_mode(FilletMode::Fill)
    };

    let (first, report) = run(board, fill());
    assert!(report.fillets > 0);
    let count = solid_regions(&first);
    assert_eq!(count, report.fillets);

    let (second, report) = run(&first, fill());
    assert_eq!(report.teardrops_removed, count);
    assert_eq!(solid_regions(&second), count);

    let (third, _) = run(&second, SmoothingParams::default().with_fillet_mode(FilletMode::Fill));
    assert_eq!(solid_regions(&third), count);
}
