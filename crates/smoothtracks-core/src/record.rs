use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Segment, Via};
use crate::layer::LayerId;

/// Prefix of every shape id minted by the editor.
pub const SHAPE_ID_PREFIX: &str = "gge";

/// Separator between a `LIB` header and its nested records.
pub const LIB_SEPARATOR: &str = "#@$";

/// Round to five decimals and print the shortest representation (`10`, `0.5`, `-3.14159`).
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1e5).round() / 1e5;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// `x y` with both coordinates formatted by [`format_number`].
pub fn format_point(p: Point) -> String {
    format!("{} {}", format_number(p.x), format_number(p.y))
}

/// Numeric part of a minted shape id, if it is one.
pub fn shape_id_number(id: &str) -> Option<u64> {
    id.strip_prefix(SHAPE_ID_PREFIX)?.parse().ok()
}

// ── Record kinds ───────────────────────────────────────────────────

/// `TRACK~width~layer~net~x0 y0 x1 y1 ...~id~locked`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub width: f64,
    pub layer: LayerId,
    pub net: String,
    pub points: Vec<Point>,
    pub id: String,
    pub locked: String,
    /// Source text when parsed; dropped once the geometry is rewritten.
    #[serde(skip)]
    pub raw: Option<String>,
}

impl TrackRecord {
    pub fn new(width: f64, layer: LayerId, net: &str, points: Vec<Point>, id: &str) -> Self {
        Self {
            width,
            layer,
            net: net.to_string(),
            points,
            id: id.to_string(),
            locked: "0".to_string(),
            raw: None,
        }
    }

    pub fn with_locked(mut self, locked: &str) -> Self {
        self.locked = locked.to_string();
        self
    }

    pub fn is_locked(&self) -> bool {
        !matches!(self.locked.as_str(), "" | "0")
    }

    /// Decompose into consecutive point pairs, coordinates snapped to the adjacency grid.
    /// Zero-length pairs are skipped.
    pub fn segments(&self, source: usize) -> Vec<Segment> {
        self.points
            .windows(2)
            .map(|pair| {
                Segment::new(
                    pair[0].snapped(),
                    pair[1].snapped(),
                    self.width,
                    self.layer,
                    &self.net,
                )
                .with_source(source, &self.id)
                .with_locked(self.is_locked())
            })
            .filter(|s| !s.is_degenerate())
            .collect()
    }
}

/// `VIA~x~y~diameter~net~drill~id~locked`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViaRecord {
    pub position: Point,
    pub diameter: f64,
    pub net: String,
    pub drill: f64,
    pub id: String,
    pub raw: String,
}

impl ViaRecord {
    pub fn to_via(&self) -> Via {
        Via::new(self.position.snapped(), self.diameter, self.drill, &self.id)
    }
}

/// `PAD~shape~x~y~w~h~layer~net~num~holeRadius~points~rotation~id~...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadRecord {
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub layer: String,
    pub net: String,
    pub hole_radius: f64,
    pub id: String,
    pub raw: String,
}

impl PadRecord {
    /// A plated pad behaves like a via of its smaller dimension; SMD pads are not obstacles.
    pub fn to_via(&self) -> Option<Via> {
        if self.hole_radius == 0.0 {
            return None;
        }
        Some(Via::new(
            self.position.snapped(),
            self.width.min(self.height),
            self.hole_radius,
            &self.id,
        ))
    }
}

/// `SOLIDREGION~layer~net~path~type~id~teardrop~...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidRegionRecord {
    pub layer: LayerId,
    pub net: String,
    pub path: String,
    pub kind: String,
    pub id: String,
    /// Non-empty when the region is a generated teardrop.
    pub teardrop: String,
    #[serde(skip)]
    pub raw: Option<String>,
}

impl SolidRegionRecord {
    pub fn new(layer: LayerId, net: &str, path: &str, id: &str) -> Self {
        Self {
            layer,
            net: net.to_string(),
            path: path.to_string(),
            kind: "solid".to_string(),
            id: id.to_string(),
            teardrop: String::new(),
            raw: None,
        }
    }

    pub fn with_teardrop(mut self, flag: &str) -> Self {
        self.teardrop = flag.to_string();
        self
    }

    pub fn is_teardrop(&self) -> bool {
        !self.teardrop.is_empty()
    }
}

/// `ARC~width~layer~net~path~helperDots~id~locked`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcRecord {
    pub width: f64,
    pub layer: LayerId,
    pub net: String,
    pub path: String,
    pub helper_dots: String,
    pub id: String,
    pub locked: String,
    #[serde(skip)]
    pub raw: Option<String>,
}

impl ArcRecord {
    pub fn new(width: f64, layer: LayerId, net: &str, path: &str, id: &str) -> Self {
        Self {
            width,
            layer,
            net: net.to_string(),
            path: path.to_string(),
            helper_dots: String::new(),
            id: id.to_string(),
            locked: "0".to_string(),
            raw: None,
        }
    }
}

/// A footprint: a `LIB` header followed by nested records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibRecord {
    pub id: String,
    pub children: Vec<Record>,
    pub raw: String,
}

/// One entry of the board's shape list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Track(TrackRecord),
    Via(ViaRecord),
    Pad(PadRecord),
    SolidRegion(SolidRegionRecord),
    Arc(ArcRecord),
    Lib(LibRecord),
    /// Any other kind, kept verbatim.
    Other(String),
}

impl Record {
    pub fn kind(&self) -> &str {
        match self {
            Record::Track(_) => "TRACK",
            Record::Via(_) => "VIA",
            Record::Pad(_) => "PAD",
            Record::SolidRegion(_) => "SOLIDREGION",
            Record::Arc(_) => "ARC",
            Record::Lib(_) => "LIB",
            Record::Other(raw) => raw.split('~').next().unwrap_or_default(),
        }
    }

    /// The shape id, for passthrough kinds the first field that looks like one.
    pub fn shape_id(&self) -> Option<&str> {
        match self {
            Record::Track(r) => Some(&r.id),
            Record::Via(r) => Some(&r.id),
            Record::Pad(r) => Some(&r.id),
            Record::SolidRegion(r) => Some(&r.id),
            Record::Arc(r) => Some(&r.id),
            Record::Lib(r) => Some(&r.id),
            Record::Other(raw) => raw.split('~').find(|f| f.starts_with(SHAPE_ID_PREFIX)),
        }
    }

    /// Every shape id carried by this record, nested ones included.
    pub fn shape_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.shape_id().into_iter().collect();
        if let Record::Lib(lib) = self {
            for child in &lib.children {
                ids.extend(child.shape_ids());
            }
        }
        ids
    }

    /// Obstacles contributed by this record, keyed by net.
    pub fn vias(&self) -> Vec<(String, Via)> {
        match self {
            Record::Via(r) => vec![(r.net.clone(), r.to_via())],
            Record::Pad(r) => r.to_via().map(|v| (r.net.clone(), v)).into_iter().collect(),
            Record::Lib(lib) => lib.children.iter().flat_map(|c| c.vias()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_teardrop(&self) -> bool {
        matches!(self, Record::SolidRegion(r) if r.is_teardrop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-3.141592653), "-3.14159");
        assert_eq!(format_number(-0.000001), "0");
        assert_eq!(format_point(Point::new(4000.123456, -2.0)), "4000.12346 -2");
    }

    #[test]
    fn test_shape_id_number() {
        assert_eq!(shape_id_number("gge42"), Some(42));
        assert_eq!(shape_id_number("gge"), None);
        assert_eq!(shape_id_number("rect1"), None);
    }

    #[test]
    fn test_track_segments_skip_zero_length() {
        let track = TrackRecord::new(
            10.0,
            1,
            "GND",
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ],
            "gge5",
        )
        .with_locked("1");
        let segments = track.segments(7);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.source == Some(7) && s.id == "gge5" && s.locked));
    }

    #[test]
    fn test_pad_without_hole_is_not_a_via() {
        let mut pad = PadRecord {
            position: Point::new(0.0, 0.0),
            width: 60.0,
            height: 40.0,
            layer: "11".to_string(),
            net: "N1".to_string(),
            hole_radius: 0.0,
            id: "gge9".to_string(),
            raw: String::new(),
        };
        assert!(pad.to_via().is_none());
        pad.hole_radius = 10.0;
        let via = pad.to_via().unwrap();
        assert_eq!(via.diameter, 40.0);
    }

    #[test]
    fn test_passthrough_shape_id() {
        let record = Record::Other("TEXT~L~4050~3120~0.8~0~0~3~~4.5~R1~M 4051 3117~~gge77~~0".into());
        assert_eq!(record.kind(), "TEXT");
        assert_eq!(record.shape_id(), Some("gge77"));
    }

    #[test]
    fn test_lib_collects_nested_ids_and_vias() {
        let pad = PadRecord {
            position: Point::new(5.0, 5.0),
            width: 30.0,
            height: 30.0,
            layer: "11".to_string(),
            net: "VCC".to_string(),
            hole_radius: 8.0,
            id: "gge12".to_string(),
            raw: String::new(),
        };
        let lib = Record::Lib(LibRecord {
            id: "gge10".to_string(),
            children: vec![Record::Pad(pad), Record::Other("TRACK~1~3~~0 0 1 1~gge11~0".into())],
            raw: String::new(),
        });
        assert_eq!(lib.shape_ids(), vec!["gge10", "gge12", "gge11"]);
        let vias = lib.vias();
        assert_eq!(vias.len(), 1);
        assert_eq!(vias[0].0, "VCC");
    }
}
