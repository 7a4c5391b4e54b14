use smoothtracks_core::geometry::Point;
use smoothtracks_core::layer::LayerId;
use smoothtracks_core::record::{format_number, format_point, ArcRecord, Record, SolidRegionRecord};

/// Teardrop flag written on generated teardrop regions so later runs can find and replace them.
pub const TEARDROP_FLAG: &str = "1";

/// A circular arc from `from` to `to`, emitted with SVG sweep flag 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPath {
    pub from: Point,
    pub to: Point,
    pub radius: f64,
}

impl ArcPath {
    /// `M x0 y0 A r r 0 0 0 x1 y1`
    pub fn to_path(&self) -> String {
        let r = format_number(self.radius);
        format!(
            "M {} A {} {} 0 0 0 {}",
            format_point(self.from),
            r,
            r,
            format_point(self.to)
        )
    }
}

/// The boundary of a generated filled region.
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    /// Straight edges through the points, closed back to the first.
    Polygon(Vec<Point>),
    /// A fillet arc closed through the corner it rounds off.
    Fillet { arc: ArcPath, corner: Point },
}

impl Outline {
    pub fn to_path(&self) -> String {
        match self {
            Outline::Polygon(points) => {
                let body: Vec<String> = points.iter().map(|p| format_point(*p)).collect();
                format!("M {} Z", body.join(" L "))
            }
            Outline::Fillet { arc, corner } => {
                format!("{} L {} Z", arc.to_path(), format_point(*corner))
            }
        }
    }
}

/// Geometry produced by a synthesizer, not yet assigned a shape id.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthShape {
    Arc {
        layer: LayerId,
        net: String,
        width: f64,
        arc: ArcPath,
    },
    Region {
        layer: LayerId,
        net: String,
        outline: Outline,
        teardrop: bool,
    },
}

impl SynthShape {
    pub fn is_teardrop(&self) -> bool {
        matches!(self, SynthShape::Region { teardrop: true, .. })
    }

    /// Turn into a board record carrying `id`.
    pub fn into_record(self, id: &str) -> Record {
        match self {
            SynthShape::Arc {
                layer,
                net,
                width,
                arc,
            } => Record::Arc(ArcRecord::new(width, layer, &net, &arc.to_path(), id)),
            SynthShape::Region {
                layer,
                net,
                outline,
                teardrop,
            } => {
                let flag = if teardrop { TEARDROP_FLAG } else { "" };
                Record::SolidRegion(
                    SolidRegionRecord::new(layer, &net, &outline.to_path(), id).with_teardrop(flag),
                )
            }
        }
    }
}
