//! `~`-delimited shape record codec.
//!
//! Each record is a single string whose first field names its kind, e.g.
//! `TRACK~10~1~GND~4000 3000 4100 3000~gge12~0`. Known kinds are parsed into typed
//! [`Record`] variants; anything else is carried as [`Record::Other`] and written back
//! byte-for-byte. Records that were never modified are re-emitted from their source text.

use std::str::FromStr;

use thiserror::Error;

use smoothtracks_core::geometry::Point;
use smoothtracks_core::layer::LayerId;
use smoothtracks_core::record::{
    format_number, format_point, ArcRecord, LibRecord, PadRecord, Record, SolidRegionRecord,
    TrackRecord, ViaRecord, LIB_SEPARATOR,
};

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Empty record")]
    Empty,

    #[error("{kind} record is missing field {index} ({name})")]
    MissingField {
        kind: &'static str,
        index: usize,
        name: &'static str,
    },

    #[error("{kind} record has invalid {name}: '{value}'")]
    InvalidNumber {
        kind: &'static str,
        name: &'static str,
        value: String,
    },

    #[error("Odd number of coordinates ({0}) in point list")]
    OddCoordinates(usize),
}

// ── Field access ──────────────────────────────────────────────────────

struct Fields<'a> {
    kind: &'static str,
    fields: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn new(kind: &'static str, line: &'a str) -> Self {
        Self {
            kind,
            fields: line.split('~').collect(),
        }
    }

    fn text(&self, index: usize, name: &'static str) -> Result<&'a str, RecordError> {
        self.fields.get(index).copied().ok_or(RecordError::MissingField {
            kind: self.kind,
            index,
            name,
        })
    }

    fn optional(&self, index: usize) -> &'a str {
        self.fields.get(index).copied().unwrap_or_default()
    }

    fn number<T: FromStr>(&self, index: usize, name: &'static str) -> Result<T, RecordError> {
        let value = self.text(index, name)?;
        value.trim().parse().map_err(|_| RecordError::InvalidNumber {
            kind: self.kind,
            name,
            value: value.to_string(),
        })
    }

    fn points(&self, index: usize) -> Result<Vec<Point>, RecordError> {
        let value = self.text(index, "points")?;
        let coords = value
            .split_whitespace()
            .map(|c| {
                c.parse::<f64>().map_err(|_| RecordError::InvalidNumber {
                    kind: self.kind,
                    name: "points",
                    value: c.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        if coords.len() % 2 != 0 {
            return Err(RecordError::OddCoordinates(coords.len()));
        }
        Ok(coords.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect())
    }
}

// ── Parsing ───────────────────────────────────────────────────────────

/// Parse one shape record.
pub fn parse_record(line: &str) -> Result<Record, RecordError> {
    let kind = line.split('~').next().unwrap_or_default();
    match kind {
        "" => Err(RecordError::Empty),
        "TRACK" => parse_track(line).map(Record::Track),
        "VIA" => parse_via(line).map(Record::Via),
        "PAD" => parse_pad(line).map(Record::Pad),
        "SOLIDREGION" => parse_solid_region(line).map(Record::SolidRegion),
        "ARC" => parse_arc(line).map(Record::Arc),
        "LIB" => parse_lib(line).map(Record::Lib),
        _ => Ok(Record::Other(line.to_string())),
    }
}

fn parse_track(line: &str) -> Result<TrackRecord, RecordError> {
    let f = Fields::new("TRACK", line);
    let width = f.number(1, "width")?;
    let layer: LayerId = f.number(2, "layer")?;
    let net = f.text(3, "net")?;
    let points = f.points(4)?;
    let id = f.text(5, "id")?;
    let mut track = TrackRecord::new(width, layer, net, points, id).with_locked(f.optional(6));
    track.raw = Some(line.to_string());
    Ok(track)
}

fn parse_via(line: &str) -> Result<ViaRecord, RecordError> {
    let f = Fields::new("VIA", line);
    Ok(ViaRecord {
        position: Point::new(f.number(1, "x")?, f.number(2, "y")?),
        diameter: f.number(3, "diameter")?,
        net: f.text(4, "net")?.to_string(),
        drill: f.number(5, "drill")?,
        id: f.text(6, "id")?.to_string(),
        raw: line.to_string(),
    })
}

fn parse_pad(line: &str) -> Result<PadRecord, RecordError> {
    let f = Fields::new("PAD", line);
    // SMD pads may leave the hole radius blank.
    let hole_radius = match f.text(9, "hole radius")?.trim() {
        "" => 0.0,
        _ => f.number(9, "hole radius")?,
    };
    Ok(PadRecord {
        position: Point::new(f.number(2, "x")?, f.number(3, "y")?),
        width: f.number(4, "width")?,
        height: f.number(5, "height")?,
        layer: f.text(6, "layer")?.to_string(),
        net: f.text(7, "net")?.to_string(),
        hole_radius,
        id: f.text(12, "id")?.to_string(),
        raw: line.to_string(),
    })
}

fn parse_solid_region(line: &str) -> Result<SolidRegionRecord, RecordError> {
    let f = Fields::new("SOLIDREGION", line);
    let layer: LayerId = f.number(1, "layer")?;
    let mut region = SolidRegionRecord::new(layer, f.text(2, "net")?, f.text(3, "path")?, f.text(5, "id")?)
        .with_teardrop(f.optional(6));
    region.kind = f.text(4, "type")?.to_string();
    region.raw = Some(line.to_string());
    Ok(region)
}

fn parse_arc(line: &str) -> Result<ArcRecord, RecordError> {
    let f = Fields::new("ARC", line);
    let layer: LayerId = f.number(2, "layer")?;
    let mut arc = ArcRecord::new(
        f.number(1, "width")?,
        layer,
        f.text(3, "net")?,
        f.text(4, "path")?,
        f.text(6, "id")?,
    );
    arc.helper_dots = f.optional(5).to_string();
    arc.locked = f.optional(7).to_string();
    arc.raw = Some(line.to_string());
    Ok(arc)
}

fn parse_lib(line: &str) -> Result<LibRecord, RecordError> {
    let mut parts = line.split(LIB_SEPARATOR);
    let header = Fields::new("LIB", parts.next().unwrap_or_default());
    let children = parts
        .filter(|part| !part.is_empty())
        .map(parse_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LibRecord {
        id: header.optional(6).to_string(),
        children,
        raw: line.to_string(),
    })
}

// ── Encoding ──────────────────────────────────────────────────────────

/// Serialize a record. Parsed records that were not rewritten come back unchanged.
pub fn encode_record(record: &Record) -> String {
    match record {
        Record::Track(track) => match &track.raw {
            Some(raw) => raw.clone(),
            None => encode_track(track),
        },
        Record::Via(via) => via.raw.clone(),
        Record::Pad(pad) => pad.raw.clone(),
        Record::SolidRegion(region) => match &region.raw {
            Some(raw) => raw.clone(),
            None => format!(
                "SOLIDREGION~{}~{}~{}~{}~{}~{}~~~0",
                region.layer, region.net, region.path, region.kind, region.id, region.teardrop
            ),
        },
        Record::Arc(arc) => match &arc.raw {
            Some(raw) => raw.clone(),
            None => format!(
                "ARC~{}~{}~{}~{}~{}~{}~{}",
                format_number(arc.width),
                arc.layer,
                arc.net,
                arc.path,
                arc.helper_dots,
                arc.id,
                arc.locked
            ),
        },
        Record::Lib(lib) => lib.raw.clone(),
        Record::Other(raw) => raw.clone(),
    }
}

fn encode_track(track: &TrackRecord) -> String {
    let coords: Vec<String> = track.points.iter().map(|p| format_point(*p)).collect();
    format!(
        "TRACK~{}~{}~{}~{}~{}~{}",
        format_number(track.width),
        track.layer,
        track.net,
        coords.join(" "),
        track.id,
        track.locked
    )
}
