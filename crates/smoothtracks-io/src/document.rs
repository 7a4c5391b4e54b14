use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use smoothtracks_core::board::Board;
use smoothtracks_core::layer::SignalLayers;
use smoothtracks_core::record::Record;

use crate::record::{encode_record, parse_record, RecordError};

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum BoardIoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed board document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shape {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: RecordError,
    },
}

// ── Document ──────────────────────────────────────────────────────────

/// The JSON container of a board: the shape list, the optional layer manifest and every
/// other key carried along untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    pub shape: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BoardDocument {
    pub fn from_json(json: &str) -> Result<Self, BoardIoError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, BoardIoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse every shape string into a typed record.
    pub fn records(&self) -> Result<Vec<Record>, BoardIoError> {
        self.shape
            .iter()
            .enumerate()
            .map(|(index, line)| parse_record(line).map_err(|source| BoardIoError::Record { index, source }))
            .collect()
    }

    /// Signal layers named by the manifest, plus the default top and bottom layers.
    pub fn signal_layers(&self) -> SignalLayers {
        match &self.layers {
            Some(manifest) => SignalLayers::from_manifest(manifest),
            None => SignalLayers::new(),
        }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

/// Parse a board document and build the board model from its shapes.
pub fn load_board(json: &str) -> Result<(BoardDocument, Board), BoardIoError> {
    let document = BoardDocument::from_json(json)?;
    let records = document.records()?;
    let signal_layers = document.signal_layers();
    log::info!(
        "parsed {} shapes on {} signal layers",
        records.len(),
        signal_layers.layer_count()
    );
    let board = Board::new(records, signal_layers);
    Ok((document, board))
}

/// Write the board's records back into `document` and serialize it.
pub fn save_board(document: &BoardDocument, board: &Board) -> Result<String, BoardIoError> {
    let mut document = document.clone();
    document.shape = board.records().iter().map(encode_record).collect();
    document.to_json()
}

pub fn load_board_file(path: impl AsRef<Path>) -> Result<(BoardDocument, Board), BoardIoError> {
    let path = path.as_ref();
    log::info!("reading board from {}", path.display());
    load_board(&fs::read_to_string(path)?)
}

pub fn save_board_file(
    path: impl AsRef<Path>,
    document: &BoardDocument,
    board: &Board,
) -> Result<(), BoardIoError> {
    let path = path.as_ref();
    fs::write(path, save_board(document, board)?)?;
    log::info!("wrote board to {}", path.display());
    Ok(())
}
