//! # SmoothTracks I/O
//!
//! Board document handling: the JSON container with its shape list and layer
//! manifest, and the `~`-delimited shape record codec.

pub mod document;
pub mod record;

pub use document::{load_board, load_board_file, save_board, save_board_file, BoardDocument, BoardIoError};
pub use record::{encode_record, parse_record, RecordError};
