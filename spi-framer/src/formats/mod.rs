//! Event file format parsers
//!
//! Each parser yields the upstream decoder's frames as an iterator over [`Event`]s.

use crate::types::{Event, FramerError, Result};
use std::path::Path;

pub mod jsonl;

pub use jsonl::{JsonlEventIterator, JsonlParser};

/// Open an event file, choosing the parser from its extension
pub fn open_event_file(path: &Path) -> Result<Box<dyn Iterator<Item = Result<Event>>>> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());

    match extension.as_deref() {
        Some("jsonl") | Some("ndjson") => {
            log::debug!("Detected JSON Lines event file");
            Ok(Box::new(JsonlParser::parse(path)?))
        }
        _ => Err(FramerError::UnsupportedFormat(format!("{:?}", extension))),
    }
}
