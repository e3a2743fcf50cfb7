//! JSON Lines event source
//!
//! Reads one upstream decoder frame per line:
//!
//! ```text
//! {"type": "enable",  "start_time": "2024-05-01T12:00:00.000001Z", "end_time": "..."}
//! {"type": "result",  "start_time": "...", "end_time": "...", "data": {"miso": "aa", "mosi": "01"}}
//! {"type": "disable", "start_time": "...", "end_time": "..."}
//! {"type": "error",   "start_time": "...", "end_time": "..."}
//! ```
//!
//! Any other `type` becomes [`Event::Unrecognized`]. Blank lines are skipped.

use crate::types::{Event, FramerError, Result, Timestamp};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One frame as written by the upstream decoder
#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    start_time: Option<Timestamp>,
    #[serde(default)]
    end_time: Option<Timestamp>,
    #[serde(default)]
    data: WireData,
}

#[derive(Debug, Default, Deserialize)]
struct WireData {
    #[serde(default, deserialize_with = "optional_hex")]
    miso: Option<Vec<u8>>,
    #[serde(default, deserialize_with = "optional_hex")]
    mosi: Option<Vec<u8>>,
}

fn optional_hex<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|s| hex::decode(s.trim()))
        .transpose()
        .map_err(serde::de::Error::custom)
}

impl WireFrame {
    fn into_event(self, line: usize) -> Result<Event> {
        let missing = |field: &str| FramerError::InvalidData {
            line,
            message: format!("'{}' frame missing {}", self.frame_type, field),
        };

        let event = match self.frame_type.as_str() {
            "enable" => Event::Enable {
                start_time: self.start_time.ok_or_else(|| missing("start_time"))?,
            },
            "result" => Event::Result {
                miso: self.data.miso.ok_or_else(|| missing("data.miso"))?,
                mosi: self.data.mosi.ok_or_else(|| missing("data.mosi"))?,
            },
            "disable" => Event::Disable {
                end_time: self.end_time.ok_or_else(|| missing("end_time"))?,
            },
            "error" => Event::Error {
                start_time: self.start_time.ok_or_else(|| missing("start_time"))?,
                end_time: self.end_time.ok_or_else(|| missing("end_time"))?,
            },
            _ => Event::Unrecognized {
                start_time: self.start_time.ok_or_else(|| missing("start_time"))?,
                end_time: self.end_time.ok_or_else(|| missing("end_time"))?,
                label: self.frame_type.clone(),
            },
        };

        Ok(event)
    }
}

/// JSON Lines event file parser
pub struct JsonlParser;

impl JsonlParser {
    /// Open a JSON Lines file and return an iterator over its events
    pub fn parse(path: &Path) -> Result<JsonlEventIterator<BufReader<File>>> {
        log::info!("Opening event file: {:?}", path);

        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Read events from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> JsonlEventIterator<R> {
        JsonlEventIterator {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

/// Iterator over events of a JSON Lines source
pub struct JsonlEventIterator<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> Iterator for JsonlEventIterator<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }

            return Some(parse_line(&line, self.line_no));
        }
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Event> {
    let frame: WireFrame = serde_json::from_str(line).map_err(|e| FramerError::ParseError {
        line: line_no,
        message: e.to_string(),
    })?;
    frame.into_event(line_no)
}
