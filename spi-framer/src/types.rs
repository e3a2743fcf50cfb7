//! Core types for the SPI transaction framer
//!
//! This module defines the events the framer consumes (as reported by an upstream
//! bit-level SPI decoder) and the records it emits once a select window closes.

use serde::{Deserialize, Serialize};

/// Timestamp type used throughout the framer
///
/// Timestamps are only ever copied from input events, never generated.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Result type for framer I/O operations
pub type Result<T> = std::result::Result<T, FramerError>;

/// Errors raised while reading events from an event source
///
/// Framing anomalies are NOT errors of this kind: they are reported in-band as
/// [`Record::TransactionError`].
#[derive(Debug, thiserror::Error)]
pub enum FramerError {
    #[error("Failed to parse event on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Invalid event data on line {line}: {message}")]
    InvalidData { line: usize, message: String },

    #[error("Unsupported event file format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Anomalies detected while framing, surfaced as `TransactionError` reasons
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FramingFault {
    /// Select deasserted while no valid window was open
    #[error("invalid transaction (selected={selected}, had_error={had_error}, start_time={start_time:?})")]
    InvalidTransaction {
        selected: bool,
        had_error: bool,
        start_time: Option<Timestamp>,
    },

    /// Upstream decoder reported a clock inconsistency
    #[error("clock state invalid when select became active")]
    ClockError,

    /// An event kind the framer does not model
    #[error("unexpected input event type: {0}")]
    UnrecognizedEvent(String),

    /// Select re-asserted while a window was still open
    #[error("transaction abandoned: select re-asserted before deassertion")]
    AbandonedTransaction,
}

/// One decoded event from the upstream bit-level decoder
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Select (enable) line asserted
    Enable { start_time: Timestamp },

    /// One transfer unit clocked while selected
    Result {
        /// Bytes read from the peripheral
        miso: Vec<u8>,
        /// Bytes written to the peripheral
        mosi: Vec<u8>,
    },

    /// Select (enable) line deasserted
    Disable { end_time: Timestamp },

    /// Upstream clock/protocol inconsistency
    Error {
        start_time: Timestamp,
        end_time: Timestamp,
    },

    /// Any other event type, passed through as a diagnostic
    Unrecognized {
        start_time: Timestamp,
        end_time: Timestamp,
        label: String,
    },
}

impl Event {
    /// Short name of the event kind, matching the upstream frame type
    pub fn kind(&self) -> &str {
        match self {
            Event::Enable { .. } => "enable",
            Event::Result { .. } => "result",
            Event::Disable { .. } => "disable",
            Event::Error { .. } => "error",
            Event::Unrecognized { label, .. } => label,
        }
    }
}

/// Output of the framer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// A successfully framed transaction
    Transaction {
        /// Time the select line was asserted
        start_time: Timestamp,
        /// Time the select line was deasserted
        end_time: Timestamp,
        /// All MISO bytes of the window, in arrival order
        #[serde(with = "hex_bytes")]
        miso: Vec<u8>,
        /// All MOSI bytes of the window, in arrival order
        #[serde(with = "hex_bytes")]
        mosi: Vec<u8>,
    },

    /// A window that could not be framed, or an upstream error
    TransactionError {
        start_time: Timestamp,
        end_time: Timestamp,
        /// Human-readable cause
        reason: String,
    },
}

impl Record {
    /// Build an error record from a framing fault
    pub fn error(start_time: Timestamp, end_time: Timestamp, fault: &FramingFault) -> Self {
        Record::TransactionError {
            start_time,
            end_time,
            reason: fault.to_string(),
        }
    }

    /// Get the start time of this record
    pub fn start_time(&self) -> Timestamp {
        match self {
            Record::Transaction { start_time, .. } => *start_time,
            Record::TransactionError { start_time, .. } => *start_time,
        }
    }

    /// Get the end time of this record
    pub fn end_time(&self) -> Timestamp {
        match self {
            Record::Transaction { end_time, .. } => *end_time,
            Record::TransactionError { end_time, .. } => *end_time,
        }
    }

    /// True if this is a `TransactionError`
    pub fn is_error(&self) -> bool {
        matches!(self, Record::TransactionError { .. })
    }
}

/// Serde adapter encoding byte buffers as lowercase hex strings
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim()).map_err(serde::de::Error::custom)
    }
}
