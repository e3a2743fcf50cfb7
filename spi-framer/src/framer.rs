//! Transaction framing state machine
//!
//! The [`TransactionFramer`] regroups the per-transfer events of an upstream SPI
//! decoder into one record per select window:
//!
//! ```text
//! Idle     --Enable-->       Selected   (fresh window)
//! Selected --Result-->       Selected   (accumulate)
//! Selected --Disable-->      Idle       emits Transaction
//! Selected --Error-->        Idle       emits TransactionError
//! Idle     --Result-->       Idle       (dropped)
//! Idle     --Disable-->      Idle       emits TransactionError
//! any      --Unrecognized--> same       emits TransactionError
//! ```

use crate::buffer::TransactionBuffer;
use crate::config::FramerConfig;
use crate::types::{Event, FramingFault, Record, Timestamp};

/// Internal framing state
#[derive(Debug, Default)]
enum FramerState {
    /// Select deasserted, nothing accumulated
    #[default]
    Idle,
    /// Select asserted since `start_time`
    Selected {
        start_time: Timestamp,
        /// Set once the window can no longer yield a valid transaction
        had_error: bool,
        pending: TransactionBuffer,
    },
}

impl FramerState {
    /// Describe a state that cannot close into a valid transaction
    fn invalid_transaction(&self) -> FramingFault {
        match self {
            FramerState::Idle => FramingFault::InvalidTransaction {
                selected: false,
                had_error: false,
                start_time: None,
            },
            FramerState::Selected { start_time, had_error, .. } => FramingFault::InvalidTransaction {
                selected: true,
                had_error: *had_error,
                start_time: Some(*start_time),
            },
        }
    }
}

/// Counters collected over the lifetime of a framer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Events passed to `process`
    pub events: u64,
    /// `Transaction` records emitted
    pub transactions: u64,
    /// `TransactionError` records emitted
    pub errors: u64,
    /// `Result` events dropped because no window was open (or the window had failed)
    pub ignored_results: u64,
    /// Windows discarded by a re-asserted select
    pub abandoned: u64,
}

/// Stateful accumulator turning SPI events into transaction records
#[derive(Debug, Default)]
pub struct TransactionFramer {
    config: FramerConfig,
    state: FramerState,
    stats: FramerStats,
}

impl TransactionFramer {
    /// Create a framer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a framer with the given configuration
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            config,
            state: FramerState::Idle,
            stats: FramerStats::default(),
        }
    }

    /// Feed the next event and return the record it completes, if any
    ///
    /// # Example
    /// ```
    /// use spi_framer::{Event, Record, TransactionFramer, Timestamp};
    ///
    /// let t = |ns| Timestamp::from_timestamp_nanos(ns);
    /// let mut framer = TransactionFramer::new();
    ///
    /// assert!(framer.process(Event::Enable { start_time: t(0) }).is_none());
    /// assert!(framer.process(Event::Result { miso: vec![0xAA], mosi: vec![0x01] }).is_none());
    ///
    /// match framer.process(Event::Disable { end_time: t(10) }) {
    ///     Some(Record::Transaction { miso, mosi, .. }) => {
    ///         assert_eq!(miso, vec![0xAA]);
    ///         assert_eq!(mosi, vec![0x01]);
    ///     }
    ///     other => panic!("unexpected record: {:?}", other),
    /// }
    /// ```
    pub fn process(&mut self, event: Event) -> Option<Record> {
        self.stats.events += 1;

        let record = match event {
            Event::Enable { start_time } => self.handle_enable(start_time),
            Event::Result { miso, mosi } => {
                self.handle_result(miso, mosi);
                None
            }
            Event::Disable { end_time } => Some(self.handle_disable(end_time)),
            Event::Error { start_time, end_time } => Some(self.handle_error(start_time, end_time)),
            Event::Unrecognized { start_time, end_time, label } => {
                log::debug!("Unrecognized event type '{}' at {}", label, start_time);
                Some(Record::error(
                    start_time,
                    end_time,
                    &FramingFault::UnrecognizedEvent(label),
                ))
            }
        };

        match &record {
            Some(Record::Transaction { .. }) => self.stats.transactions += 1,
            Some(Record::TransactionError { .. }) => self.stats.errors += 1,
            None => {}
        }

        record
    }

    /// Frame every event of an infallible source, yielding only emitted records
    pub fn frame_events<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Record> + 'a
    where
        I: IntoIterator<Item = Event>,
        I::IntoIter: 'a,
    {
        events.into_iter().filter_map(move |event| self.process(event))
    }

    /// Drop any open window and return to idle
    pub fn reset(&mut self) {
        self.state = FramerState::Idle;
    }

    /// True while a select window is open
    pub fn is_selected(&self) -> bool {
        matches!(self.state, FramerState::Selected { .. })
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    fn handle_enable(&mut self, start_time: Timestamp) -> Option<Record> {
        let previous = std::mem::replace(
            &mut self.state,
            FramerState::Selected {
                start_time,
                had_error: false,
                pending: TransactionBuffer::new(),
            },
        );
        log::debug!("Select asserted at {}", start_time);

        let FramerState::Selected { start_time: abandoned_start, pending, .. } = previous else {
            return None;
        };

        self.stats.abandoned += 1;
        if pending.is_empty() {
            log::debug!(
                "Select re-asserted at {}; window from {} carried no transfers",
                start_time,
                abandoned_start
            );
        } else {
            log::warn!(
                "Select re-asserted at {} without deassertion; discarding window from {} ({} transfer units)",
                start_time,
                abandoned_start,
                pending.units()
            );
        }

        self.config.report_abandoned.then(|| {
            Record::error(abandoned_start, start_time, &FramingFault::AbandonedTransaction)
        })
    }

    fn handle_result(&mut self, miso: Vec<u8>, mosi: Vec<u8>) {
        let FramerState::Selected { start_time, had_error, pending } = &mut self.state else {
            self.stats.ignored_results += 1;
            log::trace!("Dropping transfer unit outside select window");
            return;
        };

        if *had_error {
            self.stats.ignored_results += 1;
            return;
        }

        if !self.config.fits(pending.miso_len() + miso.len())
            || !self.config.fits(pending.mosi_len() + mosi.len())
        {
            log::warn!(
                "Window opened at {} exceeds {:?} bytes; marking it invalid",
                start_time,
                self.config.max_transaction_bytes
            );
            *had_error = true;
            *pending = TransactionBuffer::new();
            self.stats.ignored_results += 1;
            return;
        }

        log::trace!("Transfer unit: miso={} mosi={}", hex::encode(&miso), hex::encode(&mosi));
        pending.push(miso, mosi);
    }

    fn handle_disable(&mut self, end_time: Timestamp) -> Record {
        match std::mem::take(&mut self.state) {
            FramerState::Selected {
                start_time,
                had_error: false,
                pending,
            } => {
                log::debug!(
                    "Select deasserted at {}; framed {} transfer units",
                    end_time,
                    pending.units()
                );
                let (miso, mosi) = pending.into_bytes();
                Record::Transaction {
                    start_time,
                    end_time,
                    miso,
                    mosi,
                }
            }
            state => {
                let fault = state.invalid_transaction();
                log::warn!("Select deasserted at {}: {}", end_time, fault);
                Record::error(end_time, end_time, &fault)
            }
        }
    }

    fn handle_error(&mut self, start_time: Timestamp, end_time: Timestamp) -> Record {
        let record = Record::error(start_time, end_time, &FramingFault::ClockError);
        if self.is_selected() {
            log::debug!("Upstream error at {}; closing open window", start_time);
        }
        self.reset();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ns: i64) -> Timestamp {
        Timestamp::from_timestamp_nanos(ns)
    }

    fn result(miso: &[u8], mosi: &[u8]) -> Event {
        Event::Result {
            miso: miso.to_vec(),
            mosi: mosi.to_vec(),
        }
    }

    #[test]
    fn test_simple_transaction() {
        let mut framer = TransactionFramer::new();

        assert_eq!(framer.process(Event::Enable { start_time: ts(0) }), None);
        assert!(framer.is_selected());
        assert_eq!(framer.process(result(&[0xAA], &[0x01])), None);
        assert_eq!(framer.process(result(&[0xBB], &[0x02])), None);

        let record = framer.process(Event::Disable { end_time: ts(10) });
        assert_eq!(
            record,
            Some(Record::Transaction {
                start_time: ts(0),
                end_time: ts(10),
                miso: vec![0xAA, 0xBB],
                mosi: vec![0x01, 0x02],
            })
        );
        assert!(!framer.is_selected());
    }

    #[test]
    fn test_disable_without_enable() {
        let mut framer = TransactionFramer::new();

        assert_eq!(framer.process(result(&[0x00], &[0x00])), None);
        match framer.process(Event::Disable { end_time: ts(5) }) {
            Some(Record::TransactionError { start_time, end_time, reason }) => {
                assert_eq!(start_time, ts(5));
                assert_eq!(end_time, ts(5));
                assert!(reason.starts_with("invalid transaction"));
                assert!(reason.contains("selected=false"));
            }
            other => panic!("expected TransactionError, got {:?}", other),
        }
    }

    #[test]
    fn test_error_resets_window() {
        let mut framer = TransactionFramer::new();

        framer.process(Event::Enable { start_time: ts(0) });
        framer.process(result(&[0x11], &[0x22]));

        let record = framer.process(Event::Error {
            start_time: ts(1),
            end_time: ts(2),
        });
        assert_eq!(
            record,
            Some(Record::TransactionError {
                start_time: ts(1),
                end_time: ts(2),
                reason: "clock state invalid when select became active".to_string(),
            })
        );
        assert!(!framer.is_selected());

        // The closing disable of the failed window finds nothing open
        let record = framer.process(Event::Disable { end_time: ts(3) }).unwrap();
        assert!(record.is_error());
    }

    #[test]
    fn test_unrecognized_keeps_window() {
        let mut framer = TransactionFramer::new();

        framer.process(Event::Enable { start_time: ts(0) });
        framer.process(result(&[0x01], &[0x02]));

        let record = framer
            .process(Event::Unrecognized {
                start_time: ts(3),
                end_time: ts(4),
                label: "address".into(),
            })
            .unwrap();
        assert_eq!(
            record,
            Record::TransactionError {
                start_time: ts(3),
                end_time: ts(4),
                reason: "unexpected input event type: address".into(),
            }
        );
        assert!(framer.is_selected());

        framer.process(result(&[0x03], &[0x04]));
        let record = framer.process(Event::Disable { end_time: ts(9) }).unwrap();
        assert_eq!(
            record,
            Record::Transaction {
                start_time: ts(0),
                end_time: ts(9),
                miso: vec![0x01, 0x03],
                mosi: vec![0x02, 0x04],
            }
        );
    }

    #[test]
    fn test_reenable_discards_silently() {
        let mut framer = TransactionFramer::new();

        framer.process(Event::Enable { start_time: ts(0) });
        framer.process(result(&[0xDE], &[0xAD]));
        assert_eq!(framer.process(Event::Enable { start_time: ts(5) }), None);
        framer.process(result(&[0xBE], &[0xEF]));

        let record = framer.process(Event::Disable { end_time: ts(8) }).unwrap();
        assert_eq!(
            record,
            Record::Transaction {
                start_time: ts(5),
                end_time: ts(8),
                miso: vec![0xBE],
                mosi: vec![0xEF],
            }
        );
        assert_eq!(framer.stats().abandoned, 1);
    }

    #[test]
    fn test_reenable_reported() {
        let mut framer = TransactionFramer::with_config(FramerConfig::new().with_report_abandoned(true));

        framer.process(Event::Enable { start_time: ts(0) });
        let record = framer.process(Event::Enable { start_time: ts(5) }).unwrap();
        assert_eq!(record.start_time(), ts(0));
        assert_eq!(record.end_time(), ts(5));
        assert!(record.is_error());
        assert!(framer.is_selected());
    }

    #[test]
    fn test_size_limit_marks_error() {
        let mut framer = TransactionFramer::with_config(FramerConfig::new().with_max_transaction_bytes(2));

        framer.process(Event::Enable { start_time: ts(0) });
        framer.process(result(&[0x01, 0x02], &[]));
        framer.process(result(&[0x03], &[]));

        match framer.process(Event::Disable { end_time: ts(4) }) {
            Some(Record::TransactionError { start_time, reason, .. }) => {
                assert_eq!(start_time, ts(4));
                assert!(reason.contains("had_error=true"));
            }
            other => panic!("expected TransactionError, got {:?}", other),
        }

        // Next window starts clean
        framer.process(Event::Enable { start_time: ts(5) });
        framer.process(result(&[0x04], &[0x05]));
        let record = framer.process(Event::Disable { end_time: ts(6) }).unwrap();
        assert!(!record.is_error());
    }

    #[test]
    fn test_results_dropped_after_overflow() {
        let mut framer = TransactionFramer::with_config(FramerConfig::new().with_max_transaction_bytes(2));

        framer.process(Event::Enable { start_time: ts(0) });
        framer.process(result(&[0x01, 0x02, 0x03], &[]));
        assert!(framer.is_selected());

        // Fits the cap on its own, but the window has already failed
        assert_eq!(framer.process(result(&[0x04], &[0x05])), None);

        let record = framer.process(Event::Disable { end_time: ts(2) }).unwrap();
        assert_eq!(
            record,
            Record::error(
                ts(2),
                ts(2),
                &FramingFault::InvalidTransaction {
                    selected: true,
                    had_error: true,
                    start_time: Some(ts(0)),
                }
            )
        );
        assert_eq!(framer.stats().ignored_results, 2);
        assert!(!framer.is_selected());
    }

    #[test]
    fn test_error_and_unrecognized_while_idle() {
        let mut framer = TransactionFramer::new();

        let record = framer
            .process(Event::Error {
                start_time: ts(1),
                end_time: ts(2),
            })
            .unwrap();
        assert_eq!(record, Record::error(ts(1), ts(2), &FramingFault::ClockError));
        assert!(!framer.is_selected());

        let record = framer
            .process(Event::Unrecognized {
                start_time: ts(3),
                end_time: ts(4),
                label: "glitch".into(),
            })
            .unwrap();
        assert!(record.is_error());
        assert!(!framer.is_selected());

        // Still idle: a following disable has nothing to close
        let record = framer.process(Event::Disable { end_time: ts(5) }).unwrap();
        assert!(record.is_error());
        assert_eq!(framer.stats().errors, 3);
    }

    #[test]
    fn test_stats() {
        let mut framer = TransactionFramer::new();
        let events = vec![
            result(&[0x00], &[0x00]),
            Event::Enable { start_time: ts(0) },
            result(&[0x01], &[0x01]),
            Event::Disable { end_time: ts(1) },
            Event::Disable { end_time: ts(2) },
        ];

        let records: Vec<Record> = framer.frame_events(events).collect();
        assert_eq!(records.len(), 2);

        let stats = framer.stats();
        assert_eq!(stats.events, 5);
        assert_eq!(stats.transactions, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.ignored_results, 1);
    }
}
