//! Lazy framing over fallible event sources

use crate::framer::{FramerStats, TransactionFramer};
use crate::types::{Event, Record, Result};

/// Iterator that frames events from a fallible source into records
///
/// Events that complete no record are consumed silently; source errors are passed
/// through unchanged and do not disturb the framing state.
pub struct FramingIterator<I>
where
    I: Iterator<Item = Result<Event>>,
{
    events: I,
    framer: TransactionFramer,
}

impl<I> FramingIterator<I>
where
    I: Iterator<Item = Result<Event>>,
{
    pub fn new(events: I, framer: TransactionFramer) -> Self {
        Self { events, framer }
    }

    /// Statistics of the underlying framer so far
    pub fn stats(&self) -> FramerStats {
        self.framer.stats()
    }
}

impl<I> Iterator for FramingIterator<I>
where
    I: Iterator<Item = Result<Event>>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.events.next()? {
                Ok(event) => {
                    if let Some(record) = self.framer.process(event) {
                        return Some(Ok(record));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
