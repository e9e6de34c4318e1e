//! # Event Log
//!
//! An append-only, per-component log of public events. Each token,
//! compliance and module owns one `EventLog` for its own event enum.
//!
//! ## Security Invariant
//!
//! Event payloads are public. Event enums in this workspace only ever
//! carry addresses, plaintext admin values and ciphertext *handles*; the
//! [`EventKind`] of an event never depends on a confidential value.

use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

/// The structural discriminant of an event, independent of its payload.
///
/// Two calls that differ only in a hidden verdict must produce identical
/// sequences of kinds.
pub trait EventKind {
    /// Stable event name (e.g. `"Transfer"`).
    fn kind(&self) -> &'static str;
}

/// A single emitted event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord<E> {
    /// Monotonic sequence number within the owning log.
    pub sequence: u64,
    /// When the event was emitted.
    pub emitted_at: Timestamp,
    /// The event payload.
    pub event: E,
}

/// Append-only log of events emitted by one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog<E> {
    records: Vec<EventRecord<E>>,
    next_sequence: u64,
}

impl<E> EventLog<E> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Append an event.
    pub fn emit(&mut self, event: E) {
        self.records.push(EventRecord {
            sequence: self.next_sequence,
            emitted_at: Timestamp::now(),
            event,
        });
        self.next_sequence += 1;
    }

    /// All records emitted so far, oldest first.
    pub fn records(&self) -> &[EventRecord<E>] {
        &self.records
    }

    /// Iterate over event payloads, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.records.iter().map(|r| &r.event)
    }

    /// The most recently emitted event.
    pub fn last(&self) -> Option<&E> {
        self.records.last().map(|r| &r.event)
    }

    /// Number of events emitted and not yet drained.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove and return every record. Sequence numbers keep increasing.
    pub fn drain(&mut self) -> Vec<EventRecord<E>> {
        std::mem::take(&mut self.records)
    }
}

impl<E: EventKind> EventLog<E> {
    /// Event kinds in emission order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().map(EventKind::kind).collect()
    }
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}
