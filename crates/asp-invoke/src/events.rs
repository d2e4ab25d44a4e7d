// SPDX-License-Identifier: MIT OR Apache-2.0
//! Run-event sequencing.
//!
//! The invoker reports run lifecycle events to an external sink. Delivery is
//! serialized and every event carries a monotonically increasing per-run
//! sequence number, so downstream consumers can detect gaps and reorder
//! nothing.

use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEventKind {
    /// The command line was assembled.
    CommandBuilt {
        /// The shell-quoted display form.
        display: String,
    },
    /// The harness process started.
    Spawned {
        /// Process id.
        pid: u32,
    },
    /// The harness process exited.
    Exited {
        /// Exit code (-1 when terminated by signal).
        code: i32,
    },
}

/// One sequenced run event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Monotonically increasing per-run sequence number, starting at 0.
    pub seq: u64,
    /// The event payload.
    #[serde(flatten)]
    pub kind: RunEventKind,
}

/// Where run events go. The external event-stream client implements this;
/// the core only guarantees ordering.
pub trait RunEventSink {
    /// Deliver one event. Called serially; the next event is emitted only
    /// after this call returns.
    fn emit(&mut self, event: RunEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RunEventSink for NullSink {
    fn emit(&mut self, _event: RunEvent) {}
}

/// Wraps a sink, stamping sequence numbers.
#[derive(Debug)]
pub struct SequencedSink<S> {
    inner: S,
    next_seq: u64,
}

impl<S: RunEventSink> SequencedSink<S> {
    /// Wrap `inner`, starting the sequence at 0.
    pub fn new(inner: S) -> Self {
        Self { inner, next_seq: 0 }
    }

    /// Emit `kind` with the next sequence number.
    pub fn emit(&mut self, kind: RunEventKind) {
        let event = RunEvent {
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        self.inner.emit(event);
    }

    /// Unwrap the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture(Vec<RunEvent>);

    impl RunEventSink for Capture {
        fn emit(&mut self, event: RunEvent) {
            self.0.push(event);
        }
    }

    // -- 1. Sequence numbers increase monotonically from zero ----------------------

    #[test]
    fn sequence_numbers_are_monotonic() {
        let mut sink = SequencedSink::new(Capture::default());
        sink.emit(RunEventKind::CommandBuilt {
            display: "claude".into(),
        });
        sink.emit(RunEventKind::Spawned { pid: 42 });
        sink.emit(RunEventKind::Exited { code: 0 });

        let events = sink.into_inner().0;
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    // -- 2. Events serialize flat ---------------------------------------------------

    #[test]
    fn events_serialize_flat() {
        let event = RunEvent {
            seq: 3,
            kind: RunEventKind::Exited { code: 2 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["kind"], "exited");
        assert_eq!(json["code"], 2);
    }
}
