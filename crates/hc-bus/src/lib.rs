// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-bus
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Broadcast-based event bus for decoupled [`CascadeEvent`] distribution.
//!
//! The bus is single-producer (the engine) and multi-consumer. Sequence
//! numbers are stamped by the bus, not by producers, so within one cascade
//! the event stream is totally ordered regardless of which component
//! emitted an event. Publishing never blocks: a slow consumer falls behind
//! in its bounded buffer and observes the loss through
//! [`EventBusStats::dropped_events`] rather than stalling the cascade.
//! Dropping the bus closes the stream; subscribers drain what is already
//! buffered and then see the end.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hc_core::{CascadeEvent, CascadeEventKind};
use tokio::sync::broadcast;

/// Default per-subscriber buffer capacity.
const DEFAULT_CAPACITY: usize = 256;

/// Shared statistics counters for an [`EventBus`].
#[derive(Debug, Default)]
struct StatsInner {
    total_published: AtomicU64,
    dropped_events: AtomicU64,
}

/// Snapshot of the bus counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBusStats {
    /// Events published since the bus was created.
    pub total_published: u64,
    /// Currently active subscribers.
    pub active_subscribers: usize,
    /// Events lost to lagging or absent subscribers.
    pub dropped_events: u64,
}

/// Sequence-stamping broadcast bus for [`CascadeEvent`]s.
pub struct EventBus {
    tx: broadcast::Sender<CascadeEvent>,
    seq: AtomicU64,
    stats: Arc<StatsInner>,
}

impl EventBus {
    /// Create a bus with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with the given per-subscriber buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            seq: AtomicU64::new(0),
            stats: Arc::new(StatsInner::default()),
        }
    }

    /// Create a new subscription receiving future events.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Stamp `kind` with the next sequence number and publish it.
    ///
    /// Returns the stamped event. With no subscribers the event is counted
    /// as dropped; the publisher never blocks either way.
    pub fn publish(&self, kind: CascadeEventKind) -> CascadeEvent {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let event = CascadeEvent::now(seq, kind);
        self.stats.total_published.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(event.clone()).is_err() {
            self.stats.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        event
    }

    /// The sequence number the next published event will carry.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Snapshot of the current counters.
    #[must_use]
    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            total_published: self.stats.total_published.load(Ordering::Relaxed),
            active_subscribers: self.tx.receiver_count(),
            dropped_events: self.stats.dropped_events.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle for receiving events from an [`EventBus`].
pub struct EventSubscription {
    rx: broadcast::Receiver<CascadeEvent>,
    stats: Arc<StatsInner>,
}

impl EventSubscription {
    /// Receive the next event, waiting asynchronously.
    ///
    /// Returns `None` once the bus is dropped and the buffer is drained.
    /// A lagged subscriber skips ahead, counting the loss in the stats.
    pub async fn recv(&mut self) -> Option<CascadeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.stats.dropped_events.fetch_add(n, Ordering::Relaxed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive without blocking.
    pub fn try_recv(&mut self) -> Option<CascadeEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                self.stats.dropped_events.fetch_add(n, Ordering::Relaxed);
                self.rx.try_recv().ok()
            }
            Err(_) => None,
        }
    }

    /// Drain everything currently buffered, without waiting.
    pub fn drain_available(&mut self) -> Vec<CascadeEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Count events by wire type name, for trend summaries.
#[must_use]
pub fn counts_by_type(events: &[CascadeEvent]) -> BTreeMap<&'static str, u64> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.kind.type_name()).or_default() += 1;
    }
    counts
}
