// src/engine/dispatch.rs

//! Dispatch engine
//! ===============
//! Owns the registered signatures and the selector index, drains the event
//! stream and hands every event to the signatures subscribed to it.
//!
//! Dispatch modes
//! ──────────────
//!   • **sequential**    ← one thread; for each event the matching signatures
//!     run one after another. Default.
//!   • **per-signature** ← one worker thread per signature, each fed by its own
//!     bounded FIFO. The dispatch thread only routes, so a slow signature
//!     delays others only once its queue is full.
//!
//! In both modes a signature sees events in exactly the order they arrived.
//!
//! Failure isolation
//! ─────────────────
//! Errors and panics coming out of `on_event` / `on_signal` / `close` are
//! logged with the signature and event identity and go no further.
//!
//! Shutdown
//! ────────
//! When the input closes, or a stop is requested, every signature gets
//! `Signal::SourceComplete`, then every signature is closed, then `run`
//! returns the final counters.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Barrier},
    thread,
};

use crossbeam::channel::{self, Receiver, Sender, select};
use shared::constants::SOURCE_TRACKER;
use shared::{Event, Signal, SignatureMetadata};

use super::selector::SelectorIndex;
use super::signature::{Signature, SignatureContext};
use super::sink::FindingSink;
use crate::metrics::{Stats, StatsSnapshot};
use crate::rules_log;
use log::Level;

/// How events are fanned out to signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    #[default]
    Sequential,
    PerSignature,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub mode: DispatchMode,
    /// Per-signature queue depth in `PerSignature` mode.
    pub worker_queue: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { mode: DispatchMode::Sequential, worker_queue: 1_024 }
    }
}

/// Requests an orderly stop of a running engine. Cheap to clone.
#[derive(Clone)]
pub struct StopHandle(Sender<()>);

impl StopHandle {
    /// Idempotent; later calls are no-ops.
    pub fn stop(&self) {
        let _ = self.0.try_send(());
    }
}

/// A registered signature and the identity used in its log lines.
struct Slot {
    metadata: SignatureMetadata,
    signature: Box<dyn Signature>,
    closed: bool,
}

impl Slot {
    fn label(&self) -> String {
        format!("{} ({})", self.metadata.id, self.metadata.name)
    }

    fn deliver(&mut self, event: &Event) {
        let sig = &mut self.signature;
        match panic::catch_unwind(AssertUnwindSafe(|| sig.on_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => rules_log!(
                Level::Error,
                "engine",
                "signature {} failed on event {} (ts={}, pid={}): {}",
                self.label(),
                event.name,
                event.timestamp,
                event.process_id,
                e
            ),
            Err(_) => rules_log!(
                Level::Error,
                "engine",
                "signature {} panicked on event {} (ts={}, pid={})",
                self.label(),
                event.name,
                event.timestamp,
                event.process_id
            ),
        }
    }

    fn signal(&mut self, signal: &Signal) {
        let sig = &mut self.signature;
        match panic::catch_unwind(AssertUnwindSafe(|| sig.on_signal(signal))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                rules_log!(Level::Error, "engine", "signature {} failed on signal {:?}: {}", self.label(), signal, e)
            }
            Err(_) => {
                rules_log!(Level::Error, "engine", "signature {} panicked on signal {:?}", self.label(), signal)
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let sig = &mut self.signature;
        if panic::catch_unwind(AssertUnwindSafe(|| sig.close())).is_err() {
            rules_log!(Level::Error, "engine", "signature {} panicked on close", self.label());
        }
    }
}

pub struct Engine {
    slots: Vec<Slot>,
    index: SelectorIndex,
    stats: Arc<Stats>,
    config: EngineConfig,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl Engine {
    /// Register `candidates`: `init` then `selected_events` on each. A
    /// signature failing either step is logged and left out; the others are
    /// unaffected. Only successes count as loaded.
    pub fn new(config: EngineConfig, sink: FindingSink, candidates: Vec<Box<dyn Signature>>) -> Self {
        let stats = Arc::clone(sink.stats());
        let mut slots = Vec::with_capacity(candidates.len());
        let mut index = SelectorIndex::new();

        for mut signature in candidates {
            let metadata = signature.metadata();

            if let Err(e) = signature.init(SignatureContext { callback: sink.clone() }) {
                rules_log!(
                    Level::Warn,
                    "engine",
                    "failed to init signature {} ({}): {}",
                    metadata.id,
                    metadata.name,
                    e
                );
                continue;
            }

            let selectors = match signature.selected_events() {
                Ok(selectors) => selectors,
                Err(e) => {
                    rules_log!(
                        Level::Warn,
                        "engine",
                        "failed to get selected events of signature {} ({}): {}",
                        metadata.id,
                        metadata.name,
                        e
                    );
                    // Initialised but never used: release it now.
                    let mut slot = Slot { metadata, signature, closed: false };
                    slot.close();
                    continue;
                }
            };

            let slot_id = slots.len();
            for selector in &selectors {
                if let Err(e) = index.insert(selector, slot_id) {
                    rules_log!(Level::Warn, "engine", "signature {} ({}): {}", metadata.id, metadata.name, e);
                }
            }

            rules_log!(
                Level::Debug,
                "engine",
                "loaded signature {} ({}) with {} selector(s)",
                metadata.id,
                metadata.name,
                selectors.len()
            );
            slots.push(Slot { metadata, signature, closed: false });
            stats.signatures.increment();
        }

        let (stop_tx, stop_rx) = channel::bounded(1);
        Self { slots, index, stats, config, stop_tx, stop_rx }
    }

    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop_tx.clone())
    }

    /// Metadata of every loaded signature, in registration order.
    pub fn loaded(&self) -> Vec<&SignatureMetadata> {
        self.slots.iter().map(|s| &s.metadata).collect()
    }

    /// Drain `events` until it closes or a stop is requested, then signal and
    /// close every signature. Blocking: run it on its own thread.
    pub fn run(mut self, events: Receiver<Event>) -> StatsSnapshot {
        rules_log!(
            Level::Info,
            "engine",
            "dispatching to {} signature(s) over {} selector(s), mode={:?}",
            self.slots.len(),
            self.index.len(),
            self.config.mode
        );

        match self.config.mode {
            DispatchMode::Sequential => self.run_sequential(events),
            DispatchMode::PerSignature => self.run_per_signature(events),
        }

        let snap = self.stats.snapshot();
        rules_log!(
            Level::Info,
            "engine",
            "engine stopped: events={} signatures={} detections={}",
            snap.events,
            snap.signatures,
            snap.detections
        );
        snap
    }

    /// Next event, or `None` on end of stream / stop request.
    fn next_event(events: &Receiver<Event>, stop: &Receiver<()>) -> Option<Event> {
        select! {
            recv(events) -> msg => msg.ok(),
            recv(stop) -> _ => {
                rules_log!(Level::Info, "engine", "stop requested");
                None
            }
        }
    }

    fn run_sequential(&mut self, events: Receiver<Event>) {
        let stop = self.stop_rx.clone();
        let mut matched = Vec::new();

        while let Some(event) = Self::next_event(&events, &stop) {
            self.stats.events.increment();
            self.index.lookup(&event, &mut matched);
            for &slot in &matched {
                self.slots[slot].deliver(&event);
            }
        }
        drop(events);

        let signal = Signal::SourceComplete(SOURCE_TRACKER.to_string());
        for slot in &mut self.slots {
            slot.signal(&signal);
        }
        for slot in &mut self.slots {
            slot.close();
        }
    }

    fn run_per_signature(&mut self, events: Receiver<Event>) {
        let stop = self.stop_rx.clone();
        let signal = Signal::SourceComplete(SOURCE_TRACKER.to_string());
        let barrier = Barrier::new(self.slots.len());
        let queue_len = self.config.worker_queue.max(1);

        let Self { slots, index, stats, .. } = self;

        thread::scope(|scope| {
            let mut queues = Vec::with_capacity(slots.len());

            for slot in slots.iter_mut() {
                let (tx, rx) = channel::bounded::<Arc<Event>>(queue_len);
                queues.push(tx);
                let (signal, barrier) = (&signal, &barrier);
                scope.spawn(move || {
                    for event in rx {
                        slot.deliver(&event);
                    }
                    slot.signal(signal);
                    // every signature is signalled before any is closed
                    barrier.wait();
                    slot.close();
                });
            }

            let mut matched = Vec::new();
            while let Some(event) = Self::next_event(&events, &stop) {
                stats.events.increment();
                index.lookup(&event, &mut matched);
                if matched.is_empty() {
                    continue;
                }
                let event = Arc::new(event);
                for &slot in &matched {
                    // Workers only exit once their queue is dropped.
                    let _ = queues[slot].send(Arc::clone(&event));
                }
            }
            drop(events);
            // Closing the queues lets each worker drain, signal and close.
            drop(queues);
        });
    }
}

impl Drop for Engine {
    /// An engine dropped without `run` still releases its signatures.
    fn drop(&mut self) {
        for slot in &mut self.slots {
            slot.close();
        }
    }
}
