// src/comms/listener.rs

//! Listener abstraction + the JSON-lines tracer listener.
//! -----------------------------------------------------------------------------
//! A **listener** ingests raw telemetry from one source on its own thread and
//! pushes decoded [`Event`]s into the engine's bounded input channel:
//!   • a full channel blocks the listener, never drops an event
//!   • dropping the sender at the end of input is what tells the engine the
//!     stream is over

use std::{
    io::{self, BufRead},
    thread::{self, JoinHandle},
};

use crossbeam::channel::Sender;
use log::Level;
use shared::Event;

use super::input::{InputError, InputFormat, InputOptions};
use crate::rules_log;

/// Lines seen by a listener over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub forwarded: u64,
    pub skipped: u64,
}

// ============================================================================
// 1 ▸ Listener trait – uniform way to spawn them
// ============================================================================

pub trait Listener: Send + 'static {
    /// Display name for logs and the thread name.
    fn name(&self) -> &'static str;

    /// Pull events from the source until it is exhausted or the engine goes
    /// away. Returning drops `tx`.
    fn ingest(self: Box<Self>, tx: Sender<Event>) -> IngestSummary;

    /// Run `ingest` on a dedicated named thread.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> io::Result<JoinHandle<IngestSummary>> {
        let name = self.name();
        thread::Builder::new().name(format!("listener-{name}")).spawn(move || {
            rules_log!(Level::Info, "listener", "listener '{}' started", name);
            let summary = self.ingest(tx);
            rules_log!(
                Level::Info,
                "listener",
                "listener '{}' exited: {} forwarded, {} skipped",
                name,
                summary.forwarded,
                summary.skipped
            );
            summary
        })
    }
}

// ============================================================================
// 2 ▸ JSON lines
// ============================================================================

/// Newline-delimited JSON events from a file or stdin.
pub struct JsonListener {
    reader: Box<dyn BufRead + Send>,
}

impl JsonListener {
    pub fn new(reader: Box<dyn BufRead + Send>) -> Self {
        Self { reader }
    }

    /// Build the listener the options describe.
    pub fn from_options(opts: &InputOptions) -> Result<Self, InputError> {
        match opts.format {
            InputFormat::Json => Ok(Self::new(opts.open()?)),
        }
    }
}

impl Listener for JsonListener {
    fn name(&self) -> &'static str {
        "tracker-json"
    }

    fn ingest(mut self: Box<Self>, tx: Sender<Event>) -> IngestSummary {
        let mut summary = IngestSummary::default();
        let mut line = Vec::new();

        // Lines are decoded as bytes so a non-UTF-8 line is skipped, not fatal.
        loop {
            line.clear();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    rules_log!(Level::Error, "listener", "reading input failed: {}", e);
                    break;
                }
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<Event>(&line) {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        rules_log!(Level::Warn, "listener", "engine input closed, stopping listener");
                        break;
                    }
                    summary.forwarded += 1;
                }
                Err(e) => {
                    let text = String::from_utf8_lossy(&line);
                    rules_log!(Level::Error, "listener", "invalid json in {}: {}", text.trim_end(), e);
                    summary.skipped += 1;
                }
            }
        }
        summary
    }
}
