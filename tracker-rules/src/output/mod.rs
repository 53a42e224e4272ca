// src/output/mod.rs

//! Finding reporter.
//!
//! Sole consumer of the finding sink. Each finding is written as one JSON
//! line (when enabled) and handed to the SQLite writer (when configured).
//! Draining stops when every sink handle is dropped, i.e. once the engine
//! has closed all signatures.

use std::io::{self, Write};

use crossbeam::channel::Receiver;
use log::Level;
use shared::Finding;
use tokio::sync::mpsc as async_mpsc;

use crate::rules_log;

pub struct Reporter<W: Write> {
    out: Option<W>,
    db_tx: Option<async_mpsc::Sender<Finding>>,
}

impl Reporter<io::Stdout> {
    pub fn stdout(enabled: bool, db_tx: Option<async_mpsc::Sender<Finding>>) -> Self {
        Self::new(enabled.then(io::stdout), db_tx)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: Option<W>, db_tx: Option<async_mpsc::Sender<Finding>>) -> Self {
        Self { out, db_tx }
    }

    /// Drain `rx` until it closes. Must not run inside the async runtime:
    /// forwarding to the database blocks on the writer's queue.
    pub fn run(&mut self, rx: Receiver<Finding>) -> u64 {
        let mut reported = 0;
        for finding in rx {
            self.print(&finding);
            self.forward(finding);
            reported += 1;
        }
        if let Some(out) = self.out.as_mut() {
            let _ = out.flush();
        }
        // Dropping the sender lets the writer flush and exit.
        self.db_tx = None;
        rules_log!(Level::Info, "output", "reporter finished, {} finding(s)", reported);
        reported
    }

    fn print(&mut self, finding: &Finding) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        let res = serde_json::to_writer(&mut *out, finding)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"));
        if let Err(e) = res {
            rules_log!(Level::Error, "output", "cannot print finding, disabling stdout: {}", e);
            self.out = None;
        }
    }

    fn forward(&mut self, finding: Finding) {
        let Some(tx) = self.db_tx.as_ref() else {
            return;
        };
        if tx.blocking_send(finding).is_err() {
            rules_log!(Level::Error, "output", "database writer is gone, findings no longer stored");
            self.db_tx = None;
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.out
    }
}
