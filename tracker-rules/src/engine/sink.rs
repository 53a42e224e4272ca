// src/engine/sink.rs

//! Finding sink.
//!
//! Bounded multi-producer queue between signatures and the reporter. A full
//! queue blocks the emitting signature, and with it the dispatch loop; a
//! finding is never dropped to make room. The detections counter moves only
//! once the queue has accepted the finding.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use shared::Finding;

use super::signature::SignatureError;
use crate::metrics::Stats;

#[derive(Clone)]
pub struct FindingSink {
    tx: Sender<Finding>,
    stats: Arc<Stats>,
}

impl FindingSink {
    pub fn new(tx: Sender<Finding>, stats: Arc<Stats>) -> Self {
        Self { tx, stats }
    }

    /// Blocks while the queue is full. Fails only once the consumer is gone.
    pub fn emit(&self, finding: Finding) -> Result<(), SignatureError> {
        self.tx.send(finding).map_err(|_| SignatureError::SinkClosed)?;
        self.stats.detections.increment();
        Ok(())
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }
}

/// Bounded sink plus its consuming end.
pub fn bounded(capacity: usize, stats: Arc<Stats>) -> (FindingSink, Receiver<Finding>) {
    let (tx, rx) = channel::bounded(capacity);
    (FindingSink::new(tx, stats), rx)
}
