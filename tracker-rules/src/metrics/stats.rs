// src/metrics/stats.rs

//! Engine counters.
//!
//! Three monotonic counters written by the engine and read by whoever polls
//! them (the Prometheus exporter, the shutdown summary, tests). Plain atomics:
//! no locks on the hot path and no reset during normal operation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

pub const EVENTS_TOTAL: &str = "tracker_rules_events_total";
pub const DETECTIONS_TOTAL: &str = "tracker_rules_detections_total";
pub const SIGNATURES_TOTAL: &str = "tracker_rules_signatures_total";

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Add one and return the new value.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    /// Events pulled off the input stream.
    pub events: Counter,
    /// Signatures that passed registration.
    pub signatures: Counter,
    /// Findings accepted by the sink.
    pub detections: Counter,
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub events: u64,
    pub signatures: u64,
    pub detections: u64,
}

impl Stats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events: self.events.get(),
            signatures: self.signatures.get(),
            detections: self.detections.get(),
        }
    }

    /// Register help text with the installed `metrics` recorder.
    pub fn describe() {
        metrics::describe_counter!(EVENTS_TOTAL, "events ingested by tracker-rules");
        metrics::describe_counter!(DETECTIONS_TOTAL, "detections made by tracker-rules");
        metrics::describe_gauge!(SIGNATURES_TOTAL, "signatures loaded");
    }

    /// Push current values into the `metrics` recorder. Counters are set
    /// absolutely so repeated publishing never double counts.
    pub fn publish(&self) {
        let snap = self.snapshot();
        metrics::counter!(EVENTS_TOTAL).absolute(snap.events);
        metrics::counter!(DETECTIONS_TOTAL).absolute(snap.detections);
        metrics::gauge!(SIGNATURES_TOTAL).set(snap.signatures as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(Stats::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        stats.events.increment();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.events.get(), 4_000);
        assert_eq!(stats.snapshot(), StatsSnapshot { events: 4_000, signatures: 0, detections: 0 });
    }

    #[test]
    fn publish_renders_prometheus_names() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let stats = Stats::default();
        stats.events.increment();
        stats.events.increment();
        stats.signatures.increment();
        stats.detections.increment();

        metrics::with_local_recorder(&recorder, || {
            Stats::describe();
            stats.publish();
            // publishing twice must not double the counters
            stats.publish();
        });

        let out = handle.render();
        assert!(out.contains("tracker_rules_events_total 2"), "{out}");
        assert!(out.contains("tracker_rules_detections_total 1"), "{out}");
        assert!(out.contains("tracker_rules_signatures_total 1"), "{out}");
    }
}
