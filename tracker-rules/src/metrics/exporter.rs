// src/metrics/exporter.rs

//! Prometheus pull endpoint.
//!
//! The engine only maintains [`Stats`]; this module installs the global
//! `metrics` recorder with an HTTP listener and republishes the counters on a
//! fixed interval. Must be called from inside a Tokio runtime.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use log::Level;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tokio::task::JoinHandle;

use super::stats::Stats;
use crate::rules_log;

/// Install the exporter on `listen` and spawn the publisher task.
pub fn install_prometheus(
    listen: SocketAddr,
    stats: Arc<Stats>,
    interval: Duration,
) -> Result<JoinHandle<()>, BuildError> {
    PrometheusBuilder::new().with_http_listener(listen).install()?;
    Stats::describe();
    rules_log!(Level::Info, "metrics", "metrics endpoint listening on http://{}/metrics", listen);

    Ok(tokio::spawn(publish_every(stats, interval)))
}

async fn publish_every(stats: Arc<Stats>, interval: Duration) {
    let mut tick = tokio::time::interval(interval);
    loop {
        tick.tick().await;
        stats.publish();
    }
}
