pub mod exporter;
pub mod stats;

pub use exporter::install_prometheus;
pub use stats::{Counter, Stats, StatsSnapshot};
