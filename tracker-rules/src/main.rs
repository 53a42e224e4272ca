// src/main.rs

//! tracker-rules entry-point.
//!
//! 1. Load configuration & set up structured logging
//! 2. Start the Tokio runtime: Prometheus exporter, SQLite writer, Ctrl-C
//! 3. Register the bundled signatures with the engine
//! 4. Start the reporter and the input listener threads
//! 5. Run the engine until the input ends or a stop is requested
//! 6. Drain the reporter and the writer, then log the final counters

// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::{Context, Result};
use chrono::Local;
use crossbeam::channel;
use fern::Dispatch;
use log::{Level, LevelFilter};
use std::{
    path::{Path, PathBuf},
    process,
    sync::Arc,
    thread,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc as async_mpsc;

// ───── local imports ────────────────────────────────────────────────────────
use rules::comms::{INPUT_HELP, InputError, InputOptions, JsonListener, Listener};
use rules::config::{self, Config, LoggingConfig};
use rules::db::{init_database, spawn_writer};
use rules::engine::{Engine, sink};
use rules::metrics::{Stats, install_prometheus};
use rules::output::Reporter;
use rules::rules_log;
use rules::signatures;

// ───── helpers ──────────────────────────────────────────────────────────────

/// Directory that contains the running executable.
fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine exe path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("executable must live in some directory")
}

/// First CLI argument, or `config.toml` next to the executable.
fn config_path(exe_dir: &Path) -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| exe_dir.join("config.toml"))
}

/// Configure global logging as requested in `[logging]`. Logs go to stderr so
/// stdout stays a clean stream of findings.
fn setup_logging(exe_dir: &Path, logging: &LoggingConfig) -> Result<(), fern::InitError> {
    let level = match logging.level.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let log_path = logging
        .enable
        .then(|| exe_dir.join(logging.file.as_deref().unwrap_or("tracker-rules.log")));

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = log_path {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

// ───── main ─────────────────────────────────────────────────────────────────

fn run(cfg: Config, input: InputOptions) -> Result<()> {
    // 1 ─ Runtime for the async side: exporter, DB writer, Ctrl-C
    let rt = Runtime::new().context("tokio runtime creation failed")?;
    let stats = Arc::new(Stats::default());

    if let Some(m) = &cfg.metrics {
        let _guard = rt.enter();
        install_prometheus(m.listen, Arc::clone(&stats), m.publish_interval)
            .context("installing prometheus exporter")?;
    }

    // 2 ─ Findings store
    let (db_tx, writer) = match &cfg.output.database {
        Some(path) => {
            let conn = init_database(path).with_context(|| format!("opening {}", path.display()))?;
            let (tx, rx) = async_mpsc::channel(10_000);
            let handle = spawn_writer(rt.handle(), conn, rx, cfg.output.flush_interval, cfg.output.batch_size);
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    // 3 ─ Engine
    let (finding_sink, findings) = sink::bounded(cfg.engine.sink_capacity, Arc::clone(&stats));
    let engine = Engine::new(
        cfg.engine.engine_config(),
        finding_sink,
        signatures::load(&cfg.engine.signatures),
    );
    if engine.loaded().is_empty() {
        rules_log!(Level::Warn, "main", "no signatures loaded, events will only be counted");
    }

    let stop = engine.stop_handle();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            rules_log!(Level::Warn, "main", "interrupt received, stopping");
            stop.stop();
        }
    });

    // 4 ─ Reporter & listener
    let mut reporter = Reporter::stdout(cfg.output.stdout, db_tx);
    let reporter = thread::Builder::new()
        .name("reporter".into())
        .spawn(move || reporter.run(findings))
        .context("spawning reporter")?;

    let (events_tx, events_rx) = channel::bounded(cfg.engine.event_capacity);
    Box::new(JsonListener::from_options(&input)?)
        .spawn(events_tx)
        .context("spawning listener")?;

    // 5 ─ Dispatch until the input closes
    let snapshot = thread::Builder::new()
        .name("engine".into())
        .spawn(move || engine.run(events_rx))
        .context("spawning engine")?
        .join()
        .map_err(|_| anyhow::anyhow!("engine thread panicked"))?;

    // 6 ─ Drain
    let reported = reporter.join().map_err(|_| anyhow::anyhow!("reporter thread panicked"))?;
    if let Some(writer) = writer {
        let rows = rt.block_on(writer).context("database writer task failed")?;
        rules_log!(Level::Info, "main", "{} finding(s) stored", rows);
    }

    rules_log!(
        Level::Info,
        "main",
        "done: events={} signatures={} detections={} reported={}",
        snapshot.events,
        snapshot.signatures,
        snapshot.detections,
        reported
    );
    rt.shutdown_background();
    Ok(())
}

fn main() -> Result<()> {
    let exe_dir = exe_dir()?;
    let path = config_path(&exe_dir);
    let cfg = config::load_or_default(&path).with_context(|| format!("loading {}", path.display()))?;

    setup_logging(&exe_dir, &cfg.logging).context("logging setup failed")?;
    rules_log!(Level::Info, "main", "tracker-rules starting");

    let input = match InputOptions::parse(&cfg.input.options) {
        Ok(input) => input,
        Err(InputError::Help) => {
            println!("{INPUT_HELP}");
            return Ok(());
        }
        Err(e) => return Err(e).context("invalid [input] options"),
    };

    run(cfg, input)
}
