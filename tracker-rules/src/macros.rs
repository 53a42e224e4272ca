// src/macros.rs

/// Logs one line tagged with a component. The component becomes the record
/// target, so the fern format prints it in the `[target]` slot:
/// ```text
/// [2026-04-25T16:32:10+02:00][DEBUG][engine][pid=4568][tid=ThreadId(3)] loaded signature TRC-107
/// ```
/// Usage:
/// ```ignore
/// rules_log!(Level::Info, "engine", "engine started");
/// rules_log!(Level::Error, "config", "config load failed: {}", err);
/// ```
#[macro_export]
macro_rules! rules_log {
    ($level:expr, $component:expr, $($arg:tt)+) => {
        log::log!(target: $component, $level, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::Mutex;

    /// A tiny in-memory logger that captures up to DEBUG.
    struct MemoryLogger {
        buffer: Mutex<String>,
    }

    impl MemoryLogger {
        const fn new() -> Self {
            MemoryLogger { buffer: Mutex::new(String::new()) }
        }

        fn take(&self) -> String {
            std::mem::take(&mut *self.buffer.lock().unwrap())
        }
    }

    static LOGGER: MemoryLogger = MemoryLogger::new();

    impl Log for MemoryLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Debug
        }
        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                let mut buf = self.buffer.lock().unwrap();
                buf.push_str(&format!("[{}][{}] {}\n", record.level(), record.target(), record.args()));
            }
        }
        fn flush(&self) {}
    }

    #[test]
    fn rules_log_uses_component_as_target() {
        // other unit tests may log concurrently; only look for our line
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Debug);

        rules_log!(Level::Debug, "engine", "Answer={}!", 42);

        let output = LOGGER.take();
        assert!(output.contains("[DEBUG][engine] Answer=42!"), "missing line: {}", output);
    }
}
