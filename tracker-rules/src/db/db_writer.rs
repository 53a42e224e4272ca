// src/db/db_writer.rs

use log::Level;
use rusqlite::Connection;
use std::{
    thread::sleep,
    time::{Duration, Instant},
};
use thiserror::Error;

use super::batch_inserts::BatchInsert;
use crate::rules_log;

/// A batched writer for SQLite.
/// Performs all DB work synchronously to avoid holding &Connection across .await.
pub struct DbWriter<T> {
    pub conn: Connection,
    pub rx: tokio::sync::mpsc::Receiver<T>,
    pub flush_interval: Duration,
    pub batch_size: usize,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),
}

impl<T> DbWriter<T>
where
    T: BatchInsert<T> + Send + 'static,
{
    /// Start the writer loop; call inside tokio::spawn. Returns once every
    /// sender is gone and the last batch is flushed.
    pub async fn run(mut self) -> u64 {
        let mut buffer = Vec::with_capacity(self.batch_size);
        let mut interval = tokio::time::interval(self.flush_interval);
        let mut written = 0;

        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(rec) => {
                        buffer.push(rec);
                        if buffer.len() >= self.batch_size {
                            written += self.flush_logged(&mut buffer);
                        }
                    }
                    None => {
                        written += self.flush_logged(&mut buffer);
                        break;
                    }
                },
                _ = interval.tick() => {
                    written += self.flush_logged(&mut buffer);
                }
            }
        }
        rules_log!(Level::Info, "database", "writer finished, {} row(s) written", written);
        written
    }

    fn flush_logged(&mut self, buffer: &mut Vec<T>) -> u64 {
        let pending = buffer.len() as u64;
        match self.flush_sync(buffer) {
            Ok(()) => pending,
            Err(e) => {
                rules_log!(Level::Error, "database", "dropping {} row(s): {}", pending, e);
                buffer.clear();
                0
            }
        }
    }

    /// Synchronous flush with retry + backoff.
    fn flush_sync(&mut self, buffer: &mut Vec<T>) -> Result<(), DbError> {
        let start = Instant::now();
        let mut attempts = 0;

        while !buffer.is_empty() {
            match self.conn.transaction() {
                Ok(tx) => {
                    {
                        let mut stmt = tx.prepare_cached(T::insert_sql())?;
                        for rec in buffer.iter() {
                            T::bind_and_execute(&mut stmt, rec)?;
                        }
                    }
                    tx.commit()?;
                    rules_log!(
                        Level::Debug,
                        "database",
                        "flushed {} row(s) in {:?}",
                        buffer.len(),
                        start.elapsed()
                    );
                    buffer.clear();
                }
                Err(e) if e.to_string().contains("database is locked") && attempts < 5 => {
                    attempts += 1;
                    sleep(Duration::from_millis(50 * attempts));
                }
                Err(e) => return Err(DbError::Sql(e)),
            }
        }
        Ok(())
    }
}
