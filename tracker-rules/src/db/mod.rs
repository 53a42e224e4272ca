// src/db/mod.rs
//! Findings store: schema setup, batched writer and `spawn_writer`.

pub mod batch_inserts;
pub mod connection;
pub mod db_writer;

use rusqlite::Connection;
use std::time::Duration;
use tokio::{runtime::Handle, sync::mpsc as async_mpsc, task::JoinHandle};

pub use batch_inserts::BatchInsert;
pub use connection::{init_database, open_db_connection};
pub use db_writer::{DbError, DbWriter};

/// Spawn a dedicated writer task for records of type `E`. The task ends, and
/// the handle resolves to the row count, once every sender is dropped.
pub fn spawn_writer<E>(
    rt: &Handle,
    conn: Connection,
    rx: async_mpsc::Receiver<E>,
    flush_interval: Duration,
    batch_size: usize,
) -> JoinHandle<u64>
where
    E: BatchInsert<E> + Send + 'static,
{
    rt.spawn(async move {
        DbWriter::<E> {
            conn,
            rx,
            flush_interval,
            batch_size,
        }
        .run()
        .await
    })
}
