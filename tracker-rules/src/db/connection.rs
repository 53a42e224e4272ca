// src/db/connection.rs
//! Opening and initialising the findings database.

use std::{path::Path, time::Duration};

use log::Level;
use rusqlite::Connection;

use crate::rules_log;

const SCHEMA: &str = include_str!("../../resources/schema.sql");

pub fn open_db_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_millis(1_000))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

/// Open `path` and make sure the schema exists. Safe on an existing file.
pub fn init_database(path: &Path) -> rusqlite::Result<Connection> {
    let conn = open_db_connection(path)?;
    conn.pragma_update(None, "journal_size_limit", 50_000_000_i64)?;
    conn.execute_batch(SCHEMA)?;
    rules_log!(Level::Info, "database", "database ready at {}", path.display());
    Ok(conn)
}
