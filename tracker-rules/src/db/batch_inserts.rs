// src/db/batch_inserts.rs

use chrono::Utc;
use rusqlite::{Result as SqlResult, Statement, params};
use serde::Serialize;
use shared::Finding;

/// Defines how to insert one record of type `T` with a prepared statement.
pub trait BatchInsert<T> {
    fn insert_sql() -> &'static str;
    fn bind_and_execute(stmt: &mut Statement<'_>, record: &T) -> SqlResult<()>;
}

/// FINDINGS
impl BatchInsert<Finding> for Finding {
    fn insert_sql() -> &'static str {
        "INSERT INTO findings \
           (recorded_at, event_ts, sig_id, sig_name, severity, event_name, \
            origin, pid, process_name, container_id, data_json, event_json) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, rec: &Finding) -> SqlResult<()> {
        let data_json = to_json(&rec.data)?;
        let event_json = to_json(&rec.event)?;
        stmt.execute(params![
            Utc::now().timestamp_micros(),
            rec.event.timestamp as i64,
            rec.sig_metadata.id,
            rec.sig_metadata.name,
            rec.sig_metadata.severity(),
            rec.event.name,
            rec.event.resolved_origin().as_str(),
            rec.event.process_id as i64,
            rec.event.process_name,
            rec.event.container_id,
            data_json,
            event_json,
        ])?;
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> SqlResult<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
