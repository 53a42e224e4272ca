// tests/pipeline.rs

use std::{io::Write, sync::Arc, thread, time::Duration};

use crossbeam::channel;
use rusqlite::Connection;
use tempfile::{NamedTempFile, TempDir};
use tokio::{runtime::Handle, sync::mpsc};

use rules::comms::{InputOptions, JsonListener, Listener};
use rules::db::{init_database, spawn_writer};
use rules::engine::{Engine, EngineConfig, sink};
use rules::metrics::{Stats, StatsSnapshot};
use rules::output::Reporter;
use rules::signatures;
use shared::{Event, Finding, Origin, SignatureMetadata};

const EVENTS: &str = r#"{"timestamp":10,"processId":42,"processName":"sh","containerId":"c0ffee","eventName":"security_file_open","args":[{"name":"pathname","type":"const char*","value":"/etc/ld.so.preload"},{"name":"flags","type":"string","value":"O_WRONLY|O_TRUNC"}]}
{"timestamp":11,"processId":43,"eventName":"ptrace","args":[{"name":"request","type":"long","value":"PTRACE_PEEKTEXT"}]}
this line is not an event
{"timestamp":12,"processId":44,"eventName":"magic_write","args":[{"name":"pathname","type":"const char*","value":"/tmp/.x/payload"},{"name":"bytes","type":"bytes","value":"f0VMRgIBAQA="}]}
{"timestamp":13,"processId":45,"eventName":"ptrace","args":[{"name":"request","type":"long","value":"PTRACE_POKETEXT"}]}
"#;

fn finding(id: &str, ts: u64) -> Finding {
    let meta = SignatureMetadata { id: id.into(), name: format!("sig {id}"), ..Default::default() };
    let event = Event::new("openat").with_timestamp(ts).with_origin(Origin::Container).with_arg("pathname", "/x");
    Finding::new(meta, &event).with_data("k", "v")
}

#[test]
fn json_file_to_findings() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(EVENTS.as_bytes()).unwrap();
    file.flush().unwrap();

    let opts = InputOptions::parse(&[format!("file:{}", file.path().display()), "format:json".to_string()]).unwrap();
    let listener = Box::new(JsonListener::from_options(&opts).unwrap());

    let stats = Arc::new(Stats::default());
    let (sink, findings) = sink::bounded(4, Arc::clone(&stats));
    let engine = Engine::new(EngineConfig::default(), sink, signatures::load(&[]));

    let reporter = thread::spawn(move || {
        let mut reporter = Reporter::new(Some(Vec::new()), None);
        reporter.run(findings);
        reporter.into_inner().unwrap()
    });

    let (tx, rx) = channel::bounded(2);
    let listening = listener.spawn(tx).unwrap();
    let snap = engine.run(rx);
    let summary = listening.join().unwrap();
    let out = String::from_utf8(reporter.join().unwrap()).unwrap();

    assert_eq!(summary.forwarded, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(snap, StatsSnapshot { events: 4, signatures: 6, detections: 3 });

    let printed: Vec<Finding> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    let mut ids: Vec<&str> = printed.iter().map(|f| f.sig_metadata.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["TRC-1015", "TRC-103", "TRC-107"]);

    let preload = printed.iter().find(|f| f.sig_metadata.id == "TRC-107").unwrap();
    assert_eq!(preload.event.process_id, 42);
    assert_eq!(preload.event.resolved_origin(), Origin::Container);
}

#[tokio::test]
async fn findings_are_batched_into_sqlite() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("findings.db");
    let conn = init_database(&db).unwrap();

    let (tx, rx) = mpsc::channel::<Finding>(16);
    let writer = spawn_writer(&Handle::current(), conn, rx, Duration::from_millis(20), 2);

    for (n, id) in ["TRC-107", "TRC-103", "TRC-107"].into_iter().enumerate() {
        tx.send(finding(id, n as u64)).await.unwrap();
    }
    drop(tx);
    assert_eq!(writer.await.unwrap(), 3);

    let conn = Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM findings WHERE sig_id = 'TRC-107'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);

    let (origin, data): (String, String) = conn
        .query_row("SELECT origin, data_json FROM findings WHERE sig_id = 'TRC-103'", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(origin, "container");
    assert_eq!(data, r#"{"k":"v"}"#);
}

#[test]
fn reporter_forwards_to_the_writer() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("findings.db");
    let conn = init_database(&db).unwrap();

    let (db_tx, db_rx) = mpsc::channel(1);
    let writer = spawn_writer(rt.handle(), conn, db_rx, Duration::from_millis(10), 100);

    let (tx, rx) = channel::unbounded();
    for n in 0..5 {
        tx.send(finding("TRC-1019", n)).unwrap();
    }
    drop(tx);

    let mut reporter = Reporter::<Vec<u8>>::new(None, Some(db_tx));
    assert_eq!(reporter.run(rx), 5);
    assert_eq!(rt.block_on(writer).unwrap(), 5);

    // reopening an existing database keeps its rows
    let conn = init_database(&db).unwrap();
    let rows: i64 = conn.query_row("SELECT COUNT(*) FROM findings", [], |r| r.get(0)).unwrap();
    assert_eq!(rows, 5);
}
