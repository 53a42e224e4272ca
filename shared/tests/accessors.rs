//! Typed accessor behaviour against events decoded the way the input
//! listener decodes them: missing arguments and wrong runtime types come
//! back as errors, never panics.

use shared::args::{get_argument, get_bytes_argument, get_raw_addr_argument, get_str_argument};
use shared::helpers::{get_path_from_raw_addr, is_elf, is_file_write, is_unix_family};
use shared::{ArgError, Event, Origin};

fn file_open() -> Event {
    serde_json::from_str(
        r#"{"eventName": "security_file_open", "containerId": "abc",
            "args": [{"name": "pathname", "type": "const char*", "value": "/etc/ld.so.preload"},
                     {"name": "flags", "type": "string", "value": "O_WRONLY|O_CREAT"},
                     {"name": "dev", "type": "dev_t", "value": 271581185}]}"#,
    )
    .unwrap()
}

#[test]
fn string_lookup() {
    let ev = file_open();
    assert_eq!(ev.resolved_origin(), Origin::Container);
    assert_eq!(get_str_argument(&ev, "pathname"), Ok("/etc/ld.so.preload"));
    assert!(is_file_write(ev.get_str_argument("flags").unwrap()));
}

#[test]
fn missing_argument() {
    let ev = file_open();
    assert_eq!(
        get_argument(&ev, "new_path").unwrap_err(),
        ArgError::NotFound("new_path".into())
    );
}

#[test]
fn type_mismatch() {
    let ev = file_open();
    assert_eq!(
        get_str_argument(&ev, "dev"),
        Err(ArgError::TypeMismatch { name: "dev".into(), expected: "string", found: "int" })
    );
    assert!(matches!(
        get_bytes_argument(&ev, "pathname"),
        Err(ArgError::TypeMismatch { expected: "bytes", .. })
    ));
    assert!(matches!(
        ev.get_str_slice_argument("pathname"),
        Err(ArgError::TypeMismatch { expected: "string slice", .. })
    ));
    assert!(matches!(
        get_raw_addr_argument(&ev, "flags"),
        Err(ArgError::TypeMismatch { expected: "sockaddr", .. })
    ));
}

#[test]
fn first_argument_wins_on_duplicates() {
    let ev = Event::new("x").with_arg("a", "first").with_arg("a", "second");
    assert_eq!(ev.get_str_argument("a"), Ok("first"));
}

#[test]
fn bytes_and_sockaddr_from_json() {
    let ev: Event = serde_json::from_str(
        r#"{"eventName": "magic_write",
            "args": [{"name": "bytes", "type": "bytes", "value": [127, 69, 76, 70, 2]},
                     {"name": "remote_addr", "type": "struct sockaddr*",
                      "value": {"sa_family": "AF_UNIX", "sun_path": "/var/run/docker.sock"}}]}"#,
    )
    .unwrap();

    assert!(is_elf(ev.get_bytes_argument("bytes").unwrap()));

    let addr = ev.get_raw_addr_argument("remote_addr").unwrap();
    assert_eq!(is_unix_family(addr), Ok(true));
    assert_eq!(get_path_from_raw_addr(addr), Ok("/var/run/docker.sock"));
}

#[test]
fn out_of_range_bytes_are_not_bytes() {
    let ev: Event = serde_json::from_str(
        r#"{"eventName": "magic_write",
            "args": [{"name": "bytes", "type": "bytes", "value": [127, 300]}]}"#,
    )
    .unwrap();
    assert!(ev.get_bytes_argument("bytes").is_err());
}
