//! Event envelope.
//!
//! Every observation the tracer makes (exec, file open, ptrace, socket
//! connect...) travels as one [`Event`]: a source, an event name, where it
//! came from (host or container) and an ordered list of named arguments.
//! The engine never looks inside the arguments; signatures do, through the
//! typed accessors in [`crate::args`].
//!
//! ## JSON shape
//! Events are read from newline-delimited JSON in the tracer's format:
//!
//! ```json
//! {"timestamp": 1, "processId": 7, "containerId": "abc", "eventName": "security_file_open",
//!  "args": [{"name": "pathname", "type": "const char*", "value": "/etc/ld.so.preload"}]}
//! ```
//!
//! The declared argument `type` drives decoding (`bytes` are base64, string
//! arrays stay string arrays, `struct sockaddr*` becomes a string map).
//! Anything unrecognised is kept as opaque JSON instead of failing the event.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::{ORIGIN_CONTAINER, ORIGIN_HOST, SOURCE_TRACKER};

/// Where an event was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Host,
    Container,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Host => ORIGIN_HOST,
            Origin::Container => ORIGIN_CONTAINER,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One traced observation. Immutable once it leaves the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Nanoseconds since boot, as stamped by the tracer.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub process_id: u32,
    #[serde(default)]
    pub process_name: String,
    #[serde(default)]
    pub container_id: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(rename = "eventName")]
    pub name: String,
    /// Explicit origin. When absent it is derived from `container_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(default)]
    pub args: Vec<Argument>,
}

fn default_source() -> String {
    SOURCE_TRACKER.to_string()
}

impl Event {
    /// Bare tracer event with no arguments; origin is resolved from the
    /// (empty) container id, i.e. host, unless set explicitly.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            timestamp: 0,
            process_id: 0,
            process_name: String::new(),
            container_id: String::new(),
            source: default_source(),
            name: name.into(),
            origin: None,
            args: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append an argument; the declared type is inferred from the value.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push(Argument::new(name, value));
        self
    }

    /// Origin used for selector matching.
    pub fn resolved_origin(&self) -> Origin {
        match self.origin {
            Some(origin) => origin,
            None if !self.container_id.is_empty() => Origin::Container,
            None => Origin::Host,
        }
    }
}

/// A single named, typed event argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: String,
    pub value: ArgValue,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            arg_type: value.default_type().to_string(),
            value,
        }
    }
}

/// Runtime value of an argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Bytes(Vec<u8>),
    StrSlice(Vec<String>),
    /// Raw socket address as reported by the tracer (`sa_family`, `sun_path`, ...).
    SockAddr(BTreeMap<String, String>),
    Other(Value),
}

impl ArgValue {
    /// Short name used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ArgValue::Str(_) => "string",
            ArgValue::Int(_) => "int",
            ArgValue::UInt(_) => "uint",
            ArgValue::Bool(_) => "bool",
            ArgValue::Bytes(_) => "bytes",
            ArgValue::StrSlice(_) => "string slice",
            ArgValue::SockAddr(_) => "sockaddr",
            ArgValue::Other(_) => "opaque",
        }
    }

    fn default_type(&self) -> &'static str {
        match self {
            ArgValue::Str(_) => "const char*",
            ArgValue::Int(_) => "int",
            ArgValue::UInt(_) => "unsigned long",
            ArgValue::Bool(_) => "bool",
            ArgValue::Bytes(_) => "bytes",
            ArgValue::StrSlice(_) => "const char**",
            ArgValue::SockAddr(_) => "struct sockaddr*",
            ArgValue::Other(_) => "",
        }
    }

    /// Decode a JSON value using the tracer's declared argument type.
    pub fn from_json(arg_type: &str, value: Value) -> Self {
        match value {
            Value::String(s) if arg_type == "bytes" => match STANDARD.decode(s.as_bytes()) {
                Ok(bytes) => ArgValue::Bytes(bytes),
                Err(_) => ArgValue::Other(Value::String(s)),
            },
            Value::Array(items) if arg_type == "bytes" => bytes_from_array(items),
            Value::Array(items) => strings_from_array(items),
            Value::Object(map) if arg_type.contains("sockaddr") => sockaddr_from_object(map),
            Value::String(s) => ArgValue::Str(s),
            Value::Bool(b) => ArgValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ArgValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ArgValue::UInt(u)
                } else {
                    ArgValue::Other(Value::Number(n))
                }
            }
            other => ArgValue::Other(other),
        }
    }
}

fn bytes_from_array(items: Vec<Value>) -> ArgValue {
    let bytes: Option<Vec<u8>> = items
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect();
    match bytes {
        Some(bytes) => ArgValue::Bytes(bytes),
        None => ArgValue::Other(Value::Array(items)),
    }
}

fn strings_from_array(items: Vec<Value>) -> ArgValue {
    let strings: Option<Vec<String>> = items
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect();
    match strings {
        Some(strings) => ArgValue::StrSlice(strings),
        None => ArgValue::Other(Value::Array(items)),
    }
}

fn sockaddr_from_object(map: serde_json::Map<String, Value>) -> ArgValue {
    let mut addr = BTreeMap::new();
    for (k, v) in &map {
        let v = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return ArgValue::Other(Value::Object(map)),
        };
        addr.insert(k.clone(), v);
    }
    ArgValue::SockAddr(addr)
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ArgValue::Str(s) => serializer.serialize_str(s),
            ArgValue::Int(i) => serializer.serialize_i64(*i),
            ArgValue::UInt(u) => serializer.serialize_u64(*u),
            ArgValue::Bool(b) => serializer.serialize_bool(*b),
            ArgValue::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            ArgValue::StrSlice(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ArgValue::SockAddr(addr) => {
                let mut map = serializer.serialize_map(Some(addr.len()))?;
                for (k, v) in addr {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            ArgValue::Other(v) => v.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
struct RawArgument {
    name: String,
    #[serde(default, rename = "type")]
    arg_type: String,
    #[serde(default)]
    value: Value,
}

impl<'de> Deserialize<'de> for Argument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawArgument::deserialize(deserializer)?;
        let value = ArgValue::from_json(&raw.arg_type, raw.value);
        Ok(Argument {
            name: raw.name,
            arg_type: raw.arg_type,
            value,
        })
    }
}

/*──────────────────────── conversions ───────────────────────────────────*/

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        ArgValue::Int(i)
    }
}

impl From<u64> for ArgValue {
    fn from(u: u64) -> Self {
        ArgValue::UInt(u)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(bytes: Vec<u8>) -> Self {
        ArgValue::Bytes(bytes)
    }
}

impl From<&[u8]> for ArgValue {
    fn from(bytes: &[u8]) -> Self {
        ArgValue::Bytes(bytes.to_vec())
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(items: Vec<String>) -> Self {
        ArgValue::StrSlice(items)
    }
}

impl From<Vec<&str>> for ArgValue {
    fn from(items: Vec<&str>) -> Self {
        ArgValue::StrSlice(items.into_iter().map(str::to_owned).collect())
    }
}

impl From<BTreeMap<String, String>> for ArgValue {
    fn from(addr: BTreeMap<String, String>) -> Self {
        ArgValue::SockAddr(addr)
    }
}
