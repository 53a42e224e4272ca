//! Typed, fail-safe argument access.
//!
//! Lookups are linear over the event's argument list (events carry a handful
//! of arguments, so this beats hashing). A missing argument is
//! [`ArgError::NotFound`]; an argument whose runtime type differs from the
//! one requested is [`ArgError::TypeMismatch`]. Nothing here panics.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::events::{ArgValue, Argument, Event};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("argument '{0}' not found")]
    NotFound(String),

    #[error("argument '{name}' is {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

fn mismatch(arg: &Argument, expected: &'static str) -> ArgError {
    ArgError::TypeMismatch {
        name: arg.name.clone(),
        expected,
        found: arg.value.kind(),
    }
}

pub fn get_argument<'a>(event: &'a Event, name: &str) -> Result<&'a Argument, ArgError> {
    event
        .args
        .iter()
        .find(|a| a.name == name)
        .ok_or_else(|| ArgError::NotFound(name.to_string()))
}

pub fn get_str_argument<'a>(event: &'a Event, name: &str) -> Result<&'a str, ArgError> {
    let arg = get_argument(event, name)?;
    match &arg.value {
        ArgValue::Str(s) => Ok(s),
        _ => Err(mismatch(arg, "string")),
    }
}

pub fn get_bytes_argument<'a>(event: &'a Event, name: &str) -> Result<&'a [u8], ArgError> {
    let arg = get_argument(event, name)?;
    match &arg.value {
        ArgValue::Bytes(b) => Ok(b),
        _ => Err(mismatch(arg, "bytes")),
    }
}

pub fn get_str_slice_argument<'a>(event: &'a Event, name: &str) -> Result<&'a [String], ArgError> {
    let arg = get_argument(event, name)?;
    match &arg.value {
        ArgValue::StrSlice(items) => Ok(items),
        _ => Err(mismatch(arg, "string slice")),
    }
}

pub fn get_raw_addr_argument<'a>(
    event: &'a Event,
    name: &str,
) -> Result<&'a BTreeMap<String, String>, ArgError> {
    let arg = get_argument(event, name)?;
    match &arg.value {
        ArgValue::SockAddr(addr) => Ok(addr),
        _ => Err(mismatch(arg, "sockaddr")),
    }
}

/// Signed integer view; unsigned values that fit are accepted too.
pub fn get_int_argument(event: &Event, name: &str) -> Result<i64, ArgError> {
    let arg = get_argument(event, name)?;
    match &arg.value {
        ArgValue::Int(i) => Ok(*i),
        ArgValue::UInt(u) => i64::try_from(*u).map_err(|_| mismatch(arg, "int")),
        _ => Err(mismatch(arg, "int")),
    }
}

// Method sugar so signatures can write `event.get_str_argument("pathname")?`.
impl Event {
    pub fn get_argument(&self, name: &str) -> Result<&Argument, ArgError> {
        get_argument(self, name)
    }

    pub fn get_str_argument(&self, name: &str) -> Result<&str, ArgError> {
        get_str_argument(self, name)
    }

    pub fn get_bytes_argument(&self, name: &str) -> Result<&[u8], ArgError> {
        get_bytes_argument(self, name)
    }

    pub fn get_str_slice_argument(&self, name: &str) -> Result<&[String], ArgError> {
        get_str_slice_argument(self, name)
    }

    pub fn get_raw_addr_argument(&self, name: &str) -> Result<&BTreeMap<String, String>, ArgError> {
        get_raw_addr_argument(self, name)
    }

    pub fn get_int_argument(&self, name: &str) -> Result<i64, ArgError> {
        get_int_argument(self, name)
    }
}
