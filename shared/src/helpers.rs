//! Small predicates shared by signatures: open-flag classification, ELF
//! sniffing and raw socket address decoding.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::constants::{AF_INET, AF_INET6, AF_UNIX, ELF_MAGIC};

/// Raw socket address as the tracer reports it.
pub type RawAddr = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrError {
    #[error("{0} not found in address")]
    MissingField(&'static str),

    #[error("address family {0} not supported")]
    WrongFamily(String),

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// True when the open flags request write access (`O_WRONLY` or `O_RDWR`).
pub fn is_file_write(flags: &str) -> bool {
    let flags = flags.to_ascii_lowercase();
    flags.contains("o_wronly") || flags.contains("o_rdwr")
}

/// True when the buffer starts with the ELF magic.
pub fn is_elf(bytes: &[u8]) -> bool {
    bytes.starts_with(&ELF_MAGIC)
}

fn field<'a>(addr: &'a RawAddr, key: &'static str) -> Result<&'a str, AddrError> {
    addr.get(key).map(String::as_str).ok_or(AddrError::MissingField(key))
}

pub fn get_family_from_raw_addr(addr: &RawAddr) -> Result<&str, AddrError> {
    field(addr, "sa_family")
}

pub fn is_unix_family(addr: &RawAddr) -> Result<bool, AddrError> {
    Ok(get_family_from_raw_addr(addr)? == AF_UNIX)
}

pub fn is_internet_family(addr: &RawAddr) -> Result<bool, AddrError> {
    let family = get_family_from_raw_addr(addr)?;
    Ok(family == AF_INET || family == AF_INET6)
}

/// `sun_path` of a Unix-domain address.
pub fn get_path_from_raw_addr(addr: &RawAddr) -> Result<&str, AddrError> {
    match get_family_from_raw_addr(addr)? {
        AF_UNIX => field(addr, "sun_path"),
        other => Err(AddrError::WrongFamily(other.to_string())),
    }
}

pub fn get_ip_from_raw_addr(addr: &RawAddr) -> Result<&str, AddrError> {
    match get_family_from_raw_addr(addr)? {
        AF_INET => field(addr, "sin_addr"),
        AF_INET6 => field(addr, "sin6_addr"),
        other => Err(AddrError::WrongFamily(other.to_string())),
    }
}

pub fn get_port_from_raw_addr(addr: &RawAddr) -> Result<u16, AddrError> {
    let port = match get_family_from_raw_addr(addr)? {
        AF_INET => field(addr, "sin_port")?,
        AF_INET6 => field(addr, "sin6_port")?,
        other => return Err(AddrError::WrongFamily(other.to_string())),
    };
    port.parse().map_err(|_| AddrError::InvalidPort(port.to_string()))
}
