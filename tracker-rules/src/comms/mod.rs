// src/comms/mod.rs

//! Event input: option parsing and the listeners that feed the engine.

pub mod input;
pub mod listener;

pub use input::{INPUT_HELP, InputError, InputFormat, InputOptions, InputSource};
pub use listener::{IngestSummary, JsonListener, Listener};
