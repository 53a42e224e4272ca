//! Types shared between the rules engine and anything that produces or
//! consumes its traffic: the event envelope, typed argument access, and the
//! detection vocabulary (selectors, metadata, findings, signals).

pub mod args;
pub mod constants;
pub mod detect;
pub mod events;
pub mod helpers;

pub use args::ArgError;
pub use detect::{Finding, Property, Signal, SignatureEventSelector, SignatureMetadata};
pub use events::{ArgValue, Argument, Event, Origin};
