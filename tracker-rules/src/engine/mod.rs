// src/engine/mod.rs

//! Signature detection engine: contract, routing, dispatch, finding sink.

pub mod dispatch;
pub mod selector;
pub mod signature;
pub mod sink;

pub use dispatch::{DispatchMode, Engine, EngineConfig, StopHandle};
pub use selector::{SelectorError, SelectorIndex};
pub use signature::{Signature, SignatureConstructor, SignatureContext, SignatureError, emit};
pub use sink::FindingSink;
