// src/engine/signature.rs

//! Signature contract.
//!
//! A signature is one self-contained detection rule. The engine drives every
//! signature through the same lifecycle:
//!
//! ```text
//! constructed ─ init(ctx) ─▶ ready ─ (on_event | on_signal)* ─ close() ─▶ closed
//! ```
//!
//! * `init` receives the [`SignatureContext`] and compiles whatever the rule
//!   needs. An error here keeps the signature out of the pool.
//! * `metadata` and `selected_events` are pure; the selectors are read once
//!   to build the routing index and never again.
//! * `on_event` is called once per matching event, in arrival order. It must
//!   return in bounded time: the engine never preempts a running call.
//! * `on_signal` receives out-of-band messages such as end of stream.
//! * `close` is called exactly once, at shutdown.

use shared::helpers::AddrError;
use shared::{ArgError, Event, Finding, Signal, SignatureEventSelector, SignatureMetadata};
use thiserror::Error;

use super::sink::FindingSink;

/// Everything a signature gets from the engine: the handle it emits findings on.
#[derive(Clone)]
pub struct SignatureContext {
    pub callback: FindingSink,
}

#[derive(Debug, Error)]
pub enum SignatureError {
    /// Static setup is invalid (bad pattern, missing constant).
    #[error("invalid signature setup: {0}")]
    Config(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Argument(#[from] ArgError),

    #[error(transparent)]
    Address(#[from] AddrError),

    #[error("{0}")]
    Detection(String),

    #[error("finding sink closed")]
    SinkClosed,

    #[error("signature used before init")]
    NotInitialized,
}

pub trait Signature: Send {
    fn init(&mut self, ctx: SignatureContext) -> Result<(), SignatureError>;

    fn metadata(&self) -> SignatureMetadata;

    fn selected_events(&self) -> Result<Vec<SignatureEventSelector>, SignatureError>;

    fn on_event(&mut self, event: &Event) -> Result<(), SignatureError>;

    fn on_signal(&mut self, _signal: &Signal) -> Result<(), SignatureError> {
        Ok(())
    }

    fn close(&mut self) {}
}

/// Zero-argument constructor, one per entry in the signature registry.
pub type SignatureConstructor = fn() -> Result<Box<dyn Signature>, SignatureError>;

/// Emit through the handle a signature stored at `init`.
pub fn emit(cb: &Option<FindingSink>, finding: Finding) -> Result<(), SignatureError> {
    cb.as_ref().ok_or(SignatureError::NotInitialized)?.emit(finding)
}
