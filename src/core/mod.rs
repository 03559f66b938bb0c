//! Core types for the runtime
//!
//! - `TransportError` - Broker HTTP failures
//! - `RuntimeError` - Registration, dispatch and decode failures

pub mod error;

pub use error::{RuntimeError, RuntimeResult, TransportError, TransportResult};
