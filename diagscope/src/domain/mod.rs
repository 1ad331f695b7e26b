//! Domain model for diagscope
//!
//! This module contains core domain types and errors that provide:
//! - A single signal identity shared by catalog, active set and cache
//! - Structured error handling

pub mod errors;
pub mod types;

pub use types::SignalKey;

pub use errors::{DecodeError, FrameError, StoreError, TransportError, TuiError};
