//! Structured error types for diagscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open bus: {0}")]
    ConnectFailed(String),

    #[error("Replay log {path} line {line}: {reason}")]
    ReplayParse { path: String, line: usize, reason: String },

    #[error("Failed to send frame to {address:03X}: {reason}")]
    SendFailed { address: u16, reason: String },

    #[error("Bus fault: {0}")]
    Fault(String),

    #[error("Bus thread disconnected")]
    Disconnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reasons a response frame cannot be correlated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Empty payload")]
    Empty,

    #[error("Payload too short: {len} bytes, need {need}")]
    TooShort { len: usize, need: usize },

    #[error("Unrecognized response service 0x{0:02X}")]
    UnknownService(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{decoder} expects {need} byte(s), got {got}")]
    ShortPayload { decoder: &'static str, need: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum TuiError {
    #[error("Terminal too small: {width}x{height}, need at least {min_width}x{min_height}")]
    TerminalTooSmall { width: u16, height: u16, min_width: u16, min_height: u16 },

    #[error("Terminal error: {0}")]
    TerminalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
