//! Domain types providing compile-time safety and self-documentation
//!
//! [`SignalKey`] is the one identity a signal has across the catalog, the
//! active set and the value cache.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal identity: `(node address, service id, parameter id)`
///
/// Persisted as a plain `[node, service, parameter]` integer triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u16, u8, u32)", into = "(u16, u8, u32)")]
pub struct SignalKey {
    /// Request address of the node (direction bit clear)
    pub node: u16,
    /// Request service id (`0x01`, `0x22`, ...)
    pub service: u8,
    /// Parameter id within the service (8- or 16-bit in practice)
    pub parameter: u32,
}

impl SignalKey {
    #[must_use]
    pub const fn new(node: u16, service: u8, parameter: u32) -> Self {
        Self { node, service, parameter }
    }

    /// True when the parameter id needs the 2-byte (extended) encoding
    #[must_use]
    pub fn is_extended(&self) -> bool {
        self.parameter > 0xFF
    }
}

impl From<(u16, u8, u32)> for SignalKey {
    fn from((node, service, parameter): (u16, u8, u32)) -> Self {
        Self { node, service, parameter }
    }
}

impl From<SignalKey> for (u16, u8, u32) {
    fn from(key: SignalKey) -> Self {
        (key.node, key.service, key.parameter)
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended() {
            write!(f, "{:03X}/{:02X}/{:04X}", self.node, self.service, self.parameter)
        } else {
            write!(f, "{:03X}/{:02X}/{:02X}", self.node, self.service, self.parameter)
        }
    }
}
