//! # Shared Wire Vocabulary (Engine ↔ Bus)
//!
//! Defines the frame type and protocol constants shared between the
//! diagnostics engine and every bus back-end. Nothing in here knows about
//! signals, decoding or the terminal; it is the byte-level contract only.
//!
//! ## Framing
//!
//! Single-frame ISO-TP style payloads:
//!
//! ```text
//! request   [PCI len] [service]        [pid]            (8-bit parameter)
//! request   [PCI len] [service]        [did hi] [did lo] (16-bit parameter)
//! response  [PCI len] [service + 0x40] [pid | did]  [value bytes ...]
//! ```
//!
//! A node answers on its request address with the [`DIRECTION_BIT`] set
//! (`0x7E0` → `0x7E8`).
//!
//! ## Key Types
//!
//! - [`Frame`] - One bus frame (arbitration address + payload)

use std::fmt;

// ============================================================================
// Addressing
// ============================================================================

/// Address bit distinguishing a response (`1`) from a request (`0`)
pub const DIRECTION_BIT: u16 = 0x08;

/// Physical request address of the engine control module
pub const DEFAULT_NODE: u16 = 0x7E0;

/// Highest 11-bit arbitration address
pub const MAX_ARBITRATION_ID: u16 = 0x7FF;

/// Data bytes one classic frame can carry
pub const MAX_FRAME_DATA: usize = 8;

// ============================================================================
// Service Identifiers
// ============================================================================

/// **Service 0x01**: Show current data (8-bit parameter ids)
pub const SERVICE_CURRENT_DATA: u8 = 0x01;

/// **Service 0x22**: Read data by identifier (16-bit parameter ids)
pub const SERVICE_READ_BY_ID: u8 = 0x22;

/// **Service 0x10**: Diagnostic session control
pub const SERVICE_SESSION_CONTROL: u8 = 0x10;

/// **Service 0x3E**: Tester present (session keep-alive)
pub const SERVICE_TESTER_PRESENT: u8 = 0x3E;

/// Added to a service id to form its positive response code
pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;

/// Positive response to [`SERVICE_CURRENT_DATA`]
pub const RESPONSE_CURRENT_DATA: u8 = SERVICE_CURRENT_DATA + POSITIVE_RESPONSE_OFFSET;

/// Positive response to [`SERVICE_READ_BY_ID`]
pub const RESPONSE_READ_BY_ID: u8 = SERVICE_READ_BY_ID + POSITIVE_RESPONSE_OFFSET;

/// Session control sub-function: extended diagnostic session
pub const EXTENDED_SESSION: u8 = 0x03;

/// Tester present sub-function: keep alive, response requested
pub const TESTER_PRESENT_KEEPALIVE: u8 = 0x00;

// ============================================================================
// Frame
// ============================================================================

/// One frame on the diagnostics bus
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    /// 11-bit arbitration address
    pub arbitration_id: u16,
    /// Payload bytes (PCI byte first)
    pub data: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(arbitration_id: u16, data: impl Into<Vec<u8>>) -> Self {
        Self { arbitration_id, data: data.into() }
    }

    /// True when the direction bit marks this frame as a response
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.arbitration_id & DIRECTION_BIT != 0
    }

    /// Address with the direction bit cleared (the node's request address)
    #[must_use]
    pub fn node_address(&self) -> u16 {
        self.arbitration_id & !DIRECTION_BIT
    }

    /// Why a bus controller would refuse to transmit this frame, if it would
    #[must_use]
    pub fn bus_violation(&self) -> Option<String> {
        if self.arbitration_id > MAX_ARBITRATION_ID {
            return Some(format!("address {:X} is wider than 11 bits", self.arbitration_id));
        }
        match self.data.len() {
            0 => Some(format!("empty frame to {:03X}", self.arbitration_id)),
            n if n > MAX_FRAME_DATA => Some(format!(
                "{n} data bytes to {:03X}, a frame carries at most {MAX_FRAME_DATA}",
                self.arbitration_id
            )),
            _ => None,
        }
    }

    /// Payload rendered as space-separated upper-case hex
    #[must_use]
    pub fn data_hex(&self) -> String {
        hex_bytes(&self.data)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X} [{}] {}", self.arbitration_id, self.data.len(), self.data_hex())
    }
}

/// Render bytes as `1A F8 00`
#[must_use]
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_bit() {
        assert!(Frame::new(0x7E8, vec![0x03]).is_response());
        assert!(!Frame::new(0x7E0, vec![0x02]).is_response());
        assert_eq!(Frame::new(0x7E9, vec![]).node_address(), 0x7E1);
    }

    #[test]
    fn test_response_codes() {
        assert_eq!(RESPONSE_CURRENT_DATA, 0x41);
        assert_eq!(RESPONSE_READ_BY_ID, 0x62);
    }

    #[test]
    fn test_bus_violation() {
        assert_eq!(Frame::new(0x7E0, vec![0x02, 0x01, 0x0C]).bus_violation(), None);
        assert!(Frame::new(0x7E0, vec![0u8; 9]).bus_violation().unwrap().contains("9 data bytes"));
        assert!(Frame::new(0x7E0, Vec::new()).bus_violation().is_some());
        assert!(Frame::new(0x800, vec![0x02, 0x3E, 0x00]).bus_violation().is_some());
    }

    #[test]
    fn test_display() {
        let frame = Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x1A, 0xF8]);
        assert_eq!(frame.to_string(), "7E8 [5] 04 41 0C 1A F8");
    }
}
