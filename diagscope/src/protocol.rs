//! Request encoding and response parsing
//!
//! Requests and responses are single frames and share one layout
//! (see `diagscope_common` for the byte diagram). The parser only answers
//! "which signal is this and what are its value bytes"; deciding what to do
//! with the answer is the correlator's job.

use diagscope_common::{
    Frame, DIRECTION_BIT, EXTENDED_SESSION, POSITIVE_RESPONSE_OFFSET, RESPONSE_CURRENT_DATA,
    RESPONSE_READ_BY_ID, SERVICE_CURRENT_DATA, SERVICE_READ_BY_ID, SERVICE_SESSION_CONTROL,
    SERVICE_TESTER_PRESENT, TESTER_PRESENT_KEEPALIVE,
};

use crate::domain::{FrameError, SignalKey};

/// Low nibble of the PCI byte holds the single-frame length
const PCI_LENGTH_MASK: u8 = 0x0F;

/// A positive response, reduced to its signal identity and value bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<'a> {
    /// Signal key with the node address normalized to its request form
    pub key: SignalKey,
    /// Bytes after the parameter id, bounded by the PCI length
    pub value: &'a [u8],
}

/// Parse a response frame
///
/// The direction bit is not checked here; callers filter requests first.
///
/// # Errors
/// - [`FrameError::Empty`] for a zero-length payload
/// - [`FrameError::TooShort`] when the payload (or its declared PCI length)
///   cannot hold the service header
/// - [`FrameError::UnknownService`] for any code other than `0x41` / `0x62`
pub fn parse_response(frame: &Frame) -> Result<Response<'_>, FrameError> {
    let data = frame.data.as_slice();
    let Some(&pci) = data.first() else {
        return Err(FrameError::Empty);
    };

    // PCI + service code
    if data.len() < 2 {
        return Err(FrameError::TooShort { len: data.len(), need: 2 });
    }

    let (service, header_len) = match data[1] {
        RESPONSE_CURRENT_DATA => (SERVICE_CURRENT_DATA, 3),
        RESPONSE_READ_BY_ID => (SERVICE_READ_BY_ID, 4),
        other => return Err(FrameError::UnknownService(other)),
    };

    // Trailing bytes past the declared length are bus padding
    let end = (1 + usize::from(pci & PCI_LENGTH_MASK)).min(data.len());
    if end < header_len {
        return Err(FrameError::TooShort { len: end, need: header_len });
    }

    let parameter = if header_len == 3 {
        u32::from(data[2])
    } else {
        u32::from(u16::from_be_bytes([data[2], data[3]]))
    };

    Ok(Response {
        key: SignalKey::new(frame.node_address(), service, parameter),
        value: &data[header_len..end],
    })
}

/// Encode the request frame that polls `key`
///
/// Service `0x22` always carries a 2-byte identifier so the request mirrors
/// its `0x62` response. Returns `None` for parameter ids wider than 16 bits.
#[must_use]
pub fn encode_request(key: &SignalKey) -> Option<Frame> {
    let parameter = u16::try_from(key.parameter).ok()?;
    let data = if key.parameter <= 0xFF && key.service != SERVICE_READ_BY_ID {
        vec![0x02, key.service, parameter.to_be_bytes()[1]]
    } else {
        let [hi, lo] = parameter.to_be_bytes();
        vec![0x03, key.service, hi, lo]
    };
    Some(Frame::new(key.node, data))
}

/// Tester Present keep-alive (`3E 00`)
#[must_use]
pub fn tester_present(node: u16) -> Frame {
    Frame::new(node, vec![0x02, SERVICE_TESTER_PRESENT, TESTER_PRESENT_KEEPALIVE])
}

/// Diagnostic Session Control request for the extended session (`10 03`)
#[must_use]
pub fn extended_session(node: u16) -> Frame {
    Frame::new(node, vec![0x02, SERVICE_SESSION_CONTROL, EXTENDED_SESSION])
}

/// Encode the positive response a node sends for `key`
///
/// Used by the simulated bus. `value` longer than a single frame can carry
/// is cut to fit.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_response(key: &SignalKey, value: &[u8]) -> Frame {
    let mut data = vec![0x00, key.service.wrapping_add(POSITIVE_RESPONSE_OFFSET)];
    if key.service == SERVICE_READ_BY_ID || key.parameter > 0xFF {
        data.extend_from_slice(&(key.parameter as u16).to_be_bytes());
    } else {
        data.push(key.parameter as u8);
    }

    let room = 8usize.saturating_sub(data.len());
    data.extend(value.iter().take(room));
    data[0] = (data.len() - 1) as u8;

    Frame::new(key.node | DIRECTION_BIT, data)
}
