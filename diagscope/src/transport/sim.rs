//! Simulated ECU bus
//!
//! Answers current-data and read-by-identifier requests for every catalog
//! signal with a plausible positive response. Values wander a little on each
//! request so the dashboard visibly moves. Requests for unknown signals get
//! no answer, as on a real bus.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use diagscope_common::{
    Frame, DIRECTION_BIT, POSITIVE_RESPONSE_OFFSET, SERVICE_CURRENT_DATA, SERVICE_READ_BY_ID,
    SERVICE_SESSION_CONTROL, SERVICE_TESTER_PRESENT,
};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::BusHandle;
use crate::catalog::{Catalog, Decoder};
use crate::domain::{SignalKey, TransportError};
use crate::protocol::encode_response;

/// How long the bus thread waits for a request before re-checking for shutdown
const REQUEST_WAIT: Duration = Duration::from_millis(50);

/// Raw value range and per-request drift for one signal
#[derive(Debug, Clone, Copy)]
struct Profile {
    low: u16,
    high: u16,
    step: u16,
    width: usize,
}

impl Profile {
    fn for_decoder(decoder: Decoder) -> Self {
        let (low, high, step, width) = match decoder {
            // 700..6000 rpm
            Decoder::Rpm => (2_800, 24_000, 120, 2),
            Decoder::Speed => (0, 180, 2, 1),
            // 0..110 °C
            Decoder::Temperature => (40, 150, 1, 1),
            Decoder::Pressure => (20, 250, 3, 1),
            Decoder::Percent => (0, 255, 4, 1),
            // 11.5..14.5 V
            Decoder::Voltage => (115, 145, 1, 1),
            Decoder::YesNo => (0, 1, 1, 1),
            Decoder::Hex => (0, 0xFFFF, 0x10, 2),
        };
        Self { low, high, step, width }
    }
}

#[derive(Debug)]
struct SimSignal {
    profile: Profile,
    raw: u16,
}

impl SimSignal {
    fn drift(&mut self, rng: &mut StdRng) {
        let Profile { low, high, step, .. } = self.profile;
        let delta = rng.gen_range(0..=step * 2);
        self.raw = self.raw.saturating_add(delta).saturating_sub(step).clamp(low, high);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn bytes(&self) -> Vec<u8> {
        if self.profile.width == 2 {
            self.raw.to_be_bytes().to_vec()
        } else {
            vec![self.raw as u8]
        }
    }
}

/// Request/response model of the ECUs behind the catalog
#[derive(Debug)]
pub struct SimulatedEcu {
    signals: HashMap<SignalKey, SimSignal>,
    rng: StdRng,
}

impl SimulatedEcu {
    #[must_use]
    pub fn new(catalog: &Catalog) -> Self {
        Self::with_rng(catalog, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests
    #[must_use]
    pub fn seeded(catalog: &Catalog, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: &Catalog, mut rng: StdRng) -> Self {
        let signals = catalog
            .entries()
            .iter()
            .map(|entry| {
                let profile = Profile::for_decoder(entry.decoder);
                let raw = rng.gen_range(profile.low..=profile.high);
                (entry.key, SimSignal { profile, raw })
            })
            .collect();
        Self { signals, rng }
    }

    /// Positive response for `request`, if the simulated node would answer
    pub fn respond(&mut self, request: &Frame) -> Option<Frame> {
        if request.is_response() {
            return None;
        }

        let data = &request.data;
        let service = *data.get(1)?;
        let node = request.arbitration_id;
        match service {
            SERVICE_CURRENT_DATA => {
                let key = SignalKey::new(node, service, u32::from(*data.get(2)?));
                self.answer(key)
            }
            SERVICE_READ_BY_ID => {
                let did = u16::from_be_bytes([*data.get(2)?, *data.get(3)?]);
                self.answer(SignalKey::new(node, service, u32::from(did)))
            }
            SERVICE_TESTER_PRESENT | SERVICE_SESSION_CONTROL => {
                let sub_function = *data.get(2)?;
                let reply = vec![0x02, service + POSITIVE_RESPONSE_OFFSET, sub_function];
                Some(Frame::new(node | DIRECTION_BIT, reply))
            }
            other => {
                trace!("Simulator ignoring service 0x{other:02X}");
                None
            }
        }
    }

    fn answer(&mut self, key: SignalKey) -> Option<Frame> {
        let signal = self.signals.get_mut(&key)?;
        signal.drift(&mut self.rng);
        Some(encode_response(&key, &signal.bytes()))
    }
}

/// Start the simulated bus on its own thread
///
/// # Errors
/// Returns [`TransportError::ConnectFailed`] if the bus thread cannot start
pub fn spawn(catalog: &Catalog) -> Result<BusHandle, TransportError> {
    let mut ecu = SimulatedEcu::new(catalog);
    debug!("Simulating {} signal(s)", ecu.signals.len());

    BusHandle::spawn("sim", move |link| {
        while !link.should_stop() {
            match link.requests.recv_timeout(REQUEST_WAIT) {
                Ok(request) => {
                    if let Some(reason) = request.bus_violation() {
                        if !link.fault(reason) {
                            break;
                        }
                        continue;
                    }
                    if let Some(response) = ecu.respond(&request) {
                        if !link.deliver(response) {
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}
