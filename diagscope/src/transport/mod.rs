//! # Bus Transport
//!
//! The engine talks to the bus through two calls only: send a frame, and
//! take the next received frame without blocking ([`Transport`]).
//!
//! ## Back-ends
//!
//! - [`sim`] - simulated ECU answering catalog requests (`--simulate`)
//! - [`replay`] - cyclic playback of a recorded frame log (`--replay`)
//!
//! Both run on a dedicated thread behind a [`BusHandle`]. Requests go to the
//! thread and received frames come back over unbounded crossbeam channels,
//! so the foreground loop only ever does a non-blocking drain.
//!
//! ```text
//!  foreground loop                      bus thread
//!  ───────────────                      ──────────
//!  send_frame ──▶ [requests] ──────────▶ back-end
//!  poll_frame ◀── [events]   ◀────────── Frame / Fault
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use diagscope_common::Frame;
use log::{debug, warn};

use crate::domain::TransportError;

pub mod replay;
pub mod sim;

/// Frame-level access to a diagnostics bus
pub trait Transport {
    /// Queue one frame for transmission; never waits for a reply
    ///
    /// # Errors
    /// Returns [`TransportError::SendFailed`] if the bus cannot accept the frame
    fn send_frame(&mut self, address: u16, payload: &[u8]) -> Result<(), TransportError>;

    /// Next received frame, or `None` if nothing is waiting
    ///
    /// # Errors
    /// A background fault is reported once as [`TransportError::Fault`];
    /// [`TransportError::Disconnected`] means the bus thread is gone
    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError>;
}

/// What the bus thread pushes to the foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Frame(Frame),
    Fault(String),
}

/// Bus-thread side of the channel pair
pub struct BusLink {
    pub requests: Receiver<Frame>,
    events: Sender<BusEvent>,
    stop: Arc<AtomicBool>,
}

impl BusLink {
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Push a received frame; returns false once the foreground has gone away
    pub fn deliver(&self, frame: Frame) -> bool {
        self.events.send(BusEvent::Frame(frame)).is_ok()
    }

    /// Report a recoverable fault
    pub fn fault(&self, message: impl Into<String>) -> bool {
        self.events.send(BusEvent::Fault(message.into())).is_ok()
    }
}

/// Foreground handle to a bus back-end running on its own thread
pub struct BusHandle {
    name: &'static str,
    requests: Sender<Frame>,
    events: Receiver<BusEvent>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl BusHandle {
    /// Start `worker` on a named thread and return the foreground handle
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectFailed`] if the thread cannot be spawned
    pub fn spawn<F>(name: &'static str, worker: F) -> Result<Self, TransportError>
    where
        F: FnOnce(BusLink) + Send + 'static,
    {
        let (request_tx, request_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));

        let link = BusLink { requests: request_rx, events: event_tx, stop: Arc::clone(&stop) };
        let thread = std::thread::Builder::new()
            .name(format!("bus-{name}"))
            .spawn(move || worker(link))
            .map_err(|e| TransportError::ConnectFailed(format!("{name}: {e}")))?;

        debug!("Started {name} bus thread");
        Ok(Self { name, requests: request_tx, events: event_rx, stop, thread: Some(thread) })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the bus thread to stop and wait for it
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("{} bus thread panicked", self.name);
            } else {
                debug!("Stopped {} bus thread", self.name);
            }
        }
    }
}

impl Transport for BusHandle {
    fn send_frame(&mut self, address: u16, payload: &[u8]) -> Result<(), TransportError> {
        self.requests.send(Frame::new(address, payload)).map_err(|_| {
            TransportError::SendFailed { address, reason: format!("{} bus stopped", self.name) }
        })
    }

    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        match self.events.try_recv() {
            Ok(BusEvent::Frame(frame)) => Ok(Some(frame)),
            Ok(BusEvent::Fault(message)) => Err(TransportError::Fault(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

impl Drop for BusHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// In-memory transport: records what was sent and hands out queued frames
///
/// Used to drive the engine without a bus thread.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    pub sent: Vec<Frame>,
    pub inbound: VecDeque<Result<Frame, String>>,
    /// When set, every send fails with this reason
    pub fail_sends: Option<String>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.inbound.push_back(Ok(frame));
    }

    pub fn push_fault(&mut self, message: impl Into<String>) {
        self.inbound.push_back(Err(message.into()));
    }

    /// Take everything sent so far
    pub fn take_sent(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for MemoryTransport {
    fn send_frame(&mut self, address: u16, payload: &[u8]) -> Result<(), TransportError> {
        if let Some(reason) = &self.fail_sends {
            return Err(TransportError::SendFailed { address, reason: reason.clone() });
        }
        self.sent.push(Frame::new(address, payload));
        Ok(())
    }

    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        match self.inbound.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(message)) => Err(TransportError::Fault(message)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bus_handle_round_trip() {
        let mut bus = BusHandle::spawn("echo", |link| {
            while !link.should_stop() {
                if let Ok(frame) = link.requests.recv_timeout(Duration::from_millis(10)) {
                    link.deliver(Frame::new(frame.arbitration_id | 0x08, frame.data));
                }
            }
        })
        .unwrap();

        bus.send_frame(0x7E0, &[0x02, 0x01, 0x0C]).unwrap();

        let mut received = None;
        for _ in 0..200 {
            if let Some(frame) = bus.poll_frame().unwrap() {
                received = Some(frame);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(received, Some(Frame::new(0x7E8, vec![0x02, 0x01, 0x0C])));
        bus.shutdown();
    }

    #[test]
    fn test_fault_then_disconnect() {
        let mut bus = BusHandle::spawn("faulty", |link| {
            link.fault("adapter unplugged");
        })
        .unwrap();
        bus.shutdown();

        assert!(matches!(bus.poll_frame(), Err(TransportError::Fault(m)) if m == "adapter unplugged"));
        assert!(matches!(bus.poll_frame(), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let mut bus = BusHandle::spawn("idle", |link| {
            while !link.should_stop() {
                std::thread::yield_now();
            }
        })
        .unwrap();
        bus.shutdown();
        let err = bus.send_frame(0x7E0, &[0x02, 0x3E, 0x00]).unwrap_err();
        assert!(matches!(err, TransportError::SendFailed { address: 0x7E0, .. }));
    }

    #[test]
    fn test_memory_transport() {
        let mut transport = MemoryTransport::new();
        transport.push_fault("noise");
        transport.push_frame(Frame::new(0x7E8, vec![0x01]));

        assert!(transport.poll_frame().is_err());
        assert_eq!(transport.poll_frame().unwrap(), Some(Frame::new(0x7E8, vec![0x01])));
        assert_eq!(transport.poll_frame().unwrap(), None);

        transport.send_frame(0x7E0, &[0x02, 0x3E, 0x00]).unwrap();
        assert_eq!(transport.take_sent().len(), 1);

        transport.fail_sends = Some("bus off".to_string());
        assert!(transport.send_frame(0x7E0, &[0x02, 0x3E, 0x00]).is_err());
    }
}
