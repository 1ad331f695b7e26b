//! Poll scheduler
//!
//! One pass sends a request for each key in the visible window followed by a
//! single tester-present keep-alive. Nothing waits for replies; responses are
//! matched up later by the correlator.

use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::domain::{SignalKey, TransportError};
use crate::protocol::{encode_request, tester_present};
use crate::transport::Transport;

/// Default minimum time between passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Result of one polling pass
#[derive(Debug, Default)]
pub struct PassReport {
    /// Frames accepted by the transport, keep-alive included
    pub sent: usize,
    pub failed: usize,
    pub last_error: Option<TransportError>,
}

impl PassReport {
    fn record(&mut self, result: Result<(), TransportError>) {
        match result {
            Ok(()) => self.sent += 1,
            Err(e) => {
                self.failed += 1;
                self.last_error = Some(e);
            }
        }
    }
}

#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    keepalive_node: u16,
    last_pass: Option<Instant>,
    passes: u64,
}

impl PollScheduler {
    #[must_use]
    pub fn new(interval: Duration, keepalive_node: u16) -> Self {
        Self { interval, keepalive_node, last_pass: None, passes: 0 }
    }

    /// True if no pass has run yet or the interval has elapsed
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_pass {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Send one request per visible key, then the keep-alive
    ///
    /// A failed send is recorded and the pass continues with the next key.
    pub fn run_pass(
        &mut self,
        now: Instant,
        visible: &[SignalKey],
        transport: &mut dyn Transport,
    ) -> PassReport {
        let mut report = PassReport::default();

        for key in visible {
            let Some(frame) = encode_request(key) else {
                debug!("Skipping {key}: parameter id does not fit a request frame");
                continue;
            };
            report.record(transport.send_frame(frame.arbitration_id, &frame.data));
        }

        let keepalive = tester_present(self.keepalive_node);
        report.record(transport.send_frame(keepalive.arbitration_id, &keepalive.data));

        self.last_pass = Some(now);
        self.passes += 1;
        trace!("Poll pass {}: {} sent, {} failed", self.passes, report.sent, report.failed);
        report
    }
}
