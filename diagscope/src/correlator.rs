//! # Response Correlation
//!
//! Maps inbound frames to catalog entries and writes decoded text into the
//! value cache.
//!
//! ## Frame Routing
//!
//! - Direction bit clear → request or echo, ignored
//! - Unparsable payload → discarded ([`Correlation::Malformed`])
//! - Parsed but not in the catalog → unmatched ledger
//! - Catalog hit → decoded (or error text) into the cache
//!
//! The cache is written even for signals outside the active set, so a signal
//! shows a value as soon as it is switched on.

use diagscope_common::{hex_bytes, Frame};
use log::{debug, trace};

use crate::cache::ValueCache;
use crate::catalog::Catalog;
use crate::domain::{FrameError, SignalKey};
use crate::protocol::parse_response;

/// Outcome of correlating one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// Request or echo (direction bit clear)
    Ignored,
    /// Response that could not be parsed
    Malformed(FrameError),
    /// Well-formed response for a key the catalog does not know
    Unmatched(SignalKey),
    /// Cache written for `key`; `changed` is false if the text was identical
    Updated { key: SignalKey, changed: bool },
}

/// Running counters, shown in the status bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationStats {
    pub frames: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub unmatched: u64,
    pub updated: u64,
    pub decode_errors: u64,
}

/// Stateless apart from its counters; catalog and cache are passed in
#[derive(Debug, Default)]
pub struct Correlator {
    pub stats: CorrelationStats,
}

impl Correlator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Correlate a single inbound frame
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        catalog: &Catalog,
        cache: &mut ValueCache,
    ) -> Correlation {
        self.stats.frames += 1;

        if !frame.is_response() {
            self.stats.ignored += 1;
            trace!("Ignoring request {frame}");
            return Correlation::Ignored;
        }

        let response = match parse_response(frame) {
            Ok(response) => response,
            Err(e) => {
                self.stats.malformed += 1;
                debug!("Discarding {frame}: {e}");
                return Correlation::Malformed(e);
            }
        };

        let key = response.key;
        let Some(entry) = catalog.get(&key) else {
            self.stats.unmatched += 1;
            debug!("No catalog entry for {key}");
            cache.record_unmatched(key, hex_bytes(response.value));
            return Correlation::Unmatched(key);
        };

        let text = entry.decoder.decode(response.value).unwrap_or_else(|e| {
            self.stats.decode_errors += 1;
            debug!("Decode failed for {} ({key}): {e}", entry.label);
            format!("ERR {e}")
        });

        self.stats.updated += 1;
        let changed = cache.update(key, text);
        Correlation::Updated { key, changed }
    }
}
