//! Diagnostic session
//!
//! Owns every piece of engine state for one run and exposes the three steps
//! the render loop drives each tick: drain received frames, apply operator
//! commands, and run a polling pass when one is due. Rendering only reads.
//!
//! A `dirty` flag tracks whether anything on screen changed since the last
//! draw, so an idle console is not redrawn at all.

use std::time::{Duration, Instant};

use diagscope_common::DEFAULT_NODE;
use log::{debug, info, warn};

use crate::cache::ValueCache;
use crate::catalog::Catalog;
use crate::correlator::{Correlation, CorrelationStats, Correlator};
use crate::domain::{SignalKey, TransportError};
use crate::protocol::extended_session;
use crate::scheduler::{PollScheduler, DEFAULT_POLL_INTERVAL};
use crate::state::{Command, Mode, Outcome, ViewState};
use crate::store::{ActiveSet, ActiveSetStore};
use crate::transport::Transport;

/// Upper bound on frames handled per drain so a flooding bus cannot starve input
const MAX_DRAIN: usize = 4096;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub poll_interval: Duration,
    pub keepalive_node: u16,
    /// Request the extended diagnostic session on start
    pub start_session: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            keepalive_node: DEFAULT_NODE,
            start_session: true,
        }
    }
}

/// One-line message shown in the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Error(text) => text,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

pub struct Session<T: Transport> {
    catalog: Catalog,
    active: ActiveSet,
    store: ActiveSetStore,
    cache: ValueCache,
    correlator: Correlator,
    scheduler: PollScheduler,
    view: ViewState,
    transport: T,
    config: SessionConfig,
    notice: Option<Notice>,
    /// Table rows that fit on screen
    rows: usize,
    dirty: bool,
    quit: bool,
}

impl<T: Transport> Session<T> {
    /// Build a session, loading the active set from `store`
    pub fn new(catalog: Catalog, store: ActiveSetStore, transport: T, config: SessionConfig) -> Self {
        let active = store.load(&catalog);
        info!("{} of {} signal(s) active", active.len(), catalog.len());

        Self {
            scheduler: PollScheduler::new(config.poll_interval, config.keepalive_node),
            catalog,
            active,
            store,
            cache: ValueCache::new(),
            correlator: Correlator::new(),
            view: ViewState::new(),
            transport,
            config,
            notice: None,
            rows: 0,
            dirty: true,
            quit: false,
        }
    }

    /// Open the diagnostic session on the keep-alive node
    ///
    /// # Errors
    /// A failed send here means the bus is unusable; callers treat it as fatal
    pub fn start(&mut self) -> Result<(), TransportError> {
        if !self.config.start_session {
            debug!("Skipping session start");
            return Ok(());
        }
        let request = extended_session(self.config.keepalive_node);
        self.transport.send_frame(request.arbitration_id, &request.data)?;
        info!("Requested extended session on {:03X}", self.config.keepalive_node);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tick steps
    // -------------------------------------------------------------------------

    /// Correlate every frame waiting on the transport; never blocks
    ///
    /// Returns the number of events taken, faults included.
    pub fn drain_frames(&mut self) -> usize {
        let visible = self.visible_keys();
        let ledger_on_screen = self.view.mode == Mode::View
            && self.view.window(self.view_len(), self.rows).end > self.active.len();
        let unmatched_before = self.cache.unmatched_count();
        let mut taken = 0;

        while taken < MAX_DRAIN {
            match self.transport.poll_frame() {
                Ok(Some(frame)) => {
                    taken += 1;
                    match self.correlator.process_frame(&frame, &self.catalog, &mut self.cache) {
                        Correlation::Updated { key, changed: true } if visible.contains(&key) => {
                            self.dirty = true;
                        }
                        Correlation::Unmatched(_) if ledger_on_screen => self.dirty = true,
                        _ => {}
                    }
                }
                Ok(None) => break,
                Err(TransportError::Disconnected) => {
                    self.report_error(&TransportError::Disconnected);
                    break;
                }
                Err(e) => {
                    taken += 1;
                    self.report_error(&e);
                }
            }
        }

        if self.cache.unmatched_count() != unmatched_before {
            self.dirty = true;
        }
        taken
    }

    /// Apply one operator command
    pub fn apply(&mut self, command: Command) -> Outcome {
        let outcome = self.view.apply(
            command,
            &self.catalog,
            &mut self.active,
            self.rows,
            self.cache.unmatched_count(),
        );
        match outcome {
            Outcome::Unchanged => {}
            Outcome::Changed => self.dirty = true,
            Outcome::Committed => {
                self.dirty = true;
                self.commit();
            }
            Outcome::Quit => self.quit = true,
        }
        outcome
    }

    /// Run a polling pass if in View mode and the interval has elapsed
    ///
    /// Returns true if a pass ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.view.mode != Mode::View || !self.scheduler.is_due(now) {
            return false;
        }

        let visible = self.visible_keys();
        let report = self.scheduler.run_pass(now, &visible, &mut self.transport);
        if let Some(e) = report.last_error {
            warn!("{} of {} request(s) failed", report.failed, report.failed + report.sent);
            self.report_error(&e);
        }
        true
    }

    /// Record how many table rows fit, re-clamping the window
    pub fn set_rows(&mut self, rows: usize) {
        if rows != self.rows {
            self.rows = rows;
            self.view.clamp(self.catalog.len(), self.view_len(), rows);
            self.dirty = true;
        }
    }

    /// True once since the last call if something on screen changed
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn commit(&mut self) {
        match self.store.save(&self.active) {
            Ok(()) => {
                self.set_notice(Notice::Info(format!(
                    "Saved {} signal(s) to {}",
                    self.active.len(),
                    self.store.path().display()
                )));
            }
            Err(e) => {
                warn!("Failed to save active set: {e}");
                self.set_notice(Notice::Error(format!("Save failed: {e}")));
            }
        }
    }

    fn report_error(&mut self, error: &TransportError) {
        debug!("Transport: {error}");
        self.set_notice(Notice::Error(error.to_string()));
    }

    fn set_notice(&mut self, notice: Notice) {
        if self.notice.as_ref() != Some(&notice) {
            self.notice = Some(notice);
            self.dirty = true;
        }
    }

    // -------------------------------------------------------------------------
    // Read access for rendering
    // -------------------------------------------------------------------------

    /// Active keys in catalog order
    #[must_use]
    pub fn active_keys(&self) -> Vec<SignalKey> {
        self.active.in_catalog_order(&self.catalog)
    }

    /// View-mode row count: active signals, then unmatched responses
    #[must_use]
    pub fn view_len(&self) -> usize {
        self.active.len() + self.cache.unmatched_count()
    }

    /// Active keys whose rows are on screen in View mode; empty while configuring
    #[must_use]
    pub fn visible_keys(&self) -> Vec<SignalKey> {
        if self.view.mode != Mode::View {
            return Vec::new();
        }
        let keys = self.active_keys();
        let window = self.view.window(self.view_len(), self.rows);
        let end = window.end.min(keys.len());
        keys[window.start.min(end)..end].to_vec()
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    #[must_use]
    pub fn cache(&self) -> &ValueCache {
        &self.cache
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> CorrelationStats {
        self.correlator.stats
    }

    #[must_use]
    pub fn passes(&self) -> u64 {
        self.scheduler.passes()
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn store(&self) -> &ActiveSetStore {
        &self.store
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Hand the transport back for shutdown
    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use diagscope_common::Frame;

    const RPM: SignalKey = SignalKey::new(0x7E0, 0x01, 0x0C);

    fn session(dir: &tempfile::TempDir) -> Session<MemoryTransport> {
        let store = ActiveSetStore::new(dir.path().join("active.json"));
        let mut session =
            Session::new(Catalog::standard(), store, MemoryTransport::new(), SessionConfig::default());
        session.set_rows(5);
        session.take_redraw();
        session
    }

    #[test]
    fn test_start_sends_session_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session.start().unwrap();
        assert_eq!(
            session.transport_mut().take_sent(),
            vec![Frame::new(0x7E0, vec![0x02, 0x10, 0x03])]
        );
    }

    #[test]
    fn test_start_skipped_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig { start_session: false, ..SessionConfig::default() };
        let mut session = Session::new(
            Catalog::standard(),
            ActiveSetStore::new(dir.path().join("a.json")),
            MemoryTransport::new(),
            config,
        );
        session.start().unwrap();
        assert!(session.transport_mut().sent.is_empty());
    }

    #[test]
    fn test_poll_covers_visible_window_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        assert!(session.poll(Instant::now()));

        // five visible rows plus the keep-alive
        let sent = session.transport_mut().take_sent();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[5].data, vec![0x02, 0x3E, 0x00]);
    }

    #[test]
    fn test_no_polling_while_configuring() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session.apply(Command::ToggleMode);
        assert!(!session.poll(Instant::now()));
        assert!(session.transport_mut().sent.is_empty());
    }

    #[test]
    fn test_visible_update_marks_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session.transport_mut().push_frame(Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x1A, 0xF8]));

        assert_eq!(session.drain_frames(), 1);
        assert_eq!(session.cache().get(&RPM), Some("1726 rpm"));
        // RPM is not in the first five rows of the catalog
        assert!(!session.take_redraw());

        session.transport_mut().push_frame(Frame::new(0x7E8, vec![0x03, 0x41, 0x04, 0xFF]));
        session.drain_frames();
        assert!(session.take_redraw());
    }

    #[test]
    fn test_transport_fault_shown_and_drain_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session.transport_mut().push_fault("bus warning");
        session.transport_mut().push_frame(Frame::new(0x7E8, vec![0x03, 0x41, 0x0D, 0x40]));

        assert_eq!(session.drain_frames(), 2);
        let notice = session.notice().unwrap();
        assert!(notice.is_error());
        assert!(notice.text().contains("bus warning"));
        assert!(session.take_redraw());
    }

    #[test]
    fn test_fault_flood_bounded_per_drain() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        for _ in 0..MAX_DRAIN + 10 {
            session.transport_mut().push_fault("bus warning");
        }

        assert_eq!(session.drain_frames(), MAX_DRAIN);
        assert_eq!(session.drain_frames(), 10);
    }

    #[test]
    fn test_unmatched_rows_extend_view() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActiveSetStore::new(dir.path().join("active.json"));
        let mut active = ActiveSet::new();
        active.insert(RPM);
        store.save(&active).unwrap();
        let mut session =
            Session::new(Catalog::standard(), store, MemoryTransport::new(), SessionConfig::default());
        session.set_rows(5);
        session.take_redraw();

        session.transport_mut().push_frame(Frame::new(0x7E9, vec![0x03, 0x41, 0x0C, 0x10]));
        session.drain_frames();
        assert_eq!(session.view_len(), 2);
        assert!(session.take_redraw());

        // the ledger row is on screen, so a new raw value redraws
        session.transport_mut().push_frame(Frame::new(0x7E9, vec![0x03, 0x41, 0x0C, 0x11]));
        session.drain_frames();
        assert!(session.take_redraw());
        assert_eq!(session.visible_keys(), vec![RPM]);
    }

    #[test]
    fn test_commit_saves_active_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session.apply(Command::ToggleMode);
        session.apply(Command::SelectNone);
        session.apply(Command::ToggleSignal);
        assert_eq!(session.apply(Command::Commit), Outcome::Committed);

        let reloaded = session.store().load(session.catalog());
        assert_eq!(reloaded.len(), 1);
        assert!(matches!(session.notice(), Some(Notice::Info(_))));
    }

    #[test]
    fn test_save_failure_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActiveSetStore::new(dir.path().join("missing").join("active.json"));
        let mut session =
            Session::new(Catalog::standard(), store, MemoryTransport::new(), SessionConfig::default());

        session.apply(Command::ToggleMode);
        assert_eq!(session.apply(Command::Commit), Outcome::Committed);
        assert_eq!(session.view().mode, Mode::View);
        assert!(session.notice().unwrap().text().starts_with("Save failed"));
    }

    #[test]
    fn test_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        assert!(!session.should_quit());
        session.apply(Command::Quit);
        assert!(session.should_quit());
    }
}
