//! # Terminal User Interface (TUI)
//!
//! Render loop over `ratatui` + `crossterm`.
//!
//! ## Tick
//!
//! Each iteration of [`run`]:
//!
//! 1. Measure the terminal and hand the table height to the session
//! 2. Drain every received frame through the correlator (non-blocking)
//! 3. Wait up to one tick for a key and apply it
//! 4. Run a polling pass if in View mode and one is due
//! 5. Redraw, only if the session reports a visible change
//!
//! ratatui diffs each frame against the previous buffer, so a redraw after a
//! single value change rewrites only that row's cells.
//!
//! ## Sub-Modules
//!
//! - `layout` - header / table / status bands and the minimum size
//! - `table` - View and Configure table rows
//! - `status` - header and status bars
//! - `theme` - Color scheme

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, warn};
use ratatui::{backend::Backend, backend::CrosstermBackend, layout::Rect, Terminal};

pub mod layout;
mod status;
pub mod table;
mod theme;

use layout::{check_size, compute_layout};

use crate::domain::TuiError;
use crate::session::Session;
use crate::state::{Command, Mode};
use crate::transport::Transport;

/// Default bound on the input wait per loop iteration
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

/// Draw one full frame of the console
pub fn draw<T: Transport>(f: &mut ratatui::Frame, session: &Session<T>, bus: &str) {
    let screen = compute_layout(f.area());

    status::render_header(f, screen.header, session, bus);
    match session.view().mode {
        Mode::View => table::render_view(f, screen.table, session),
        Mode::Configure => table::render_configure(f, screen.table, session),
    }
    status::render_status(f, screen.status, session);
}

fn table_rows_for(width: u16, height: u16) -> usize {
    compute_layout(Rect::new(0, 0, width, height)).table_rows()
}

/// One loop iteration on an already prepared terminal
///
/// Split out of [`run`] so it can be driven against a test backend with
/// scripted input.
///
/// # Errors
/// Returns [`TuiError`] if the terminal cannot be measured or drawn
pub fn step<B: Backend, T: Transport>(
    terminal: &mut Terminal<B>,
    session: &mut Session<T>,
    input: Option<Event>,
    bus: &str,
) -> Result<(), TuiError> {
    let size = terminal.size().map_err(|e| TuiError::TerminalError(e.to_string()))?;
    session.set_rows(table_rows_for(size.width, size.height));

    session.drain_frames();

    match input {
        Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
            if let Some(command) = Command::from_key(session.view().mode, key) {
                session.apply(command);
            }
        }
        Some(Event::Resize(width, height)) => {
            debug!("Resized to {width}x{height}");
            session.mark_dirty();
        }
        _ => {}
    }
    if session.should_quit() {
        return Ok(());
    }

    session.poll(Instant::now());

    if session.take_redraw() {
        terminal
            .draw(|f| draw(f, session, bus))
            .map_err(|e| TuiError::TerminalError(e.to_string()))?;
    }
    Ok(())
}

/// Run the console until the operator quits
///
/// The terminal is checked against the minimum size before it is touched, and
/// restored on every exit path once it has been taken over.
///
/// # Errors
/// - [`TuiError::TerminalTooSmall`] at startup
/// - [`TuiError::Io`] / [`TuiError::TerminalError`] if the terminal fails
pub fn run<T: Transport>(session: &mut Session<T>, tick: Duration, bus: &str) -> Result<(), TuiError> {
    let (width, height) = crossterm::terminal::size()?;
    check_size(width, height)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    let result = Terminal::new(CrosstermBackend::new(stdout))
        .map_err(TuiError::from)
        .and_then(|mut terminal| {
            let result = event_loop(&mut terminal, session, tick, bus);
            if let Err(e) = terminal.show_cursor() {
                warn!("Failed to restore cursor: {e}");
            }
            result
        });

    restore_terminal();
    result
}

fn event_loop<B: Backend, T: Transport>(
    terminal: &mut Terminal<B>,
    session: &mut Session<T>,
    tick: Duration,
    bus: &str,
) -> Result<(), TuiError> {
    step(terminal, session, None, bus)?;
    loop {
        let input = if event::poll(tick)? { Some(event::read()?) } else { None };
        step(terminal, session, input, bus)?;
        if session.should_quit() {
            return Ok(());
        }
    }
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!("Failed to leave raw mode: {e}");
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
        warn!("Failed to leave alternate screen: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::session::SessionConfig;
    use crate::store::ActiveSetStore;
    use crate::transport::MemoryTransport;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use diagscope_common::Frame;
    use ratatui::backend::TestBackend;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(ratatui::buffer::Cell::symbol).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn press(code: KeyCode) -> Option<Event> {
        Some(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn setup(dir: &tempfile::TempDir) -> (Terminal<TestBackend>, Session<MemoryTransport>) {
        let terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        let session = Session::new(
            Catalog::standard(),
            ActiveSetStore::new(dir.path().join("active.json")),
            MemoryTransport::new(),
            SessionConfig::default(),
        );
        (terminal, session)
    }

    #[test]
    fn test_first_step_draws_view_and_polls() {
        let dir = tempfile::tempdir().unwrap();
        let (mut terminal, mut session) = setup(&dir);

        step(&mut terminal, &mut session, None, "test").unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("DIAGSCOPE"));
        assert!(text.contains("[VIEW]"));
        assert!(text.contains("Calculated Engine Load"));
        assert_eq!(session.rows(), 15);
        // fifteen visible requests plus the keep-alive
        assert_eq!(session.transport_mut().take_sent().len(), 16);
    }

    #[test]
    fn test_value_appears_after_response() {
        let dir = tempfile::tempdir().unwrap();
        let (mut terminal, mut session) = setup(&dir);
        step(&mut terminal, &mut session, None, "test").unwrap();

        session.transport_mut().push_frame(Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x1A, 0xF8]));
        step(&mut terminal, &mut session, None, "test").unwrap();

        assert!(screen_text(&terminal).contains("1726 rpm"));
    }

    #[test]
    fn test_unmatched_response_listed_after_active_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("active.json"), "[[2016, 1, 12]]").unwrap();
        let (mut terminal, mut session) = setup(&dir);
        step(&mut terminal, &mut session, None, "test").unwrap();

        session.transport_mut().push_frame(Frame::new(0x7E9, vec![0x04, 0x41, 0x0C, 0x0A, 0x0B]));
        step(&mut terminal, &mut session, None, "test").unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("(unknown)"));
        assert!(text.contains("0A 0B"));
        assert!(text.contains("[ SIGNALS 1-2/2 ]"));
    }

    #[test]
    fn test_idle_step_does_not_redraw() {
        let dir = tempfile::tempdir().unwrap();
        let (mut terminal, mut session) = setup(&dir);
        step(&mut terminal, &mut session, None, "test").unwrap();

        let drawn = terminal.get_frame().count();
        step(&mut terminal, &mut session, None, "test").unwrap();
        assert_eq!(terminal.get_frame().count(), drawn);
    }

    #[test]
    fn test_configure_screen_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut terminal, mut session) = setup(&dir);
        step(&mut terminal, &mut session, None, "test").unwrap();

        step(&mut terminal, &mut session, press(KeyCode::Char('c')), "test").unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("[CONFIGURE]"));
        assert!(text.contains("▶ [x] 7E0/01/04"));

        step(&mut terminal, &mut session, press(KeyCode::Char(' ')), "test").unwrap();
        assert!(screen_text(&terminal).contains("▶ [ ] 7E0/01/04"));

        step(&mut terminal, &mut session, press(KeyCode::Enter), "test").unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("[VIEW]"));
        assert!(text.contains("Saved"));
        assert!(dir.path().join("active.json").exists());
    }

    #[test]
    fn test_quit_key() {
        let dir = tempfile::tempdir().unwrap();
        let (mut terminal, mut session) = setup(&dir);
        step(&mut terminal, &mut session, press(KeyCode::Char('q')), "test").unwrap();
        assert!(session.should_quit());
        assert!(session.transport_mut().sent.is_empty());
    }

    #[test]
    fn test_tiny_terminal_renders_without_panic() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut session) = setup(&dir);
        let mut terminal = Terminal::new(TestBackend::new(12, 5)).unwrap();
        step(&mut terminal, &mut session, None, "test").unwrap();
        assert_eq!(session.rows(), 0);
    }
}
