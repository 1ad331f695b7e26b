//! # Interaction State Machine
//!
//! ```text
//!            c / Tab
//!   View ───────────────▶ Configure
//!    ▲  (cursor=0, scroll=0)   │ ↑↓ move cursor, Space toggle, a/n all/none
//!    │                         │
//!    └──── Enter / c / Esc ────┘ commit (persist, scroll=0)
//! ```
//!
//! In View mode the scroll window runs over the active signals only and there
//! is no cursor. In Configure mode the cursor walks the whole catalog and the
//! window follows it, keeping a small margin above and below.
//!
//! Transitions are pure: persisting the active set on commit is left to the
//! caller, which gets [`Outcome::Committed`] back.

use std::ops::Range;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::catalog::Catalog;
use crate::store::ActiveSet;

/// Rows kept between the cursor and the bottom edge before scrolling down
const BOTTOM_MARGIN: usize = 3;
/// Rows kept between the cursor and the top edge before scrolling up
const TOP_MARGIN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    View,
    Configure,
}

impl Mode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Mode::View => "VIEW",
            Mode::Configure => "CONFIGURE",
        }
    }
}

/// Operator commands, decoded from key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Enter Configure from View; commits when already configuring
    ToggleMode,
    Up,
    Down,
    ToggleSignal,
    Commit,
    SelectAll,
    SelectNone,
}

impl Command {
    /// Map a key press to a command for the current mode
    ///
    /// Keys with no meaning in `mode` map to `None` and are ignored.
    #[must_use]
    pub fn from_key(mode: Mode, key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return matches!(key.code, KeyCode::Char('c' | 'C')).then_some(Command::Quit);
        }

        let command = match (mode, key.code) {
            (_, KeyCode::Char('q' | 'Q')) => Command::Quit,
            (_, KeyCode::Up | KeyCode::Char('k')) => Command::Up,
            (_, KeyCode::Down | KeyCode::Char('j')) => Command::Down,
            (Mode::View, KeyCode::Char('c' | 'C') | KeyCode::Tab) => Command::ToggleMode,
            (Mode::Configure, KeyCode::Char('c' | 'C') | KeyCode::Enter | KeyCode::Esc) => {
                Command::Commit
            }
            (Mode::Configure, KeyCode::Char(' ')) => Command::ToggleSignal,
            (Mode::Configure, KeyCode::Char('a' | 'A')) => Command::SelectAll,
            (Mode::Configure, KeyCode::Char('n' | 'N')) => Command::SelectNone,
            _ => return None,
        };
        Some(command)
    }
}

/// What applying a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing visible changed
    Unchanged,
    /// State changed; redraw
    Changed,
    /// Left Configure mode; the active set should be persisted
    Committed,
    Quit,
}

/// Largest scroll offset that still fills the window
#[must_use]
pub fn max_scroll(len: usize, rows: usize) -> usize {
    len.saturating_sub(rows)
}

/// Mode, cursor and scroll window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub mode: Mode,
    /// Index into catalog order; only meaningful in Configure mode
    pub cursor: usize,
    pub scroll: usize,
}

impl ViewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of the rows currently on screen out of `len`
    #[must_use]
    pub fn window(&self, len: usize, rows: usize) -> Range<usize> {
        let start = self.scroll.min(len);
        start..(start + rows).min(len)
    }

    /// Apply `command`
    ///
    /// `rows` is the number of table rows that fit on screen. In View mode the
    /// list scrolled over is the active signals followed by `unmatched_rows`
    /// rows of responses no catalog entry claims.
    pub fn apply(
        &mut self,
        command: Command,
        catalog: &Catalog,
        active: &mut ActiveSet,
        rows: usize,
        unmatched_rows: usize,
    ) -> Outcome {
        let before = *self;
        match (self.mode, command) {
            (_, Command::Quit) => return Outcome::Quit,

            (Mode::View, Command::ToggleMode) => {
                self.mode = Mode::Configure;
                self.cursor = 0;
                self.scroll = 0;
            }
            (Mode::View, Command::Up) => self.scroll = self.scroll.saturating_sub(1),
            (Mode::View, Command::Down) => {
                self.scroll = (self.scroll + 1).min(max_scroll(active.len() + unmatched_rows, rows));
            }
            (Mode::View, _) => {}

            (Mode::Configure, Command::ToggleMode | Command::Commit) => {
                self.mode = Mode::View;
                self.scroll = 0;
                return Outcome::Committed;
            }
            (Mode::Configure, Command::Up) => self.cursor_up(catalog.len(), rows),
            (Mode::Configure, Command::Down) => self.cursor_down(catalog.len(), rows),
            (Mode::Configure, Command::ToggleSignal) => {
                let Some(entry) = catalog.entries().get(self.cursor) else {
                    return Outcome::Unchanged;
                };
                active.toggle(entry.key);
                return Outcome::Changed;
            }
            (Mode::Configure, Command::SelectAll) => {
                *active = ActiveSet::all(catalog);
                return Outcome::Changed;
            }
            (Mode::Configure, Command::SelectNone) => {
                active.clear();
                return Outcome::Changed;
            }
        }

        if *self == before {
            Outcome::Unchanged
        } else {
            Outcome::Changed
        }
    }

    fn cursor_down(&mut self, len: usize, rows: usize) {
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
        if self.cursor + BOTTOM_MARGIN > self.scroll + rows {
            self.scroll += 1;
        }
        self.settle(len, rows);
    }

    fn cursor_up(&mut self, len: usize, rows: usize) {
        self.cursor = self.cursor.saturating_sub(1);
        if self.cursor < self.scroll + TOP_MARGIN && self.scroll > 0 {
            self.scroll -= 1;
        }
        self.settle(len, rows);
    }

    /// Clamp scroll and keep the cursor on screen
    fn settle(&mut self, len: usize, rows: usize) {
        self.scroll = self.scroll.min(max_scroll(len, rows));
        if rows == 0 {
            return;
        }
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + rows {
            self.scroll = self.cursor + 1 - rows;
        }
    }

    /// Re-establish bounds after the window or the lists changed size
    ///
    /// `view_len` counts every View-mode row, unmatched ones included.
    pub fn clamp(&mut self, catalog_len: usize, view_len: usize, rows: usize) {
        match self.mode {
            Mode::View => self.scroll = self.scroll.min(max_scroll(view_len, rows)),
            Mode::Configure => {
                self.cursor = self.cursor.min(catalog_len.saturating_sub(1));
                self.settle(catalog_len, rows);
            }
        }
    }
}
