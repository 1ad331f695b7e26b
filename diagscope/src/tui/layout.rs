//! Screen layout for the TUI.
//!
//! Three bands, top to bottom: header, signal table, status bar. The table
//! takes whatever height is left, and the number of signal rows it can show
//! drives both scrolling and which signals get polled.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::domain::TuiError;

/// Smallest usable terminal
pub const MIN_WIDTH: u16 = 40;
pub const MIN_HEIGHT: u16 = 10;

const HEADER_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 3;
/// Table border (top + bottom) plus the column header row
const TABLE_CHROME: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub table: Rect,
    pub status: Rect,
}

impl ScreenLayout {
    /// Signal rows that fit inside the table band
    #[must_use]
    pub fn table_rows(&self) -> usize {
        usize::from(self.table.height.saturating_sub(TABLE_CHROME))
    }
}

/// Split `area` into the three bands
#[must_use]
pub fn compute_layout(area: Rect) -> ScreenLayout {
    let bands = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);

    ScreenLayout { header: bands[0], table: bands[1], status: bands[2] }
}

/// Refuse to start on a terminal smaller than [`MIN_WIDTH`] x [`MIN_HEIGHT`]
///
/// # Errors
/// Returns [`TuiError::TerminalTooSmall`] with the measured size
pub fn check_size(width: u16, height: u16) -> Result<(), TuiError> {
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(TuiError::TerminalTooSmall {
            width,
            height,
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
        });
    }
    Ok(())
}
