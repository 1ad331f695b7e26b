//! TUI color theme
//!
//! HUD-inspired color scheme for the terminal interface

use ratatui::style::{Color, Modifier, Style};

use crate::cache::NO_DATA;

pub const HUD_GREEN: Color = Color::Rgb(0, 255, 0);
pub const CRITICAL_RED: Color = Color::Rgb(255, 0, 0);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(0, 180, 0);

pub const STYLE_HEADING: Style = Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD);
pub const STYLE_LABEL: Style = Style::new().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD);
pub const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
pub const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);
pub const STYLE_TEXT: Style = Style::new().fg(Color::White);
pub const STYLE_CURSOR: Style = Style::new().fg(Color::Black).bg(CAUTION_AMBER);

/// Color a value cell by what it holds
#[must_use]
pub fn value_style(value: &str) -> Style {
    if value == NO_DATA {
        STYLE_DIM
    } else if value.starts_with("ERR") {
        Style::new().fg(CRITICAL_RED)
    } else {
        Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD)
    }
}
