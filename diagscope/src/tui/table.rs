//! Signal table - the scrolling body of the screen.
//!
//! # View mode
//!
//! One row per active signal, in catalog order, then one row per response
//! that no catalog entry claims, showing its raw bytes:
//! ```text
//! NODE     SVC PARAM LABEL                        VALUE
//! 7E0 ECM  01  0C    RPM                       1726 rpm
//! 7E1 TCM  01  0C    (unknown)                       10
//! ```
//!
//! # Configure mode
//!
//! One row per catalog entry, cursor row highlighted:
//! ```text
//! ▶ [x] 7E0/01/0C    RPM            Engine speed in revolutions per minute
//! ```
//!
//! Only the rows inside the scroll window are built. Every cell is cut to its
//! column so nothing wraps on a narrow terminal.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::{
    value_style, CAUTION_AMBER, HUD_GREEN, STYLE_CURSOR, STYLE_DIM, STYLE_LABEL, STYLE_TEXT,
};
use crate::catalog::{node_name, CatalogEntry};
use crate::domain::SignalKey;
use crate::session::Session;
use crate::transport::Transport;

const CURSOR_MARK: &str = "▶ ";
const NODE_WIDTH: usize = 9;
const SERVICE_WIDTH: usize = 4;
const PARAM_WIDTH: usize = 6;
const VALUE_WIDTH: usize = 16;
const KEY_WIDTH: usize = 13;
const CONFIG_LABEL_WIDTH: usize = 28;
const UNMATCHED_LABEL: &str = "(unknown)";

/// Cut `s` to `width` characters, marking the cut with `…`
#[must_use]
pub fn truncate_for_display(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = s.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

fn cell(s: &str, width: usize) -> String {
    format!("{:<width$}", truncate_for_display(s, width))
}

fn node_cell(node: u16) -> String {
    match node_name(node) {
        Some(name) => format!("{node:03X} {name}"),
        None => format!("{node:03X}"),
    }
}

fn parameter_cell(key: &SignalKey) -> String {
    if key.is_extended() {
        format!("{:04X}", key.parameter)
    } else {
        format!("{:02X}", key.parameter)
    }
}

/// Width left for the label column once the fixed columns are placed
fn label_width(inner_width: usize, fixed: usize) -> usize {
    inner_width.saturating_sub(fixed).max(1)
}

fn view_header(inner_width: usize) -> Line<'static> {
    let label = label_width(inner_width, NODE_WIDTH + SERVICE_WIDTH + PARAM_WIDTH + VALUE_WIDTH);
    Line::from(Span::styled(
        format!(
            "{}{}{}{}{:>VALUE_WIDTH$}",
            cell("NODE", NODE_WIDTH),
            cell("SVC", SERVICE_WIDTH),
            cell("PARAM", PARAM_WIDTH),
            cell("LABEL", label),
            "VALUE"
        ),
        STYLE_LABEL,
    ))
}

fn signal_row(
    key: &SignalKey,
    label: (&str, Style),
    value: (&str, Style),
    inner_width: usize,
) -> Line<'static> {
    let label_cols = label_width(inner_width, NODE_WIDTH + SERVICE_WIDTH + PARAM_WIDTH + VALUE_WIDTH);
    let text = truncate_for_display(value.0, VALUE_WIDTH - 1);

    Line::from(vec![
        Span::styled(cell(&node_cell(key.node), NODE_WIDTH), STYLE_DIM),
        Span::styled(cell(&format!("{:02X}", key.service), SERVICE_WIDTH), STYLE_DIM),
        Span::styled(cell(&parameter_cell(key), PARAM_WIDTH), STYLE_DIM),
        Span::styled(cell(label.0, label_cols), label.1),
        Span::styled(format!("{text:>VALUE_WIDTH$}"), value.1),
    ])
}

/// One View-mode row
#[must_use]
pub fn view_line(entry: &CatalogEntry, value: &str, inner_width: usize) -> Line<'static> {
    signal_row(&entry.key, (entry.label.as_str(), STYLE_TEXT), (value, value_style(value)), inner_width)
}

/// View-mode row for a response with no catalog entry
#[must_use]
pub fn unmatched_line(key: &SignalKey, raw: &str, inner_width: usize) -> Line<'static> {
    signal_row(key, (UNMATCHED_LABEL, STYLE_DIM), (raw, Style::new().fg(CAUTION_AMBER)), inner_width)
}

/// One Configure-mode row
#[must_use]
pub fn configure_line(
    entry: &CatalogEntry,
    active: bool,
    is_cursor: bool,
    inner_width: usize,
) -> Line<'static> {
    let marker = if is_cursor { CURSOR_MARK } else { "  " };
    let checkbox = if active { "[x] " } else { "[ ] " };
    let fixed = marker.chars().count() + checkbox.len() + KEY_WIDTH + CONFIG_LABEL_WIDTH;
    let description = truncate_for_display(&entry.description, inner_width.saturating_sub(fixed));

    let base = if is_cursor { STYLE_CURSOR } else { STYLE_TEXT };
    let check_style = if active {
        Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD)
    } else {
        STYLE_DIM
    };

    Line::from(vec![
        Span::styled(marker, Style::new().fg(CAUTION_AMBER)),
        Span::styled(checkbox, if is_cursor { base } else { check_style }),
        Span::styled(cell(&entry.key.to_string(), KEY_WIDTH), if is_cursor { base } else { STYLE_DIM }),
        Span::styled(cell(&entry.label, CONFIG_LABEL_WIDTH), base),
        Span::styled(description, if is_cursor { base } else { STYLE_DIM }),
    ])
}

fn bordered(title: String, color: ratatui::style::Color) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(title).border_style(Style::new().fg(color))
}

/// Render the active signals with their latest values
pub fn render_view<T: Transport>(f: &mut Frame, area: Rect, session: &Session<T>) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let keys = session.active_keys();
    let total = session.view_len();
    let window = session.view().window(total, session.rows());

    let mut lines = vec![view_header(inner_width)];
    if keys.is_empty() {
        lines.push(Line::from(Span::styled("No active signals. Press c to configure.", STYLE_DIM)));
    }

    let catalog = session.catalog();
    let cache = session.cache();
    let active_end = window.end.min(keys.len());
    lines.extend(keys[window.start.min(active_end)..active_end].iter().filter_map(|key| {
        let entry = catalog.get(key)?;
        Some(view_line(entry, cache.display(key), inner_width))
    }));
    lines.extend(
        cache
            .unmatched()
            .skip(window.start.saturating_sub(keys.len()))
            .take(window.end - window.start.max(active_end))
            .map(|(key, raw)| unmatched_line(key, raw, inner_width)),
    );

    let title = if window.is_empty() {
        format!("[ SIGNALS {total} ]")
    } else {
        format!("[ SIGNALS {}-{}/{total} ]", window.start + 1, window.end)
    };
    f.render_widget(Paragraph::new(lines).block(bordered(title, HUD_GREEN)), area);
}

/// Render the full catalog with activation checkboxes
pub fn render_configure<T: Transport>(f: &mut Frame, area: Rect, session: &Session<T>) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let catalog = session.catalog();
    let view = session.view();
    let window = view.window(catalog.len(), session.rows());

    let header = Line::from(Span::styled(
        format!("      {}{}DESCRIPTION", cell("KEY", KEY_WIDTH), cell("LABEL", CONFIG_LABEL_WIDTH)),
        STYLE_LABEL,
    ));
    let mut lines = vec![header];
    lines.extend(catalog.entries()[window.clone()].iter().enumerate().map(|(offset, entry)| {
        let index = window.start + offset;
        configure_line(entry, session.active().contains(&entry.key), index == view.cursor, inner_width)
    }));

    let title = format!(
        "[ CONFIGURE {}/{} active | Space toggle  a all  n none  Enter save ]",
        session.active().len(),
        catalog.len()
    );
    f.render_widget(Paragraph::new(lines).block(bordered(title, CAUTION_AMBER)), area);
}
