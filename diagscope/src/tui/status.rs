use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::{CAUTION_AMBER, CRITICAL_RED, HUD_GREEN, STYLE_DIM, STYLE_HEADING, STYLE_KEY};
use crate::session::Session;
use crate::state::Mode;
use crate::transport::Transport;

fn separator() -> Span<'static> {
    Span::styled(" | ", STYLE_DIM)
}

fn mode_badge(mode: Mode) -> Span<'static> {
    let color = match mode {
        Mode::View => HUD_GREEN,
        Mode::Configure => CAUTION_AMBER,
    };
    Span::styled(format!("[{}]", mode.label()), Style::new().fg(color).add_modifier(Modifier::BOLD))
}

/// Title bar: bus, traffic counters
pub fn render_header<T: Transport>(f: &mut Frame, area: Rect, session: &Session<T>, bus: &str) {
    let stats = session.stats();
    let line = Line::from(vec![
        Span::styled("DIAGSCOPE", STYLE_HEADING),
        separator(),
        Span::styled(format!("bus:{bus}"), Style::new().fg(HUD_GREEN)),
        separator(),
        Span::styled(format!("{} rx", stats.frames), Style::new().fg(CAUTION_AMBER)),
        Span::styled(format!(" ({} decoded)", stats.updated), STYLE_DIM),
        separator(),
        Span::styled(format!("{} polls", session.passes()), Style::new().fg(HUD_GREEN)),
    ]);

    let paragraph = Paragraph::new(line).block(
        Block::default().borders(Borders::ALL).border_style(Style::new().fg(HUD_GREEN)),
    );
    f.render_widget(paragraph, area);
}

/// Bottom bar: mode, counts, latest notice, key hints
pub fn render_status<T: Transport>(f: &mut Frame, area: Rect, session: &Session<T>) {
    let mode = session.view().mode;
    let unmatched = session.cache().unmatched_count();

    let mut spans = vec![
        mode_badge(mode),
        Span::raw(" "),
        Span::styled(
            format!("{}/{} active", session.active().len(), session.catalog().len()),
            Style::new().fg(HUD_GREEN),
        ),
        separator(),
        Span::styled(
            format!("{unmatched} unmatched"),
            Style::new().fg(if unmatched > 0 { CAUTION_AMBER } else { HUD_GREEN }),
        ),
    ];

    if let Some(notice) = session.notice() {
        let color = if notice.is_error() { CRITICAL_RED } else { HUD_GREEN };
        spans.push(separator());
        spans.push(Span::styled(notice.text().to_string(), Style::new().fg(color)));
    }

    spans.push(separator());
    let hints: &[(&'static str, &'static str)] = match mode {
        Mode::View => &[("Q", ":Quit "), ("C", ":Configure "), ("↑↓", ":Scroll")],
        Mode::Configure => &[("Q", ":Quit "), ("Space", ":Toggle "), ("Enter", ":Save")],
    };
    for (key, action) in hints {
        spans.push(Span::styled(*key, STYLE_KEY));
        spans.push(Span::styled(*action, STYLE_DIM));
    }

    let border = if session.notice().is_some_and(|n| n.is_error()) { CRITICAL_RED } else { HUD_GREEN };
    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::new().fg(border)));
    f.render_widget(paragraph, area);
}
