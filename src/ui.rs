use chrono::{DateTime, Utc};
use ratatui::{prelude::*, widgets::*};

/// Renders a text input field
pub fn render_input<'a>(
    content: impl Into<Text<'a>>,
    title: &'a str,
    is_focused: bool,
) -> Paragraph<'a> {
    let style = if is_focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title);

    Paragraph::new(content).block(block)
}

/// Password placeholder of the same length
pub fn masked(len: usize) -> String {
    "•".repeat(len)
}

/// `[x] label` / `[ ] label` with a color per state
pub fn flag_span(label: &str, on: bool) -> Span<'static> {
    let (prefix, color) = if on {
        ("[x]", Color::Green)
    } else {
        ("[ ]", Color::DarkGray)
    };
    Span::styled(format!("{} {}", prefix, label), Style::default().fg(color))
}

/// Timestamp for the profile panel, `-` when unknown
pub fn format_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Rect of the given percentage size centered in `r`
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
