use crate::index::Record;
use crate::session::Phase;
use crate::tui::app::{App, Mode};
use crate::utils::{format_size, is_binary};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use std::borrow::Cow;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Query input
            Constraint::Min(10),   // Records / Detail
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_query_input(f, app, chunks[0]);
    draw_main_area(f, app, chunks[1]);
    draw_status_bar(f, app, chunks[2]);

    match app.mode {
        Mode::Help => draw_help(f),
        Mode::PathPrompt => draw_path_prompt(f, app),
        Mode::Browse | Mode::Detail => {}
    }
}

fn draw_query_input(f: &mut Frame, app: &App, area: Rect) {
    let input = Paragraph::new(app.query.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Filter (Ctrl+O: open, Ctrl+P: detail, F1: help, Esc: quit) "),
        );

    f.render_widget(input, area);

    if app.mode == Mode::Browse {
        f.set_cursor_position(input_cursor(area, &app.query));
    }
}

fn draw_main_area(f: &mut Frame, app: &App, area: Rect) {
    match app.mode {
        Mode::Detail => draw_detail(f, app, area),
        _ => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);

            draw_records_list(f, app, chunks[0]);
            draw_detail(f, app, chunks[1]);
        }
    }
}

/// Key and value as shown in the current display mode
fn render_pair(record: &Record, hex: bool) -> (Cow<'_, str>, Cow<'_, str>) {
    if hex {
        (Cow::Borrowed(record.key_hex()), Cow::Borrowed(record.value_hex()))
    } else {
        (record.key_display(), record.value_display())
    }
}

fn draw_records_list(f: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let view = state.filtered_view();

    // Only build the rows that fit
    let height = area.height.saturating_sub(2) as usize;
    let offset = if height == 0 || app.selected < height {
        0
    } else {
        app.selected + 1 - height
    };

    let key_style = Style::default().fg(Color::Cyan);
    let value_style = Style::default().fg(Color::White);
    let binary_style = Style::default().fg(Color::DarkGray);

    let items: Vec<ListItem> = view
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, record)| {
            let style = if i == app.selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let (key, value) = render_pair(record, app.show_hex);
            let value_style = if !app.show_hex && is_binary(record.value_bytes()) {
                binary_style
            } else {
                value_style
            };

            let line = Line::from(vec![
                Span::styled(truncate(&key, area.width as usize / 2), key_style),
                Span::raw("  "),
                Span::styled(first_line(&value).to_string(), value_style),
            ]);

            ListItem::new(line).style(style)
        })
        .collect();

    let title = if state.is_filtered() {
        format!(" Records ({} of {}) ", view.len(), state.total_count())
    } else {
        format!(" Records ({}) ", view.len())
    };

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(list, area);
}

fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let Some(record) = app.get_selected_record() else {
        let placeholder = Paragraph::new(Text::raw(idle_hint(app)))
            .block(Block::default().borders(Borders::ALL).title(" Detail "));
        f.render_widget(placeholder, area);
        return;
    };

    let (key, value) = render_pair(record, app.show_hex);
    let label = Style::default().fg(Color::DarkGray);
    let heading = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Key ", heading),
            Span::styled(format!("({})", format_size(record.key_bytes().len())), label),
        ]),
    ];
    lines.extend(key.lines().map(|l| Line::raw(l.to_string())));
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled("Value ", heading),
        Span::styled(format!("({})", format_size(record.value_bytes().len())), label),
    ]));
    lines.extend(value.lines().map(|l| Line::raw(l.to_string())));

    let title = if app.show_hex { " Detail (hex) " } else { " Detail " };
    let detail = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll.min(u16::MAX as usize) as u16, 0));

    f.render_widget(detail, area);
}

fn idle_hint(app: &App) -> &'static str {
    match app.session.state().phase() {
        Phase::Closed => "No database open. Press Ctrl+O to open one.",
        Phase::Opening => "Loading...",
        Phase::Repairing => "Repairing...",
        Phase::CorruptedPendingRepair => "Database is corrupted. Press Ctrl+R to repair it.",
        Phase::Open => "No matching records",
    }
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let style = if state.corruption_detected() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let mut text = state.status_text().to_string();
    if app.repair_available() {
        text.push_str(" [Ctrl+R: repair]");
    }

    f.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());
    let bindings = [
        ("Type", "Filter keys and values (case-insensitive, hex too)"),
        ("Enter", "Filter now"),
        ("Esc", "Clear filter, quit when empty"),
        ("Up/Down, Ctrl+J/K", "Move selection"),
        ("PgUp/PgDn, Ctrl+U/D", "Move by page"),
        ("gg / G", "First / last record"),
        ("Ctrl+W", "Delete word"),
        ("Ctrl+P", "Toggle detail view"),
        ("Ctrl+X", "Toggle hex display"),
        ("Ctrl+O", "Open database"),
        ("Ctrl+L", "Close database"),
        ("Ctrl+R", "Repair database"),
        ("F5", "Reload database"),
        ("Ctrl+C / Ctrl+Q", "Quit"),
    ];

    let lines: Vec<Line> = bindings
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{:<22}", key), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        })
        .collect();

    let help = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Help (any key to close) "));

    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

fn draw_path_prompt(f: &mut Frame, app: &App) {
    let outer = centered_rect(70, 20, f.area());
    let area = Rect {
        height: outer.height.min(3),
        ..outer
    };

    let input = Paragraph::new(app.path_input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Open database directory (Enter: open, Esc: cancel) "),
        );

    f.render_widget(Clear, area);
    f.render_widget(input, area);

    f.set_cursor_position(input_cursor(area, &app.path_input));
}

/// Cursor position after `text` inside a bordered one-line input, kept within the box
fn input_cursor(area: Rect, text: &str) -> (u16, u16) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let column = text.chars().count().min(inner_width.saturating_sub(1)) as u16;
    (area.x.saturating_add(1).saturating_add(column), area.y.saturating_add(1))
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
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
        .split(vertical[1])[1]
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Cut `text` to at most `max` characters, marking the cut
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
