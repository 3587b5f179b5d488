use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Wrap,
};
use ratatui::Frame;

use crate::controller::PendingDelete;
use crate::storage::Store;
use crate::view::{submit_label, DisplayStyle, TaskRow};

use super::app::{AppState, StatusKind};
use super::form::{FormField, FormState};

const INDEX_WIDTH: u16 = 4;
const DUE_WIDTH: u16 = 18;
const STATE_WIDTH: u16 = 10;
const HELP_KEY_WIDTH: usize = 10;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_BG_SELECTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER: Color = Color::Rgb(92, 126, 166);

const HELP_ENTRIES: [(&str, &str); 9] = [
    ("j / k", "move selection"),
    ("a", "add a task"),
    ("e, Enter", "edit selected task"),
    ("space, c", "toggle completed"),
    ("d", "delete selected task"),
    ("r", "reload from store"),
    ("Tab", "switch form field"),
    ("Esc", "cancel form / quit"),
    ("q", "quit"),
];

pub fn render<S: Store>(frame: &mut Frame, app: &AppState<S>) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(area);

    render_title(frame, chunks[0]);
    render_form(frame, app, chunks[1]);
    render_progress(frame, app, chunks[2]);
    render_table(frame, app, chunks[3]);
    render_footer(frame, app, chunks[4]);

    if let Some(pending) = app.delete_confirm.as_ref() {
        render_delete_confirm_modal(frame, area, pending);
    } else if app.show_help {
        render_help_modal(frame, area);
    }
}

fn render_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(Span::styled(
        "Task Master",
        Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

fn render_form<S: Store>(frame: &mut Frame, app: &AppState<S>, area: Rect) {
    let label = submit_label(&app.controller.mode());
    let border = if app.form.is_some() {
        COLOR_ACCENT
    } else {
        COLOR_MUTED_DARK
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(
            format!(" {label} "),
            Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
        ));

    let lines = match app.form.as_ref() {
        Some(form) => form_lines(form, &app.display.placeholder),
        None => vec![Line::from(Span::styled(
            "Press a to add a task, e to edit the selected one",
            Style::default().fg(COLOR_MUTED),
        ))],
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn form_lines(form: &FormState, placeholder: &str) -> Vec<Line<'static>> {
    let field = |name: &'static str, value: &str, active: bool, hint: &str| {
        let marker = if active { "> " } else { "  " };
        let value_span = if value.is_empty() {
            Span::styled(hint.to_string(), Style::default().fg(COLOR_MUTED_DARK))
        } else {
            Span::styled(value.to_string(), Style::default().fg(COLOR_TEXT))
        };
        let mut spans = vec![
            Span::styled(marker, Style::default().fg(COLOR_ACCENT)),
            Span::styled(format!("{name:<7}"), Style::default().fg(COLOR_MUTED)),
            value_span,
        ];
        if active {
            spans.push(Span::styled("_", Style::default().fg(COLOR_ACCENT)));
        }
        Line::from(spans)
    };

    let due_hint = format!("DD/MM/YYYY HH:mm (empty: now; {placeholder} if unreadable)");
    let mut lines = vec![
        field("Title", form.title.as_str(), form.active == FormField::Title, "Task title"),
        field("Due", form.due.as_str(), form.active == FormField::Due, due_hint.as_str()),
    ];
    if let Some(error) = form.error.as_ref() {
        if let Some(first) = lines.first_mut() {
            first.spans.push(Span::styled(
                format!("  {error}"),
                Style::default().fg(COLOR_ERROR),
            ));
        }
    }
    lines
}

fn render_progress<S: Store>(frame: &mut Frame, app: &AppState<S>, area: Rect) {
    let progress = app.progress();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_BORDER)),
        )
        .gauge_style(Style::default().fg(hex_color(crate::view::COLOR_COMPLETED)))
        .ratio(progress.ratio().clamp(0.0, 1.0))
        .label(progress.label());
    frame.render_widget(gauge, area);
}

fn render_table<S: Store>(frame: &mut Frame, app: &AppState<S>, area: Rect) {
    let rows = app.rows();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_BORDER))
        .title(Span::styled(
            format!(" Tasks ({}) ", rows.len()),
            Style::default().fg(COLOR_TEXT),
        ));

    if rows.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No tasks yet",
            Style::default().fg(COLOR_MUTED),
        )))
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["#", "Title", "Due", "State"]).style(
        Style::default()
            .fg(COLOR_MUTED)
            .add_modifier(Modifier::BOLD),
    );
    let body: Vec<Row> = rows.iter().map(table_row).collect();
    let widths = [
        Constraint::Length(INDEX_WIDTH),
        Constraint::Min(10),
        Constraint::Length(DUE_WIDTH),
        Constraint::Length(STATE_WIDTH),
    ];
    let table = Table::new(body, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().bg(COLOR_BG_SELECTED))
        .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(app.selected);
    frame.render_stateful_widget(table, area, &mut state);
}

fn table_row(row: &TaskRow) -> Row<'static> {
    let style = row_style(row.style);
    Row::new(vec![
        Cell::from(row.index.to_string()).style(Style::default().fg(COLOR_MUTED_DARK)),
        Cell::from(row.title.clone()).style(style),
        Cell::from(row.due.clone()).style(Style::default().fg(COLOR_MUTED)),
        Cell::from(row.action).style(style),
    ])
}

fn row_style(style: DisplayStyle) -> Style {
    let base = Style::default().fg(hex_color(style.color));
    if style.strikethrough {
        base.add_modifier(Modifier::CROSSED_OUT)
    } else {
        base
    }
}

fn render_footer<S: Store>(frame: &mut Frame, app: &AppState<S>, area: Rect) {
    let hint_span = Span::styled(app.footer_hint(), Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = app.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status.to_string(), status_style),
        ])
    } else {
        Line::from(hint_span)
    };
    let widget = Paragraph::new(line).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(COLOR_BORDER)),
    );
    frame.render_widget(widget, area);
}

fn render_delete_confirm_modal(frame: &mut Frame, area: Rect, pending: &PendingDelete) {
    let content_width = area.width.saturating_sub(8).min(64);
    let height = 9u16.min(area.height.saturating_sub(6).max(8));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let title_width = (content_width as usize).saturating_sub(10);
    let lines = vec![
        Line::from(Span::styled(
            "Delete task?",
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Title: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(
                truncate_text(&pending.title, title_width),
                Style::default().fg(COLOR_TEXT),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            pending.prompt(),
            Style::default().fg(COLOR_WARNING),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y: delete   n/Esc: keep",
            Style::default().fg(COLOR_INFO),
        )),
    ];

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_ERROR)),
        );
    frame.render_widget(widget, modal);
}

fn render_help_modal(frame: &mut Frame, area: Rect) {
    let height = HELP_ENTRIES.len() as u16 + 4;
    let modal = centered_rect(48, height, area);
    frame.render_widget(Clear, modal);

    let mut lines: Vec<Line<'static>> = HELP_ENTRIES
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(
                    format!("{key:<HELP_KEY_WIDTH$}"),
                    Style::default().fg(COLOR_ACCENT),
                ),
                Span::styled(*action, Style::default().fg(COLOR_TEXT)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "any key to close",
        Style::default().fg(COLOR_MUTED_DARK),
    )));

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER))
            .title(" Keys "),
    );
    frame.render_widget(widget, modal);
}

/// `#RRGGBB` to a terminal colour; anything else falls back to plain text
fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return COLOR_TEXT;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => COLOR_TEXT,
    }
}

fn truncate_text(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::config::{DisplayConfig, TimeZoneChoice};
    use crate::controller::Controller;
    use crate::repository::TaskRepository;
    use crate::storage::{MemoryBackend, SlotStore, TODOS_KEY};
    use crate::ui::app::StatusNotifier;

    fn screen(app: &AppState<SlotStore<MemoryBackend>>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app(seed: &str) -> AppState<SlotStore<MemoryBackend>> {
        let backend = MemoryBackend::with_item(TODOS_KEY, seed);
        let controller = Controller::new(
            TaskRepository::open(SlotStore::new(backend)),
            StatusNotifier::default(),
        );
        AppState::new(
            controller,
            DisplayConfig {
                timezone: TimeZoneChoice::Utc,
                ..DisplayConfig::default()
            },
        )
    }

    #[test]
    fn renders_rows_progress_and_placeholder() {
        let app = app(
            r#"[{"id":1,"task_title":"Buy milk","due":1700000000000,"is_completed":true},
                {"id":2,"task_title":"Walk dog","due":"not-a-number","is_completed":false}]"#,
        );
        let text = screen(&app);
        assert!(text.contains("Add Task"));
        assert!(text.contains("Progress: 50%"));
        assert!(text.contains("Buy milk"));
        assert!(text.contains("14/11/2023 22:13"));
        assert!(text.contains("No date set"));
        assert!(text.contains("Completed"));
    }

    #[test]
    fn renders_edit_label_and_delete_modal() {
        let mut app = app(r#"[{"id":1,"task_title":"Buy milk","due":1700000000000}]"#);
        app.handle_key(KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE));
        assert!(screen(&app).contains("Edit Task"));

        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        app.handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::NONE));
        let text = screen(&app);
        assert!(text.contains("Delete task?"));
        assert!(text.contains("revert this!"));
    }

    #[test]
    fn empty_store_shows_zero_progress() {
        let text = screen(&app("[]"));
        assert!(text.contains("Progress: 0%"));
        assert!(text.contains("No tasks yet"));
    }

    #[test]
    fn completed_rows_are_green_and_struck_through() {
        let style = row_style(crate::view::display_style(true));
        assert_eq!(style.fg, Some(Color::Rgb(0x4C, 0xAF, 0x50)));
        assert!(style.add_modifier.contains(Modifier::CROSSED_OUT));
        assert_eq!(hex_color("#FFFFFF"), Color::Rgb(255, 255, 255));
        assert_eq!(hex_color("bogus"), COLOR_TEXT);
    }
}
