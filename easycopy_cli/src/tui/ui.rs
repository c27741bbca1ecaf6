//! TUI rendering functions

use super::app::{PanelApp, Tab};
use crate::settings::CopyField;
use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table, TableState, Tabs,
    },
    Frame,
};

/// Draw the TUI
pub fn draw(frame: &mut Frame, app: &PanelApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Tab bar
            Constraint::Min(5),    // Tab page
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_tabs(frame, app, chunks[0]);
    match app.tab {
        Tab::Requests => draw_requests_tab(frame, app, chunks[1]),
        Tab::Settings => draw_settings_tab(frame, app, chunks[1]),
    }
    draw_status(frame, app, chunks[2]);
    draw_footer(frame, app.tab, chunks[3]);
}

fn draw_tabs(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let titles = [Tab::Requests, Tab::Settings]
        .iter()
        .map(|t| Line::from(t.title()))
        .collect::<Vec<_>>();
    let selected = match app.tab {
        Tab::Requests => 0,
        Tab::Settings => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

/// Draw the error filter toggle and the request table
fn draw_requests_tab(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let checkbox = if app.view.filter().errors_only { "[x]" } else { "[ ]" };
    let filter_line = Line::from(vec![
        Span::styled(checkbox, Style::default().fg(Color::Cyan)),
        Span::styled(" Show only errors (status >= 400)", Style::default().fg(Color::White)),
    ]);
    frame.render_widget(Paragraph::new(filter_line), chunks[0]);

    draw_request_table(frame, app, chunks[1]);
}

fn draw_request_table(frame: &mut Frame, app: &PanelApp, area: Rect) {
    // Fixed columns: Time(8) + Method(7) + Status(6) + Copy(6) + borders/padding(~10)
    let fixed_width = 8 + 7 + 6 + 6 + 10;
    let url_width = (area.width as usize).saturating_sub(fixed_width).max(10);

    let header = Row::new(vec!["Time", "Method", "URL", "Status", ""])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .bottom_margin(0);

    let selected = app.view.selected();
    let rows: Vec<Row> = app
        .view
        .rows()
        .enumerate()
        .map(|(i, exchange)| {
            let copy_cell = if i == selected { "[Copy]" } else { "" };
            let time = exchange
                .started_date_time
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string();
            Row::new(vec![
                Cell::from(time).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format!("{:>6}", truncate_str(&exchange.method, 6)))
                    .style(method_style(&exchange.method)),
                Cell::from(truncate_str(&exchange.url, url_width)),
                Cell::from(exchange.status.to_string()).style(status_style(exchange.status)),
                Cell::from(copy_cell).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let title = if app.replayed {
        format!(" Requests ({}/{}) ", app.view.row_count(), app.view.history_len())
    } else {
        " Requests (loading...) ".to_string()
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .row_highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)));

    let mut state = TableState::default();
    if app.view.row_count() > 0 {
        state.select(Some(selected));
    }
    frame.render_stateful_widget(table, chunks[0], &mut state);

    if app.view.row_count() > 0 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");

        let mut scrollbar_state = ScrollbarState::new(app.view.row_count()).position(selected);
        frame.render_stateful_widget(scrollbar, chunks[1], &mut scrollbar_state);
    }

    let tooltip_row = app
        .tooltip
        .as_ref()
        .and_then(|tooltip| app.view.row_of(tooltip.index).map(|row| (tooltip, row)));
    if let Some((tooltip, row)) = tooltip_row {
        // Row 0 sits below the top border and the header
        let first_row_y = chunks[0].y + 2;
        let last_row_y = chunks[0].y + chunks[0].height.saturating_sub(2);
        if row >= state.offset() {
            let row_y = first_row_y + (row - state.offset()) as u16;
            if row_y <= last_row_y {
                let width = (tooltip.message.len() as u16 + 2).min(chunks[0].width);
                let x = chunks[0].x + chunks[0].width.saturating_sub(width + 1);
                let y = row_y.saturating_sub(1).max(chunks[0].y);
                let popup = Rect::new(x, y, width, 1);

                frame.render_widget(Clear, popup);
                frame.render_widget(
                    Paragraph::new(format!(" {} ", tooltip.message))
                        .style(Style::default().fg(Color::Black).bg(Color::Green)),
                    popup,
                );
            }
        }
    }
}

/// Draw the copy settings form
fn draw_settings_tab(frame: &mut Frame, app: &PanelApp, area: Rect) {
    let settings = app.form.settings();
    let selected = app.form.selected_field();

    let lines: Vec<Line> = CopyField::ALL
        .iter()
        .map(|field| {
            let checkbox = if settings.get(*field) { "[x]" } else { "[ ]" };
            let style = if *field == selected {
                Style::default().fg(Color::White).bg(Color::Rgb(40, 40, 60))
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!(" {} ", checkbox), Style::default().fg(Color::Cyan)),
                Span::styled(field.label(), style),
                Span::styled(format!("  ({})", field.as_str()), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let block = Block::default()
        .title(" Fields to copy ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_status(frame: &mut Frame, app: &PanelApp, area: Rect) {
    if let Some(status) = &app.status {
        let line = Line::from(Span::styled(status.as_str(), Style::default().fg(Color::Yellow)));
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Draw the footer with key hints
fn draw_footer(frame: &mut Frame, tab: Tab, area: Rect) {
    let hints: &[(&str, &str)] = match tab {
        Tab::Requests => &[
            ("Tab", " Settings  "),
            ("↑/↓", " Navigate  "),
            ("e", " Errors only  "),
            ("Enter", " Copy  "),
            ("q", " Quit"),
        ],
        Tab::Settings => &[
            ("Tab", " Requests  "),
            ("↑/↓", " Navigate  "),
            ("Space", " Toggle  "),
            ("s", " Save  "),
            ("r", " Reset  "),
            ("q", " Quit"),
        ],
    };

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(*key, Style::default().fg(Color::Cyan)),
                Span::styled(*label, Style::default().fg(Color::DarkGray)),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Get style for HTTP method
fn method_style(method: &str) -> Style {
    match method {
        "GET" => Style::default().fg(Color::Green),
        "POST" => Style::default().fg(Color::Yellow),
        "PUT" => Style::default().fg(Color::Blue),
        "PATCH" => Style::default().fg(Color::Magenta),
        "DELETE" => Style::default().fg(Color::Red),
        "HEAD" => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::White),
    }
}

/// Get style for HTTP status code
fn status_style(status: u16) -> Style {
    if status >= 500 {
        Style::default().fg(Color::Red)
    } else if status >= 400 {
        Style::default().fg(Color::Yellow)
    } else if status >= 300 {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Green)
    }
}

/// Truncate any string to max length
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CopySettings;
    use crate::tui::app::PanelEvent;
    use easycopy_common::CapturedExchange;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &PanelApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("https://a.test/x", 40), "https://a.test/x");
        assert_eq!(truncate_str("https://a.test/long/path", 10), "https:/...");
        assert_eq!(truncate_str("abcdef", 2), "ab");
    }

    #[test]
    fn test_requests_tab_renders_rows_and_tooltip() {
        let mut app = PanelApp::new(CopySettings::default());
        app.handle_event(PanelEvent::Replayed(vec![
            CapturedExchange::new("GET", "https://a.test/ok", 200, "OK"),
            CapturedExchange::new("DELETE", "https://a.test/gone", 410, "Gone"),
        ]));
        app.handle_event(PanelEvent::Copied { index: 1, ok: true });

        let screen = render(&app);
        assert!(screen.contains("https://a.test/ok"));
        assert!(screen.contains("410"));
        assert!(screen.contains("Requests (2/2)"));
        assert!(screen.contains("Network request copied to clipboard"));
    }

    #[test]
    fn test_tooltip_not_drawn_for_filtered_out_exchange() {
        let mut app = PanelApp::new(CopySettings::default());
        app.handle_event(PanelEvent::Replayed(vec![
            CapturedExchange::new("GET", "https://a.test/ok", 200, "OK"),
            CapturedExchange::new("DELETE", "https://a.test/gone", 410, "Gone"),
        ]));
        app.handle_event(PanelEvent::Copied { index: 0, ok: true });
        app.view.set_errors_only(true);

        let screen = render(&app);
        assert!(screen.contains("https://a.test/gone"));
        assert!(!screen.contains("Network request copied to clipboard"));
    }

    #[test]
    fn test_settings_tab_renders_checkboxes() {
        let mut app = PanelApp::new(CopySettings::default());
        app.tab = Tab::Settings;

        let screen = render(&app);
        assert!(screen.contains("[x] Request URL"));
        assert!(screen.contains("[ ] Request headers"));
        assert!(screen.contains("[ ] Response status text"));
    }
}
