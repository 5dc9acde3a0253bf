//! Frame drawing
//!
//! `draw` is a pure function of the dashboard state, the theme and the
//! current time. It never mutates state and never touches the cluster.

use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use kubedash_core::dashboard::{
    DashboardState, MIN_DETAILS_WIDTH, MIN_HEIGHT, MIN_LIST_WIDTH, Pane, Tab,
};
use kubedash_core::text::{TextLine, overview_lines};

use super::theme::Theme;

const KEY_HINTS: [(&str, &str); 7] = [
    ("←/→", "pane"),
    ("↑/↓", "move"),
    ("Tab/1-4", "view"),
    ("PgUp/PgDn", "scroll"),
    ("r", "refresh"),
    ("Enter", "select"),
    ("q", "quit"),
];

pub fn draw(f: &mut Frame, state: &DashboardState, theme: &Theme, now: DateTime<Utc>) {
    let area = f.area();

    if !state.ready {
        let notice = Paragraph::new("Initializing…")
            .style(theme.text_muted())
            .alignment(Alignment::Center);
        f.render_widget(notice, centered_line(area));
        return;
    }

    if state.layout.too_small() {
        let lines = vec![
            Line::styled("Terminal too small", theme.error()),
            Line::styled(
                format!(
                    "{}x{}, need at least {}x{}",
                    state.layout.width,
                    state.layout.height,
                    MIN_LIST_WIDTH + MIN_DETAILS_WIDTH,
                    MIN_HEIGHT
                ),
                theme.text_muted(),
            ),
        ];
        let notice = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(notice, centered_line(area));
        return;
    }

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(state.layout.list_width),
            Constraint::Min(0),
        ])
        .split(outer[0]);

    draw_list(f, main[0], state, theme, now);
    draw_details(f, main[1], state, theme, now);
    draw_footer(f, outer[1], theme);
}

fn centered_line(area: Rect) -> Rect {
    let y = area.y + area.height / 2;
    Rect::new(area.x, y.saturating_sub(1), area.width, area.height.min(2))
}

fn to_line(line: &TextLine, theme: &Theme) -> Line<'static> {
    Line::from(
        line.spans()
            .iter()
            .map(|s| Span::styled(s.text.clone(), theme.tone(s.tone)))
            .collect::<Vec<_>>(),
    )
}

fn draw_list(f: &mut Frame, area: Rect, state: &DashboardState, theme: &Theme, now: DateTime<Utc>) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border(state.pane == Pane::List))
        .title(Span::styled(
            format!(" {} ({}) ", state.kind.title(), state.items.len()),
            theme.title(),
        ));

    if state.items.is_empty() {
        let body = match (&state.last_error, state.resources_pending()) {
            (Some(err), _) => Line::styled(format!("Error: {}", err), theme.error()),
            (None, true) => Line::styled("Loading…", theme.text_muted()),
            (None, false) => Line::styled("No resources found", theme.text_muted()),
        };
        f.render_widget(
            Paragraph::new(body).block(block).wrap(Wrap { trim: true }),
            area,
        );
        return;
    }

    if let Some(err) = &state.last_error {
        block = block.title_bottom(Span::styled(format!(" refresh failed: {} ", err), theme.error()));
    }

    let items: Vec<ListItem> = state
        .items
        .iter()
        .map(|item| {
            let label = item.status_label();
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{} ", theme.status_icon(label)), theme.status(label)),
                    Span::styled(item.name().to_string(), theme.text()),
                ]),
                Line::styled(format!("  {}", item.description(now)), theme.text_muted()),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(theme.selection());
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn tab_bar(state: &DashboardState, theme: &Theme) -> Line<'static> {
    let spans: Vec<Span> = Tab::ALL
        .iter()
        .map(|tab| {
            Span::styled(
                format!(" {}:{} ", tab.index() + 1, tab.label()),
                theme.tab(*tab == state.tab),
            )
        })
        .collect();
    Line::from(spans)
}

/// Lines of the detail body, the scroll offset, and whether the paragraph
/// must wrap them. Tab viewports arrive already wrapped to the pane width.
fn body_lines(
    state: &DashboardState,
    theme: &Theme,
    now: DateTime<Utc>,
) -> (Vec<Line<'static>>, usize, bool) {
    let muted = |text: &str| vec![Line::styled(text.to_string(), theme.text_muted())];

    if state.tab == Tab::Overview {
        let lines = match state.selected_item() {
            Some(item) => overview_lines(item, now)
                .iter()
                .map(|l| to_line(l, theme))
                .collect(),
            None => muted("No resource selected."),
        };
        return (lines, 0, true);
    }

    if state.tab == Tab::Doctor && state.doctor_loading {
        return (muted("Analyzing containers..."), 0, true);
    }

    let Some(viewport) = state.viewport(state.tab) else {
        return (Vec::new(), 0, true);
    };
    if viewport.rows().is_empty() {
        let notice = if viewport.is_pending() {
            "Loading…"
        } else if state.selected_item().is_none() {
            "No resource selected."
        } else {
            "Nothing to show yet."
        };
        return (muted(notice), 0, true);
    }
    (
        viewport.rows().iter().map(|l| to_line(l, theme)).collect(),
        viewport.scroll,
        false,
    )
}

fn draw_details(f: &mut Frame, area: Rect, state: &DashboardState, theme: &Theme, now: DateTime<Utc>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    f.render_widget(Paragraph::new(tab_bar(state, theme)), chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border(state.pane == Pane::Details));
    let (lines, scroll, wrap) = body_lines(state, theme, now);
    let mut body = Paragraph::new(lines)
        .block(block)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    if wrap {
        body = body.wrap(Wrap { trim: false });
    }
    f.render_widget(body, chunks[1]);
}

fn draw_footer(f: &mut Frame, area: Rect, theme: &Theme) {
    let mut spans = Vec::with_capacity(KEY_HINTS.len() * 2);
    for (key, action) in KEY_HINTS {
        spans.push(Span::styled(format!(" {}", key), theme.key_hint()));
        spans.push(Span::styled(format!(" {} ", action), theme.text_muted()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubedash_core::dashboard::{Event, Key, init, reduce};
    use kubedash_core::fetch::LogSection;
    use kubedash_core::model::{ContainerState, ContainerStatus, Pod};
    use kubedash_core::resource::{ResourceItem, ResourceKind};
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};

    fn render(state: &DashboardState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| draw(f, state, &Theme::default(), Utc::now()))
            .unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn with_pods(width: u16, height: u16) -> DashboardState {
        let (mut state, effects) = init(ResourceKind::Pod, false);
        reduce(&mut state, Event::Resize { width, height });
        let pod = Pod::new("api-7d9f8", "Running")
            .with_container(ContainerStatus::new("api", ContainerState::running()));
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket: effects[0].ticket(),
                result: Ok(vec![ResourceItem::Pod(pod)]),
            },
        );
        state
    }

    #[test]
    fn test_initializing_before_first_resize() {
        let (state, _) = init(ResourceKind::Pod, false);
        assert!(render(&state, 80, 20).contains("Initializing"));
    }

    #[test]
    fn test_too_small_notice() {
        let (mut state, _) = init(ResourceKind::Pod, false);
        reduce(&mut state, Event::Resize { width: 50, height: 8 });
        let screen = render(&state, 50, 8);
        assert!(screen.contains("Terminal too small"));
        assert!(!screen.contains("Overview"));
    }

    #[test]
    fn test_layout_with_overview() {
        let state = with_pods(100, 30);
        let screen = render(&state, 100, 30);
        assert!(screen.contains("Pods (1)"));
        assert!(screen.contains("1:Overview"));
        assert!(screen.contains("4:Doctor"));
        assert!(screen.contains("Pod: api-7d9f8"));
        assert!(screen.contains("api: running"));
        assert!(screen.contains("quit"));
    }

    #[test]
    fn test_doctor_loading_indicator() {
        let mut state = with_pods(100, 30);
        reduce(&mut state, Event::Key(Key::Char('4')));
        assert!(render(&state, 100, 30).contains("Analyzing containers..."));
    }

    #[test]
    fn test_list_error_shown_in_list_pane() {
        let (mut state, effects) = init(ResourceKind::Pod, false);
        reduce(&mut state, Event::Resize { width: 100, height: 30 });
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket: effects[0].ticket(),
                result: Err(kubedash_core::client::CollaboratorError::command(
                    "list",
                    "boom",
                )),
            },
        );
        assert!(render(&state, 100, 30).contains("Error: list: boom"));
    }

    #[test]
    fn test_end_shows_last_line_of_long_logs() {
        let mut state = with_pods(100, 30);
        let ticket = reduce(&mut state, Event::Key(Key::Char('2')))[0].ticket();
        let long = "y".repeat(157);
        let mut text: String = (0..41).map(|i| format!("line{} {}\n", i, long)).collect();
        text.push_str("THE-LAST-LINE\n");
        reduce(
            &mut state,
            Event::LogsFetched {
                ticket,
                resource: "api-7d9f8".into(),
                result: Ok(vec![LogSection {
                    title: "Container: api".into(),
                    text: Ok(text),
                }]),
            },
        );

        reduce(&mut state, Event::Key(Key::Right));
        reduce(&mut state, Event::Key(Key::End));
        let screen = render(&state, 100, 30);
        assert!(screen.contains("THE-LAST-LINE"));
        assert!(!screen.contains("line0 "));
    }
}
