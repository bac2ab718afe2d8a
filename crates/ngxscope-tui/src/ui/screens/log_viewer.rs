use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use ngxscope_logs::{
    AccessRecord, FreeTextRecord, LogChannel, LogView, ParsedLogEntry, Placeholder, Projection,
    Row, SearchQuery, SourceMode, project,
};

use crate::app::AppState;
use crate::ui::components::{StatusBar, log_viewer_hints};
use crate::ui::{Layout, Theme};

/// Two stacked panes, one per log channel
pub struct LogViewerScreen;

/// Safely truncate a string to a maximum byte length, finding the nearest valid UTF-8 boundary
fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut pos = max_bytes;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    &s[..pos]
}

/// Shorten `text` to `width` bytes, marking the cut with "..."
fn fit(text: &str, width: usize) -> String {
    if text.len() > width {
        format!("{}...", safe_truncate(text, width.saturating_sub(3)))
    } else {
        text.to_string()
    }
}

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, view: &LogView) {
        let show_search_bar = state.ui_state.search_active || !view.query().is_empty();
        let (header, search_bar, content, status_bar) =
            Layout::main(frame.area(), show_search_bar);

        Self::render_header(frame, header, state, view);
        if let Some(area) = search_bar {
            Self::render_search_bar(frame, area, state, view);
        }

        let panes = Layout::panes(content);
        for channel in LogChannel::ALL {
            Self::render_pane(frame, panes[channel.index()], state, view, channel);
        }

        Self::render_status_bar(frame, status_bar, state, view);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState, view: &LogView) {
        let title = Line::from(vec![
            Span::styled("ngxscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.source_mode.label(), Theme::text_highlight()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.source_label.as_str(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(view.mode().label(), Theme::text()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_search_bar(frame: &mut Frame, area: Rect, state: &AppState, view: &LogView) {
        let active = state.ui_state.search_active;
        let mut spans = Vec::new();

        if active {
            spans.push(Span::styled(" /", Theme::text_highlight()));
            spans.push(Span::styled(
                state.ui_state.search_input.clone(),
                Theme::text_highlight(),
            ));
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Theme::HIGHLIGHT)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
            spans.push(Span::styled(
                "  [Enter] Keep  [Esc] Clear",
                Theme::text_dim(),
            ));
        } else {
            spans.push(Span::styled(" Search: ", Theme::text_dim()));
            spans.push(Span::styled(
                view.query().as_str().to_string(),
                Theme::text_highlight(),
            ));
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if active {
                    Style::default().fg(Theme::HIGHLIGHT)
                } else {
                    Theme::border()
                })
                .title(Span::styled(" Search ", Theme::title())),
        );

        frame.render_widget(bar, area);
    }

    fn render_pane(
        frame: &mut Frame,
        area: Rect,
        state: &mut AppState,
        view: &LogView,
        channel: LogChannel,
    ) {
        let lines = view.visible(channel);
        let total = lines.len();
        let available = view.buffer(channel).len();
        let query = view.query();

        let title = if query.is_empty() {
            format!(" {} ({}) ", channel.title(), total)
        } else {
            format!(" {} ({} matching) ", channel.title(), total)
        };
        let focused = state.ui_state.focus == channel;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if focused {
                Theme::border_focused()
            } else {
                Theme::border()
            })
            .title(Span::styled(title, Theme::title()));

        let mut body = block.inner(area);
        frame.render_widget(block, area);

        if let Some(error) = view.error(channel) {
            let error_line = Rect { height: 1, ..body };
            frame.render_widget(
                Paragraph::new(Span::styled(format!("⚠ {error}"), Theme::error())),
                error_line,
            );
            body.y += 1;
            body.height = body.height.saturating_sub(1);
        }

        let height = body.height as usize;
        if height == 0 {
            return;
        }

        // Clamp scroll, or pin to the bottom in follow mode
        let max_scroll = total.saturating_sub(height);
        let scroll = if state.ui_state.auto_scroll {
            max_scroll
        } else {
            state.scroll(channel).min(max_scroll)
        };
        state.set_scroll(channel, scroll);

        // Viewport-first: only the visible window is projected
        let end = (scroll + height).min(total);
        let rows = match project(&lines[scroll..end], available, view.mode(), channel) {
            Projection::Rows(rows) => rows
                .iter()
                .map(|row| format_row(row, query, body.width.saturating_sub(1) as usize))
                .collect(),
            Projection::Empty(placeholder) => {
                let style = if placeholder.suggests_clearing_search() {
                    Theme::text_highlight()
                } else {
                    Theme::placeholder()
                };
                vec![Line::from(Span::styled(
                    placeholder_text(placeholder, channel, state.source_mode, query.as_str()),
                    style,
                ))]
            }
        };

        frame.render_widget(Paragraph::new(rows), body);

        if total > height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(scroll);

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, view: &LogView) {
        let right = format!(
            "{} | {} {}",
            state.source_mode.label(),
            view.mode().label(),
            if state.ui_state.auto_scroll { "▼" } else { " " }
        );

        let bar = StatusBar::new()
            .hints(log_viewer_hints(state.source_mode))
            .right(right)
            .notification(state.ui_state.notification.as_ref());

        frame.render_widget(bar, area);
    }
}

/// Message shown in place of rows when a pane is empty
fn placeholder_text(
    placeholder: Placeholder,
    channel: LogChannel,
    mode: SourceMode,
    query: &str,
) -> String {
    match placeholder {
        Placeholder::NoData => match mode {
            SourceMode::Push => format!("Waiting for {channel} events from nginx..."),
            SourceMode::Poll => format!("No {channel} logs yet."),
        },
        Placeholder::NoMatches { available } => format!(
            "No lines match '{query}' ({available} available). Press n to clear the search."
        ),
    }
}

/// Split `text` into spans, marking search hits
fn highlighted(text: String, style: Style, query: &SearchQuery) -> Vec<Span<'static>> {
    let matches = if query.is_empty() {
        Vec::new()
    } else {
        query.find_matches(&text)
    };
    if matches.is_empty() {
        return vec![Span::styled(text, style)];
    }

    let mut spans = Vec::new();
    let mut last_end = 0;
    for (start, end) in matches {
        if start > last_end {
            spans.push(Span::styled(text[last_end..start].to_string(), style));
        }
        spans.push(Span::styled(text[start..end].to_string(), Theme::search_match()));
        last_end = end;
    }
    if last_end < text.len() {
        spans.push(Span::styled(text[last_end..].to_string(), style));
    }
    spans
}

fn format_row(row: &Row<'_>, query: &SearchQuery, width: usize) -> Line<'static> {
    match row {
        Row::Raw(raw) => Line::from(highlighted(fit(raw, width), Theme::text(), query)),
        Row::Parsed { entry, .. } => match entry {
            ParsedLogEntry::Access(record) => format_access(record, query, width),
            ParsedLogEntry::FreeText(record) => format_free_text(record, query, width),
            ParsedLogEntry::Unparsed(text) => {
                let mut spans = vec![Span::styled("UNPARSED ", Theme::unparsed())];
                spans.extend(highlighted(
                    fit(text, width.saturating_sub(9)),
                    Theme::unparsed(),
                    query,
                ));
                Line::from(spans)
            }
        },
    }
}

/// `ip  METHOD path  status  size  user-agent`
fn format_access(record: &AccessRecord, query: &SearchQuery, width: usize) -> Line<'static> {
    let mut spans = highlighted(format!("{:<15}", record.ip), Theme::text_dim(), query);
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("{:<7}", record.method),
        Style::default().add_modifier(Modifier::BOLD),
    ));

    // ip, method, status and size take 36 columns; path and agent share the rest
    let path_width = (width.saturating_sub(36) / 2).max(16);
    spans.extend(highlighted(
        format!("{:<path_width$}", fit(&record.path, path_width)),
        Theme::text(),
        query,
    ));
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        record.status.clone(),
        Theme::tag(record.status_color()),
    ));
    spans.push(Span::styled(format!(" {:>7} ", record.size), Theme::text_dim()));
    spans.extend(highlighted(
        fit(&record.user_agent, width.saturating_sub(path_width + 36)),
        Theme::text_dim(),
        query,
    ));
    Line::from(spans)
}

/// `timestamp [SEV] message`
fn format_free_text(record: &FreeTextRecord, query: &SearchQuery, width: usize) -> Line<'static> {
    let mut spans = Vec::new();
    let mut used = 0;
    if let Some(ts) = &record.timestamp {
        spans.push(Span::styled(format!("{ts} "), Theme::text_dim()));
        used += ts.len() + 1;
    }
    spans.push(Span::styled(
        format!("[{}] ", record.severity.as_str()),
        Theme::tag(record.severity.color()),
    ));
    used += 6;

    spans.extend(highlighted(
        fit(&record.message, width.saturating_sub(used)),
        Theme::text(),
        query,
    ));
    Line::from(spans)
}
