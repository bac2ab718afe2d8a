use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

use ngxscope_types::SourceMode;

use crate::app::Notification;
use crate::ui::Theme;

/// Status bar showing keyboard shortcuts, or a notification when one is up
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    right_text: Option<String>,
    notification: Option<&'a Notification>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            right_text: None,
            notification: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    pub fn right<S: Into<String>>(mut self, text: S) -> Self {
        self.right_text = Some(text.into());
        self
    }

    pub fn notification(mut self, notification: Option<&'a Notification>) -> Self {
        self.notification = notification;
        self
    }

    fn left_line(&self) -> Line<'a> {
        if let Some(n) = self.notification {
            let style = if n.is_error {
                Theme::error().bg(Color::DarkGray)
            } else {
                Theme::notification()
            };
            return Line::from(Span::styled(n.message.clone(), style));
        }

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", Theme::status_bar()));
            }
            spans.push(Span::styled(format!("[{key}]"), Theme::status_bar_key()));
            spans.push(Span::styled(format!(" {desc}"), Theme::status_bar()));
        }
        Line::from(spans)
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let line = self.left_line();
        let line_width = line.width() as u16;
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        if let Some(right) = self.right_text {
            let width = Line::from(right.as_str()).width() as u16;
            let right_x = area.x + area.width.saturating_sub(width + 1);
            if right_x > area.x + line_width + 2 {
                buf.set_span(
                    right_x,
                    area.y,
                    &Span::styled(right.as_str(), Style::default()),
                    width,
                );
            }
        }
    }
}

/// Hints for the log screen; refresh only exists in poll mode
pub fn log_viewer_hints(mode: SourceMode) -> Vec<(&'static str, &'static str)> {
    let mut hints = vec![("/", "Search"), ("m", "Mode")];
    if mode == SourceMode::Poll {
        hints.push(("r", "Refresh"));
    }
    hints.extend([
        ("Tab", "Focus"),
        ("e", "Export"),
        ("?", "Help"),
        ("q", "Quit"),
    ]);
    hints
}
