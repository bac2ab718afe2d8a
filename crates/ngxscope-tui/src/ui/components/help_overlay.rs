use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use ngxscope_types::SourceMode;

use crate::ui::{Layout, Theme};

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame, mode: SourceMode) {
        let popup_area = Layout::popup(frame.area(), 50, 26);
        frame.render_widget(Clear, popup_area);

        let mut help_text = vec![
            Line::from(Span::styled(
                "Keybindings",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Self::section("Navigation"),
            Self::key_line("j/↓", "Scroll down"),
            Self::key_line("k/↑", "Scroll up"),
            Self::key_line("PgDn", "Page down"),
            Self::key_line("PgUp", "Page up"),
            Self::key_line("g", "Go to top"),
            Self::key_line("G", "Go to bottom"),
            Self::key_line("Tab", "Switch pane"),
            Self::key_line("f", "Toggle follow mode"),
            Line::from(""),
            Self::section("Display"),
            Self::key_line("m", "Toggle raw/formatted"),
            Self::key_line("/", "Search both panes"),
            Self::key_line("n", "Clear search"),
            Line::from(""),
            Self::section("Actions"),
        ];
        if mode == SourceMode::Poll {
            help_text.push(Self::key_line("r", "Refresh now"));
        }
        help_text.extend([
            Self::key_line("c", "Clear all logs"),
            Self::key_line("e", "Export filtered logs"),
            Self::key_line("?", "Toggle this help"),
            Self::key_line("q", "Quit"),
        ]);

        let help_widget = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border_focused())
                .title(Span::styled(" Help ", Theme::title())),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn section(name: &str) -> Line<'_> {
        Line::from(Span::styled(name, Style::default().fg(Color::Yellow)))
    }

    fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("  {key:>8}"), Style::default().fg(Color::Green)),
            Span::styled(format!("  {desc}"), Theme::text()),
        ])
    }
}
