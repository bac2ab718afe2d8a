use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Header, optional search bar, content and status bar
    pub fn main(area: Rect, show_search_bar: bool) -> (Rect, Option<Rect>, Rect, Rect) {
        let search_height = if show_search_bar { 3 } else { 0 };
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(search_height),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        let search = show_search_bar.then_some(chunks[1]);
        (chunks[0], search, chunks[2], chunks[3])
    }

    /// Split content into the two stacked log panes
    pub fn panes(area: Rect) -> [Rect; 2] {
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        [chunks[0], chunks[1]]
    }

    /// Centered popup of at most `width` x `height`, keeping a 2-cell margin
    pub fn popup(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_without_search_bar() {
        let (header, search, content, status) = Layout::main(Rect::new(0, 0, 80, 24), false);
        assert_eq!(header.height, 3);
        assert!(search.is_none());
        assert_eq!(status.height, 1);
        assert_eq!(content.height, 20);
    }

    #[test]
    fn test_main_with_search_bar() {
        let (_, search, content, _) = Layout::main(Rect::new(0, 0, 80, 24), true);
        assert_eq!(search.map(|r| r.height), Some(3));
        assert_eq!(content.height, 17);
    }

    #[test]
    fn test_panes_cover_content() {
        let [top, bottom] = Layout::panes(Rect::new(0, 4, 80, 20));
        assert_eq!(top.y, 4);
        assert_eq!(top.height + bottom.height, 20);
        assert_eq!(bottom.y, top.y + top.height);
    }

    #[test]
    fn test_popup_is_centered_and_clamped() {
        let popup = Layout::popup(Rect::new(0, 0, 40, 20), 60, 10);
        assert_eq!(popup.width, 36);
        assert_eq!(popup.height, 10);
        assert_eq!(popup.x, 2);
        assert_eq!(popup.y, 5);
    }
}
