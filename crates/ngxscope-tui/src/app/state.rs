use std::time::{Duration, Instant};

use ngxscope_types::{LogChannel, SourceMode};

/// How long a notification stays on screen
const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// Lines moved by PageUp/PageDown
pub const PAGE_SIZE: usize = 20;

/// Transient message shown in the status bar
#[derive(Clone, Debug)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    shown_at: Instant,
}

impl Notification {
    fn new(message: String, is_error: bool) -> Self {
        Self {
            message,
            is_error,
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= NOTIFICATION_TTL
    }
}

/// UI-specific transient state
pub struct UiState {
    /// Is the search bar open?
    pub search_active: bool,

    /// Text typed into the search bar
    pub search_input: String,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Pane receiving scroll keys
    pub focus: LogChannel,

    /// Scroll offset per pane, indexed by channel
    pub scroll: [usize; 2],

    /// Follow mode: keep both panes pinned to the newest line
    pub auto_scroll: bool,

    pub notification: Option<Notification>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_active: false,
            search_input: String::new(),
            help_visible: false,
            focus: LogChannel::Access,
            scroll: [0, 0],
            auto_scroll: true,
            notification: None,
        }
    }
}

/// Global application state
pub struct AppState {
    /// Where lines come from, fixed for the session
    pub source_mode: SourceMode,

    /// Human-readable origin shown in the header (URL or file paths)
    pub source_label: String,

    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,
}

impl AppState {
    pub fn new(source_mode: SourceMode, source_label: impl Into<String>) -> Self {
        Self {
            source_mode,
            source_label: source_label.into(),
            ui_state: UiState::default(),
            should_quit: false,
        }
    }

    /// Open the search bar, continuing from the active query
    pub fn start_search(&mut self, current_query: &str) {
        self.ui_state.search_active = true;
        self.ui_state.search_input = current_query.to_string();
    }

    /// Close the search bar and drop its text
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
    }

    /// Close the search bar, keeping the query in effect
    pub fn apply_search(&mut self) {
        self.ui_state.search_active = false;
    }

    pub fn search_input_char(&mut self, c: char) {
        self.ui_state.search_input.push(c);
        self.reset_scroll();
    }

    pub fn search_input_backspace(&mut self) {
        self.ui_state.search_input.pop();
        self.reset_scroll();
    }

    pub fn search_input_clear(&mut self) {
        self.ui_state.search_input.clear();
        self.reset_scroll();
    }

    pub fn focus_next(&mut self) {
        self.ui_state.focus = self.ui_state.focus.sibling();
    }

    pub fn scroll(&self, channel: LogChannel) -> usize {
        self.ui_state.scroll[channel.index()]
    }

    pub fn set_scroll(&mut self, channel: LogChannel, offset: usize) {
        self.ui_state.scroll[channel.index()] = offset;
    }

    /// Scroll the focused pane up; leaves follow mode
    pub fn scroll_up(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        let i = self.ui_state.focus.index();
        self.ui_state.scroll[i] = self.ui_state.scroll[i].saturating_sub(n);
    }

    /// Scroll the focused pane down; the renderer clamps to the last page
    pub fn scroll_down(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        let i = self.ui_state.focus.index();
        self.ui_state.scroll[i] = self.ui_state.scroll[i].saturating_add(n);
    }

    pub fn scroll_to_top(&mut self) {
        self.ui_state.auto_scroll = false;
        self.set_scroll(self.ui_state.focus, 0);
    }

    /// Jump to the newest line and resume following
    pub fn scroll_to_bottom(&mut self) {
        self.ui_state.auto_scroll = true;
        self.set_scroll(self.ui_state.focus, usize::MAX);
    }

    pub fn reset_scroll(&mut self) {
        self.ui_state.scroll = [0, 0];
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.ui_state.notification = Some(Notification::new(message.into(), false));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.ui_state.notification = Some(Notification::new(message.into(), true));
    }

    pub fn dismiss_notification(&mut self) {
        self.ui_state.notification = None;
    }

    /// Drop the notification once its time is up; true if one was removed
    pub fn expire_notification(&mut self, now: Instant) -> bool {
        if self
            .ui_state
            .notification
            .as_ref()
            .is_some_and(|n| n.is_expired(now))
        {
            self.ui_state.notification = None;
            return true;
        }
        false
    }
}
