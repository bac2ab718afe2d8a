/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,

    // Search bar
    OpenSearch,
    /// Close the bar and drop the query
    CloseSearch,
    /// Close the bar and keep the query
    ApplySearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ClearSearch,

    // Log view
    ToggleDisplayMode,
    Refresh,
    ClearLogs,
    ExportLogs,
    FocusNext,

    // Scrolling the focused pane
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,

    DismissNotification,
}
