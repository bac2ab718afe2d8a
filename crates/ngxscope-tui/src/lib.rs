//! TUI components for ngxscope
//!
//! This crate provides the terminal user interface for ngxscope,
//! including state management, keybindings, event handling, and the
//! two-pane log screen.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, Notification, PAGE_SIZE, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, Theme};
