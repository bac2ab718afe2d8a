mod config;
mod export;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ngxscope_backend::{EventBus, FileTailer, HttpLogSource, HttpSourceConfig};
use ngxscope_logs::{
    AcquisitionStrategy, LogChannel, LogPipeline, LogUpdate, PollConfig, PollFetcher,
    PushListener, SourceMode,
};
use ngxscope_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext, LogViewerScreen,
    PAGE_SIZE, Tui,
};

use crate::config::{Args, Config};
use crate::export::{export_file_name, export_logs_to_file};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args)?;

    init_tracing(config.log_file.as_deref())?;

    let result = run_app(config).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Diagnostics go to `log_file` when given, so they stay out of the TUI
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

/// File tailers feeding the event bus in push mode
struct PushFeeds {
    bus: Arc<EventBus>,
    cancel: CancellationToken,
    tailers: Vec<JoinHandle<()>>,
}

impl PushFeeds {
    async fn start(bus: Arc<EventBus>, config: &Config) -> Self {
        let cancel = CancellationToken::new();
        let mut tailers = Vec::new();

        for (channel, path) in [
            (LogChannel::Access, &config.access_log),
            (LogChannel::Error, &config.error_log),
        ] {
            let tailer = FileTailer::new(path.clone(), channel, Arc::clone(&bus));
            tailers.push(tailer.spawn(cancel.clone()).await);
        }

        Self {
            bus,
            cancel,
            tailers,
        }
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        for tailer in self.tailers.drain(..) {
            tailer.abort();
        }
        self.bus.close();
    }
}

impl Drop for PushFeeds {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn start_pipeline(
    config: &Config,
) -> (
    LogPipeline,
    mpsc::UnboundedReceiver<LogUpdate>,
    Option<PushFeeds>,
) {
    match config.mode {
        SourceMode::Poll => {
            let source = Arc::new(HttpLogSource::new(HttpSourceConfig {
                base_url: config.url.clone(),
                timeout: config.timeout,
                session_cookie: config.session_cookie.clone(),
            }));
            let strategy: Box<dyn AcquisitionStrategy> = Box::new(PollFetcher::new(
                source,
                PollConfig {
                    interval: config.interval,
                    lines: config.lines,
                },
            ));
            let (pipeline, updates) = LogPipeline::start(strategy, config.capacity).await;
            (pipeline, updates, None)
        }
        SourceMode::Push => {
            let bus = Arc::new(EventBus::new());
            let strategy: Box<dyn AcquisitionStrategy> =
                Box::new(PushListener::new(Arc::clone(&bus)));
            // Subscribe before any tailer emits
            let (pipeline, updates) = LogPipeline::start(strategy, config.capacity).await;
            let feeds = PushFeeds::start(bus, config).await;
            (pipeline, updates, Some(feeds))
        }
    }
}

async fn run_app(config: Config) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut state = AppState::new(config.mode, config.source_label());
    let (mut pipeline, mut updates, feeds) = start_pipeline(&config).await;

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(250));
    let keybindings = KeyBindings::new();

    render(&mut tui, &mut state, &mut pipeline)?;

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.search_active {
                            keybindings.get_search_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                        continue;
                    }
                    Event::Tick => {
                        if !state.expire_notification(Instant::now()) {
                            continue;
                        }
                    }
                    Event::Resize(_, _) => {}
                    Event::Error(e) => {
                        state.notify_error(e);
                    }
                }
            }

            Some(update) = updates.recv() => {
                if !pipeline.apply(update) {
                    continue;
                }
            }

            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &mut pipeline, action);
            }
        }

        if state.should_quit {
            break;
        }

        render(&mut tui, &mut state, &mut pipeline)?;
    }

    // Cleanup
    pipeline.shutdown();
    if let Some(mut feeds) = feeds {
        feeds.shutdown();
    }
    events.shutdown();
    tui.restore()?;

    Ok(())
}

fn handle_action(state: &mut AppState, pipeline: &mut LogPipeline, action: Action) {
    match action {
        Action::Quit => {
            state.should_quit = true;
        }
        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }

        // Search is live: every edit replaces the query
        Action::OpenSearch => {
            state.start_search(pipeline.view().query().as_str());
        }
        Action::CloseSearch => {
            state.cancel_search();
            pipeline.view_mut().clear_query();
        }
        Action::ApplySearch => {
            state.apply_search();
        }
        Action::SearchInput(c) => {
            state.search_input_char(c);
            pipeline.view_mut().set_query(&state.ui_state.search_input);
        }
        Action::SearchBackspace => {
            state.search_input_backspace();
            pipeline.view_mut().set_query(&state.ui_state.search_input);
        }
        Action::SearchClear => {
            state.search_input_clear();
            pipeline.view_mut().clear_query();
        }
        Action::ClearSearch => {
            state.cancel_search();
            state.reset_scroll();
            pipeline.view_mut().clear_query();
        }

        Action::ToggleDisplayMode => {
            pipeline.view_mut().toggle_mode();
        }
        Action::Refresh => {
            // No-op in push mode
            pipeline.refresh();
        }
        Action::ClearLogs => {
            pipeline.view_mut().clear_all();
            state.reset_scroll();
        }
        Action::ExportLogs => {
            let path = export_file_name();
            match export_logs_to_file(&path, pipeline.view()) {
                Ok(count) => {
                    state.notify(format!("Exported {} lines to {}", count, path.display()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "export failed");
                    state.notify_error(format!("Export failed: {:#}", e));
                }
            }
        }
        Action::FocusNext => {
            state.focus_next();
        }

        Action::ScrollUp(n) => state.scroll_up(n),
        Action::ScrollDown(n) => state.scroll_down(n),
        Action::PageUp => state.scroll_up(PAGE_SIZE),
        Action::PageDown => state.scroll_down(PAGE_SIZE),
        Action::ScrollToTop => state.scroll_to_top(),
        Action::ScrollToBottom => state.scroll_to_bottom(),
        Action::ToggleAutoScroll => {
            state.ui_state.auto_scroll = !state.ui_state.auto_scroll;
        }

        Action::DismissNotification => {
            state.dismiss_notification();
        }
    }
}

fn render(tui: &mut Tui, state: &mut AppState, pipeline: &mut LogPipeline) -> Result<()> {
    pipeline.view_mut().sync_filters();

    tui.terminal().draw(|frame| {
        LogViewerScreen::render(frame, state, pipeline.view());

        if state.ui_state.help_visible {
            HelpOverlay::render(frame, state.source_mode);
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use ngxscope_logs::{EventSource, SubscribeError};

    use super::*;

    #[tokio::test]
    async fn test_dropping_push_feeds_stops_tailers_and_closes_bus() {
        let dir = tempfile::tempdir().unwrap();
        let access_log = dir.path().join("access.log");
        let error_log = dir.path().join("error.log");
        std::fs::write(&access_log, "").unwrap();
        std::fs::write(&error_log, "").unwrap();

        let config = Config {
            mode: SourceMode::Push,
            access_log,
            error_log,
            ..Config::default()
        };
        let bus = Arc::new(EventBus::new());
        let feeds = PushFeeds::start(Arc::clone(&bus), &config).await;
        let cancel = feeds.cancel.clone();
        assert_eq!(feeds.tailers.len(), 2);

        drop(feeds);

        assert!(cancel.is_cancelled());
        assert!(matches!(
            bus.subscribe(LogChannel::Access.event_name()).await,
            Err(SubscribeError::Closed)
        ));
    }
}
