use tokio::sync::mpsc;
use tracing::info;

use ngxscope_types::SourceMode;

use crate::acquire::{AcquisitionStrategy, LogUpdate};
use crate::view::LogView;

/// Owns a log view and the acquisition strategy feeding it
///
/// Updates arrive on the receiver returned by [`LogPipeline::start`]; the
/// owner passes each one to [`LogPipeline::apply`]. After
/// [`LogPipeline::shutdown`] (or drop) the strategy is stopped and late
/// updates are ignored.
pub struct LogPipeline {
    view: LogView,
    strategy: Box<dyn AcquisitionStrategy>,
}

impl LogPipeline {
    /// Activate `strategy` and return the pipeline with its update receiver
    pub async fn start(
        mut strategy: Box<dyn AcquisitionStrategy>,
        capacity: usize,
    ) -> (Self, mpsc::UnboundedReceiver<LogUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        strategy.activate(tx).await;
        info!(mode = strategy.mode().label(), capacity, "log pipeline started");

        let pipeline = Self {
            view: LogView::new(capacity),
            strategy,
        };
        (pipeline, rx)
    }

    pub fn apply(&mut self, update: LogUpdate) -> bool {
        self.view.apply(update)
    }

    pub fn mode(&self) -> SourceMode {
        self.strategy.mode()
    }

    /// Manual refresh; only meaningful in poll mode
    pub fn refresh(&self) {
        if self.mode() == SourceMode::Poll {
            self.strategy.refresh();
        }
    }

    pub fn view(&self) -> &LogView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut LogView {
        &mut self.view
    }

    /// Stop acquisition; no update is applied afterwards
    pub fn shutdown(&mut self) {
        if self.view.is_active() {
            self.strategy.deactivate();
            self.view.deactivate();
            info!("log pipeline stopped");
        }
    }
}

impl Drop for LogPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
