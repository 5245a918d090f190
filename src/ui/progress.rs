//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::event::{Event, EventBus, EventKind};
use crate::progress::Monitorable;
use console::style;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

const REDRAW_INTERVAL: Duration = Duration::from_millis(120);

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            eprintln!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            eprintln!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Renders `save-image` events published while an image is acquired.
///
/// Interactive terminals get an indicatif bar that follows the event's
/// progress handle until it completes. Elsewhere each save is announced
/// with a single plain line.
pub struct SaveProgress {
    task: JoinHandle<()>,
}

impl SaveProgress {
    /// Subscribe to `bus` and render events until [`SaveProgress::finish`]
    pub fn spawn(ctx: &UiContext, bus: &EventBus) -> Self {
        let mut rx = bus.subscribe();
        let fancy = ctx.use_fancy_output();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => match event.kind {
                        EventKind::SaveImage => render_save(fancy, &event).await,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "progress renderer fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { task }
    }

    /// Stop rendering and clear any bar still on screen
    pub fn finish(self) {
        self.task.abort();
    }
}

fn save_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.blue} Saving {prefix}  {bar:24.blue/dim} {percent:>3}%  {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .progress_chars("━╸─")
}

async fn render_save(fancy: bool, event: &Event) {
    if !fancy {
        eprintln!("Saving {} from the container daemon...", event.image);
        return;
    }

    let bar = ProgressBar::new(0).with_finish(ProgressFinish::AndClear);
    bar.set_style(save_bar_style());
    bar.set_prefix(event.image.clone());
    bar.enable_steady_tick(REDRAW_INTERVAL);

    loop {
        let progress = event.progress.progress();
        bar.set_length(progress.size);
        bar.set_position(progress.current);
        if progress.complete {
            break;
        }
        tokio::time::sleep(REDRAW_INTERVAL).await;
    }

    bar.finish_and_clear();
}
