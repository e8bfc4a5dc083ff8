use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use arrnorm_core::pipeline::{NormalizedImage, PipelineStage, ProgressReporter};

use crate::summary::{print_image_done, print_image_header};

/// Terminal progress: a bar for stages with a known item count, a spinner
/// otherwise, plus the per-image banners of a normalization batch.
#[derive(Default)]
pub struct TerminalReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_bar(stage: PipelineStage, total_items: Option<usize>) -> ProgressBar {
        let bar = match total_items {
            Some(total) => {
                let bar = ProgressBar::new(total as u64);
                let style = ProgressStyle::default_bar()
                    .template("  {msg:26} [{bar:40}] {pos}/{len}")
                    .map(|s| s.progress_chars("=> "))
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                bar.set_style(style);
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                let style = ProgressStyle::default_spinner()
                    .template("  {spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                bar.set_style(style);
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        bar.set_message(stage.to_string());
        bar
    }
}

impl ProgressReporter for TerminalReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.take() {
                previous.finish_and_clear();
            }
            *slot = Some(Self::make_bar(stage, total_items));
        }
    }

    fn advance(&self, items_done: usize) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_position(items_done as u64);
            }
        }
    }

    fn finish_stage(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                let message = format!("{} \u{2713}", bar.message());
                bar.finish_with_message(message);
            }
        }
    }

    fn begin_image(&self, index: usize, total: usize, target: &Path) {
        print_image_header(index, total, target);
    }

    fn finish_image(&self, result: &NormalizedImage) {
        print_image_done(result);
    }
}
