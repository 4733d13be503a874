use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);

/// Share of the work that has left the queue, in percent.
pub fn completion_percentage(total: usize, remaining: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let done = total - remaining.min(total);
    done as f64 * 100.0 / total as f64
}

/// Renders how much of the queue has been taken while the workers run.
pub struct ProgressReporter {
    bar: ProgressBar,
    total: usize,
    interval: Duration,
    percentage: f64,
}

impl ProgressReporter {
    pub fn new(total: usize, interval: Duration) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template("[*] [{bar:20}] {msg}")
                .map(|style| style.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        Self::with_bar(bar, total, interval)
    }

    pub fn hidden(total: usize, interval: Duration) -> Self {
        Self::with_bar(ProgressBar::hidden(), total, interval)
    }

    fn with_bar(bar: ProgressBar, total: usize, interval: Duration) -> Self {
        Self {
            bar,
            total,
            interval,
            percentage: 0.0,
        }
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Updates the bar from the current queue length. The reported value never
    /// goes backwards.
    pub fn observe(&mut self, remaining: usize) -> f64 {
        let percentage = completion_percentage(self.total, remaining).max(self.percentage);
        self.percentage = percentage;

        let done = (percentage / 100.0 * self.total as f64).round() as u64;
        self.bar.set_position(done);
        self.bar.set_message(format!("{:.0}%", percentage));

        percentage
    }

    /// Polls until `finished` reports that every worker has exited, then
    /// prints the closing line and returns the final percentage.
    pub fn watch<R, F>(&mut self, remaining: R, finished: F) -> f64
    where
        R: Fn() -> usize,
        F: Fn() -> bool,
    {
        loop {
            self.observe(remaining());
            if finished() {
                break;
            }
            thread::sleep(self.interval);
        }

        // Workers are gone, so this read is final.
        let percentage = self.observe(remaining());
        self.finish(percentage);
        percentage
    }

    fn finish(&self, percentage: f64) {
        if let Ok(style) = ProgressStyle::with_template("[*] {msg}") {
            self.bar.set_style(style);
        }

        if percentage >= 100.0 {
            self.bar.finish_with_message("Benchmark finished");
        } else {
            self.bar
                .abandon_with_message(format!("Benchmark stopped at {:.0}%", percentage));
        }
    }
}
