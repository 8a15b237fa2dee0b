//! Live progress reporting during benchmark execution.

use crate::results::report::format_size;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::VecDeque;
use std::io::IsTerminal;
use std::time::Duration;

const WINDOW_SIZE: usize = 20;

/// Spinner, rolling latency estimate and ETA for one object size.
///
/// Draws to stderr so the report on stdout stays clean. Example:
/// ```text
///   ⠋ 64 KB       estimate: 312.40 us     ████████░░░░░░░░░░░░  ETA 00:00:03
/// ```
pub struct LiveProgress {
    progress: ProgressBar,
    /// Recent write+read times of one iteration.
    recent: VecDeque<Duration>,
    completed: usize,
}

impl LiveProgress {
    /// Progress bar for `iterations` iterations of `size`-byte objects.
    ///
    /// Hidden when `enabled` is false or stderr is not a terminal.
    pub fn new(size: usize, iterations: usize, enabled: bool, color: bool) -> Self {
        if !enabled || !std::io::stderr().is_terminal() {
            return Self::hidden();
        }

        let template = if color {
            "  {spinner:.cyan} {prefix:<10} estimate: {msg:<12}  {bar:20.cyan/dim} ETA {eta}"
        } else {
            "  {spinner} {prefix:<10} estimate: {msg:<12}  {bar:20} ETA {eta}"
        };
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

        let progress = ProgressBar::with_draw_target(Some(iterations as u64), ProgressDrawTarget::stderr());
        progress.set_style(style);
        progress.set_prefix(format_size(size));
        progress.set_message("measuring...");
        progress.enable_steady_tick(Duration::from_millis(100));

        Self::with_bar(progress)
    }

    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(progress: ProgressBar) -> Self {
        Self {
            progress,
            recent: VecDeque::with_capacity(WINDOW_SIZE),
            completed: 0,
        }
    }

    /// Record one completed iteration (write plus read time).
    pub fn tick(&mut self, iteration: Duration) {
        self.completed += 1;
        if self.recent.len() >= WINDOW_SIZE {
            self.recent.pop_front();
        }
        self.recent.push_back(iteration);

        let avg = self.rolling_average();
        self.progress.set_message(format!("{:.2} us", avg.as_secs_f64() * 1_000_000.0));
        self.progress.set_position(self.completed as u64);
    }

    /// Run `f` with the bar hidden so log lines do not tear it.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.progress.suspend(f)
    }

    fn rolling_average(&self) -> Duration {
        if self.recent.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.recent.iter().sum();
        sum / self.recent.len() as u32
    }

    /// Clear the bar. Returns the final rolling average.
    pub fn finish(self) -> Duration {
        let avg = self.rolling_average();
        self.progress.finish_and_clear();
        avg
    }
}
