//! This module provides the progress bar rendered while a run is going on.

use std::io::{self, Write};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::completion::Completion;

const BAR_WIDTH: usize = 50;

/// Periodically renders the share of absorbed jobs to `out`, until they all are.
#[derive(Debug)]
pub struct ProgressReporter<W> {
    completion: Completion,
    interval: Duration,
    out: W,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(completion: Completion, interval: Duration, out: W) -> Self {
        Self { completion, interval, out }
    }

    /// Render progress on every tick until completion, then give the writer back.
    ///
    /// Returns straight away when there is nothing to wait for.
    pub async fn run(mut self) -> io::Result<W> {
        if self.completion.total() == 0 {
            writeln!(self.out, "{}", render(0, 0))?;
            return Ok(self.out);
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.completion.wait() => {}
            }

            write!(self.out, "\r{}", render(self.completion.absorbed(), self.completion.total()))?;
            self.out.flush()?;

            if self.completion.is_complete() {
                break;
            }
        }

        writeln!(self.out, "\nDownload complete!")?;

        Ok(self.out)
    }
}

/// Render `done` out of `total` as a percentage bar.
///
/// ```
/// # use downloader::progress::render;
/// assert_eq!(render(1, 4), format!("Progress: [{:<50}] 25%", "█".repeat(12)));
/// assert_eq!(render(0, 0), format!("Progress: [{}] 100%", "█".repeat(50)));
/// ```
pub fn render(done: usize, total: usize) -> String {
    let percent = match total {
        0 => 100,
        total => done.min(total) * 100 / total,
    };
    let bar = "█".repeat(percent * BAR_WIDTH / 100);

    format!("Progress: [{bar:<width$}] {percent}%", width = BAR_WIDTH)
}
