//! Run summary.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::identity::RunIdentity;
use crate::outcome::Failure;

/// Accumulated fetch durations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    total: Duration,
    count: u32,
}

impl Timing {
    #[inline]
    pub fn record(&mut self, elapsed: Duration) {
        self.total = self.total.saturating_add(elapsed);
        self.count = self.count.saturating_add(1);
    }

    #[inline]
    pub fn total(&self) -> Duration {
        self.total
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Average duration, zero when nothing has been recorded.
    pub fn average(&self) -> Duration {
        self.total.checked_div(self.count).unwrap_or_default()
    }
}

/// Summary of one run, printed once every job has been absorbed.
#[derive(Debug)]
pub struct RunReport {
    pub run: RunIdentity,
    pub output_dir: PathBuf,
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of the fetch durations of the jobs fetched successfully.
    pub total_duration: Duration,
    pub average_duration: Duration,
    /// Elapsed time of the whole run.
    pub wall_time: Duration,
    /// Failed jobs, in the order they were reported.
    pub failures: Vec<Failure>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} stored in `{}`", self.run, self.output_dir.display())?;
        writeln!(
            f,
            "Total Urls Processed: {} || Total Success: {} || Total Failed: {}",
            self.total_jobs, self.succeeded, self.failed
        )?;
        write!(
            f,
            "Total time taken: {:?} || Average Download Time: {:?} || Wall time: {:?}",
            self.total_duration, self.average_duration, self.wall_time
        )?;

        if !self.failures.is_empty() {
            write!(f, "\nList of failed Urls with Index and error:")?;

            for failure in &self.failures {
                write!(
                    f,
                    "\n{}: {} || error: {} || elapsed: {:?}",
                    failure.job.index, failure.job.url, failure.error, failure.elapsed
                )?;
            }
        }

        Ok(())
    }
}
