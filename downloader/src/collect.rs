use tokio::sync::mpsc;

use crate::completion::Completion;
use crate::outcome::Failure;

/// Sole owner of the failure list.
///
/// Failures are kept in arrival order, each one being absorbed into the [`Completion`] once recorded.
#[derive(Debug)]
pub struct ErrorCollector {
    completion: Completion,
    failures: Vec<Failure>,
}

impl ErrorCollector {
    pub fn new(completion: Completion) -> Self {
        Self {
            completion,
            failures: Vec::new(),
        }
    }

    /// Collect failures until every sender is gone, then hand the list back.
    pub async fn run(mut self, mut failures: mpsc::UnboundedReceiver<Failure>) -> Vec<Failure> {
        while let Some(failure) = failures.recv().await {
            tracing::warn!("Job #{} failed for `{}`: {}", failure.job.index, failure.job.url, failure.error);

            self.failures.push(failure);
            self.completion.absorb();
        }

        self.failures
    }
}
