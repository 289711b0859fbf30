use tokio::sync::mpsc;

use crate::outcome::{Failure, Fetched, Outcome};
use crate::report::Timing;

/// Single consumer of the outcome stream.
///
/// Fetched jobs go to the persister, failed ones to the error collector. Fetch durations of the former feed the run's
/// [`Timing`].
#[derive(Debug)]
pub struct Dispatcher {
    fetched: mpsc::UnboundedSender<Fetched>,
    failures: mpsc::UnboundedSender<Failure>,
    timing: Timing,
}

impl Dispatcher {
    pub fn new(fetched: mpsc::UnboundedSender<Fetched>, failures: mpsc::UnboundedSender<Failure>) -> Self {
        Self {
            fetched,
            failures,
            timing: Timing::default(),
        }
    }

    /// Route outcomes until every fetch task is done, then return the collected timing.
    ///
    /// Both downstream channels close when this returns.
    pub async fn run(mut self, mut outcomes: mpsc::UnboundedReceiver<Outcome>) -> Timing {
        while let Some(outcome) = outcomes.recv().await {
            tracing::trace!("Job #{} fetched in {:?}", outcome.job().index, outcome.elapsed());

            let lost = match outcome {
                Outcome::Fetched(fetched) => {
                    self.timing.record(fetched.elapsed);
                    self.fetched.send(fetched).err().map(|err| err.0.job)
                }
                Outcome::Failed(failure) => self.failures.send(failure).err().map(|err| err.0.job),
            };

            if let Some(job) = lost {
                tracing::error!("Lost outcome of job #{}: downstream stage is gone", job.index);
            }
        }

        self.timing
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::job::Job;
    use crate::outcome::JobError;

    fn job(index: usize) -> Job {
        Job {
            index,
            url: format!("https://a.example/{index}"),
        }
    }

    #[tokio::test]
    async fn test_routes_by_variant() {
        let (fetched_tx, mut fetched_rx) = mpsc::unbounded_channel();
        let (failures_tx, mut failures_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(Outcome::Fetched(Fetched {
            job: job(1),
            content: Bytes::from_static(b"OK"),
            elapsed: Duration::from_millis(10),
        }))
        .unwrap();
        tx.send(Outcome::Failed(Failure {
            job: job(2),
            error: JobError::Rejected,
            elapsed: Duration::from_millis(99),
        }))
        .unwrap();
        tx.send(Outcome::Fetched(Fetched {
            job: job(3),
            content: Bytes::from_static(b"OK"),
            elapsed: Duration::from_millis(30),
        }))
        .unwrap();
        drop(tx);

        let timing = Dispatcher::new(fetched_tx, failures_tx).run(rx).await;

        assert_eq!(timing.count(), 2);
        assert_eq!(timing.total(), Duration::from_millis(40));
        assert_eq!(timing.average(), Duration::from_millis(20));

        assert_eq!(fetched_rx.recv().await.unwrap().job.index, 1);
        assert_eq!(fetched_rx.recv().await.unwrap().job.index, 3);
        assert!(fetched_rx.recv().await.is_none());

        assert_eq!(failures_rx.recv().await.unwrap().job.index, 2);
        assert!(failures_rx.recv().await.is_none());
    }
}
