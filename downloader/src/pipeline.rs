//! This module provides the orchestrator wiring every stage of a run together.

use std::io::{self, Seek};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::FutureExt;
use tokio::sync::mpsc;

use crate::collect::ErrorCollector;
use crate::completion::Completion;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::fetch::{FetchError, Fetcher};
use crate::gate::{AdmissionGate, Permit};
use crate::identity::RunIdentity;
use crate::job::{Job, JobSource};
use crate::outcome::{Failure, Fetched, JobError, Outcome};
use crate::persist::Persister;
use crate::pool::WorkerPool;
use crate::progress::ProgressReporter;
use crate::report::RunReport;
use crate::Error;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Opening the input, counting jobs and creating the output directory.
    Init,
    /// Jobs are still being read from the input.
    Reading,
    /// Every job has been admitted, waiting for their outcomes to be absorbed.
    Draining,
    /// Joining stages and building the report.
    Reporting,
    Done,
}

impl Phase {
    #[inline]
    fn enter(self, run: &RunIdentity) {
        tracing::debug!("Run {run} entering {self:?} phase");
    }
}

/// Downloads every URL listed in a CSV input, each job going through the following stages:
///
/// ```text
///     job source ──> admission gate + worker pool (fetcher) ──> dispatcher ──> persister
///                                                                   │              │ write failures
///                                                                   └──────────────┴──> error collector
/// ```
///
/// Each admitted job yields exactly one outcome, absorbed either by the persister or by the error collector.
/// A run is over once as many outcomes as admitted jobs have been absorbed.
#[derive(Debug)]
pub struct Pipeline<F> {
    config: Config,
    fetcher: Arc<F>,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            config: Config::default(),
            fetcher: Arc::new(fetcher),
        }
    }

    #[inline]
    pub fn with_config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    /// Run the pipeline over the CSV file at `input`, storing content in a new directory named after `label`.
    ///
    /// Only setup failures abort the run, per-job failures are listed in the returned [`RunReport`].
    pub async fn trigger(&self, input: impl AsRef<Path>, label: Option<&str>) -> Result<RunReport, Error> {
        let started = Instant::now();
        let input = input.as_ref();

        tracing::info!("Pipeline triggered: File: {}", input.display());

        let identity = RunIdentity::generate(label);
        Phase::Init.enter(&identity);

        let (file, total) = open(input).await?;
        let completion = Completion::new(total);

        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        let persister = Persister::create(&self.config.store_path, identity.clone(), completion.clone(), failures_tx.clone()).await?;
        let output_dir = persister.dir().to_path_buf();

        tracing::info!("Processing {total} URLs into `{}`", output_dir.display());

        Phase::Reading.enter(&identity);

        let collector = tokio::spawn(ErrorCollector::new(completion.clone()).run(failures_rx));
        let persister = tokio::spawn(persister.run(fetched_rx));
        let dispatcher = tokio::spawn(Dispatcher::new(fetched_tx, failures_tx).run(outcomes_rx));
        let gate = AdmissionGate::new(self.config.concurrency);
        let pool = WorkerPool::start(self.config.concurrency);
        let workers = tokio::spawn(admit(jobs_rx, gate, pool, Arc::clone(&self.fetcher), outcomes_tx));
        let reader = tokio::task::spawn_blocking({
            let completion = completion.clone();
            move || read(file, jobs_tx, &completion)
        });
        let progress = self.config.show_progress.then(|| {
            tokio::spawn(ProgressReporter::new(completion.clone(), self.config.progress_interval, io::stderr()).run())
        });

        let admitted = reader.await?;
        if admitted != total {
            tracing::warn!("Input changed while running: {admitted} jobs admitted out of {total} counted");
        }

        Phase::Draining.enter(&identity);

        completion.wait().await;

        Phase::Reporting.enter(&identity);

        // producers first, so that each channel is closed by its last sender
        workers.await??;
        let timing = dispatcher.await?;
        let succeeded = persister.await?;
        let failures = collector.await?;

        if let Some(progress) = progress {
            if let Err(err) = progress.await? {
                tracing::warn!("Cannot render progress: {err}");
            }
        }

        let report = RunReport {
            run: identity,
            output_dir,
            total_jobs: admitted,
            succeeded,
            failed: failures.len(),
            total_duration: timing.total(),
            average_duration: timing.average(),
            wall_time: started.elapsed(),
            failures,
        };

        debug_assert_eq!(report.succeeded + report.failed, report.total_jobs);

        tracing::info!(
            "Total Urls Processed: {} || Total Success: {} || Total Failed: {}",
            report.total_jobs,
            report.succeeded,
            report.failed
        );

        Phase::Done.enter(&report.run);

        Ok(report)
    }
}

/// Open the input and count its jobs, leaving the file rewound.
async fn open(input: &Path) -> Result<(std::fs::File, usize), Error> {
    let path = input.to_path_buf();

    let opened = tokio::task::spawn_blocking(move || -> io::Result<_> {
        let mut file = std::fs::File::open(&path)?;

        if !file.metadata()?.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
        }

        let total = JobSource::count_jobs(&mut file);
        file.rewind()?;

        Ok((file, total))
    })
    .await?;

    opened.map_err(|source| Error::OpenInput {
        path: input.to_path_buf(),
        source,
    })
}

/// Feed jobs to the worker pool, then seal the completion with the number actually sent.
fn read(file: std::fs::File, jobs: mpsc::UnboundedSender<Job>, completion: &Completion) -> usize {
    let mut admitted = 0;

    for job in JobSource::new(file) {
        tracing::trace!("Read job #{}: `{}`", job.index, job.url);

        if jobs.send(job).is_err() {
            tracing::error!("Job queue closed, stop reading input");
            break;
        }

        admitted += 1;
    }

    completion.seal(admitted);

    admitted
}

/// Admit jobs through the gate and run their fetch on the pool, until the job queue is closed and drained.
///
/// A job that cannot be admitted is rejected, so that it still yields an outcome.
async fn admit<F: Fetcher>(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    gate: AdmissionGate,
    pool: WorkerPool,
    fetcher: Arc<F>,
    outcomes: mpsc::UnboundedSender<Outcome>,
) -> Result<(), tokio::task::JoinError> {
    while let Some(job) = jobs.recv().await {
        let permit = match gate.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                tracing::error!("Cannot admit job #{}: {err}", job.index);
                reject(&outcomes, job);
                continue;
            }
        };

        tracing::trace!("Admitted job #{} ({} in flight)", job.index, gate.in_flight());

        if let Err(err) = pool.submit(fetch(Arc::clone(&fetcher), job.clone(), permit, outcomes.clone())) {
            tracing::error!("Cannot run job #{}: {err}", job.index);
            reject(&outcomes, job);
        }
    }

    pool.close().await
}

/// Fetch one job and hand its outcome over, holding its gate slot until then.
async fn fetch<F: Fetcher>(fetcher: Arc<F>, job: Job, _permit: Permit, outcomes: mpsc::UnboundedSender<Outcome>) {
    let start = Instant::now();

    let result = AssertUnwindSafe(fetcher.fetch(&job.url))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(FetchError::Panicked));

    let elapsed = start.elapsed();

    let outcome = match result {
        Ok(content) => Outcome::Fetched(Fetched { job, content, elapsed }),
        Err(err) => Outcome::Failed(Failure {
            job,
            error: err.into(),
            elapsed,
        }),
    };

    if let Err(mpsc::error::SendError(outcome)) = outcomes.send(outcome) {
        tracing::error!("Lost outcome of job #{}: dispatcher is gone", outcome.job().index);
    }
}

fn reject(outcomes: &mpsc::UnboundedSender<Outcome>, job: Job) {
    let failure = Failure {
        job,
        error: JobError::Rejected,
        elapsed: Duration::ZERO,
    };

    if let Err(mpsc::error::SendError(outcome)) = outcomes.send(Outcome::Failed(failure)) {
        tracing::error!("Lost outcome of job #{}: dispatcher is gone", outcome.job().index);
    }
}
