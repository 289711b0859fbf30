//! Terminal results of processing a [`Job`].

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::job::Job;

/// Why a job ended up in the failure list.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),
    #[error("persist `{}`: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rejected by the worker pool")]
    Rejected,
}

/// A job whose content has been fetched and still has to be persisted.
#[derive(Debug)]
pub struct Fetched {
    pub job: Job,
    pub content: Bytes,
    /// Time spent fetching.
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct Failure {
    pub job: Job,
    pub error: JobError,
    /// Time spent fetching.
    pub elapsed: Duration,
}

/// What a fetch task hands over once done with a job.
#[derive(Debug)]
pub enum Outcome {
    Fetched(Fetched),
    Failed(Failure),
}

impl Outcome {
    #[inline]
    pub fn job(&self) -> &Job {
        match self {
            Self::Fetched(fetched) => &fetched.job,
            Self::Failed(failure) => &failure.job,
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Fetched(fetched) => fetched.elapsed,
            Self::Failed(failure) => failure.elapsed,
        }
    }
}

impl Fetched {
    /// Turn into a [`Failure`] once persisting failed.
    pub fn into_failure(self, path: PathBuf, source: std::io::Error) -> Failure {
        Failure {
            job: self.job,
            error: JobError::Persist { path, source },
            elapsed: self.elapsed,
        }
    }
}
