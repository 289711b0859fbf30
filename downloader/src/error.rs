use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors aborting a whole run.
///
/// Per-job failures never surface here, they are collected into the [`RunReport`](crate::RunReport) instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open input file `{}`: {source}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create output directory `{}`: {source}", path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("pipeline stage failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
