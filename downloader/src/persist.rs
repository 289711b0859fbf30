//! This module provides the persister writing fetched content to the run's output directory.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::{fs, io};

use crate::completion::Completion;
use crate::identity::RunIdentity;
use crate::outcome::{Failure, Fetched};

/// Writes fetched content to `<store>/<run>/<run>-<index>`.
///
/// A successful write is absorbed into the [`Completion`], a failed one is forwarded as a [`Failure`] instead.
#[derive(Debug)]
pub struct Persister {
    dir: PathBuf,
    identity: RunIdentity,
    completion: Completion,
    failures: mpsc::UnboundedSender<Failure>,
}

impl Persister {
    /// Create the run's output directory under `store`.
    ///
    /// The run directory itself must not exist yet.
    pub async fn create(
        store: &Path,
        identity: RunIdentity,
        completion: Completion,
        failures: mpsc::UnboundedSender<Failure>,
    ) -> Result<Self, crate::Error> {
        let dir = store.join(&identity);

        let created = match fs::create_dir_all(store).await {
            Ok(()) => fs::create_dir(&dir).await,
            err => err,
        };

        created.map_err(|source| crate::Error::CreateOutputDir {
            path: dir.clone(),
            source,
        })?;

        tracing::debug!("Created output directory: `{}`", dir.display());

        Ok(Self {
            dir,
            identity,
            completion,
            failures,
        })
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the content of the job at `index`.
    #[inline]
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(self.identity.file_name(index))
    }

    /// Persist every fetched job until the channel closes, returning how many were written.
    pub async fn run(self, mut fetched: mpsc::UnboundedReceiver<Fetched>) -> usize {
        let mut written = 0;

        while let Some(fetched) = fetched.recv().await {
            let path = self.path_for(fetched.job.index);

            match write_file(&path, &fetched.content).await {
                Ok(()) => {
                    tracing::trace!("Persisted job #{} to `{}`", fetched.job.index, path.display());

                    written += 1;
                    self.completion.absorb();
                }
                Err(err) => {
                    if let Err(mpsc::error::SendError(failure)) = self.failures.send(fetched.into_failure(path, err)) {
                        tracing::error!("Lost failure of job #{}: {}", failure.job.index, failure.error);
                    }
                }
            }
        }

        written
    }
}

async fn write_file(path: &Path, content: &[u8]) -> io::Result<()> {
    use io::AsyncWriteExt;

    let file = fs::File::options().write(true).create_new(true).open(path).await?;

    let mut writer = io::BufWriter::new(file);
    writer.write_all(content).await?;

    writer.shutdown().await?;
    writer.into_inner().sync_all().await?;

    Ok(())
}
