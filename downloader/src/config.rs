use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Default admission gate capacity, ie. how many jobs are fetched at once.
pub const DEFAULT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(size) => size,
    None => unreachable!(),
};
pub const DEFAULT_STORE_PATH: &str = "./store";
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// The directory run directories are created in.
    pub store_path: PathBuf,
    pub concurrency: NonZeroUsize,
    pub progress_interval: Duration,
    /// Render a progress bar to stderr.
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            concurrency: DEFAULT_CONCURRENCY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            show_progress: true,
        }
    }
}

impl Config {
    #[inline]
    pub fn with_store_path(self, store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ..self
        }
    }

    #[inline]
    pub fn with_concurrency(self, concurrency: NonZeroUsize) -> Self {
        Self { concurrency, ..self }
    }

    #[inline]
    pub fn with_progress_interval(self, progress_interval: Duration) -> Self {
        Self {
            progress_interval,
            ..self
        }
    }

    #[inline]
    pub fn with_progress(self, show_progress: bool) -> Self {
        Self { show_progress, ..self }
    }
}
