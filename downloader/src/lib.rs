//! A simple crate downloading web content listed in a CSV file.
//!
//! A concurrent pipeline turning a list of URLs into downloaded files, dedicated to:
//! - reading download jobs lazily from a CSV input,
//! - fetching them concurrently under a fixed concurrency ceiling,
//! - persisting fetched content into a directory unique to each run,
//! - collecting failures into a final report, along with timing statistics.
//!
//! It makes use of `Semaphore`s to bound in-flight requests, a fixed-size pool of workers draining a task queue, and
//! _multi-producer single-consumer_ `mpsc` channels between stages, so that every piece of mutable state shared between
//! tasks has a single owner: the failure list belongs to the error collector, the completion count is only bumped by the
//! stages finalizing an outcome, the admission slots are owned by the semaphore.
//!
//! As a **strong hypothesis**, we can assume that:
//! - the fetcher enforces its own timeouts, a stuck fetch would otherwise hold its admission slot forever;
//! - the input file is not rewritten while a run is going on, the job count being computed by a first pass over it.
//!
//! Here is the layout of the local storage once a run labelled `nightly` has completed:
//!
//! ```text
//!     - store
//!       L nightly-{timestamp}-{random}
//!         L nightly-{timestamp}-{random}-1
//!         L nightly-{timestamp}-{random}-2
//!         L ...
//! ```
//!
//! Only jobs fetched and written successfully get a file, failed ones are listed in the [`RunReport`] instead.

mod error;
pub use error::Error;

pub mod collect;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod fetch;
pub mod gate;
pub mod identity;
pub mod job;
pub mod logging;
pub mod outcome;
pub mod persist;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod report;

pub use config::Config;
pub use fetch::{FetchError, FetchSettings, Fetcher, HttpFetcher};
pub use identity::RunIdentity;
pub use job::Job;
pub use outcome::{Failure, Outcome};
pub use pipeline::Pipeline;
pub use report::RunReport;
