//! This module turns a CSV input into download jobs.

use std::io;

use thiserror::Error;

/// One URL to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// 1-based position among the valid rows of the input, header excluded.
    pub index: usize,
    /// The URL to fetch, as found in the first column.
    pub url: String,
}

/// A row that could not be turned into a [`Job`].
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("empty URL at line {line}")]
    EmptyUrl { line: u64 },
}

/// A lazy sequence of [`Job`]s read from a CSV input.
///
/// The first row is a header and is always discarded. Malformed rows (syntax errors, a field count differing from the header's,
/// invalid UTF-8 or an empty first column) are logged and skipped without consuming an index. An I/O error ends the sequence.
///
/// ```
/// # use downloader::job::{Job, JobSource};
/// let input = "Urls\nhttps://a.example\n\nhttps://b.example\n";
/// let jobs: Vec<Job> = JobSource::new(input.as_bytes()).collect();
///
/// assert_eq!(jobs.len(), 2);
/// assert_eq!(jobs[1].index, 2);
/// assert_eq!(jobs[1].url, "https://b.example");
/// ```
pub struct JobSource<R> {
    records: csv::StringRecordsIntoIter<R>,
    next_index: usize,
    exhausted: bool,
    /// Whether skipped rows are logged.
    verbose: bool,
}

impl<R: io::Read> JobSource<R> {
    pub fn new(reader: R) -> Self {
        let records = csv::ReaderBuilder::new().has_headers(true).from_reader(reader).into_records();

        Self {
            records,
            next_index: 1,
            exhausted: false,
            verbose: true,
        }
    }

    /// Count the jobs `reader` would yield, applying the exact same parsing rules.
    ///
    /// Skipped rows are not logged, that is left to the pass actually reading the jobs.
    pub fn count_jobs(reader: R) -> usize {
        Self { verbose: false, ..Self::new(reader) }.count()
    }

    fn parse(record: csv::StringRecord) -> Result<String, RowError> {
        match record.get(0).map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.to_owned()),
            _ => Err(RowError::EmptyUrl {
                line: record.position().map_or(0, csv::Position::line),
            }),
        }
    }
}

impl<R: io::Read> Iterator for JobSource<R> {
    type Item = Job;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let Some(row) = self.records.next() else {
                self.exhausted = true;
                break;
            };

            match row.map_err(RowError::from).and_then(Self::parse) {
                Ok(url) => {
                    let job = Job { index: self.next_index, url };
                    self.next_index += 1;
                    return Some(job);
                }
                Err(RowError::Csv(err)) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                    if self.verbose {
                        tracing::error!("Stop reading input: {err}");
                    }
                    self.exhausted = true;
                }
                Err(err) if self.verbose => tracing::warn!("Skipping malformed row: {err}"),
                Err(_) => {}
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs(input: &str) -> Vec<Job> {
        JobSource::new(input.as_bytes()).collect()
    }

    #[test]
    fn test_header_is_skipped() {
        let jobs = jobs("Urls\nhttps://a.example/1\nhttps://a.example/2\nhttps://a.example/3\n");

        assert_eq!(
            jobs,
            (1..=3)
                .map(|index| Job {
                    index,
                    url: format!("https://a.example/{index}"),
                })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_header_only() {
        assert!(jobs("Urls\n").is_empty());
        assert!(jobs("").is_empty());
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_malformed_rows_do_not_consume_indexes() {
        let jobs = jobs("Urls\nhttps://a.example\nhttps://b.example,extra\n   \n\"\"\nhttps://c.example\n");

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0], Job { index: 1, url: "https://a.example".into() });
        assert_eq!(jobs[1], Job { index: 2, url: "https://c.example".into() });
        assert!(logs_contain("Skipping malformed row"));
    }

    #[test]
    fn test_url_is_trimmed() {
        let jobs = jobs("Urls\n  https://a.example  \n");

        assert_eq!(jobs[0].url, "https://a.example");
    }

    #[test]
    fn test_multi_column_input_uses_first_column() {
        let jobs = jobs("url,comment\nhttps://a.example,first\nhttps://b.example,second\n");

        assert_eq!(jobs.iter().map(|job| job.url.as_str()).collect::<Vec<_>>(), ["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_count_jobs_matches_iteration() {
        let input = "Urls\nhttps://a.example\nbad,row\nhttps://b.example\n";

        assert_eq!(JobSource::count_jobs(input.as_bytes()), jobs(input).len());
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_count_jobs_does_not_log_skipped_rows() {
        let input = "Urls\nhttps://a.example\nbad,row\n\"\"\nhttps://b.example\n";

        assert_eq!(JobSource::count_jobs(input.as_bytes()), 2);
        assert!(!logs_contain("Skipping malformed row"));

        assert_eq!(jobs(input).len(), 2);
        assert!(logs_contain("Skipping malformed row"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_io_error_ends_sequence() {
        struct Failing;

        impl io::Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
        }

        assert_eq!(JobSource::new(Failing).count(), 0);
        assert!(logs_contain("Stop reading input"));
    }
}
