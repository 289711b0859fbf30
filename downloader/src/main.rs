use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use downloader::config::{DEFAULT_CONCURRENCY, DEFAULT_STORE_PATH};
use downloader::{logging, Config, FetchSettings, HttpFetcher, Pipeline, RunReport};

/// Triggers the pipeline downloading the content of URLs listed in a CSV file.
#[derive(Debug, Parser)]
#[command(name = "downloader", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Triggers the pipeline
    Trigger(TriggerArgs),
}

#[derive(Debug, Args)]
struct TriggerArgs {
    /// Full path of the CSV file, URLs being read from its first column
    #[arg(short = 'p', long = "path", visible_alias = "PATH")]
    path: PathBuf,

    /// Output folder name, prefixing the generated unique token
    #[arg(short = 'o', long = "output", visible_alias = "OUTPUT")]
    output: Option<String>,

    /// Directory run folders are created in
    #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Maximum number of URLs fetched at once
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: NonZeroUsize,

    /// Request timeout, in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,

    /// Do not render the progress bar
    #[arg(short, long)]
    quiet: bool,
}

async fn trigger(args: TriggerArgs) -> Result<RunReport, downloader::Error> {
    let settings = FetchSettings {
        timeout: Duration::from_secs(args.timeout),
        accept_invalid_certs: args.insecure,
        ..Default::default()
    };
    let fetcher = HttpFetcher::new(&settings).map_err(downloader::Error::Client)?;

    let config = Config::default()
        .with_store_path(args.store)
        .with_concurrency(args.concurrency)
        .with_progress(!args.quiet);

    Pipeline::new(fetcher)
        .with_config(config)
        .trigger(&args.path, args.output.as_deref())
        .await
}

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible.
    if let Err(err) = logging::init_logging() {
        eprintln!("downloader: cannot initialize logging: {err}");
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Trigger(args) => match trigger(args).await {
            Ok(report) => println!("{report}"),
            Err(err) => {
                eprintln!("downloader error: {err}");
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_trigger_defaults() {
        let cli = Cli::try_parse_from(["downloader", "trigger", "-p", "urls.csv"]).unwrap();

        let Command::Trigger(args) = cli.command;
        assert_eq!(args.path, PathBuf::from("urls.csv"));
        assert_eq!(args.output, None);
        assert_eq!(args.store, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(args.concurrency, DEFAULT_CONCURRENCY);
        assert!(!args.quiet);
    }

    #[test]
    fn test_trigger_requires_path() {
        assert!(Cli::try_parse_from(["downloader", "trigger", "-o", "nightly"]).is_err());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        assert!(Cli::try_parse_from(["downloader", "trigger", "-p", "urls.csv", "-c", "0"]).is_err());
    }
}
