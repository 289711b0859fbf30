use tracing_subscriber::EnvFilter;

/// Initialize structured logging to stderr, stdout being left to the run report.
///
/// The filter is read from `RUST_LOG`, defaulting to `info`.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()?;

    tracing::debug!("Logging initialized");

    Ok(())
}
