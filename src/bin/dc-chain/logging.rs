use std::path::{Path, PathBuf};

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use dc_chain::RunLog;

use crate::error::AppError;

/// Install the global subscriber: human readable output on stderr, filtered by `RUST_LOG`
/// (default `info`), plus the run log. Returns the run log's path.
pub fn init(log_dir: &Path) -> Result<PathBuf, AppError> {
    let run_log = RunLog::create(log_dir).map_err(|err| AppError::logging(log_dir.to_path_buf(), err))?;
    let path = run_log.path().to_path_buf();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(console)
        .with(run_log.into_layer())
        .init();
    Ok(path)
}
