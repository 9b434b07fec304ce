//! The per-run log file.
//!
//! Every run gets its own timestamped file. It receives a copy of every warning and error emitted
//! through `tracing` while the run's subscriber is installed, and is only ever read by people.

use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;

const LOG_FILE_PREFIX: &str = "dc-chain";

pub struct RunLog {
    path: PathBuf,
    appender: RollingFileAppender,
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog").field("path", &self.path).finish()
    }
}

impl RunLog {
    /// Create the log file for a run starting now.
    pub fn create<P: AsRef<Path>>(log_dir: P) -> Result<Self, crate::Error> {
        Self::create_at(log_dir, chrono::Local::now())
    }

    pub fn create_at<P, Tz>(log_dir: P, started: chrono::DateTime<Tz>) -> Result<Self, crate::Error>
    where
        P: AsRef<Path>,
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let log_dir = log_dir.as_ref();
        std::fs::create_dir_all(log_dir)?;
        let stem = format!("{LOG_FILE_PREFIX}-{}", started.format("%Y%m%d-%H%M%S"));
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(&stem)
            .filename_suffix("log")
            .build(log_dir)
            .map_err(|err| std::io::Error::other(err.to_string()))?;
        Ok(Self {
            path: log_dir.join(format!("{stem}.log")),
            appender,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A layer writing `WARN` and `ERROR` events to the log file.
    pub fn into_layer<S>(self) -> impl Layer<S> + Send + Sync + 'static
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(self.appender)
            .with_filter(LevelFilter::WARN)
    }
}

#[cfg(test)]
mod test_run_log {
    use super::*;
    use chrono::TimeZone;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn file_name_carries_start_time() {
        let dir = tempfile::tempdir().unwrap();
        let started = chrono::Utc.with_ymd_and_hms(2026, 10, 14, 9, 5, 3).unwrap();
        let log = RunLog::create_at(dir.path().join("logs"), started).unwrap();
        assert_eq!(
            log.path(),
            dir.path().join("logs/dc-chain-20261014-090503.log")
        );
        assert!(log.path().is_file());
    }

    #[test]
    fn only_warnings_and_errors_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path()).unwrap();
        let path = log.path().to_path_buf();
        let subscriber = tracing_subscriber::registry().with(log.into_layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("fetching binutils-2.30");
            tracing::warn!("unable to remove builds/gcc-14.2.0");
            tracing::error!("checksum mismatch");
        });
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(!contents.contains("fetching binutils"));
        assert!(contents.contains("WARN"));
        assert!(contents.contains("unable to remove builds/gcc-14.2.0"));
        assert!(contents.contains("checksum mismatch"));
    }
}
