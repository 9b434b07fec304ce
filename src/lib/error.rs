use std::path::PathBuf;
use std::time::Duration;

use crate::checksum::ChecksumParseError;
use crate::manifest::ManifestParseError;

/// The main error enum for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    ConfigParse(#[from] toml::de::Error),
    #[error(transparent)]
    ManifestParse(#[from] ManifestParseError),
    #[error(transparent)]
    ChecksumParse(#[from] ChecksumParseError),

    /// A tool needed by the selected run mode is not installed.
    #[error("required tool '{tool}' was not found on PATH")]
    TransportUnavailable { tool: String },

    #[error("unsupported URL scheme in '{url}'")]
    UnsupportedScheme { url: String },

    #[error("mirror URL '{url}' cannot contain sub-directories")]
    InvalidMirror { url: String },

    #[error("unable to locate {target} on server ({} mirror directories probed)", probed.len())]
    MirrorMiss {
        target: String,
        probed: Vec<url::Url>,
    },

    #[error("checksum mismatch for {}\n  expected: {expected}\n  got:      {actual}", file.display())]
    ChecksumMismatch {
        file: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {}", archive.display())]
    Extraction {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive {} does not contain the expected top-level directory '{expected}'", archive.display())]
    UnexpectedLayout { archive: PathBuf, expected: String },

    #[error("archive entry escapes the destination directory: {}", path.display())]
    UnsafeArchivePath { path: PathBuf },

    #[error("Command '{command}' exited with status {status}\n{stderr}")]
    Subprocess {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Command '{command}' did not finish within {}s", after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("'{name}' does not name an item inside the staging directory")]
    InvalidStagingName { name: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("cannot use staging directory {}", path.display())]
    StagingUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Whether this error came from the user or the OS asking the run to stop.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// An error encountered while acquiring one manifest component.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch '{component}'")]
pub struct FetchError {
    pub component: String,
    #[source]
    pub source: Error,
}

impl FetchError {
    pub fn new<S: Into<String>>(component: S, source: Error) -> Self {
        Self {
            component: component.into(),
            source,
        }
    }
}
