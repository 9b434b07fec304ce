use std::path::PathBuf;
use std::process::ExitCode;

/// Categories of application errors that can be matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// The command line could not be parsed
    Usage,
    /// Argument validation errors
    ArgValidation,
    /// Configuration file errors
    Config,
    /// The run log could not be created
    Logging,
    /// A tool needed by the selected mode is missing
    Capability,
    /// The staging directory could not be used
    Staging,
    /// Manifest reading or parsing errors
    Manifest,
    /// Errors occurred while fetching. These are reported as they happen, so this variant only
    /// exists to produce the correct `ExitCode`.
    Fetch,
}

/// Internal error type that contains all application error variants.
#[derive(Debug, thiserror::Error)]
pub enum AppErrorInner {
    #[error(transparent)]
    Usage(clap::Error),
    #[error("Argument error: {0}")]
    ArgValidation(String),
    #[error("Failed to load configuration file: {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        err: dc_chain::Error,
    },
    #[error("Failed to create log file in {}", dir.display())]
    Logging {
        dir: PathBuf,
        #[source]
        err: dc_chain::Error,
    },
    #[error(transparent)]
    Capability(dc_chain::Error),
    #[error(transparent)]
    Staging(dc_chain::Error),
    #[error("Failed to load manifest: {manifest}")]
    Manifest {
        manifest: String,
        #[source]
        err: dc_chain::Error,
    },
    #[error("Failed to fetch {0} component(s)")]
    Fetch(usize),
}

/// The application-level error type, holding the concrete error for reporting and a kind for the
/// exit code.
///
/// This type uses the newtype pattern to wrap a boxed inner error, reducing stack size.
#[derive(Debug)]
pub struct AppError(Box<AppErrorInner>, AppErrorKind);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl AppError {
    pub fn new(inner: AppErrorInner, kind: AppErrorKind) -> Self {
        Self(Box::new(inner), kind)
    }

    pub fn error_kind(&self) -> &AppErrorKind {
        &self.1
    }

    pub fn usage(err: clap::Error) -> Self {
        Self::new(AppErrorInner::Usage(err), AppErrorKind::Usage)
    }

    pub fn arg_validation(msg: String) -> Self {
        Self::new(AppErrorInner::ArgValidation(msg), AppErrorKind::ArgValidation)
    }

    pub fn config(path: PathBuf, err: dc_chain::Error) -> Self {
        Self::new(AppErrorInner::Config { path, err }, AppErrorKind::Config)
    }

    pub fn logging(dir: PathBuf, err: dc_chain::Error) -> Self {
        Self::new(AppErrorInner::Logging { dir, err }, AppErrorKind::Logging)
    }

    pub fn capability(err: dc_chain::Error) -> Self {
        Self::new(AppErrorInner::Capability(err), AppErrorKind::Capability)
    }

    pub fn staging(err: dc_chain::Error) -> Self {
        Self::new(AppErrorInner::Staging(err), AppErrorKind::Staging)
    }

    pub fn manifest(manifest: String, err: dc_chain::Error) -> Self {
        Self::new(AppErrorInner::Manifest { manifest, err }, AppErrorKind::Manifest)
    }

    pub fn fetch(failures: usize) -> Self {
        Self::new(AppErrorInner::Fetch(failures), AppErrorKind::Fetch)
    }

    /// The error followed by each of its causes, separated by `: `.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }

    /// Print to stderr. Usage errors keep clap's own formatting.
    pub fn report(&self) {
        match self.0.as_ref() {
            AppErrorInner::Usage(err) => {
                let _ = err.print();
            }
            _ => eprintln!("❌ {}", self.chain()),
        }
    }
}

impl From<AppError> for ExitCode {
    fn from(_: AppError) -> Self {
        ExitCode::FAILURE
    }
}
