use std::path::{Path, PathBuf};

use clap::Parser;
use clap::error::ErrorKind;
use url::Url;

use dc_chain::{Config, ConfigFile, FailurePolicy, GitProtocol, RunMode};

use crate::error::AppError;

// Shamelessly borrowed from https://github.com/crate-ci/clap-cargo/blob/0378657ffdf2b67bcd6f1ab56e04a1322b92dd0e/src/style.rs
use anstyle::AnsiColor::*;
use anstyle::Effects;
use anstyle::Style;

const HEADER: Style = Green.on_default().effects(Effects::BOLD);
const USAGE: Style = Green.on_default().effects(Effects::BOLD);
const LITERAL: Style = Cyan.on_default().effects(Effects::BOLD);
const PLACEHOLDER: Style = Cyan.on_default();
const ERROR: Style = Red.on_default().effects(Effects::BOLD);
const VALID: Style = Cyan.on_default().effects(Effects::BOLD);
const INVALID: Style = Yellow.on_default().effects(Effects::BOLD);

const APP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

/// Read when `--config` isn't given, if it exists.
const DEFAULT_CONFIG_FILE: &str = "dc-chain.toml";
const DEFAULT_MANIFEST: &str = "components.conf";

#[derive(Debug, Parser)]
#[command(name = "dc-chain")]
#[command(version)]
#[command(about = "Fetch and stage the sources of a Dreamcast cross toolchain")]
#[command(long_about = None)]
#[command(styles = APP_STYLING)]
#[command(term_width = 100)]
struct Args {
    /// Delete components left by an earlier run and fetch them again
    #[arg(long, overrides_with = "no_force")]
    force: bool,
    /// Keep components left by an earlier run (default)
    #[arg(long, overrides_with = "force")]
    no_force: bool,

    /// Clone `dreamcast` repositories with git
    #[arg(long, overrides_with = "download")]
    clone: bool,
    /// Download `dreamcast` repositories as branch tarballs (default)
    #[arg(long, overrides_with = "clone")]
    download: bool,

    /// Clone over HTTPS (default)
    #[arg(long, overrides_with = "ssh")]
    https: bool,
    /// Clone over SSH
    #[arg(long, overrides_with = "https")]
    ssh: bool,

    /// Verify the SHA-512 digest of every downloaded archive (default)
    #[arg(long, overrides_with = "no_verify")]
    verify: bool,
    /// Skip checksum verification
    #[arg(long, overrides_with = "verify")]
    no_verify: bool,

    /// Fetch every component even after a failure and report all failures at the end
    #[arg(long)]
    keep_going: bool,

    /// Component manifest: a path or an http(s):// or file:// URL
    #[arg(long, short = 'm', value_name = "PATH|URL", env = "DC_CHAIN_MANIFEST", default_value = DEFAULT_MANIFEST)]
    manifest: String,

    /// Directory the sources are staged in [default: builds]
    #[arg(long, short = 's', value_name = "PATH")]
    staging_dir: Option<PathBuf>,

    /// Directory for per-run log files [default: logs]
    #[arg(long, value_name = "PATH")]
    log_dir: Option<PathBuf>,

    /// Default mirror for `toolchain` components [default: https://ftpmirror.gnu.org]
    #[arg(long, value_name = "URL", env = "DC_CHAIN_MIRROR")]
    mirror: Option<String>,

    /// TOML configuration file. If omitted, `dc-chain.toml` is read when present.
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Where to read the manifest from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Path(PathBuf),
    Url(Url),
}

impl ManifestSource {
    fn detect(arg: &str) -> Self {
        match Url::parse(arg) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => Self::Url(url),
            _ => Self::Path(PathBuf::from(arg)),
        }
    }
}

impl std::fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug)]
pub struct ValidatedArgs {
    pub config: Config,
    pub manifest: ManifestSource,
    /// The configuration file that was applied, if any.
    pub config_file: Option<PathBuf>,
}

/// The value of a `--flag`/`--no-flag` pair, if either was given.
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl ValidatedArgs {
    fn detect_config_file(arg: Option<PathBuf>) -> Result<Option<PathBuf>, AppError> {
        match arg {
            Some(path) if path.is_file() => Ok(Some(path)),
            Some(path) => Err(AppError::arg_validation(format!(
                "configuration file does not exist: {}",
                path.display()
            ))),
            None => Ok(Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file())),
        }
    }

    fn load_config_file(path: &Path, config: &mut Config) -> Result<(), AppError> {
        ConfigFile::read(path)
            .and_then(|file| file.apply(config))
            .map_err(|err| AppError::config(path.to_path_buf(), err))
    }
}

impl TryFrom<Args> for ValidatedArgs {
    type Error = AppError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut config = Config::default();

        let config_file = ValidatedArgs::detect_config_file(args.config)?;
        if let Some(path) = &config_file {
            ValidatedArgs::load_config_file(path, &mut config)?;
        }

        if let Some(force) = flag_pair(args.force, args.no_force) {
            config.force = force;
        }
        if let Some(clone) = flag_pair(args.clone, args.download) {
            config.mode = if clone { RunMode::Clone } else { RunMode::Download };
        }
        if let Some(ssh) = flag_pair(args.ssh, args.https) {
            config.protocol = if ssh { GitProtocol::Ssh } else { GitProtocol::Https };
        }
        if let Some(verify) = flag_pair(args.verify, args.no_verify) {
            config.verify_checksums = verify;
        }
        if args.keep_going {
            config.policy = FailurePolicy::ContinueAndCollectFailures;
        }
        if let Some(mirror) = args.mirror {
            config.mirror = Url::parse(&mirror).map_err(|err| {
                AppError::arg_validation(format!("invalid mirror URL '{mirror}': {err}"))
            })?;
        }
        if let Some(dir) = args.staging_dir {
            config.staging_dir = dir;
        }
        if let Some(dir) = args.log_dir {
            config.log_dir = dir;
        }

        Ok(ValidatedArgs {
            config,
            manifest: ManifestSource::detect(&args.manifest),
            config_file,
        })
    }
}

/// Parse the command line. `--help` and `--version` print and exit here.
pub fn parse() -> Result<ValidatedArgs, AppError> {
    parse_from(std::env::args_os())
}

pub fn parse_from<I, T>(raw_args: I) -> Result<ValidatedArgs, AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let args = match Args::try_parse_from(raw_args) {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return Err(AppError::usage(err)),
    };
    ValidatedArgs::try_from(args)
}
