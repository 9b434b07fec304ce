//! Run configuration.
//!
//! A [`Config`] is assembled once per run (defaults, then an optional TOML [`ConfigFile`], then
//! command line flags) and afterwards only ever borrowed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::Error;

pub const DEFAULT_MIRROR: &str = "https://ftpmirror.gnu.org";
pub const DEFAULT_GITHUB_HTTPS: &str = "https://github.com";
pub const DEFAULT_GITHUB_SSH: &str = "git@github.com:";
pub const DEFAULT_STAGING_DIR: &str = "builds";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_REMOTE_NAME: &str = "origin";
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 1800;

/// How `dreamcast` components are acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Clone the repository with `git`.
    Clone,
    /// Download and unpack a branch tarball.
    #[default]
    Download,
}

/// The transport used to reach GitHub hosted repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProtocol {
    #[default]
    Https,
    Ssh,
}

/// What the dispatcher does after a component fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the run at the first failing component.
    #[default]
    StopOnFirstFailure,
    /// Keep going and report every failure at the end.
    ContinueAndCollectFailures,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub force: bool,
    pub mode: RunMode,
    pub protocol: GitProtocol,
    pub verify_checksums: bool,
    pub policy: FailurePolicy,
    /// Default mirror base for `toolchain` components without their own.
    pub mirror: Url,
    pub github_https: String,
    pub github_ssh: String,
    pub staging_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Remote name given to cloned repositories.
    pub remote_name: String,
    pub http_connect_timeout: Duration,
    /// Longest wait for a response, and then for each read of its body. Not a cap on a whole
    /// transfer.
    pub http_timeout: Duration,
    pub clone_timeout: Duration,
    /// Parallelism hint for the build step.
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            force: false,
            mode: RunMode::default(),
            protocol: GitProtocol::default(),
            verify_checksums: true,
            policy: FailurePolicy::default(),
            // SAFETY: a constant, known-good URL
            mirror: Url::parse(DEFAULT_MIRROR).unwrap(),
            github_https: DEFAULT_GITHUB_HTTPS.to_string(),
            github_ssh: DEFAULT_GITHUB_SSH.to_string(),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            remote_name: DEFAULT_REMOTE_NAME.to_string(),
            http_connect_timeout: Duration::from_secs(DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            clone_timeout: Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS),
            jobs: num_cpus::get(),
        }
    }
}

impl Config {
    /// The URL passed to `git clone` for a GitHub hosted repository.
    pub fn repository_url(&self, organization: &str, repo: &str) -> String {
        match self.protocol {
            GitProtocol::Https => format!(
                "{}/{organization}/{repo}.git",
                self.github_https.trim_end_matches('/')
            ),
            GitProtocol::Ssh => format!("{}{organization}/{repo}.git", self.github_ssh),
        }
    }

    /// The URL of the tarball GitHub serves for a branch. Always uses the HTTPS base, even in SSH
    /// mode.
    pub fn branch_archive_url(
        &self,
        organization: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Url, Error> {
        Ok(Url::parse(&format!(
            "{}/{organization}/{repo}/archive/{branch}.tar.gz",
            self.github_https.trim_end_matches('/')
        ))?)
    }
}

/// Optional overrides read from a TOML file. Every key is optional.
///
/// ```toml
/// mirror = "https://ftp.gnu.org/gnu"
/// staging-dir = "/opt/toolchains/dc/builds"
/// mode = "clone"
/// protocol = "ssh"
/// http-timeout-secs = 60
/// ```
#[derive(Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub mirror: Option<String>,
    pub staging_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub mode: Option<RunMode>,
    pub protocol: Option<GitProtocol>,
    pub force: Option<bool>,
    pub verify: Option<bool>,
    pub policy: Option<FailurePolicy>,
    pub remote_name: Option<String>,
    pub github_https: Option<String>,
    pub github_ssh: Option<String>,
    pub http_connect_timeout_secs: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub clone_timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn parse<S: AsRef<str>>(document: S) -> Result<Self, Error> {
        Ok(toml::from_str(document.as_ref())?)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::parse(std::fs::read_to_string(path)?)
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply(self, config: &mut Config) -> Result<(), Error> {
        if let Some(mirror) = self.mirror {
            config.mirror = Url::parse(&mirror)?;
        }
        if let Some(dir) = self.staging_dir {
            config.staging_dir = dir;
        }
        if let Some(dir) = self.log_dir {
            config.log_dir = dir;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(force) = self.force {
            config.force = force;
        }
        if let Some(verify) = self.verify {
            config.verify_checksums = verify;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(remote) = self.remote_name {
            config.remote_name = remote;
        }
        if let Some(base) = self.github_https {
            config.github_https = base;
        }
        if let Some(base) = self.github_ssh {
            config.github_ssh = base;
        }
        if let Some(secs) = self.http_connect_timeout_secs {
            config.http_connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.http_timeout_secs {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.clone_timeout_secs {
            config.clone_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }
}
