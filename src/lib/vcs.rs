//! Cloning git repositories.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A version-control client able to clone one branch of a repository.
pub trait Vcs {
    /// Clone `branch` of `url` into `dest`, naming the remote `remote`.
    fn clone_repo(&self, url: &str, branch: &str, remote: &str, dest: &Path) -> Result<(), Error>;
}

impl<V: Vcs + ?Sized> Vcs for &V {
    fn clone_repo(&self, url: &str, branch: &str, remote: &str, dest: &Path) -> Result<(), Error> {
        (**self).clone_repo(url, branch, remote, dest)
    }
}

/// Clones by running `git` as a subprocess. Requires `git` to be installed and on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
    cancel: CancelToken,
}

impl GitCli {
    pub fn new(timeout: Duration, cancel: CancelToken) -> Self {
        Self { timeout, cancel }
    }

    /// Check that `git` can be found.
    pub fn probe() -> Result<std::path::PathBuf, Error> {
        which::which("git").map_err(|_| Error::TransportUnavailable {
            tool: "git".to_string(),
        })
    }

    fn clone_subprocess(url: &str, branch: &str, remote: &str, into: &Path) -> Command {
        let mut git = Command::new("git");
        git.args(["clone", "--quiet", "--branch", branch, "--origin", remote]);
        git.arg(url).arg(into);
        git.stdout(Stdio::null())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());
        git
    }

    fn command_line(url: &str, branch: &str, remote: &str, into: &Path) -> String {
        format!(
            "git clone --quiet --branch {branch} --origin {remote} {url} {}",
            into.display()
        )
    }
}

impl Vcs for GitCli {
    fn clone_repo(&self, url: &str, branch: &str, remote: &str, dest: &Path) -> Result<(), Error> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        run_to_completion(
            Self::clone_subprocess(url, branch, remote, dest),
            &Self::command_line(url, branch, remote, dest),
            self.timeout,
            &self.cancel,
        )
    }
}

/// Run `command` until it exits, is cancelled, or outlives `timeout`. Stderr is collected on its
/// own thread so a noisy child never stalls on a full pipe.
fn run_to_completion(
    mut command: Command,
    command_line: &str,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<(), Error> {
    let mut child = command.spawn()?;
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    });
    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() || started.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            // The reader is left detached: grandchildren may still hold the pipe open
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            return Err(Error::Timeout {
                command: command_line.to_string(),
                after: timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };
    if status.success() {
        return Ok(());
    }
    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();
    Err(Error::Subprocess {
        command: command_line.to_string(),
        status,
        stderr,
    })
}
