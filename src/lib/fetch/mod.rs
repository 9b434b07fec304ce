//! Acquiring individual components.

pub mod dreamcast;
pub mod library;
pub mod toolchain;

use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::staging::Staging;
use crate::transport::Transport;
use crate::vcs::Vcs;

/// Everything a fetcher needs, borrowed for the length of a run.
#[derive(Clone, Copy)]
pub struct FetchContext<'a> {
    pub config: &'a Config,
    pub staging: &'a Staging,
    pub transport: &'a dyn Transport,
    pub vcs: &'a dyn Vcs,
    pub cancel: &'a CancelToken,
}

/// Where a component ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    /// Acquired during this run.
    Fetched(PathBuf),
    /// Left over from an earlier run and not touched.
    AlreadyPresent(PathBuf),
}

impl Staged {
    pub fn is_fetched(&self) -> bool {
        matches!(self, Staged::Fetched(_))
    }
}

impl AsRef<Path> for Staged {
    fn as_ref(&self) -> &Path {
        match self {
            Staged::Fetched(path) | Staged::AlreadyPresent(path) => path,
        }
    }
}

/// The filename at the end of a URL's path, if there is one.
pub(crate) fn url_filename(url: &url::Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
}
