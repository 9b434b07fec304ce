//! In-memory collaborators for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use sha2::{Digest, Sha512};
use url::Url;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::Error;
use crate::fetch::FetchContext;
use crate::staging::Staging;
use crate::transport::{Progress, Transport};
use crate::vcs::Vcs;

pub fn sha512_hex(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}

/// Serves fixed bodies and remembers every URL asked for. Unknown URLs fail like a 404.
#[derive(Default)]
pub struct FakeTransport {
    bodies: HashMap<String, Vec<u8>>,
    pub requests: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub fn serve<S: Into<String>>(&mut self, url: S, body: impl Into<Vec<u8>>) -> &mut Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn download(&self, url: &Url, dest: &Path, _: Progress) -> Result<u64, Error> {
        self.requests.borrow_mut().push(url.to_string());
        match self.bodies.get(url.as_str()) {
            Some(body) => {
                std::fs::write(dest, body)?;
                Ok(body.len() as u64)
            }
            None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("404 {url}"),
            ))),
        }
    }
}

/// "Clones" by creating the destination with a marker file.
#[derive(Default)]
pub struct FakeVcs {
    pub clones: RefCell<Vec<(String, String, String)>>,
    pub fail: bool,
}

impl Vcs for FakeVcs {
    fn clone_repo(&self, url: &str, branch: &str, remote: &str, dest: &Path) -> Result<(), Error> {
        self.clones
            .borrow_mut()
            .push((url.to_string(), branch.to_string(), remote.to_string()));
        if self.fail {
            return Err(Error::Io(std::io::Error::other("clone failed")));
        }
        std::fs::create_dir_all(dest)?;
        std::fs::write(dest.join(".git"), "gitdir")?;
        Ok(())
    }
}

/// Owns the pieces a [`FetchContext`] borrows.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub config: Config,
    pub staging: Staging,
    pub transport: FakeTransport,
    pub vcs: FakeVcs,
    pub cancel: CancelToken,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::open(dir.path().join("builds")).unwrap();
        Self {
            config: Config {
                mirror: Url::parse("https://mirror.test/gnu").unwrap(),
                ..Config::default()
            },
            dir,
            staging,
            transport: FakeTransport::default(),
            vcs: FakeVcs::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn context(&self) -> FetchContext<'_> {
        FetchContext {
            config: &self.config,
            staging: &self.staging,
            transport: &self.transport,
            vcs: &self.vcs,
            cancel: &self.cancel,
        }
    }
}
