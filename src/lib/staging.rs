//! The staging directory where fetched sources accumulate.
//!
//! Whether a component has already been acquired is decided purely by the existence of its
//! directory. Anything written into the staging directory goes through a scratch location first
//! and is renamed into place once complete, so an interrupted run never leaves a directory that
//! looks finished.

use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// The state of a staging path after force policy has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// The path exists and should be used as-is.
    Present(PathBuf),
    /// Nothing is there; the caller should fetch into this path.
    Absent(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Staging {
    root: PathBuf,
}

impl Staging {
    /// Use `dir` as the staging directory, creating it if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref();
        let staging_unavailable = |source| Error::StagingUnavailable {
            path: dir.to_path_buf(),
            source,
        };
        if !dir.is_dir() {
            std::fs::create_dir_all(dir).map_err(staging_unavailable)?;
        }
        let root = dir.canonicalize().map_err(staging_unavailable)?;
        tracing::debug!("staging directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative path onto the root.
    pub fn path<S: AsRef<str>>(&self, name: S) -> PathBuf {
        self.root.join(name.as_ref())
    }

    pub fn is_present<S: AsRef<str>>(&self, name: S) -> bool {
        self.path(name).exists()
    }

    /// The path of a top-level item called `name`. Names that would resolve anywhere other than
    /// directly inside the root are rejected.
    pub fn entry<S: AsRef<str>>(&self, name: S) -> Result<PathBuf, Error> {
        let name = name.as_ref();
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(Error::InvalidStagingName {
                name: name.to_string(),
            }),
        }
    }

    /// Try to delete a staged item. A failure is logged as a warning and the item is left as it
    /// was. Returns whether the item is gone.
    pub fn force_remove<S: AsRef<str>>(&self, name: S) -> bool {
        self.remove_with(name.as_ref(), remove_path)
    }

    fn remove_with<F>(&self, name: &str, remove: F) -> bool
    where
        F: FnOnce(&Path) -> std::io::Result<()>,
    {
        let path = match self.entry(name) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!("refusing to remove anything: {err}");
                return false;
            }
        };
        if !path.exists() {
            return true;
        }
        match remove(&path) {
            Ok(()) => {
                tracing::info!("removed {}", path.display());
                true
            }
            Err(err) => {
                tracing::warn!(
                    "unable to remove {}, continuing with existing content: {err}",
                    path.display()
                );
                !path.exists()
            }
        }
    }

    /// Apply force policy to `name` and report whether it is still there.
    pub fn prepare<S: AsRef<str>>(&self, name: S, force: bool) -> Result<Presence, Error> {
        self.prepare_with(name.as_ref(), force, remove_path)
    }

    fn prepare_with<F>(&self, name: &str, force: bool, remove: F) -> Result<Presence, Error>
    where
        F: FnOnce(&Path) -> std::io::Result<()>,
    {
        let path = self.entry(name)?;
        if force && path.exists() {
            self.remove_with(name, remove);
        }
        Ok(if path.exists() {
            Presence::Present(path)
        } else {
            Presence::Absent(path)
        })
    }

    /// A fresh scratch directory inside the staging directory, deleted on drop.
    pub fn scratch_dir(&self) -> Result<tempfile::TempDir, Error> {
        Ok(tempfile::Builder::new()
            .prefix(".scratch-")
            .tempdir_in(&self.root)?)
    }

    /// Move a completed item into position as `name`.
    pub fn place<P: AsRef<Path>, S: AsRef<str>>(&self, from: P, name: S) -> Result<PathBuf, Error> {
        let dest = self.entry(name)?;
        std::fs::rename(from.as_ref(), &dest)?;
        Ok(dest)
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
