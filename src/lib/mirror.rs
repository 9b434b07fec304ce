//! Locating a release on a GNU-style mirror.
//!
//! Projects lay out their release directories in a few different ways, so for each component a
//! fixed list of candidate directories is probed in priority order. The first one whose
//! [`CHECKSUM_FILE`] mentions the target archive wins.

use std::path::Path;

use url::Url;

use crate::checksum::{self, CHECKSUM_FILE, ChecksumEntry};
use crate::error::Error;
use crate::transport::{Progress, Transport};

/// Candidate directories for one `name`/`version`, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorCandidates(Vec<Url>);

impl MirrorCandidates {
    pub fn new(base: &Url, name: &str, version: &str) -> Result<Self, Error> {
        let layouts: [&[&str]; 6] = [
            &[],
            &["releases"],
            &["releases", version],
            &[version],
            &["snapshots"],
            &["snapshots", version],
        ];
        layouts
            .iter()
            .map(|layout| directory(base, name, layout))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Url> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a MirrorCandidates {
    type Item = &'a Url;
    type IntoIter = std::slice::Iter<'a, Url>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// `<base>/<name>/<layout...>/`, always with a trailing slash so it can be joined onto.
fn directory(base: &Url, name: &str, layout: &[&str]) -> Result<Url, Error> {
    let mut dir = base.clone();
    {
        let mut segments = dir.path_segments_mut().map_err(|_| Error::InvalidMirror {
            url: base.to_string(),
        })?;
        segments.pop_if_empty().push(name).extend(layout).push("");
    }
    Ok(dir)
}

/// A mirror directory known to publish the target, with its checksum entries for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub dir: Url,
    pub entries: Vec<ChecksumEntry>,
}

impl Located {
    pub fn url_of(&self, entry: &ChecksumEntry) -> Result<Url, Error> {
        Ok(self.dir.join(&entry.filename)?)
    }
}

/// Probe `candidates` in order for a checksum manifest naming `target`. Each manifest is
/// downloaded into a scratch file in `scratch_dir` which is removed again whatever the outcome.
pub fn locate<T: Transport + ?Sized>(
    transport: &T,
    candidates: &MirrorCandidates,
    target: &str,
    scratch_dir: &Path,
) -> Result<Located, Error> {
    for dir in candidates {
        let checksum_url = dir.join(CHECKSUM_FILE)?;
        let scratch = tempfile::Builder::new()
            .prefix(".sums-")
            .tempfile_in(scratch_dir)?;
        if let Err(err) = transport.download(&checksum_url, scratch.path(), Progress::Silent) {
            if err.is_cancellation() {
                return Err(err);
            }
            tracing::debug!("no checksum manifest at {checksum_url}: {err}");
            continue;
        }
        let document = std::fs::read_to_string(scratch.path())?;
        let entries = checksum::parse_manifest(&document, target)?;
        if !entries.is_empty() {
            tracing::debug!("found {target} in {dir}");
            return Ok(Located {
                dir: dir.clone(),
                entries,
            });
        }
    }
    Err(Error::MirrorMiss {
        target: target.to_string(),
        probed: candidates.iter().cloned().collect(),
    })
}
