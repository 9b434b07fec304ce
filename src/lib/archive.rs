//! Unpacking compressed tar archives.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

use tar::Archive;

use crate::cancel::CancelToken;
use crate::checksum::ArchiveFormat;
use crate::error::Error;

/// Extract `archive` into the directory `into`, which must already exist.
pub fn extract(
    archive: &Path,
    format: ArchiveFormat,
    into: &Path,
    cancel: &CancelToken,
) -> Result<(), Error> {
    let as_extraction_error = |source| Error::Extraction {
        archive: archive.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(archive).map_err(as_extraction_error)?);
    let result = match format {
        ArchiveFormat::Gz => unpack(flate2::read::GzDecoder::new(reader), into, cancel),
        ArchiveFormat::Bz2 => unpack(bzip2::read::BzDecoder::new(reader), into, cancel),
        ArchiveFormat::Xz => unpack(xz2::read::XzDecoder::new(reader), into, cancel),
    };
    result.map_err(|err| match err {
        Error::Io(source) => as_extraction_error(source),
        other => other,
    })
}

fn unpack<R: Read>(reader: R, into: &Path, cancel: &CancelToken) -> Result<(), Error> {
    let mut archive = Archive::new(reader);
    for entry in archive.entries()? {
        cancel.check()?;
        let mut entry = entry?;
        // GitHub branch tarballs carry the commit id in a global pax header
        if entry.header().entry_type().is_pax_global_extensions() {
            continue;
        }
        let path = entry.path()?.into_owned();
        if path.is_absolute() || path.components().any(|c| c == Component::ParentDir) {
            return Err(Error::UnsafeArchivePath { path });
        }
        // Some archives start with a "./" entry
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }
        if !entry.unpack_in(into)? {
            return Err(Error::UnsafeArchivePath { path });
        }
    }
    Ok(())
}

/// The single directory an archive unpacked into, if there is exactly one top-level item and it
/// is a directory.
pub fn single_top_level_dir(dir: &Path) -> Result<Option<std::path::PathBuf>, Error> {
    let mut items = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    match (items.pop(), items.is_empty()) {
        (Some(only), true) if only.is_dir() => Ok(Some(only)),
        _ => Ok(None),
    }
}
