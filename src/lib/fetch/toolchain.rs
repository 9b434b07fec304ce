//! `toolchain` components: versioned source archives on a GNU-style mirror.

use std::path::PathBuf;

use crate::archive;
use crate::checksum::{self, ChecksumEntry};
use crate::error::Error;
use crate::fetch::{FetchContext, Staged};
use crate::manifest::ToolchainComponent;
use crate::mirror::{self, Located, MirrorCandidates};
use crate::staging::Presence;
use crate::transport::Progress;

/// Locate, download, verify and unpack `<name>-<version>` into the staging directory.
pub fn fetch(ctx: &FetchContext<'_>, component: &ToolchainComponent) -> Result<Staged, Error> {
    let target = component.target();
    if let Presence::Present(path) = ctx.staging.prepare(&target, ctx.config.force)? {
        tracing::info!("{target}: already downloaded");
        return Ok(Staged::AlreadyPresent(path));
    }

    let mirror_base = component.mirror.as_ref().unwrap_or(&ctx.config.mirror);
    let candidates = MirrorCandidates::new(mirror_base, &component.name, &component.version)?;
    let located = mirror::locate(ctx.transport, &candidates, &target, ctx.staging.root())?;
    let Some(entry) = checksum::select_format(&located.entries) else {
        return Err(Error::MirrorMiss {
            target,
            probed: candidates.iter().cloned().collect(),
        });
    };
    tracing::info!("{target}: using {} from {}", entry.filename, located.dir);

    let archive = download_archive(ctx, &located, entry)?;
    if ctx.config.verify_checksums {
        verify(&archive, entry)?;
    } else {
        tracing::warn!("{target}: checksum verification disabled");
    }

    let scratch = ctx.staging.scratch_dir()?;
    archive::extract(&archive, entry.format, scratch.path(), ctx.cancel)?;
    let unpacked = scratch.path().join(&target);
    if !unpacked.is_dir() {
        return Err(Error::UnexpectedLayout {
            archive,
            expected: target,
        });
    }
    let path = ctx.staging.place(&unpacked, &target)?;
    tracing::info!("{target}: unpacked into {}", path.display());
    Ok(Staged::Fetched(path))
}

/// Download the selected archive next to the staged sources, reusing an intact copy left by an
/// earlier run.
fn download_archive(
    ctx: &FetchContext<'_>,
    located: &Located,
    entry: &ChecksumEntry,
) -> Result<PathBuf, Error> {
    let archive = ctx.staging.path(&entry.filename);
    if ctx.config.force {
        ctx.staging.force_remove(&entry.filename);
    } else if archive.is_file()
        && ctx.config.verify_checksums
        && checksum::sha512_file(&archive)? == entry.digest
    {
        tracing::info!("{}: reusing verified archive", entry.filename);
        return Ok(archive);
    }

    let url = located.url_of(entry)?;
    tracing::info!("downloading {url}");
    let partial = ctx.staging.path(format!("{}.part", entry.filename));
    if let Err(err) = ctx.transport.download(&url, &partial, Progress::Visible) {
        let _ = std::fs::remove_file(&partial);
        return Err(err);
    }
    std::fs::rename(&partial, &archive)?;
    Ok(archive)
}

fn verify(archive: &std::path::Path, entry: &ChecksumEntry) -> Result<(), Error> {
    let actual = checksum::sha512_file(archive)?;
    if actual == entry.digest {
        tracing::debug!("{}: checksum ok", entry.filename);
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            file: archive.to_path_buf(),
            expected: entry.digest.clone(),
            actual,
        })
    }
}
