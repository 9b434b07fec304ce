//! `dreamcast` components: GitHub hosted repositories, cloned or downloaded as a branch tarball.

use crate::archive;
use crate::checksum::ArchiveFormat;
use crate::config::RunMode;
use crate::error::Error;
use crate::fetch::{FetchContext, Staged};
use crate::manifest::DreamcastComponent;
use crate::staging::Presence;
use crate::transport::Progress;

/// Acquire the repository into `<staging>/<repo>` according to the run mode.
pub fn fetch(ctx: &FetchContext<'_>, component: &DreamcastComponent) -> Result<Staged, Error> {
    let repo = &component.repo;
    let path = match ctx.staging.prepare(repo, ctx.config.force)? {
        Presence::Present(path) => {
            let verb = match ctx.config.mode {
                RunMode::Clone => "cloned",
                RunMode::Download => "downloaded",
            };
            tracing::info!("{repo}: already {verb}");
            return Ok(Staged::AlreadyPresent(path));
        }
        Presence::Absent(path) => path,
    };
    match ctx.config.mode {
        RunMode::Clone => {
            let url = ctx.config.repository_url(&component.organization, repo);
            tracing::info!("cloning {url} ({})", component.branch);
            let scratch = ctx.staging.scratch_dir()?;
            let checkout = scratch.path().join(repo);
            ctx.vcs
                .clone_repo(&url, &component.branch, &ctx.config.remote_name, &checkout)?;
            ctx.staging.place(&checkout, repo)?;
        }
        RunMode::Download => download(ctx, component)?,
    }
    tracing::info!("{repo}: staged in {}", path.display());
    Ok(Staged::Fetched(path))
}

fn download(ctx: &FetchContext<'_>, component: &DreamcastComponent) -> Result<(), Error> {
    let url = ctx.config.branch_archive_url(
        &component.organization,
        &component.repo,
        &component.branch,
    )?;
    tracing::info!("downloading {url}");
    let scratch = ctx.staging.scratch_dir()?;
    let tarball = scratch.path().join(format!(
        "{}-{}.tar.gz",
        component.repo,
        component.branch.replace('/', "-")
    ));
    ctx.transport.download(&url, &tarball, Progress::Visible)?;

    let unpack_dir = scratch.path().join("unpacked");
    std::fs::create_dir(&unpack_dir)?;
    archive::extract(&tarball, ArchiveFormat::Gz, &unpack_dir, ctx.cancel)?;
    let Some(top_level) = archive::single_top_level_dir(&unpack_dir)? else {
        return Err(Error::UnexpectedLayout {
            archive: tarball,
            expected: format!("a single top-level directory for {}", component.repo),
        });
    };
    ctx.staging.place(top_level, &component.repo)?;
    Ok(())
}
