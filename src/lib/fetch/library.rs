//! `lib` components: a single file downloaded from an arbitrary URL.

use crate::error::Error;
use crate::fetch::{FetchContext, Staged, url_filename};
use crate::manifest::LibComponent;
use crate::staging::Presence;
use crate::transport::Progress;

/// Download `component.url` into `<staging>/<name>/`, keeping the file's own name.
pub fn fetch(ctx: &FetchContext<'_>, component: &LibComponent) -> Result<Staged, Error> {
    let name = &component.name;
    if let Presence::Present(path) = ctx.staging.prepare(name, ctx.config.force)? {
        tracing::info!("{name}: already downloaded");
        return Ok(Staged::AlreadyPresent(path));
    }

    let filename = url_filename(&component.url).unwrap_or(name.as_str());
    let scratch = ctx.staging.scratch_dir()?;
    let dir = scratch.path().join(name);
    std::fs::create_dir(&dir)?;
    tracing::info!("downloading {}", component.url);
    ctx.transport
        .download(&component.url, &dir.join(filename), Progress::Visible)?;
    let path = ctx.staging.place(&dir, name)?;
    tracing::info!("{name}: saved as {}", path.join(filename).display());
    Ok(Staged::Fetched(path))
}
