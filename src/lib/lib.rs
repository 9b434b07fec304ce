//! Acquire the sources of a Dreamcast cross toolchain and stage them for building.
//!
//! A component manifest lists what is needed, one record per line:
//!
//! - `toolchain:<name>:<version>:[<mirror>]`: a GNU-style release tarball. Candidate directories
//!   on the mirror are probed for a `sha512.sum` naming `<name>-<version>.tar.*`, the best
//!   compression available is downloaded, verified and unpacked.
//! - `dreamcast:<repo>:[<branch>]:[<organization>]`: a GitHub hosted repository, either cloned
//!   with `git` or downloaded as a branch tarball.
//! - `lib:<name>:<url>`: a single file saved as-is.
//!
//! Every component is staged in its own directory. Components already present from an earlier
//! run are left alone unless force mode is on, so a run can be repeated after a failure.
//!
//! # Usage
//!
//! ```rust
//! use dc_chain::{ComponentRecord, Manifest};
//!
//! let manifest = Manifest::parse(
//!     r#"
//! toolchain:binutils:2.43
//! toolchain:newlib:4.4.0.20231231:https://sourceware.org/pub
//! dreamcast:kos-ports
//! "#,
//! )?;
//!
//! let names = manifest
//!     .components()
//!     .map(ComponentRecord::staging_name)
//!     .collect::<Vec<_>>();
//! assert_eq!(names, ["binutils-2.43", "newlib-4.4.0.20231231", "kos-ports"]);
//! # Ok::<(), dc_chain::Error>(())
//! ```
//!
//! Fetching goes through a [`Dispatcher`], which borrows everything it needs for the run:
//!
//! ```rust,no_run
//! use dc_chain::{CancelToken, Config, Dispatcher, Downloader, FetchContext, GitCli, Manifest,
//!     RunResult, Staging};
//!
//! # fn main() -> Result<(), dc_chain::Error> {
//! let config = Config::default();
//! let cancel = CancelToken::new();
//! let staging = Staging::open(&config.staging_dir)?;
//! let transport =
//!     Downloader::new(config.http_connect_timeout, config.http_timeout, cancel.clone())?;
//! let vcs = GitCli::new(config.clone_timeout, cancel.clone());
//! let manifest = Manifest::read("components.conf")?;
//!
//! let dispatcher = Dispatcher::new(FetchContext {
//!     config: &config,
//!     staging: &staging,
//!     transport: &transport,
//!     vcs: &vcs,
//!     cancel: &cancel,
//! });
//! let report = dispatcher.run(&manifest);
//! assert_eq!(report.result(), RunResult::Ok);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cancel;
pub mod checksum;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod mirror;
pub mod runlog;
pub mod staging;
pub mod transport;
pub mod vcs;

#[cfg(test)]
mod testing;

pub use cancel::CancelToken;
pub use checksum::{ArchiveFormat, ChecksumEntry, ChecksumParseError};
pub use config::{Config, ConfigFile, FailurePolicy, GitProtocol, RunMode};
pub use dispatcher::{Dispatcher, Outcome, RunReport, RunResult};
pub use error::{Error, FetchError};
pub use fetch::{FetchContext, Staged};
pub use manifest::{ComponentRecord, EntryKind, Manifest, ManifestEntry, ManifestParseError};
pub use mirror::MirrorCandidates;
pub use runlog::RunLog;
pub use staging::{Presence, Staging};
pub use transport::{Downloader, Progress, Transport};
pub use vcs::{GitCli, Vcs};
