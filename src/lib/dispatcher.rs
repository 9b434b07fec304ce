//! Walks a [`Manifest`] in order and hands each record to the matching fetcher.

use std::path::Path;

use crate::config::FailurePolicy;
use crate::error::{Error, FetchError};
use crate::fetch::{self, FetchContext, Staged};
use crate::manifest::{ComponentRecord, EntryKind, Manifest};

/// What happened to one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Staged { name: String, staged: Staged },
    Skipped { line: usize, class: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Ok,
    Fail,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
    pub failures: Vec<FetchError>,
    /// Set when the run stopped before reaching the end of the manifest.
    pub stopped_early: bool,
}

impl RunReport {
    pub fn result(&self) -> RunResult {
        if self.failures.is_empty() {
            RunResult::Ok
        } else {
            RunResult::Fail
        }
    }

    /// Number of components acquired during this run.
    pub fn fetched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Staged { staged, .. } if staged.is_fetched()))
            .count()
    }

    /// Number of components left over from an earlier run.
    pub fn already_present(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Staged { staged, .. } if !staged.is_fetched()))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Skipped { .. }))
            .count()
    }
}

pub struct Dispatcher<'a> {
    ctx: FetchContext<'a>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(ctx: FetchContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn staging_root(&self) -> &Path {
        self.ctx.staging.root()
    }

    /// Fetch one component.
    pub fn fetch(&self, record: &ComponentRecord) -> Result<Staged, Error> {
        self.ctx.cancel.check()?;
        match record {
            ComponentRecord::Toolchain(component) => fetch::toolchain::fetch(&self.ctx, component),
            ComponentRecord::Dreamcast(component) => fetch::dreamcast::fetch(&self.ctx, component),
            ComponentRecord::Lib(component) => fetch::library::fetch(&self.ctx, component),
        }
    }

    /// Process every entry of `manifest` in file order, honouring the configured
    /// [`FailurePolicy`].
    pub fn run(&self, manifest: &Manifest) -> RunReport {
        let mut report = RunReport::default();
        for entry in manifest.entries() {
            let record = match &entry.kind {
                EntryKind::Component(record) => record,
                EntryKind::Unknown { class } => {
                    tracing::warn!(
                        "line {}: skipping unknown component class '{class}'",
                        entry.line
                    );
                    report.outcomes.push(Outcome::Skipped {
                        line: entry.line,
                        class: class.clone(),
                    });
                    continue;
                }
            };
            let name = record.display_name();
            tracing::info!("processing {name}");
            match self.fetch(record) {
                Ok(staged) => report.outcomes.push(Outcome::Staged { name, staged }),
                Err(err) => {
                    let cancelled = err.is_cancellation();
                    tracing::error!("{name}: {err}");
                    report.failures.push(FetchError::new(name, err));
                    if cancelled || self.ctx.config.policy == FailurePolicy::StopOnFirstFailure {
                        report.stopped_early = true;
                        break;
                    }
                }
            }
        }
        report
    }
}
