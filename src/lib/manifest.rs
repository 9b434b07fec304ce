//! The component manifest.
//!
//! One record per line, `#` comments and blank lines ignored, fields separated by colons:
//!
//! ```text
//! toolchain:<name>:<version>:[<mirror-base-url>]
//! dreamcast:<repo>:[<branch>]:[<organization>]
//! lib:<name>:<url>
//! ```
//!
//! URLs are always the last field and take the rest of the line, so they may contain colons.

use std::collections::HashMap;
use std::path::Path;

use url::Url;

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_ORGANIZATION: &str = "KallistiOS";

/// Errors encountered when parsing a manifest.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestParseError {
    #[error("line {line}: missing required field '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: too many fields for a '{class}' record")]
    TooManyFields { line: usize, class: &'static str },

    #[error("line {line}: invalid URL '{url}': {reason}")]
    InvalidUrl {
        line: usize,
        url: String,
        reason: String,
    },

    #[error("line {line}: '{value}' is not a valid {field}")]
    InvalidName {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: '{target}' is already staged by line {first}")]
    DuplicateTarget {
        line: usize,
        first: usize,
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainComponent {
    pub name: String,
    pub version: String,
    /// Overrides the run's default mirror base when given.
    pub mirror: Option<Url>,
}

impl ToolchainComponent {
    /// `<name>-<version>`, both the archive stem and the staged directory name.
    pub fn target(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DreamcastComponent {
    pub repo: String,
    pub branch: String,
    pub organization: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibComponent {
    pub name: String,
    pub url: Url,
}

/// A component the manifest asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRecord {
    Toolchain(ToolchainComponent),
    Dreamcast(DreamcastComponent),
    Lib(LibComponent),
}

impl ComponentRecord {
    /// A human readable name for progress messages and errors.
    pub fn display_name(&self) -> String {
        match self {
            ComponentRecord::Toolchain(t) => t.target(),
            ComponentRecord::Dreamcast(d) => format!("{}/{} ({})", d.organization, d.repo, d.branch),
            ComponentRecord::Lib(l) => l.name.clone(),
        }
    }

    /// The directory this component occupies inside the staging directory.
    pub fn staging_name(&self) -> String {
        match self {
            ComponentRecord::Toolchain(t) => t.target(),
            ComponentRecord::Dreamcast(d) => d.repo.clone(),
            ComponentRecord::Lib(l) => l.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Component(ComponentRecord),
    /// A record whose class isn't recognised. These are skipped, not rejected.
    Unknown { class: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// 1-based line number in the manifest.
    pub line: usize,
    pub kind: EntryKind,
}

/// An ordered, parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse a manifest document. Either every record is well-formed or the first malformed one
    /// is reported.
    pub fn parse<S: AsRef<str>>(document: S) -> Result<Self, ManifestParseError> {
        let mut entries = Vec::new();
        let mut targets: HashMap<String, usize> = HashMap::new();
        for (index, raw) in document.as_ref().lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let kind = parse_record(line, text)?;
            if let EntryKind::Component(record) = &kind {
                let target = record.staging_name();
                if let Some(&first) = targets.get(&target) {
                    return Err(ManifestParseError::DuplicateTarget {
                        line,
                        first,
                        target,
                    });
                }
                targets.insert(target, line);
            }
            entries.push(ManifestEntry { line, kind });
        }
        Ok(Self { entries })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        Ok(Self::parse(std::fs::read_to_string(path)?)?)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Iterate over the recognised components only.
    pub fn components(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.entries.iter().filter_map(|entry| match &entry.kind {
            EntryKind::Component(record) => Some(record),
            EntryKind::Unknown { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn required<'a>(
    line: usize,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ManifestParseError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ManifestParseError::MissingField { line, field }),
    }
}

/// A required field that ends up as a directory name inside the staging directory.
fn path_component<'a>(
    line: usize,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ManifestParseError> {
    let value = required(line, field, value)?;
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(ManifestParseError::InvalidName {
            line,
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_url(line: usize, text: &str) -> Result<Url, ManifestParseError> {
    Url::parse(text).map_err(|err| ManifestParseError::InvalidUrl {
        line,
        url: text.to_string(),
        reason: err.to_string(),
    })
}

fn parse_record(line: usize, text: &str) -> Result<EntryKind, ManifestParseError> {
    let (class, rest) = text.split_once(':').unwrap_or((text, ""));
    let class = class.trim();
    if class.is_empty() {
        return Err(ManifestParseError::MissingField {
            line,
            field: "class",
        });
    }
    let record = match class {
        "toolchain" => {
            let mut fields = rest.splitn(3, ':');
            let name = path_component(line, "name", fields.next())?;
            let version = path_component(line, "version", fields.next())?;
            let mirror = optional(fields.next())
                .map(|url| parse_url(line, url))
                .transpose()?;
            ComponentRecord::Toolchain(ToolchainComponent {
                name: name.to_string(),
                version: version.to_string(),
                mirror,
            })
        }
        "dreamcast" => {
            let fields = rest.split(':').collect::<Vec<_>>();
            if fields.len() > 3 {
                return Err(ManifestParseError::TooManyFields {
                    line,
                    class: "dreamcast",
                });
            }
            let mut fields = fields.into_iter();
            let repo = path_component(line, "repo", fields.next())?;
            let branch = optional(fields.next()).unwrap_or(DEFAULT_BRANCH);
            let organization = optional(fields.next()).unwrap_or(DEFAULT_ORGANIZATION);
            ComponentRecord::Dreamcast(DreamcastComponent {
                repo: repo.to_string(),
                branch: branch.to_string(),
                organization: organization.to_string(),
            })
        }
        "lib" => {
            let mut fields = rest.splitn(2, ':');
            let name = path_component(line, "name", fields.next())?;
            let url = parse_url(line, required(line, "url", fields.next())?)?;
            ComponentRecord::Lib(LibComponent {
                name: name.to_string(),
                url,
            })
        }
        other => {
            return Ok(EntryKind::Unknown {
                class: other.to_string(),
            });
        }
    };
    Ok(EntryKind::Component(record))
}

#[cfg(test)]
use ManifestParseError::*;
