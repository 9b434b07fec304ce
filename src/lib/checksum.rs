//! Checksum manifests and archive format selection.
//!
//! Mirrors publish a `sha512.sum` file next to their archives. Each line pairs a SHA-512 digest
//! with a filename, in the format produced by `sha512sum`:
//!
//! ```text
//! 8cfd6c9b1f0a6b2e...e1f3a9  binutils-2.30.tar.xz
//! ```

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha512};

/// The checksum manifest published in every mirror directory.
pub const CHECKSUM_FILE: &str = "sha512.sum";

/// Length of a hex encoded SHA-512 digest.
pub const DIGEST_HEX_LEN: usize = 128;

const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChecksumParseError {
    /// A line names the target with a compression we can't unpack.
    #[error("unrecognised archive format in checksum entry '{filename}'")]
    UnknownFormat { filename: String },

    #[error("malformed digest for '{filename}': expected {DIGEST_HEX_LEN} hex characters")]
    InvalidDigest { filename: String },
}

/// Compression formats, in the order they're preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Xz,
    Bz2,
    Gz,
}

impl ArchiveFormat {
    pub fn from_extension<S: AsRef<str>>(ext: S) -> Option<Self> {
        match ext.as_ref() {
            "xz" => Some(Self::Xz),
            "bz2" => Some(Self::Bz2),
            "gz" => Some(Self::Gz),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xz => "xz",
            Self::Bz2 => "bz2",
            Self::Gz => "gz",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tar.{}", self.extension())
    }
}

/// One line of a checksum manifest that names the target archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Lowercase hex digest.
    pub digest: String,
    pub format: ArchiveFormat,
    pub filename: String,
}

impl ChecksumEntry {
    /// Parse one line, returning `Ok(None)` when the line is about some other file.
    pub fn parse_line(line: &str, target: &str) -> Result<Option<Self>, ChecksumParseError> {
        let mut fields = line.split_whitespace();
        let (Some(digest), Some(path)) = (fields.next(), fields.next()) else {
            return Ok(None);
        };
        // `sha512sum -b` marks binary mode with a leading '*'
        let path = path.strip_prefix('*').unwrap_or(path);
        let filename = path.rsplit('/').next().unwrap_or(path);
        let Some(ext) = filename
            .strip_prefix(target)
            .and_then(|rest| rest.strip_prefix(".tar."))
        else {
            return Ok(None);
        };
        let format =
            ArchiveFormat::from_extension(ext).ok_or_else(|| ChecksumParseError::UnknownFormat {
                filename: filename.to_string(),
            })?;
        if digest.len() != DIGEST_HEX_LEN || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChecksumParseError::InvalidDigest {
                filename: filename.to_string(),
            });
        }
        Ok(Some(Self {
            digest: digest.to_ascii_lowercase(),
            format,
            filename: filename.to_string(),
        }))
    }
}

/// Collect every entry for `target` in a checksum manifest, in file order.
pub fn parse_manifest<S: AsRef<str>>(
    document: S,
    target: &str,
) -> Result<Vec<ChecksumEntry>, ChecksumParseError> {
    document
        .as_ref()
        .lines()
        .filter_map(|line| ChecksumEntry::parse_line(line, target).transpose())
        .collect()
}

/// Pick one entry: `xz` wins outright, `bz2` beats `gz`, and `gz` is taken only when nothing else
/// has been.
pub fn select_format(entries: &[ChecksumEntry]) -> Option<&ChecksumEntry> {
    let mut chosen: Option<&ChecksumEntry> = None;
    for entry in entries {
        match entry.format {
            ArchiveFormat::Xz => return Some(entry),
            ArchiveFormat::Bz2 => chosen = Some(entry),
            ArchiveFormat::Gz => {
                if chosen.is_none() {
                    chosen = Some(entry);
                }
            }
        }
    }
    chosen
}

/// Hex encoded SHA-512 of a file's contents.
pub fn sha512_file<P: AsRef<Path>>(path: P) -> Result<String, std::io::Error> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
fn digest_of(c: char) -> String {
    std::iter::repeat_n(c, DIGEST_HEX_LEN).collect()
}

#[cfg(test)]
mod test_checksum_lines {
    use super::*;

    #[test]
    fn matching_line_is_parsed() {
        let line = format!("{}  binutils-2.30.tar.xz", digest_of('A'));
        let entry = ChecksumEntry::parse_line(&line, "binutils-2.30")
            .unwrap()
            .unwrap();
        assert_eq!(entry.format, ArchiveFormat::Xz);
        assert_eq!(entry.filename, "binutils-2.30.tar.xz");
        assert_eq!(entry.digest, digest_of('a'));
    }

    #[test]
    fn binary_marker_and_paths_are_tolerated() {
        let line = format!("{} *./releases/gcc-14.2.0.tar.gz", digest_of('0'));
        let entry = ChecksumEntry::parse_line(&line, "gcc-14.2.0").unwrap().unwrap();
        assert_eq!(entry.filename, "gcc-14.2.0.tar.gz");
    }

    #[test]
    fn other_files_are_ignored() {
        for line in [
            format!("{}  binutils-2.31.tar.xz", digest_of('1')),
            format!("{}  binutils-2.30.1.tar.xz", digest_of('1')),
            format!("{}  binutils-2.30.zip", digest_of('1')),
            "".to_string(),
            "just-one-field".to_string(),
        ] {
            assert_eq!(ChecksumEntry::parse_line(&line, "binutils-2.30"), Ok(None));
        }
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let line = format!("{}  binutils-2.30.tar.lz", digest_of('1'));
        assert_eq!(
            ChecksumEntry::parse_line(&line, "binutils-2.30"),
            Err(ChecksumParseError::UnknownFormat {
                filename: "binutils-2.30.tar.lz".into()
            })
        );
    }

    #[test]
    fn short_digest_is_an_error() {
        assert!(matches!(
            ChecksumEntry::parse_line("abc123  binutils-2.30.tar.gz", "binutils-2.30"),
            Err(ChecksumParseError::InvalidDigest { .. })
        ));
    }

    #[test]
    fn parse_manifest_keeps_file_order() {
        let document = format!(
            "{d}  gdb-15.2.tar.gz\n{d}  gcc-14.2.0.tar.gz\n{d}  gdb-15.2.tar.xz\n",
            d = digest_of('f')
        );
        let formats = parse_manifest(&document, "gdb-15.2")
            .unwrap()
            .into_iter()
            .map(|e| e.format)
            .collect::<Vec<_>>();
        assert_eq!(formats, vec![ArchiveFormat::Gz, ArchiveFormat::Xz]);
    }
}

#[cfg(test)]
mod test_format_selection {
    use super::*;

    fn entries(formats: &[ArchiveFormat]) -> Vec<ChecksumEntry> {
        formats
            .iter()
            .map(|format| ChecksumEntry {
                digest: digest_of('0'),
                format: *format,
                filename: format!("pkg-1.0.{format}"),
            })
            .collect()
    }

    fn selected(formats: &[ArchiveFormat]) -> Option<ArchiveFormat> {
        select_format(&entries(formats)).map(|e| e.format)
    }

    use ArchiveFormat::*;

    #[test]
    fn xz_always_wins() {
        assert_eq!(selected(&[Gz, Bz2, Xz]), Some(Xz));
        assert_eq!(selected(&[Xz, Bz2, Gz]), Some(Xz));
    }

    #[test]
    fn bz2_beats_gz_in_any_order() {
        assert_eq!(selected(&[Gz, Bz2]), Some(Bz2));
        assert_eq!(selected(&[Bz2, Gz]), Some(Bz2));
    }

    #[test]
    fn gz_only_when_alone() {
        assert_eq!(selected(&[Gz]), Some(Gz));
        assert_eq!(selected(&[]), None);
    }
}
