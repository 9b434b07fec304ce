//! Integration tests for the dc-chain library.
//!
//! Mirrors are plain directories served over `file://` URLs, so these tests exercise the real
//! [`Downloader`] and archive extraction without touching the network.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

use dc_chain::{
    ArchiveFormat, CancelToken, Config, Dispatcher, Downloader, Error, FetchContext, Manifest,
    Outcome, Progress, RunMode, RunResult, Staged, Staging, Transport, Vcs,
};
use sha2::{Digest, Sha512};
use url::Url;

/// Wraps a transport and records every URL it is asked for.
struct Recording<T> {
    inner: T,
    requests: RefCell<Vec<String>>,
}

impl<T: Transport> Recording<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            requests: RefCell::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl<T: Transport> Transport for Recording<T> {
    fn download(&self, url: &Url, dest: &Path, progress: Progress) -> Result<u64, Error> {
        self.requests.borrow_mut().push(url.to_string());
        self.inner.download(url, dest, progress)
    }
}

/// A VCS client that must never be used.
struct NoVcs;

impl Vcs for NoVcs {
    fn clone_repo(&self, url: &str, _: &str, _: &str, _: &Path) -> Result<(), Error> {
        panic!("unexpected clone of {url}");
    }
}

fn tarball(format: ArchiveFormat, root: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_mode(0o755);
    header.set_size(0);
    builder
        .append_data(&mut header, format!("{root}/"), std::io::empty())
        .unwrap();
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o644);
        header.set_size(contents.len() as u64);
        builder
            .append_data(&mut header, format!("{root}/{name}"), contents.as_bytes())
            .unwrap();
    }
    let tar = builder.into_inner().unwrap();
    match format {
        ArchiveFormat::Xz => {
            let mut enc = xz2::write::XzEncoder::new(Vec::new(), 6);
            enc.write_all(&tar).unwrap();
            enc.finish().unwrap()
        }
        ArchiveFormat::Bz2 => {
            let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            enc.write_all(&tar).unwrap();
            enc.finish().unwrap()
        }
        ArchiveFormat::Gz => {
            let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(&tar).unwrap();
            enc.finish().unwrap()
        }
    }
}

/// Lay out `<name>-<version>` in `<mirror>/<name>/<subdir>` with a `sha512.sum` covering every
/// format given.
fn publish(mirror: &Path, subdir: &str, name: &str, version: &str, formats: &[ArchiveFormat]) {
    let target = format!("{name}-{version}");
    let dir = mirror.join(name).join(subdir);
    std::fs::create_dir_all(&dir).unwrap();
    let mut sums = String::new();
    for format in formats {
        let bytes = tarball(*format, &target, &[("configure", "#!/bin/sh\n")]);
        let filename = format!("{target}.{format}");
        sums.push_str(&format!("{}  {filename}\n", hex::encode(Sha512::digest(&bytes))));
        std::fs::write(dir.join(&filename), bytes).unwrap();
    }
    std::fs::write(dir.join("sha512.sum"), sums).unwrap();
}

fn file_url(dir: &Path) -> Url {
    Url::from_directory_path(dir).unwrap()
}

struct Workspace {
    _dir: tempfile::TempDir,
    mirror: PathBuf,
    staging: Staging,
    config: Config,
    cancel: CancelToken,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mirror = dir.path().join("mirror");
        std::fs::create_dir(&mirror).unwrap();
        let staging = Staging::open(dir.path().join("builds")).unwrap();
        let config = Config {
            mirror: file_url(&mirror),
            ..Config::default()
        };
        Self {
            _dir: dir,
            mirror,
            staging,
            config,
            cancel: CancelToken::new(),
        }
    }

    fn transport(&self) -> Recording<Downloader> {
        let downloader = Downloader::new(
            self.config.http_connect_timeout,
            self.config.http_timeout,
            self.cancel.clone(),
        );
        Recording::new(downloader.unwrap())
    }

    fn run<T: Transport>(&self, transport: &T, manifest: &str) -> dc_chain::RunReport {
        let manifest = Manifest::parse(manifest).unwrap();
        Dispatcher::new(FetchContext {
            config: &self.config,
            staging: &self.staging,
            transport,
            vcs: &NoVcs,
            cancel: &self.cancel,
        })
        .run(&manifest)
    }
}

#[test]
fn test_xz_only_mirror_end_to_end() {
    let ws = Workspace::new();
    publish(&ws.mirror, "", "binutils", "2.30", &[ArchiveFormat::Xz]);
    let manifest = format!("toolchain:binutils:2.30:{}\n", file_url(&ws.mirror));

    let report = ws.run(&ws.transport(), &manifest);
    assert_eq!(report.result(), RunResult::Ok, "{:?}", report.failures);
    assert!(ws.staging.path("binutils-2.30/configure").is_file());
    assert!(matches!(
        &report.outcomes[..],
        [Outcome::Staged { staged: Staged::Fetched(_), .. }]
    ));
}

#[test]
fn test_probe_order_reaches_last_candidate() {
    let ws = Workspace::new();
    publish(&ws.mirror, "snapshots/14.2.0", "gcc", "14.2.0", &[ArchiveFormat::Gz]);
    let transport = ws.transport();

    let report = ws.run(&transport, "toolchain:gcc:14.2.0\n");
    assert_eq!(report.result(), RunResult::Ok, "{:?}", report.failures);

    let base = file_url(&ws.mirror.join("gcc"));
    let expected = [
        "sha512.sum",
        "releases/sha512.sum",
        "releases/14.2.0/sha512.sum",
        "14.2.0/sha512.sum",
        "snapshots/sha512.sum",
        "snapshots/14.2.0/sha512.sum",
        "snapshots/14.2.0/gcc-14.2.0.tar.gz",
    ]
    .map(|path| base.join(path).unwrap().to_string());
    assert_eq!(transport.requested(), expected);
}

#[test]
fn test_bz2_preferred_over_gz() {
    let ws = Workspace::new();
    publish(
        &ws.mirror,
        "releases",
        "gdb",
        "15.2",
        &[ArchiveFormat::Gz, ArchiveFormat::Bz2],
    );
    let transport = ws.transport();
    let report = ws.run(&transport, "toolchain:gdb:15.2\n");
    assert_eq!(report.result(), RunResult::Ok, "{:?}", report.failures);
    assert!(ws.staging.is_present("gdb-15.2.tar.bz2"));
    assert!(!ws.staging.is_present("gdb-15.2.tar.gz"));
    assert!(
        transport
            .requested()
            .last()
            .is_some_and(|url| url.ends_with("gdb-15.2.tar.bz2"))
    );
}

#[test]
fn test_fail_fast_skips_remaining_records() {
    let ws = Workspace::new();
    publish(&ws.mirror, "", "binutils", "2.30", &[ArchiveFormat::Xz]);
    publish(&ws.mirror, "", "newlib", "4.4.0", &[ArchiveFormat::Gz]);

    let report = ws.run(
        &ws.transport(),
        "toolchain:binutils:2.30\ntoolchain:gcc:99.0\ntoolchain:newlib:4.4.0\n",
    );
    assert_eq!(report.result(), RunResult::Fail);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].source,
        Error::MirrorMiss { ref target, .. } if target == "gcc-99.0"
    ));
    assert!(ws.staging.is_present("binutils-2.30"));
    assert!(!ws.staging.is_present("newlib-4.4.0"));
}

#[test]
fn test_second_run_is_idempotent() {
    let ws = Workspace::new();
    publish(&ws.mirror, "", "binutils", "2.30", &[ArchiveFormat::Xz]);
    let manifest = "toolchain:binutils:2.30\n";
    assert_eq!(ws.run(&ws.transport(), manifest).result(), RunResult::Ok);

    let transport = ws.transport();
    let report = ws.run(&transport, manifest);
    assert_eq!(report.result(), RunResult::Ok);
    assert_eq!(report.already_present(), 1);
    assert!(transport.requested().is_empty());
}

#[test]
fn test_corrupted_archive_is_not_unpacked() {
    let ws = Workspace::new();
    publish(&ws.mirror, "", "binutils", "2.30", &[ArchiveFormat::Xz]);
    std::fs::write(ws.mirror.join("binutils/binutils-2.30.tar.xz"), b"tampered").unwrap();

    let report = ws.run(&ws.transport(), "toolchain:binutils:2.30\n");
    assert_eq!(report.result(), RunResult::Fail);
    assert!(matches!(
        report.failures[0].source,
        Error::ChecksumMismatch { .. }
    ));
    assert!(!ws.staging.is_present("binutils-2.30"));
}

#[test]
fn test_dreamcast_branch_tarball_download() {
    let mut ws = Workspace::new();
    let github = ws.mirror.join("github");
    let archive_dir = github.join("KallistiOS/KallistiOS/archive");
    std::fs::create_dir_all(&archive_dir).unwrap();
    std::fs::write(
        archive_dir.join("master.tar.gz"),
        tarball(ArchiveFormat::Gz, "KallistiOS-master", &[("environ.sh", "")]),
    )
    .unwrap();
    ws.config.mode = RunMode::Download;
    ws.config.github_https = file_url(&github).to_string();

    let report = ws.run(&ws.transport(), "dreamcast:KallistiOS\n");
    assert_eq!(report.result(), RunResult::Ok, "{:?}", report.failures);
    assert!(ws.staging.path("KallistiOS/environ.sh").is_file());
}

#[test]
fn test_malformed_manifest_is_rejected_before_fetching() {
    let err = Manifest::parse("toolchain:binutils:2.30\ntoolchain:gcc\n").unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");
}
