//! Downloading files.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use url::Url;

use crate::cancel::CancelToken;
use crate::error::Error;

const CHUNK_SIZE: usize = 64 * 1024;

/// Whether a download draws a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Silent,
    Visible,
}

/// Fetches the resource at a URL into a local file.
pub trait Transport {
    /// Write the body at `url` to `dest`, returning the number of bytes written. `dest` is
    /// truncated first. Any non-success response is an error.
    fn download(&self, url: &Url, dest: &Path, progress: Progress) -> Result<u64, Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn download(&self, url: &Url, dest: &Path, progress: Progress) -> Result<u64, Error> {
        (**self).download(url, dest, progress)
    }
}

/// The default transport: `http`/`https` through a blocking reqwest client, `file` URLs by
/// copying.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::blocking::Client,
    cancel: CancelToken,
}

impl Downloader {
    /// `connect_timeout` bounds establishing a connection. `read_timeout` bounds the wait for the
    /// response headers and then each read of the body, so a slow transfer that keeps making
    /// progress is never cut off.
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        cancel: CancelToken,
    ) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;
        Ok(Self { client, cancel })
    }

    fn copy_with_progress<R: Read>(
        &self,
        mut reader: R,
        dest: &Path,
        total: Option<u64>,
        label: &str,
        progress: Progress,
    ) -> Result<u64, Error> {
        let bar = match progress {
            Progress::Silent => ProgressBar::hidden(),
            Progress::Visible => make_download_bar(total, label),
        };
        let mut out = io::BufWriter::new(fs::File::create(dest)?);
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        let result = loop {
            if let Err(err) = self.cancel.check() {
                break Err(err);
            }
            let n = match reader.read(&mut buffer) {
                Ok(0) => break Ok(written),
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => break Err(err.into()),
            };
            if let Err(err) = out.write_all(&buffer[..n]) {
                break Err(err.into());
            }
            written += n as u64;
            bar.set_position(written);
        };
        bar.finish_and_clear();
        out.flush()?;
        result
    }
}

impl Transport for Downloader {
    fn download(&self, url: &Url, dest: &Path, progress: Progress) -> Result<u64, Error> {
        let label = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or(url.as_str())
            .to_string();
        match url.scheme() {
            "http" | "https" => {
                tracing::debug!("GET {url}");
                let response = self.client.get(url.clone()).send()?.error_for_status()?;
                let total = response.content_length();
                self.copy_with_progress(response, dest, total, &label, progress)
            }
            "file" => {
                let path = url.to_file_path().map_err(|_| Error::UnsupportedScheme {
                    url: url.to_string(),
                })?;
                let file = fs::File::open(&path)?;
                let total = file.metadata().ok().map(|m| m.len());
                self.copy_with_progress(file, dest, total, &label, progress)
            }
            _ => Err(Error::UnsupportedScheme {
                url: url.to_string(),
            }),
        }
    }
}

fn make_download_bar(total: Option<u64>, label: &str) -> ProgressBar {
    let bar = match total {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::with_template(
                    "{prefix:.cyan.bold} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                // SAFETY: the template is a constant known to be valid
                .unwrap()
                .progress_chars("━╸━"),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{prefix:.cyan.bold} {spinner} {bytes}")
                    // SAFETY: the template is a constant known to be valid
                    .unwrap()
                    .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷"),
            );
            bar
        }
    };
    bar.set_prefix(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
