//! Resumable HTTP downloader for distribution packages.
//!
//! One transfer streams one URL to one destination file:
//! - HEAD-equivalent reachability probe before committing to a transfer
//! - redirect following at the client level, bounded depth
//! - HTTP Range resume that appends to an existing partial file, restarting
//!   from zero when the server ignores the range
//! - throttled progress callbacks, final callback always at 100%
//! - cooperative cancellation checked at every chunk boundary
//! - automatic bounded retry with resume for interrupted transfers (the
//!   only failures retried at this level)
//!
//! Response bodies are streamed straight to disk; nothing is buffered whole.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{AcquireError, AcquireResult};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for streaming response bytes to disk (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Minimum interval between progress callbacks.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum redirect hops before a transfer is abandoned.
const MAX_REDIRECTS: usize = 10;

/// Resume attempts after an interrupted transfer, beyond the first try.
const TRANSFER_RETRIES: u32 = 2;

/// Progress callback: `(bytes_downloaded, total_bytes, percent)`.
///
/// `total_bytes` is 0 when the server did not announce a length. Callbacks
/// arrive at most every ~100ms, monotonically, and the final call always
/// reports 100%. Callers must not block inside the callback.
pub type ProgressCallback = Box<dyn Fn(u64, u64, f64) + Send + Sync>;

/// Per-transfer options.
pub struct DownloadOptions {
    /// Progress callback, throttled by the downloader.
    pub progress: Option<ProgressCallback>,
    /// Cancellation token checked at each chunk boundary.
    pub cancel: CancellationToken,
    /// Byte offset to resume from; 0 starts fresh. Resume is only ever
    /// requested by the orchestrator's retry logic, never assumed here.
    pub resume_from: u64,
    /// Keep the partial file on (non-cancel, non-timeout) failure so a later
    /// attempt can resume it.
    pub keep_partial_on_error: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            progress: None,
            cancel: CancellationToken::new(),
            resume_from: 0,
            keep_partial_on_error: false,
        }
    }
}

impl DownloadOptions {
    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resume from a prior partial file of this many bytes.
    pub fn resume_from(mut self, offset: u64) -> Self {
        self.resume_from = offset;
        self
    }

    /// Keep the partial file when a transfer ultimately fails.
    pub fn keep_partial_on_error(mut self, keep: bool) -> Self {
        self.keep_partial_on_error = keep;
        self
    }
}

/// HTTP downloader with resume support.
#[derive(Debug)]
pub struct HttpDownloader {
    client: Client,
    timeout: Duration,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDownloader {
    /// Create a downloader with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a downloader with a custom timeout (connect and stalled
    /// transfer both).
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_settings(timeout, true)
    }

    /// Create a downloader with a custom timeout and redirect behavior.
    ///
    /// Redirect following is on by default and bounded to avoid loops;
    /// turning it off makes any 3xx answer a hard failure.
    pub fn with_settings(timeout: Duration, follow_redirects: bool) -> Self {
        let redirect = if follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, timeout }
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe that a source URL is reachable without transferring the body.
    ///
    /// Follows redirects up to the bounded depth; any non-2xx answer is a
    /// hard [`AcquireError::SourceUnreachable`] carrying the HTTP status.
    /// Returns the announced content length (0 if unknown).
    pub fn check_reachable(&self, url: &str) -> AcquireResult<u64> {
        let response = self.client.head(url).send().map_err(|e| {
            if e.is_timeout() {
                AcquireError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                AcquireError::SourceUnreachable {
                    url: url.to_string(),
                    status: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(AcquireError::SourceUnreachable {
                url: url.to_string(),
                status: response.status().to_string(),
            });
        }

        Ok(content_length(response.headers()))
    }

    /// Download `url` to `dest`, honoring the options.
    ///
    /// Interrupted transfers are retried with resume a bounded number of
    /// times; every other failure propagates after cleanup. Returns the
    /// total size of the file on disk.
    pub fn download(&self, url: &str, dest: &Path, opts: &DownloadOptions) -> AcquireResult<u64> {
        let mut resume_from = opts.resume_from;
        let mut attempt = 0u32;

        loop {
            match self.transfer(url, dest, resume_from, opts) {
                Ok(size) => return Ok(size),
                Err(AcquireError::Cancelled) => {
                    // transfer() already removed the partial file.
                    return Err(AcquireError::Cancelled);
                }
                Err(err @ AcquireError::Timeout { .. }) => {
                    // Timeouts always clean up; they are not resume-retried
                    // here because the stall is likely to repeat immediately.
                    fs::remove_file(dest).ok();
                    return Err(err);
                }
                Err(err @ AcquireError::TransferFailed { .. }) if attempt < TRANSFER_RETRIES => {
                    attempt += 1;
                    resume_from = dest.metadata().map(|m| m.len()).unwrap_or(0);
                    warn!(
                        url,
                        attempt,
                        resume_from,
                        error = %err,
                        "transfer interrupted, resuming"
                    );
                }
                Err(err) => {
                    if !opts.keep_partial_on_error {
                        fs::remove_file(dest).ok();
                    }
                    return Err(err);
                }
            }
        }
    }

    /// One transfer attempt.
    fn transfer(
        &self,
        url: &str,
        dest: &Path,
        resume_from: u64,
        opts: &DownloadOptions,
    ) -> AcquireResult<u64> {
        if opts.cancel.is_cancelled() {
            fs::remove_file(dest).ok();
            return Err(AcquireError::Cancelled);
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| AcquireError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut request = self.client.get(url);
        if resume_from > 0 {
            request = request.header("Range", format!("bytes={}-", resume_from));
        }

        let mut response = request.send().map_err(|e| {
            if e.is_timeout() {
                AcquireError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else if resume_from > 0 {
                // Mid-download from the caller's perspective; eligible for a
                // resume retry.
                AcquireError::TransferFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            } else {
                AcquireError::SourceUnreachable {
                    url: url.to_string(),
                    status: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let (start_byte, file) = if resume_from > 0 && status == StatusCode::PARTIAL_CONTENT {
            // Server honors the range; append to the partial file.
            let file = OpenOptions::new().append(true).open(dest).map_err(|e| {
                AcquireError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                }
            })?;
            (resume_from, file)
        } else if status.is_success() {
            // Fresh transfer, or the server ignored the range: restart from
            // zero rather than producing a corrupt file.
            if resume_from > 0 {
                debug!(url, %status, "server ignored range request, restarting from zero");
            }
            let file = File::create(dest).map_err(|e| AcquireError::WriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;
            (0, file)
        } else {
            return Err(AcquireError::SourceUnreachable {
                url: url.to_string(),
                status: status.to_string(),
            });
        };

        let total = start_byte + content_length(response.headers());

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = start_byte;
        let mut last_emit: Option<Instant> = None;

        loop {
            if opts.cancel.is_cancelled() {
                drop(writer);
                fs::remove_file(dest).ok();
                return Err(AcquireError::Cancelled);
            }

            let bytes_read = match response.read(&mut buffer) {
                Ok(n) => n,
                Err(e) => {
                    // Persist what already arrived so a resume retry can
                    // pick up from it.
                    writer.flush().ok();
                    return Err(AcquireError::TransferFailed {
                        url: url.to_string(),
                        reason: format!("read error: {}", e),
                    });
                }
            };

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| AcquireError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;

            if let Some(ref cb) = opts.progress {
                let due = last_emit
                    .map(|t| t.elapsed() >= PROGRESS_INTERVAL)
                    .unwrap_or(true);
                if due {
                    cb(downloaded, total, percent(downloaded, total));
                    last_emit = Some(Instant::now());
                }
            }
        }

        writer.flush().map_err(|e| AcquireError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        // A known length that we fell short of means the connection closed
        // early; surface it as an interrupted transfer so resume kicks in.
        if total > start_byte && downloaded < total {
            return Err(AcquireError::TransferFailed {
                url: url.to_string(),
                reason: format!("connection closed at {} of {} bytes", downloaded, total),
            });
        }

        if let Some(ref cb) = opts.progress {
            cb(downloaded, downloaded.max(total), 100.0);
        }

        Ok(downloaded)
    }
}

fn percent(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (downloaded as f64 / total as f64) * 100.0
    }
}

fn content_length(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downloader_default_timeout() {
        let downloader = HttpDownloader::default();
        assert_eq!(downloader.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_downloader_with_timeout() {
        let downloader = HttpDownloader::with_timeout(Duration::from_secs(60));
        assert_eq!(downloader.timeout().as_secs(), 60);
    }

    #[test]
    fn test_options_builder() {
        let token = CancellationToken::new();
        let opts = DownloadOptions::default()
            .resume_from(1024)
            .keep_partial_on_error(true)
            .with_cancellation(token.clone());

        assert_eq!(opts.resume_from, 1024);
        assert!(opts.keep_partial_on_error);
        assert!(!opts.cancel.is_cancelled());
        token.cancel();
        assert!(opts.cancel.is_cancelled());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(50, 200), 25.0);
        assert_eq!(percent(200, 200), 100.0);
    }

    #[test]
    fn test_pre_cancelled_transfer_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("out.bin");

        let token = CancellationToken::new();
        token.cancel();
        let opts = DownloadOptions::default().with_cancellation(token);

        let downloader = HttpDownloader::new();
        // No request is issued: the token is checked first.
        let result = downloader.download("http://127.0.0.1:1/never", &dest, &opts);
        assert!(matches!(result, Err(AcquireError::Cancelled)));
        assert!(!dest.exists());
    }
}
