//! Upload progress reporting
//!
//! Progress is observational only: the reader forwards every byte unchanged
//! and the sink never influences control flow.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Receives per-file progress events during a grouped send.
pub trait ProgressSink: Send {
    fn file_started(&mut self, _path: &Path, _total: u64) {}

    fn progress(&mut self, path: &Path, sent: u64, total: u64);

    fn file_finished(&mut self, _path: &Path) {}
}

/// Whole percent of `sent` out of `total`; an empty total counts as done.
pub fn percent(sent: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    (sent.min(total) * 100) / total
}

/// Prints progress to stdout, one line per new whole percent.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last_percent: Option<u64>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for ConsoleProgress {
    fn file_started(&mut self, path: &Path, total: u64) {
        self.last_percent = None;
        tracing::debug!(file = %path.display(), bytes = total, "upload started");
        println!("Uploading {}", path.display());
    }

    fn progress(&mut self, _path: &Path, sent: u64, total: u64) {
        let pct = percent(sent, total);
        if self.last_percent != Some(pct) {
            self.last_percent = Some(pct);
            println!("Uploaded: {}%", pct);
        }
    }

    fn file_finished(&mut self, path: &Path) {
        println!("Uploaded {}", path.display());
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _path: &Path, _sent: u64, _total: u64) {}
}

/// Reader that reports the running byte count to a [`ProgressSink`].
pub struct ProgressReader<'a, R> {
    inner: R,
    path: &'a Path,
    sent: u64,
    total: u64,
    sink: &'a mut dyn ProgressSink,
}

impl<'a, R> ProgressReader<'a, R> {
    pub fn new(inner: R, path: &'a Path, total: u64, sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            inner,
            path,
            sent: 0,
            total,
            sink,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.sent
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<'_, R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = &poll {
            let read = (buf.filled().len() - before) as u64;
            if read > 0 {
                this.sent += read;
                this.sink.progress(this.path, this.sent, this.total);
            }
        }

        poll
    }
}
