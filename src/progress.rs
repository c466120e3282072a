// Upload progress: a reader wrapper that counts the bytes handed to the
// HTTP body, and a console reporter that renders the percentage as a
// transient line.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};

/// Snapshot of how much of a file has been streamed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub bytes_read: u64,
    pub total_length: u64,
}

impl ProgressState {
    /// Percentage streamed, clamped to 100. Reads can land past the
    /// expected length (for example when the file grows while uploading),
    /// so the value never goes beyond the end. An empty file is complete.
    pub fn percentage(&self) -> f64 {
        if self.total_length == 0 {
            return 100.0;
        }
        let read = self.bytes_read.min(self.total_length);
        100.0 * read as f64 / self.total_length as f64
    }
}

/// Wraps a reader and calls `on_progress` after every non-empty read.
pub struct ProgressReader<R, F> {
    inner: R,
    bytes_read: u64,
    total_length: u64,
    on_progress: F,
}

impl<R, F> ProgressReader<R, F>
where
    R: Read,
    F: FnMut(ProgressState),
{
    pub fn new(inner: R, total_length: u64, on_progress: F) -> Self {
        ProgressReader {
            inner,
            bytes_read: 0,
            total_length,
            on_progress,
        }
    }

    pub fn state(&self) -> ProgressState {
        ProgressState {
            bytes_read: self.bytes_read,
            total_length: self.total_length,
        }
    }
}

impl<R, F> Read for ProgressReader<R, F>
where
    R: Read,
    F: FnMut(ProgressState),
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.bytes_read += n as u64;
            if self.bytes_read > self.total_length {
                tracing::trace!(
                    bytes_read = self.bytes_read,
                    total_length = self.total_length,
                    "read past the expected length"
                );
            }
            let state = self.state();
            (self.on_progress)(state);
        }
        Ok(n)
    }
}

/// Overwritable "Uploading... NN.NN%" line on the terminal. Cloning shares
/// the same line, so one clone can be moved into the upload callback while
/// the caller keeps another to clear it.
#[derive(Clone)]
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("Uploading... {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        ConsoleProgress { bar }
    }

    pub fn update(&self, state: ProgressState) {
        self.bar.set_message(format!("{:.2}%", state.percentage()));
    }

    /// Remove the line from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}
