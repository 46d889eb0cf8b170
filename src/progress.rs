// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;

/// Events emitted while syncing the library or building a feed
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Credentials were loaded (and refreshed if they had expired)
    Authenticated { refreshed: bool },

    /// A page of the library listing is being requested
    FetchingLibrary { page: usize },

    /// The whole library listing has been received
    LibraryFetched { total_books: usize },

    /// Work on a title begins
    BookStarting {
        asin: String,
        title: String,
        purchased: String,
        summary: Option<String>,
        book_index: usize,
        total_books: usize,
    },

    /// A download URL was issued for the title
    DownloadLinkResolved { asin: String, url: String },

    /// The title was skipped for a reason that is not an error
    BookSkipped { asin: String, reason: String },

    /// A download is starting
    DownloadStarting {
        title: String,
        path: PathBuf,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A download completed successfully
    DownloadCompleted {
        path: PathBuf,
        bytes_downloaded: u64,
        hash: String,
    },

    /// The file is already present with a matching size
    DownloadSkipped { path: PathBuf },

    /// Transcoding into the DRM-free container has started
    TranscodeStarting { source: PathBuf },

    /// The transcoded file is newer than the download
    TranscodeSkipped { source: PathBuf },

    /// Transcoding finished
    TranscodeCompleted { output: PathBuf },

    /// A title failed; the sync moves on to the next one
    BookFailed { title: String, error: String },

    /// Stale partial downloads were removed from the target directory
    PartialFilesCleanedUp { count: usize },

    /// A local media file was added to the feed
    FeedItemAdded { path: PathBuf },

    /// A local media file could not be probed and was left out of the feed
    FeedItemSkipped { path: PathBuf, error: String },

    /// The feed file was written
    FeedCompleted {
        outfile: PathBuf,
        items: usize,
        skipped: usize,
    },

    /// Sync operation completed
    SyncCompleted {
        downloaded_count: usize,
        skipped_count: usize,
        converted_count: usize,
        failed_count: usize,
    },
}

/// Trait for reporting progress events.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

/// A reporter that forwards every event to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::BookFailed { title, error } => {
                tracing::warn!(%title, %error, "book failed");
            }
            ProgressEvent::BookSkipped { asin, reason } => {
                tracing::info!(%asin, %reason, "book skipped");
            }
            ProgressEvent::DownloadProgress { .. } => {}
            _ => tracing::debug!(?event),
        }
    }
}

impl TracingReporter {
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_handles_all_events() {
        let reporter = NoopReporter;

        reporter.report(ProgressEvent::Authenticated { refreshed: true });
        reporter.report(ProgressEvent::FetchingLibrary { page: 1 });
        reporter.report(ProgressEvent::LibraryFetched { total_books: 3 });

        reporter.report(ProgressEvent::BookStarting {
            asin: "B000000001".to_string(),
            title: "A Book".to_string(),
            purchased: "2024-01-15".to_string(),
            summary: None,
            book_index: 0,
            total_books: 3,
        });

        reporter.report(ProgressEvent::DownloadStarting {
            title: "A Book".to_string(),
            path: PathBuf::from("/tmp/a.aax"),
            content_length: Some(1024),
        });

        reporter.report(ProgressEvent::DownloadProgress {
            bytes_downloaded: 512,
            total_bytes: Some(1024),
        });

        reporter.report(ProgressEvent::DownloadCompleted {
            path: PathBuf::from("/tmp/a.aax"),
            bytes_downloaded: 1024,
            hash: "sha256:abc123".to_string(),
        });

        reporter.report(ProgressEvent::BookFailed {
            title: "Another Book".to_string(),
            error: "Connection timeout".to_string(),
        });

        reporter.report(ProgressEvent::PartialFilesCleanedUp { count: 2 });

        reporter.report(ProgressEvent::SyncCompleted {
            downloaded_count: 1,
            skipped_count: 1,
            converted_count: 1,
            failed_count: 1,
        });
        reporter.report(ProgressEvent::FeedCompleted {
            outfile: PathBuf::from("rss"),
            items: 2,
            skipped: 0,
        });
    }

    #[test]
    fn tracing_reporter_accepts_events_without_subscriber() {
        let reporter = TracingReporter::shared();
        reporter.report(ProgressEvent::FetchingLibrary { page: 2 });
        reporter.report(ProgressEvent::BookSkipped {
            asin: "B000000001".to_string(),
            reason: "no download link".to_string(),
        });
    }
}
