// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use crate::auth::{Credentials, authenticate};
use crate::book::{DownloadOutcome, download_book};
use crate::error::{BookError, SyncError};
use crate::http::HttpClient;
use crate::library::{Audiobook, DEFAULT_PAGE_SIZE, download_link, fetch_library, select_codec};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::state::prepare_target_dir;
use crate::transcode::{ConvertOutcome, Transcoder, convert_book};

/// Options for a library sync
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Credential file written by the vendor SDK
    pub auth_file: PathBuf,
    /// Directory downloads and derived files are written to
    pub target_dir: PathBuf,
    /// Decryption key; falls back to the credential file when unset
    pub activation_bytes: Option<String>,
    /// Resolve links and write sidecars, but download and convert nothing
    pub dry_run: bool,
    pub page_size: usize,
    /// Maximum number of titles to process (None = all)
    pub limit: Option<usize>,
}

impl SyncOptions {
    pub fn new(auth_file: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            auth_file: auth_file.into(),
            target_dir: target_dir.into(),
            activation_bytes: None,
            dry_run: false,
            page_size: DEFAULT_PAGE_SIZE,
            limit: None,
        }
    }
}

/// Result of a sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Titles fetched from the CDN
    pub downloaded: usize,
    /// Titles already present, dry-run or without a server supplied filename
    pub skipped: usize,
    /// Titles converted into `.m4a`
    pub converted: usize,
    pub failed: usize,
    /// Details of failed titles (title, error message)
    pub failed_books: Vec<(String, String)>,
}

/// What the sync loop did with one title
#[derive(Debug)]
struct BookReport {
    download: DownloadOutcome,
    converted: bool,
}

async fn process_book<C: HttpClient, T: Transcoder + ?Sized>(
    client: &C,
    transcoder: &T,
    credentials: &Credentials,
    book: &Audiobook,
    options: &SyncOptions,
    activation_bytes: Option<&str>,
    reporter: &SharedProgressReporter,
) -> Result<BookReport, BookError> {
    let codec = select_codec(book)?;

    let url = download_link(client, credentials, &book.asin, codec).await?;
    reporter.report(ProgressEvent::DownloadLinkResolved {
        asin: book.asin.clone(),
        url: url.clone(),
    });

    let download = download_book(
        client,
        &url,
        &options.target_dir,
        book,
        codec,
        options.dry_run,
        reporter,
    )
    .await?;

    let mut converted = false;
    if let (Some(path), Some(key)) = (download.local_file(), activation_bytes) {
        converted = matches!(
            convert_book(transcoder, path, key, reporter).await?,
            ConvertOutcome::Converted { .. }
        );
    }

    Ok(BookReport {
        download,
        converted,
    })
}

/// Synchronize the owned library into `options.target_dir`
///
/// Titles are processed one after another: pick a codec, resolve the
/// download link, download, then strip the DRM wrapper. A failing title is
/// reported and counted, and the sync moves on.
pub async fn sync_library<C: HttpClient, T: Transcoder + ?Sized>(
    client: &C,
    transcoder: &T,
    options: &SyncOptions,
    reporter: SharedProgressReporter,
) -> Result<SyncResult, SyncError> {
    let (credentials, refreshed) = authenticate(client, &options.auth_file).await?;
    reporter.report(ProgressEvent::Authenticated { refreshed });

    let activation_bytes = options
        .activation_bytes
        .clone()
        .or_else(|| credentials.activation_bytes.clone());
    if activation_bytes.is_none() && !options.dry_run {
        return Err(SyncError::MissingActivationBytes);
    }

    let partial_files_cleaned = prepare_target_dir(&options.target_dir)?;
    if partial_files_cleaned > 0 {
        reporter.report(ProgressEvent::PartialFilesCleanedUp {
            count: partial_files_cleaned,
        });
    }

    let mut books = fetch_library(client, &credentials, options.page_size, &reporter).await?;
    if let Some(limit) = options.limit {
        books.truncate(limit);
    }

    let total_books = books.len();
    let mut result = SyncResult::default();

    for (book_index, book) in books.iter().enumerate() {
        reporter.report(ProgressEvent::BookStarting {
            asin: book.asin.clone(),
            title: book.title.clone(),
            purchased: book.purchased(),
            summary: book.merchandising_summary.clone(),
            book_index,
            total_books,
        });

        let outcome = process_book(
            client,
            transcoder,
            &credentials,
            book,
            options,
            activation_bytes.as_deref(),
            &reporter,
        )
        .await;

        match outcome {
            Ok(report) => {
                match &report.download {
                    DownloadOutcome::Downloaded { .. } => result.downloaded += 1,
                    DownloadOutcome::AlreadyPresent { .. } => result.skipped += 1,
                    DownloadOutcome::DryRun { path } => {
                        result.skipped += 1;
                        reporter.report(ProgressEvent::BookSkipped {
                            asin: book.asin.clone(),
                            reason: format!("dry run, would write {}", path.display()),
                        });
                    }
                    DownloadOutcome::NoDisposition => {
                        result.skipped += 1;
                        reporter.report(ProgressEvent::BookSkipped {
                            asin: book.asin.clone(),
                            reason: "no filename in response".to_string(),
                        });
                    }
                }
                if report.converted {
                    result.converted += 1;
                }
            }
            Err(e) => {
                tracing::debug!(asin = %book.asin, error = ?e, "book failed");
                reporter.report(ProgressEvent::BookFailed {
                    title: book.title.clone(),
                    error: e.to_string(),
                });
                result.failed += 1;
                result.failed_books.push((book.title.clone(), e.to_string()));
            }
        }
    }

    reporter.report(ProgressEvent::SyncCompleted {
        downloaded_count: result.downloaded,
        skipped_count: result.skipped,
        converted_count: result.converted,
        failed_count: result.failed,
    });

    Ok(result)
}
