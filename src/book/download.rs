// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::library::Audiobook;
use crate::metadata::{sidecar_path, write_book_sidecar};
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::filename::{download_filename, parse_content_disposition};

/// What happened to a download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was fetched and moved into place
    Downloaded {
        path: PathBuf,
        bytes: u64,
        content_hash: String,
    },
    /// A file of the advertised size already exists
    AlreadyPresent { path: PathBuf },
    /// Dry run: the file would have been fetched to `path`
    DryRun { path: PathBuf },
    /// The server did not name the file, so there is nowhere to put it
    NoDisposition,
}

impl DownloadOutcome {
    /// Path of the file on disk that can be handed to the transcoder
    pub fn local_file(&self) -> Option<&Path> {
        match self {
            Self::Downloaded { path, .. } | Self::AlreadyPresent { path } => Some(path),
            Self::DryRun { .. } | Self::NoDisposition => None,
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    PathBuf::from(partial)
}

/// Download a title from `url` into `target_dir`
///
/// The filename is derived from the response's Content-Disposition. The body
/// is streamed to a `.partial` file, hashed on the way, and renamed once
/// complete. A sidecar JSON is written for every outcome except
/// [`DownloadOutcome::NoDisposition`].
pub async fn download_book<C: HttpClient>(
    client: &C,
    url: &str,
    target_dir: &Path,
    book: &Audiobook,
    codec: &str,
    dry_run: bool,
    reporter: &SharedProgressReporter,
) -> Result<DownloadOutcome, DownloadError> {
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let Some(attachment) = response
        .content_disposition
        .as_deref()
        .and_then(parse_content_disposition)
    else {
        tracing::warn!(url, "no content-disposition");
        return Ok(DownloadOutcome::NoDisposition);
    };

    let output_path = target_dir.join(download_filename(book, codec, &attachment));
    let metadata_path = sidecar_path(&output_path);

    if let (Ok(existing), Some(expected)) =
        (std::fs::metadata(&output_path), response.content_length)
        && existing.len() == expected
    {
        write_book_sidecar(&metadata_path, book, codec, None)?;
        reporter.report(ProgressEvent::DownloadSkipped {
            path: output_path.clone(),
        });
        return Ok(DownloadOutcome::AlreadyPresent { path: output_path });
    }

    if dry_run {
        write_book_sidecar(&metadata_path, book, codec, None)?;
        return Ok(DownloadOutcome::DryRun { path: output_path });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        title: book.title.clone(),
        path: output_path.clone(),
        content_length: response.content_length,
    });

    let temp_path = partial_path(&output_path);
    let mut file = File::create(&temp_path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: temp_path.clone(),
            source: e,
        })?;

    let mut hasher = Sha256::new();
    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: temp_path.clone(),
                source: e,
            })?;
        hasher.update(&chunk);

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: temp_path.clone(),
            source: e,
        })?;
    drop(file);

    tokio::fs::rename(&temp_path, &output_path)
        .await
        .map_err(|e| DownloadError::RenameFailed {
            from: temp_path.clone(),
            to: output_path.clone(),
            source: e,
        })?;

    let content_hash = format!("sha256:{:x}", hasher.finalize());
    write_book_sidecar(&metadata_path, book, codec, Some(content_hash.clone()))?;

    reporter.report(ProgressEvent::DownloadCompleted {
        path: output_path.clone(),
        bytes_downloaded,
        hash: content_hash.clone(),
    });

    Ok(DownloadOutcome::Downloaded {
        path: output_path,
        bytes: bytes_downloaded,
        content_hash,
    })
}
