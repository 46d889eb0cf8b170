// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::book::derived_path;
use crate::error::TranscodeError;
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::ffmpeg::Transcoder;

/// Result of converting one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    Converted { output: PathBuf },
    /// The `.m4a` is newer than the download
    UpToDate { output: PathBuf },
}

fn modified(path: &Path) -> Result<SystemTime, TranscodeError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| TranscodeError::StatFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Turn a download into `{stem}.m4a` plus a `{stem}.png` cover
pub async fn convert_book<T: Transcoder + ?Sized>(
    transcoder: &T,
    download_path: &Path,
    activation_bytes: &str,
    reporter: &SharedProgressReporter,
) -> Result<ConvertOutcome, TranscodeError> {
    let m4a_path = derived_path(download_path, "m4a");

    if m4a_path.exists() && modified(&m4a_path)? > modified(download_path)? {
        reporter.report(ProgressEvent::TranscodeSkipped {
            source: download_path.to_path_buf(),
        });
        return Ok(ConvertOutcome::UpToDate { output: m4a_path });
    }

    reporter.report(ProgressEvent::TranscodeStarting {
        source: download_path.to_path_buf(),
    });

    // The suffix stays `.m4a` so ffmpeg still picks the container
    let temp_path = derived_path(download_path, "partial.m4a");
    if let Err(e) = transcoder
        .strip_drm(download_path, &temp_path, activation_bytes)
        .await
    {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&temp_path, &m4a_path)
        .await
        .map_err(|e| TranscodeError::RenameFailed {
            from: temp_path.clone(),
            to: m4a_path.clone(),
            source: e,
        })?;

    // Some titles ship without artwork
    let cover_path = derived_path(download_path, "png");
    if let Err(e) = transcoder
        .extract_cover(download_path, &cover_path, activation_bytes)
        .await
    {
        tracing::warn!(path = %download_path.display(), error = %e, "cover extraction failed");
    }

    reporter.report(ProgressEvent::TranscodeCompleted {
        output: m4a_path.clone(),
    });

    Ok(ConvertOutcome::Converted { output: m4a_path })
}
