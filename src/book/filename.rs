// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::library::Audiobook;

/// Extract the attachment filename from a Content-Disposition header
///
/// Returns `None` when the header carries no `filename=` parameter.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let raw = rest.split(';').next().unwrap_or("").trim();
    let unquoted = raw.trim_matches('"').trim_matches('\'');

    let sanitized = sanitize_filename::sanitize(unquoted);
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Split an attachment name into stem and extension (with leading dot)
fn split_extension(attachment: &str) -> (&str, &str) {
    match attachment.rfind('.') {
        Some(pos) if pos > 0 => (&attachment[..pos], &attachment[pos..]),
        _ => (attachment, ""),
    }
}

/// Local filename for a download
///
/// Format: `{purchased}-{title}.{asin}.{codec}{ext}` where title and
/// extension come from the server supplied attachment name.
pub fn download_filename(book: &Audiobook, codec: &str, attachment: &str) -> String {
    let (title, ext) = split_extension(attachment);
    format!(
        "{}-{}.{}.{}{}",
        book.purchased(),
        title,
        book.asin,
        codec,
        ext
    )
}

/// Path with the final extension removed, shared by all derived files
pub fn clean_stem(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Path of a file derived from a download, e.g. the `.m4a` or `.png`
pub fn derived_path(download_path: &Path, extension: &str) -> PathBuf {
    let mut stem = clean_stem(download_path).into_os_string();
    stem.push(".");
    stem.push(extension);
    PathBuf::from(stem)
}
