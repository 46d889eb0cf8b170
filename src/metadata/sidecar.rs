// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;
use crate::library::Audiobook;

/// JSON written next to each download: the vendor record plus what we chose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSidecar {
    pub asin: String,
    pub title: String,
    pub purchased: String,
    pub codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_at: Option<String>,
    /// Remaining fields of the library record, untouched
    #[serde(flatten)]
    pub record: serde_json::Map<String, serde_json::Value>,
}

impl BookSidecar {
    /// Create a sidecar from a library record
    pub fn from_book(book: &Audiobook, codec: &str, content_hash: Option<String>) -> Self {
        let mut record = match &book.raw {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        for key in ["asin", "title", "purchased", "codec", "content_hash", "written_at"] {
            record.remove(key);
        }

        Self {
            asin: book.asin.clone(),
            title: book.title.clone(),
            purchased: book.purchased(),
            codec: codec.to_string(),
            content_hash,
            written_at: Some(Utc::now().to_rfc3339()),
            record,
        }
    }
}

/// Sidecar location for a download: same stem, `.json` extension
pub fn sidecar_path(download_path: &Path) -> PathBuf {
    download_path.with_extension("json")
}

/// Write the sidecar for a book to `path`
pub fn write_book_sidecar(
    path: &Path,
    book: &Audiobook,
    codec: &str,
    content_hash: Option<String>,
) -> Result<(), MetadataError> {
    let sidecar = BookSidecar::from_book(book, codec, content_hash);
    let json = serde_json::to_string_pretty(&sidecar)?;
    std::fs::write(path, json).map_err(|e| MetadataError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read a sidecar back
pub fn read_book_sidecar(path: &Path) -> Result<BookSidecar, MetadataError> {
    let content = std::fs::read_to_string(path).map_err(|e| MetadataError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| MetadataError::JsonParseFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::parse_library_page;
    use tempfile::tempdir;

    fn make_book() -> Audiobook {
        parse_library_page(
            br#"{"items": [{
                "asin": "B0036I54I6",
                "title": "Mostly Harmless",
                "purchase_date": "2021-06-01T10:00:00Z",
                "runtime_length_min": 349,
                "authors": [{"name": "Douglas Adams"}]
            }]}"#,
        )
        .unwrap()
        .remove(0)
    }

    #[test]
    fn sidecar_path_swaps_extension() {
        let path = Path::new("/books/2021-06-01-Mostly_Harmless.B0036I54I6.LC_64_22050_stereo.aax");
        assert_eq!(
            sidecar_path(path),
            PathBuf::from("/books/2021-06-01-Mostly_Harmless.B0036I54I6.LC_64_22050_stereo.json")
        );
    }

    #[test]
    fn from_book_merges_choices_into_record() {
        let sidecar = BookSidecar::from_book(&make_book(), "LC_64_22050_stereo", None);

        assert_eq!(sidecar.purchased, "2021-06-01");
        assert_eq!(sidecar.codec, "LC_64_22050_stereo");
        assert_eq!(sidecar.record["runtime_length_min"], 349);
        assert!(!sidecar.record.contains_key("asin"));
    }

    #[test]
    fn write_and_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.json");

        write_book_sidecar(
            &path,
            &make_book(),
            "LC_128_44100_stereo",
            Some("sha256:abc123".to_string()),
        )
        .unwrap();
        let read_back = read_book_sidecar(&path).unwrap();

        assert_eq!(read_back.asin, "B0036I54I6");
        assert_eq!(read_back.title, "Mostly Harmless");
        assert_eq!(read_back.codec, "LC_128_44100_stereo");
        assert_eq!(read_back.content_hash.as_deref(), Some("sha256:abc123"));
        assert_eq!(read_back.record["authors"][0]["name"], "Douglas Adams");
    }

    #[test]
    fn written_json_is_flat() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.json");
        write_book_sidecar(&path, &make_book(), "LC_64_22050_stereo", None).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["asin"], "B0036I54I6");
        assert_eq!(raw["purchase_date"], "2021-06-01T10:00:00Z");
        assert!(raw.get("content_hash").is_none());
    }

    #[test]
    fn read_nonexistent_returns_error() {
        let dir = tempdir().unwrap();
        assert!(read_book_sidecar(&dir.path().join("missing.json")).is_err());
    }
}
