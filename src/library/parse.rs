// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Deserialize;

use crate::error::LibraryError;

/// An encoding profile offered for a title
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AvailableCodec {
    pub enhanced_codec: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A title from the library listing.
///
/// `raw` keeps the complete vendor record so it can be written to the
/// sidecar untouched.
#[derive(Debug, Clone)]
pub struct Audiobook {
    pub asin: String,
    pub title: String,
    pub purchase_date: Option<String>,
    pub merchandising_summary: Option<String>,
    pub available_codecs: Vec<AvailableCodec>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct LibraryItem {
    asin: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    purchase_date: Option<String>,
    #[serde(default)]
    merchandising_summary: Option<String>,
    #[serde(default)]
    available_codecs: Option<Vec<AvailableCodec>>,
}

#[derive(Debug, Deserialize)]
struct LibraryPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

impl Audiobook {
    /// Purchase date without the time part, e.g. `2024-01-15`
    pub fn purchased(&self) -> String {
        self.purchase_date
            .as_deref()
            .and_then(|date| date.split('T').next())
            .filter(|date| !date.is_empty())
            .unwrap_or("1970-01-01")
            .to_string()
    }

    fn from_value(raw: serde_json::Value) -> Option<Self> {
        let item: LibraryItem = match serde_json::from_value(raw.clone()) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed library item");
                return None;
            }
        };

        let asin = item.asin?;

        Some(Self {
            title: item.title.unwrap_or_else(|| asin.clone()),
            asin,
            purchase_date: item.purchase_date,
            merchandising_summary: item.merchandising_summary,
            available_codecs: item.available_codecs.unwrap_or_default(),
            raw,
        })
    }
}

/// Parse one page of the library listing
///
/// Items without an ASIN cannot be downloaded and are dropped.
pub fn parse_library_page(bytes: &[u8]) -> Result<Vec<Audiobook>, LibraryError> {
    let page: LibraryPage = serde_json::from_slice(bytes)?;
    Ok(page
        .items
        .into_iter()
        .filter_map(Audiobook::from_value)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"{
        "items": [
            {
                "asin": "B0036I54I6",
                "title": "The Hitchhiker's Guide to the Galaxy",
                "purchase_date": "2019-03-02T17:44:09.411Z",
                "merchandising_summary": "<p>Don't panic.</p>",
                "available_codecs": [
                    {"enhanced_codec": "LC_64_22050_stereo", "format": "Enhanced", "name": "aax_22_64"},
                    {"enhanced_codec": "LC_128_44100_stereo", "format": "Enhanced", "name": "aax_44_128"}
                ],
                "runtime_length_min": 349
            },
            {
                "asin": "B002V5D7RU",
                "title": "Podcast Without Codecs",
                "purchase_date": "2020-11-20T08:00:00Z",
                "available_codecs": null
            },
            {
                "title": "No ASIN"
            }
        ],
        "response_groups": ["product_attrs"]
    }"#;

    #[test]
    fn parses_items_and_keeps_raw_record() {
        let books = parse_library_page(SAMPLE_PAGE.as_bytes()).unwrap();

        assert_eq!(books.len(), 2);
        let first = &books[0];
        assert_eq!(first.asin, "B0036I54I6");
        assert_eq!(first.available_codecs.len(), 2);
        assert_eq!(first.raw["runtime_length_min"], 349);
        assert_eq!(
            first.merchandising_summary.as_deref(),
            Some("<p>Don't panic.</p>")
        );
    }

    #[test]
    fn null_codecs_become_empty() {
        let books = parse_library_page(SAMPLE_PAGE.as_bytes()).unwrap();
        assert!(books[1].available_codecs.is_empty());
    }

    #[test]
    fn purchased_strips_time() {
        let books = parse_library_page(SAMPLE_PAGE.as_bytes()).unwrap();
        assert_eq!(books[0].purchased(), "2019-03-02");
        assert_eq!(books[1].purchased(), "2020-11-20");
    }

    #[test]
    fn purchased_defaults_to_epoch() {
        let books = parse_library_page(br#"{"items": [{"asin": "B1", "title": "T"}]}"#).unwrap();
        assert_eq!(books[0].purchased(), "1970-01-01");
    }

    #[test]
    fn empty_page_parses() {
        let books = parse_library_page(br#"{"items": []}"#).unwrap();
        assert!(books.is_empty());
    }

    #[test]
    fn malformed_json_fails() {
        assert!(parse_library_page(b"not json").is_err());
    }
}
