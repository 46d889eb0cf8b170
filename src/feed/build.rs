// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use rss::extension::itunes::{
    ITunesCategoryBuilder, ITunesChannelExtensionBuilder, ITunesItemExtensionBuilder,
};
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, ImageBuilder, Item, ItemBuilder};
use url::Url;

use crate::error::FeedError;
use crate::fields;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::transcode::{MediaProbe, Transcoder};

use super::channel::{GuidSource, PodcastChannel};
use super::item::PodcastItem;
use super::tags::PodcastTags;

/// File extensions the feed builder picks up
pub const SUPPORTED_EXTENSIONS: &[&str] = &["aax", "aaxc", "m4a", "m4b", "mp3", "mp4", "mov"];

pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// One `*.<ext>` pattern per supported extension, for `--all`
pub fn all_patterns() -> Vec<String> {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!("*.{}", ext))
        .collect()
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a" | "m4b") => "audio/mp4",
        Some("aax") => "audio/vnd.audible.aax",
        Some("aaxc") => "audio/vnd.audible.aaxc",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Expand glob patterns into the supported media files they match
///
/// A pattern without wildcards names a single file, which must exist and
/// have a supported extension. Files matched twice are listed once.
pub fn resolve_input_files(patterns: &[String]) -> Result<Vec<PathBuf>, FeedError> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            let path = Path::new(pattern);
            if !path.is_file() || !is_supported_file(path) {
                return Err(FeedError::UnsupportedInput(pattern.clone()));
            }
            files.push(absolute(path));
            continue;
        }

        let matches = glob::glob(pattern).map_err(|source| FeedError::BadPattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in matches {
            match entry {
                Ok(path) if path.is_file() && is_supported_file(&path) => {
                    files.push(absolute(&path));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "unreadable glob match"),
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    files.retain(|path| seen.insert(path.clone()));
    Ok(files)
}

fn parse_http_url(value: &str, what: &str) -> Result<Url, FeedError> {
    let invalid = |reason: String| FeedError::InvalidUrl {
        url: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(format!("{} is not a URL: {}", what, e)))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid(format!("{} needs a host", what)));
    }
    Ok(url)
}

/// The base URL media files are served from; always ends in `/`
pub fn url_prefix(prefix: &str) -> Result<Url, FeedError> {
    let mut url = parse_http_url(prefix, "url prefix")?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// `prefix` with `file_name` appended as a single percent-encoded path segment
fn file_url(prefix: &Url, file_name: &str) -> Result<Url, FeedError> {
    let mut url = prefix.clone();
    url.path_segments_mut()
        .map_err(|()| FeedError::InvalidUrl {
            url: prefix.to_string(),
            reason: "url prefix cannot have path segments".to_string(),
        })?
        .pop_if_empty()
        .push(file_name);
    Ok(url)
}

/// The podcast homepage, defaulting to the URL prefix
pub fn website(website: Option<&str>, prefix: &Url) -> Result<Url, FeedError> {
    match website {
        Some(website) => parse_http_url(website, "website"),
        None => Ok(prefix.clone()),
    }
}

/// Absolute artwork URLs are kept, anything else is resolved against the prefix
pub fn image_url(image: &str, prefix: &Url) -> Result<Url, FeedError> {
    if let Ok(url) = parse_http_url(image, "image") {
        return Ok(url);
    }
    prefix.join(image).map_err(|e| FeedError::InvalidUrl {
        url: image.to_string(),
        reason: e.to_string(),
    })
}

/// Where the feed itself is served; defaults to the prefix plus the outfile's name
pub fn feed_url(feed_url: Option<&str>, prefix: &Url, outfile: &Path) -> Result<Url, FeedError> {
    if let Some(feed_url) = feed_url {
        return parse_http_url(feed_url, "feed url");
    }

    let name = outfile
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| FeedError::InvalidUrl {
            url: outfile.display().to_string(),
            reason: "outfile has no file name".to_string(),
        })?;
    file_url(prefix, &name)
}

/// `HH:MM:SS`, as `itunes:duration` expects
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Settings of the `rss` command
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub explicit: bool,
    pub image: String,
    /// iTunes top level category
    pub category: String,
    pub subcategory: String,
    pub url_prefix: String,
    pub outfile: PathBuf,
    pub feed_url: Option<String>,
    pub overwrite: bool,
    /// `<podcast:medium>` of the channel
    pub medium: String,
    /// File names or glob patterns
    pub files: Vec<String>,
}

impl FeedOptions {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        image: impl Into<String>,
        url_prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            website: None,
            explicit: false,
            image: image.into(),
            category: "Arts".to_string(),
            subcategory: "Books".to_string(),
            url_prefix: url_prefix.into(),
            outfile: PathBuf::from("rss"),
            feed_url: None,
            overwrite: false,
            medium: "podcast".to_string(),
            files: Vec::new(),
        }
    }
}

/// Outcome of a feed build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSummary {
    pub outfile: PathBuf,
    pub feed_url: String,
    pub items: usize,
    pub skipped: usize,
}

/// Turn one probed media file into a feed item
pub fn episode_item(path: &Path, probe: &MediaProbe, prefix: &Url) -> Result<Item, FeedError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let enclosure_url = file_url(prefix, &file_name)?;

    let title = probe.tag("title").map(str::to_string).unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone())
    });
    let pub_date = probe
        .tag("creation_time")
        .and_then(|created| DateTime::parse_from_rfc3339(created).ok())
        .map(|created| created.to_rfc2822());
    let artist = probe.tag("artist").or_else(|| probe.tag("album_artist"));

    let enclosure = EnclosureBuilder::default()
        .url(enclosure_url.to_string())
        .length(probe.size.unwrap_or_default().to_string())
        .mime_type(mime_type(path).to_string())
        .build();
    let guid = GuidBuilder::default()
        .value(enclosure_url.to_string())
        .permalink(true)
        .build();
    let itunes = ITunesItemExtensionBuilder::default()
        .author(artist.map(str::to_string))
        .duration(probe.duration_secs.map(format_duration))
        .block(Some("Yes".to_string()))
        .build();

    let mut item = ItemBuilder::default()
        .title(Some(title))
        .description(probe.tag("comment").map(str::to_string))
        .pub_date(pub_date)
        .enclosure(Some(enclosure))
        .guid(Some(guid))
        .itunes_ext(Some(itunes))
        .build();

    if let Some(artist) = artist {
        let mut podcast = PodcastItem::new();
        podcast.set_person(vec![fields! { "person" => artist, "role" => "author" }], true)?;
        podcast.extend_item(&mut item);
    }
    Ok(item)
}

/// Probe every input file and write the resulting feed to `options.outfile`
///
/// Files that cannot be probed are reported and left out.
pub async fn build_feed<T: Transcoder + ?Sized>(
    transcoder: &T,
    options: &FeedOptions,
    reporter: &SharedProgressReporter,
) -> Result<FeedSummary, FeedError> {
    if options.outfile.exists() && !options.overwrite {
        return Err(FeedError::OutfileExists(options.outfile.clone()));
    }

    let prefix = url_prefix(&options.url_prefix)?;
    let website = website(options.website.as_deref(), &prefix)?;
    let image = image_url(&options.image, &prefix)?;
    let feed_url = feed_url(options.feed_url.as_deref(), &prefix, &options.outfile)?;

    let files = resolve_input_files(&options.files)?;
    tracing::debug!(count = files.len(), site = %website, "building feed");

    let mut items = Vec::with_capacity(files.len());
    let mut skipped = 0;
    for path in files {
        let probe = match transcoder.probe(&path).await {
            Ok(probe) => probe,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "probe failed");
                reporter.report(ProgressEvent::FeedItemSkipped {
                    path,
                    error: e.to_string(),
                });
                skipped += 1;
                continue;
            }
        };

        items.push(episode_item(&path, &probe, &prefix)?);
        reporter.report(ProgressEvent::FeedItemAdded { path });
    }

    let subcategory = ITunesCategoryBuilder::default()
        .text(options.subcategory.clone())
        .build();
    let category = ITunesCategoryBuilder::default()
        .text(options.category.clone())
        .subcategory(Some(Box::new(subcategory)))
        .build();
    let itunes = ITunesChannelExtensionBuilder::default()
        .explicit(Some(options.explicit.to_string()))
        .image(Some(image.to_string()))
        .categories(vec![category])
        .summary(Some(options.description.clone()))
        .build();
    let artwork = ImageBuilder::default()
        .url(image.to_string())
        .title(options.name.clone())
        .link(website.to_string())
        .build();

    let item_count = items.len();
    let mut channel = ChannelBuilder::default()
        .title(options.name.clone())
        .link(website.to_string())
        .description(options.description.clone())
        .image(Some(artwork))
        .generator(Some(format!("audioshelf {}", env!("CARGO_PKG_VERSION"))))
        .last_build_date(Some(chrono::Utc::now().to_rfc2822()))
        .itunes_ext(Some(itunes))
        .items(items)
        .build();

    let mut podcast = PodcastChannel::new();
    podcast.set_guid(GuidSource::FeedUrl(feed_url.as_str()))?;
    podcast.set_medium(&options.medium)?;
    podcast.extend_channel(&mut channel);

    let xml = channel.pretty_write_to(Vec::new(), b' ', 2)?;
    tokio::fs::write(&options.outfile, xml)
        .await
        .map_err(|source| FeedError::WriteFailed {
            path: options.outfile.clone(),
            source,
        })?;

    reporter.report(ProgressEvent::FeedCompleted {
        outfile: options.outfile.clone(),
        items: item_count,
        skipped,
    });

    Ok(FeedSummary {
        outfile: options.outfile.clone(),
        feed_url: feed_url.to_string(),
        items: item_count,
        skipped,
    })
}
