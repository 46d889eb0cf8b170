// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, refreshing or saving credentials
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to read credential file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write credential file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credential file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize credentials: {0}")]
    SerializeFailed(#[from] serde_json::Error),

    #[error("Unknown marketplace locale '{0}'")]
    UnknownLocale(String),

    #[error("Credential file has no refresh token and the access token has expired")]
    MissingRefreshToken,

    #[error("Token refresh failed: {source}")]
    RefreshFailed {
        #[source]
        source: reqwest::Error,
    },

    #[error("Token refresh rejected with HTTP {status}")]
    RefreshRejected { status: u16 },

    #[error("Malformed token refresh response: {0}")]
    RefreshResponse(String),
}

/// Errors that can occur when talking to the vendor library API
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse library response: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No download location returned for {asin} (HTTP {status})")]
    MissingLocation { asin: String, status: u16 },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors raised when no usable codec is offered for a title
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("No acceptable codecs for {title} ({asin})")]
    NoAcceptableCodec { asin: String, title: String },
}

/// Errors that can occur during audiobook downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Errors that can occur when running the external transcoder
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to launch {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ExitFailure {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to parse probe output for {path}: {source}")]
    ProbeParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to inspect {path}: {source}")]
    StatFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during sidecar metadata operations
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read metadata file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write metadata file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),
}

/// Syntax errors in an iCalendar recurrence rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("'{0}' is not a KEY=VALUE pair")]
    NotKeyValue(String),

    #[error("{0} appears more than once")]
    DuplicateKey(String),

    #[error("{0} has no value")]
    EmptyValue(String),

    #[error("unknown frequency '{0}'")]
    UnknownFrequency(String),

    #[error("{key} must be a positive integer, got '{value}'")]
    NotPositive { key: String, value: String },

    #[error("invalid {key} entry '{value}'")]
    InvalidEntry { key: String, value: String },

    #[error("unknown rule part '{0}'")]
    UnknownPart(String),

    #[error("FREQ is required")]
    MissingFrequency,

    #[error("COUNT and UNTIL cannot both be set")]
    CountWithUntil,
}

/// Validation errors for podcast namespace tags
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("<podcast:{tag}> does not accept key '{key}'")]
    UnknownKey { tag: &'static str, key: String },

    #[error("<podcast:{tag}> requires key '{key}'")]
    MissingKey { tag: &'static str, key: &'static str },

    #[error("<podcast:{tag}> key '{key}' has invalid value '{value}'")]
    InvalidValue {
        tag: &'static str,
        key: String,
        value: String,
    },

    #[error("<podcast:{tag}> {reason}")]
    Invalid { tag: &'static str, reason: String },

    #[error("<podcast:updateFrequency> invalid rrule '{rule}': {source}")]
    InvalidRrule {
        rule: String,
        #[source]
        source: RecurrenceError,
    },
}

/// Errors that can occur while building a feed from local media
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0}: file not found or not a supported media file")]
    UnsupportedInput(String),

    #[error("Invalid file pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Output file {0} already exists (use --overwrite)")]
    OutfileExists(PathBuf),

    #[error("Failed to write feed to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize feed: {0}")]
    SerializeFailed(#[from] rss::Error),

    #[error("Feed tag error: {0}")]
    Tag(#[from] TagError),
}

/// Errors that can occur when preparing the target directory
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that fail a single title during a library sync
#[derive(Error, Debug)]
pub enum BookError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

/// Top-level errors for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("No activation bytes configured (set activation_bytes or store them in the credential file)")]
    MissingActivationBytes,
}
