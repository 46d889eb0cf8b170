pub mod auth;
pub mod book;
pub mod error;
pub mod feed;
pub mod http;
pub mod library;
pub mod metadata;
pub mod progress;
pub mod state;
pub mod sync;
pub mod transcode;

// Re-export main types for convenience
pub use auth::{Credentials, authenticate, load_credentials};
pub use error::{
    AuthError, BookError, CodecError, DownloadError, FeedError, LibraryError, MetadataError,
    RecurrenceError, StateError, SyncError, TagError, TranscodeError,
};
pub use feed::{
    FeedOptions, FeedSummary, Fields, PodcastChannel, PodcastItem, PodcastTags, build_feed,
};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use library::{Audiobook, fetch_library};
pub use progress::{
    NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter, TracingReporter,
};
pub use sync::{SyncOptions, SyncResult, sync_library};
pub use transcode::{FfmpegTranscoder, MediaProbe, Transcoder};
