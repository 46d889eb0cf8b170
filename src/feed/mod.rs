mod build;
mod channel;
mod extension;
mod fields;
mod item;
mod namespace;
mod rrule;
mod tags;

pub use build::{
    FeedOptions, FeedSummary, SUPPORTED_EXTENSIONS, all_patterns, build_feed, episode_item,
    feed_url, format_duration, image_url, is_supported_file, resolve_input_files, url_prefix,
    website,
};
pub use channel::{GuidSource, PodcastChannel, normalize_dtstart};
pub use extension::{extension_map, register_namespace};
pub use fields::{Fields, ensure_format, to_lower_camel_case};
pub use item::{AlternateEnclosure, PodcastItem};
pub use namespace::{
    MEDIUMS, PODCAST_GUID_NAMESPACE, PODCAST_NS, PODCAST_PREFIX, SERVICE_SLUGS, namespaces,
    url_to_guid,
};
pub use rrule::{RecurrenceRule, parse_rrule};
pub use tags::{PodcastTags, TagSet, ValueBlock};
