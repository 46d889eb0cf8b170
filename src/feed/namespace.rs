// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use uuid::Uuid;

/// XML namespace of the Podcasting 2.0 tags
pub const PODCAST_NS: &str = "https://podcastindex.org/namespace/1.0";

pub const PODCAST_PREFIX: &str = "podcast";

/// UUIDv5 namespace under which feed URLs are hashed into `<podcast:guid>`
pub const PODCAST_GUID_NAMESPACE: Uuid = Uuid::from_u128(0xead4c236_bf58_58c6_a2c6_a6b28d128cb6);

/// Platforms that may appear in `<podcast:block id="...">`
///
/// Mirrors the podcast namespace's serviceslugs.txt.
pub const SERVICE_SLUGS: &[&str] = &[
    "acast",
    "amazon",
    "anchor",
    "apple",
    "audible",
    "audioboom",
    "backtracks",
    "bitcoin",
    "blubrry",
    "buzzsprout",
    "captivate",
    "castos",
    "castopod",
    "facebook",
    "fireside",
    "fyyd",
    "google",
    "gpodder",
    "hypercatcher",
    "kasts",
    "libsyn",
    "mastodon",
    "megafono",
    "megaphone",
    "omnystudio",
    "overcast",
    "paypal",
    "pinecast",
    "podbean",
    "podcastaddict",
    "podcastguru",
    "podcastindex",
    "podcasts",
    "podchaser",
    "podcloud",
    "podfriend",
    "podiant",
    "podigee",
    "podnews",
    "podomatic",
    "podserve",
    "podverse",
    "redcircle",
    "relay",
    "resonaterecordings",
    "rss",
    "shoutengine",
    "simplecast",
    "slack",
    "soundcloud",
    "spotify",
    "spreaker",
    "tiktok",
    "transistor",
    "twitter",
    "whooshkaa",
    "youtube",
    "zencast",
];

/// Values accepted by `<podcast:medium>` and `remoteItem`'s `medium`
pub const MEDIUMS: &[&str] = &[
    "podcast",
    "podcastL",
    "music",
    "musicL",
    "video",
    "videoL",
    "film",
    "filmL",
    "audiobook",
    "audiobookL",
    "newsletter",
    "newsletterL",
    "blog",
    "blogL",
    "mixed",
];

/// Prefix to URI mapping to declare on the `<rss>` element
pub fn namespaces() -> BTreeMap<String, String> {
    BTreeMap::from([(PODCAST_PREFIX.to_string(), PODCAST_NS.to_string())])
}

fn strip_scheme(url: &str) -> &str {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url;
    };

    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid { rest } else { url }
}

/// Derive a podcast GUID from a feed URL
///
/// The scheme and trailing slashes are dropped first, so `https://podnews.net/rss`,
/// `podnews.net/rss/` and `podnews.net/rss` all hash to the same GUID.
pub fn url_to_guid(url: &str) -> String {
    let rest = strip_scheme(url.trim());

    let (before_fragment, fragment) = rest.split_once('#').unwrap_or((rest, ""));
    let (location, query) = before_fragment
        .split_once('?')
        .unwrap_or((before_fragment, ""));

    let joined = format!("{}{}{}", location, query, fragment);
    let seed = joined.trim_end_matches('/');

    Uuid::new_v5(&PODCAST_GUID_NAMESPACE, seed.as_bytes())
        .hyphenated()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_namespace_constant() {
        assert_eq!(
            PODCAST_GUID_NAMESPACE.to_string(),
            "ead4c236-bf58-58c6-a2c6-a6b28d128cb6"
        );
    }

    #[test]
    fn guid_from_full_url() {
        assert_eq!(
            url_to_guid("https://mp3s.nashownotes.com/pc20rss.xml"),
            "917393e3-1b1e-5cef-ace4-edaa54e1f810"
        );
    }

    #[test]
    fn guid_ignores_scheme_and_trailing_slashes() {
        let expected = "9b024349-ccf0-5f69-a609-6b82873eab3c";
        assert_eq!(url_to_guid("podnews.net/rss"), expected);
        assert_eq!(url_to_guid("podnews.net/rss/"), expected);
        assert_eq!(url_to_guid("podnews.net/rss////"), expected);
        assert_eq!(url_to_guid("https://podnews.net/rss"), expected);
        assert_eq!(url_to_guid("http://podnews.net/rss/"), expected);
    }

    #[test]
    fn namespace_map() {
        assert_eq!(namespaces()["podcast"], PODCAST_NS);
    }

    #[test]
    fn slug_list_is_sorted() {
        assert!(SERVICE_SLUGS.windows(2).all(|w| w[0] < w[1]));
        assert!(SERVICE_SLUGS.contains(&"audible"));
    }
}
