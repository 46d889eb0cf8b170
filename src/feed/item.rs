// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::TagError;

use super::fields::{TRUE_FALSE, Fields, decimal_field, ensure_format, integer_field};
use super::tags::{PodcastTags, TagSet, fields_node, push_child};

const TRANSCRIPT_RELS: &[&str] = &["captions"];
const SOCIAL_PROTOCOLS: &[&str] = &["disabled", "activitypub", "twitter", "lightning"];
const INTEGRITY_TYPES: &[&str] = &["sri", "pgp-signature"];

const ALTERNATE_ENCLOSURE_KEYS: &[&str] = &[
    "type", "length", "bitrate", "height", "lang", "title", "rel", "codecs", "default",
];

/// A `<podcast:alternateEnclosure>` with its `<podcast:source>` and
/// optional `<podcast:integrity>` children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateEnclosure {
    pub fields: Fields,
    pub sources: Vec<Fields>,
    pub integrity: Option<Fields>,
}

impl AlternateEnclosure {
    pub fn new(fields: Fields, sources: Vec<Fields>, integrity: Option<Fields>) -> Self {
        Self {
            fields,
            sources,
            integrity,
        }
    }

    fn check(&self) -> Result<(), TagError> {
        const TAG: &str = "alternateEnclosure";

        ensure_format(
            TAG,
            std::slice::from_ref(&self.fields),
            ALTERNATE_ENCLOSURE_KEYS,
            &["type"],
            &[("default", TRUE_FALSE)],
        )?;
        integer_field(TAG, &self.fields, "length")?;
        integer_field(TAG, &self.fields, "height")?;
        decimal_field(TAG, &self.fields, "bitrate")?;

        if self.sources.is_empty() {
            return Err(TagError::Invalid {
                tag: TAG,
                reason: "needs at least one source".to_string(),
            });
        }
        ensure_format("source", &self.sources, &["uri", "content_type"], &["uri"], &[])?;

        if let Some(integrity) = &self.integrity {
            ensure_format(
                "integrity",
                std::slice::from_ref(integrity),
                &["type", "value"],
                &["type", "value"],
                &[("type", INTEGRITY_TYPES)],
            )?;
        }
        Ok(())
    }

    fn node(&self) -> rss::extension::Extension {
        let mut node = fields_node("alternateEnclosure", &self.fields, None);
        for source in &self.sources {
            push_child(&mut node, fields_node("source", source, None));
        }
        if let Some(integrity) = &self.integrity {
            push_child(&mut node, fields_node("integrity", integrity, None));
        }
        node
    }
}

/// Podcasting 2.0 tags of an `<item>`
#[derive(Debug, Clone, Default)]
pub struct PodcastItem {
    tags: TagSet,
    alternate_enclosures: Vec<AlternateEnclosure>,
}

impl PodcastTags for PodcastItem {
    fn tag_set(&self) -> &TagSet {
        &self.tags
    }

    fn tag_set_mut(&mut self) -> &mut TagSet {
        &mut self.tags
    }
}

impl PodcastItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<podcast:transcript>`: `url` and `type` required, optional
    /// `language` and `rel` (`captions`)
    pub fn set_transcript(&mut self, transcripts: Vec<Fields>, replace: bool) -> Result<(), TagError> {
        ensure_format(
            "transcript",
            &transcripts,
            &["url", "type", "language", "rel"],
            &["url", "type"],
            &[("rel", TRANSCRIPT_RELS)],
        )?;
        let nodes = transcripts
            .iter()
            .map(|t| fields_node("transcript", t, None))
            .collect();
        self.tags.put("transcript", transcripts, nodes, replace);
        Ok(())
    }

    pub fn transcript(&self) -> &[Fields] {
        self.tags.entries("transcript")
    }

    pub fn set_chapters(&mut self, chapters: Fields) -> Result<(), TagError> {
        ensure_format(
            "chapters",
            std::slice::from_ref(&chapters),
            &["url", "type"],
            &["url", "type"],
            &[],
        )?;
        let node = fields_node("chapters", &chapters, None);
        self.tags.put_one("chapters", chapters, node);
        Ok(())
    }

    pub fn chapters(&self) -> Option<&Fields> {
        self.tags.entry("chapters")
    }

    /// `<podcast:soundbite>`: `start_time` and `duration` in seconds, optional title `text`
    pub fn set_soundbite(&mut self, soundbites: Vec<Fields>, replace: bool) -> Result<(), TagError> {
        ensure_format(
            "soundbite",
            &soundbites,
            &["start_time", "duration", "text"],
            &["start_time", "duration"],
            &[],
        )?;
        for soundbite in &soundbites {
            decimal_field("soundbite", soundbite, "start_time")?;
            decimal_field("soundbite", soundbite, "duration")?;
        }

        let nodes = soundbites
            .iter()
            .map(|s| fields_node("soundbite", s, Some("text")))
            .collect();
        self.tags.put("soundbite", soundbites, nodes, replace);
        Ok(())
    }

    pub fn soundbite(&self) -> &[Fields] {
        self.tags.entries("soundbite")
    }

    pub fn set_season(&mut self, season: Fields) -> Result<(), TagError> {
        ensure_format(
            "season",
            std::slice::from_ref(&season),
            &["season", "name"],
            &["season"],
            &[],
        )?;
        integer_field("season", &season, "season")?;
        let node = fields_node("season", &season, Some("season"));
        self.tags.put_one("season", season, node);
        Ok(())
    }

    pub fn season(&self) -> Option<&Fields> {
        self.tags.entry("season")
    }

    /// `<podcast:episode>`; the number may be fractional (`204.5`)
    pub fn set_episode(&mut self, episode: Fields) -> Result<(), TagError> {
        ensure_format(
            "episode",
            std::slice::from_ref(&episode),
            &["episode", "display"],
            &["episode"],
            &[],
        )?;
        decimal_field("episode", &episode, "episode")?;
        let node = fields_node("episode", &episode, Some("episode"));
        self.tags.put_one("episode", episode, node);
        Ok(())
    }

    pub fn episode(&self) -> Option<&Fields> {
        self.tags.entry("episode")
    }

    /// `<podcast:socialInteract>`; `uri` may only be left out when the
    /// protocol is `disabled`
    pub fn set_social_interact(
        &mut self,
        interactions: Vec<Fields>,
        replace: bool,
    ) -> Result<(), TagError> {
        ensure_format(
            "socialInteract",
            &interactions,
            &["uri", "protocol", "account_id", "account_url", "priority"],
            &["protocol"],
            &[("protocol", SOCIAL_PROTOCOLS)],
        )?;
        for interaction in &interactions {
            if interaction["protocol"] != "disabled" && !interaction.contains_key("uri") {
                return Err(TagError::MissingKey {
                    tag: "socialInteract",
                    key: "uri",
                });
            }
            integer_field("socialInteract", interaction, "priority")?;
        }

        let nodes = interactions
            .iter()
            .map(|i| fields_node("socialInteract", i, None))
            .collect();
        self.tags.put("socialInteract", interactions, nodes, replace);
        Ok(())
    }

    pub fn social_interact(&self) -> &[Fields] {
        self.tags.entries("socialInteract")
    }

    pub fn set_alternate_enclosure(
        &mut self,
        enclosures: Vec<AlternateEnclosure>,
        replace: bool,
    ) -> Result<(), TagError> {
        for enclosure in &enclosures {
            enclosure.check()?;
        }

        let fields = enclosures.iter().map(|e| e.fields.clone()).collect();
        let nodes = enclosures.iter().map(AlternateEnclosure::node).collect();
        self.tags.put("alternateEnclosure", fields, nodes, replace);

        if replace {
            self.alternate_enclosures = enclosures;
        } else {
            self.alternate_enclosures.extend(enclosures);
        }
        Ok(())
    }

    pub fn alternate_enclosure(&self) -> &[AlternateEnclosure] {
        &self.alternate_enclosures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tags::tests::render;
    use crate::fields;

    fn xml(item: &PodcastItem) -> String {
        render(item.tag_set())
    }

    #[test]
    fn transcript() {
        let srt = fields! {
            "url" => "https://example.com/episode1/transcript.srt",
            "type" => "application/srt",
            "rel" => "captions",
        };
        let json = fields! {
            "url" => "https://example.com/episode1/transcript.json",
            "type" => "application/json",
            "language" => "es",
        };

        let mut item = PodcastItem::new();
        assert!(
            item.set_transcript(vec![fields! { "url" => "x", "type" => "y", "rel" => "bogus" }], false)
                .is_err()
        );
        assert!(item.set_transcript(vec![fields! { "url" => "x" }], false).is_err());

        item.set_transcript(vec![srt.clone()], false).unwrap();
        item.set_transcript(vec![json.clone()], false).unwrap();
        assert_eq!(item.transcript(), &[srt, json]);

        let out = xml(&item);
        assert!(out.contains(
            r#"<podcast:transcript rel="captions" type="application/srt" url="https://example.com/episode1/transcript.srt"></podcast:transcript>"#
        ));
        assert!(out.contains(
            r#"<podcast:transcript language="es" type="application/json" url="https://example.com/episode1/transcript.json"></podcast:transcript>"#
        ));
    }

    #[test]
    fn chapters() {
        let mut item = PodcastItem::new();
        assert!(item.set_chapters(fields! { "url" => "x" }).is_err());

        let chapters = fields! {
            "url" => "https://example.com/episode1/chapters.json",
            "type" => "application/json+chapters",
        };
        item.set_chapters(chapters.clone()).unwrap();
        assert_eq!(item.chapters(), Some(&chapters));
        assert!(xml(&item).contains(
            r#"<podcast:chapters type="application/json+chapters" url="https://example.com/episode1/chapters.json"></podcast:chapters>"#
        ));
    }

    #[test]
    fn soundbite() {
        let mut item = PodcastItem::new();
        assert!(
            item.set_soundbite(vec![fields! { "start_time" => "73.0" }], false)
                .is_err()
        );
        assert!(
            item.set_soundbite(vec![fields! { "start_time" => "-1", "duration" => "60" }], false)
                .is_err()
        );
        assert!(
            item.set_soundbite(vec![fields! { "start_time" => "1", "duration" => "long" }], false)
                .is_err()
        );

        let first = fields! { "start_time" => "73.0", "duration" => "60.0" };
        let second = fields! {
            "start_time" => "1234.5",
            "duration" => "42.25",
            "text" => "Why the Podcast Namespace Matters",
        };
        item.set_soundbite(vec![first.clone(), second.clone()], true)
            .unwrap();
        assert_eq!(item.soundbite(), &[first, second]);

        let out = xml(&item);
        assert!(out.contains(
            r#"<podcast:soundbite duration="60.0" startTime="73.0"></podcast:soundbite>"#
        ));
        assert!(out.contains(
            r#"<podcast:soundbite duration="42.25" startTime="1234.5">Why the Podcast Namespace Matters</podcast:soundbite>"#
        ));
    }

    #[test]
    fn season_and_episode() {
        let mut item = PodcastItem::new();
        assert!(item.set_season(fields! { "season" => "one" }).is_err());
        assert!(item.set_season(fields! { "name" => "Race for the Whitehouse" }).is_err());
        assert!(item.set_episode(fields! { "episode" => "three" }).is_err());

        let season = fields! { "season" => "5", "name" => "Race for the Whitehouse 2020" };
        let episode = fields! { "episode" => "204.5", "display" => "Ch.3" };
        item.set_season(season.clone()).unwrap();
        item.set_episode(episode.clone()).unwrap();
        assert_eq!(item.season(), Some(&season));
        assert_eq!(item.episode(), Some(&episode));

        let out = xml(&item);
        assert!(out.contains(
            r#"<podcast:season name="Race for the Whitehouse 2020">5</podcast:season>"#
        ));
        assert!(out.contains(r#"<podcast:episode display="Ch.3">204.5</podcast:episode>"#));

        item.set_season(fields! { "season" => "6" }).unwrap();
        let out = xml(&item);
        assert!(out.contains("<podcast:season>6</podcast:season>"));
        assert!(!out.contains("Whitehouse"));
    }

    #[test]
    fn social_interact() {
        let mut item = PodcastItem::new();
        assert!(
            item.set_social_interact(vec![fields! { "protocol" => "activitypub" }], false)
                .is_err()
        );
        assert!(
            item.set_social_interact(
                vec![fields! { "protocol" => "carrier-pigeon", "uri" => "coop://1" }],
                false
            )
            .is_err()
        );
        assert!(
            item.set_social_interact(
                vec![fields! { "protocol" => "twitter", "uri" => "https://x/", "priority" => "first" }],
                false
            )
            .is_err()
        );

        let mastodon = fields! {
            "protocol" => "activitypub",
            "uri" => "https://podcastindex.social/web/@dave/108013847520053258",
            "account_id" => "@dave",
            "account_url" => "https://podcastindex.social/web/@dave",
            "priority" => "1",
        };
        let disabled = fields! { "protocol" => "disabled" };
        item.set_social_interact(vec![mastodon.clone(), disabled.clone()], false)
            .unwrap();
        assert_eq!(item.social_interact(), &[mastodon, disabled]);

        let out = xml(&item);
        assert!(out.contains(
            r#"<podcast:socialInteract accountId="@dave" accountUrl="https://podcastindex.social/web/@dave" priority="1" protocol="activitypub" uri="https://podcastindex.social/web/@dave/108013847520053258"></podcast:socialInteract>"#
        ));
        assert!(out.contains(r#"<podcast:socialInteract protocol="disabled"></podcast:socialInteract>"#));
    }

    fn hls_enclosure() -> AlternateEnclosure {
        AlternateEnclosure::new(
            fields! {
                "type" => "application/x-mpegURL",
                "length" => "0",
                "title" => "HLS",
                "default" => "false",
            },
            vec![fields! { "uri" => "https://example.com/episode.m3u8" }],
            Some(fields! { "type" => "sri", "value" => "sha384-ExVqijgYHm15PqQqdXfW95x" }),
        )
    }

    #[test]
    fn alternate_enclosure_roundtrip_and_children() {
        let mut item = PodcastItem::new();
        let enclosure = hls_enclosure();
        item.set_alternate_enclosure(vec![enclosure.clone()], false)
            .unwrap();
        assert_eq!(item.alternate_enclosure(), &[enclosure.clone()]);

        let out = xml(&item);
        assert!(out.contains(
            r#"<podcast:alternateEnclosure default="false" length="0" title="HLS" type="application/x-mpegURL"><podcast:integrity type="sri" value="sha384-ExVqijgYHm15PqQqdXfW95x"></podcast:integrity><podcast:source uri="https://example.com/episode.m3u8"></podcast:source></podcast:alternateEnclosure>"#
        ));

        let torrent = AlternateEnclosure::new(
            fields! { "type" => "audio/mpeg", "bitrate" => "128000.5" },
            vec![
                fields! { "uri" => "https://example.com/episode.mp3" },
                fields! {
                    "uri" => "https://example.com/episode.torrent",
                    "content_type" => "application/x-bittorrent",
                },
            ],
            None,
        );
        item.set_alternate_enclosure(vec![torrent.clone()], false)
            .unwrap();
        assert_eq!(item.alternate_enclosure(), &[enclosure, torrent.clone()]);
        assert!(xml(&item).contains(
            r#"<podcast:source contentType="application/x-bittorrent" uri="https://example.com/episode.torrent"></podcast:source>"#
        ));

        item.set_alternate_enclosure(vec![torrent.clone()], true)
            .unwrap();
        assert_eq!(item.alternate_enclosure(), &[torrent]);
        assert!(!xml(&item).contains("HLS"));
    }

    #[test]
    fn alternate_enclosure_validation() {
        let mut no_type = hls_enclosure();
        no_type.fields.remove("type");

        let mut no_sources = hls_enclosure();
        no_sources.sources.clear();

        let mut source_without_uri = hls_enclosure();
        source_without_uri.sources = vec![fields! { "content_type" => "audio/mpeg" }];

        let mut bad_integrity = hls_enclosure();
        bad_integrity.integrity = Some(fields! { "type" => "md5", "value" => "abc" });

        let mut bad_length = hls_enclosure();
        bad_length.fields.insert("length".to_string(), "big".to_string());

        let mut bad_default = hls_enclosure();
        bad_default.fields.insert("default".to_string(), "maybe".to_string());

        let mut item = PodcastItem::new();
        for bad in [
            no_type,
            no_sources,
            source_without_uri,
            bad_integrity,
            bad_length,
            bad_default,
        ] {
            assert!(item.set_alternate_enclosure(vec![bad], false).is_err());
        }
        assert!(item.alternate_enclosure().is_empty());
        assert!(item.tag_set().is_empty());
    }

    #[test]
    fn shared_tags_work_on_item() {
        let mut item = PodcastItem::new();
        item.set_license(fields! { "license" => "cc-by-4.0" }).unwrap();
        item.set_location(fields! { "location" => "Austin, TX", "geo" => "geo:30.2672,97.7431" })
            .unwrap();
        let out = xml(&item);
        assert!(out.contains("<podcast:license>cc-by-4.0</podcast:license>"));
        assert!(out.contains(r#"<podcast:location geo="geo:30.2672,97.7431">Austin, TX</podcast:location>"#));
    }
}
