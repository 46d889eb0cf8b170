// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::TagError;

use super::fields::{TRUE_FALSE, YES_NO, Fields, ensure_format, integer_field};
use super::namespace::{MEDIUMS, SERVICE_SLUGS, url_to_guid};
use super::rrule::parse_rrule;
use super::tags::{PodcastTags, TagSet, element, fields_node, push_child};

const REMOTE_ITEM_KEYS: &[&str] = &["feed_guid", "feed_url", "item_guid", "medium"];

/// Where a `<podcast:guid>` comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidSource<'a> {
    /// A UUID chosen by the caller
    Uuid(&'a str),
    /// The feed URL, hashed into a UUIDv5
    FeedUrl(&'a str),
}

/// Podcasting 2.0 tags of a `<channel>`
#[derive(Debug, Clone, Default)]
pub struct PodcastChannel {
    tags: TagSet,
}

impl PodcastTags for PodcastChannel {
    fn tag_set(&self) -> &TagSet {
        &self.tags
    }

    fn tag_set_mut(&mut self) -> &mut TagSet {
        &mut self.tags
    }
}

fn check_remote_items(entries: &[Fields]) -> Result<(), TagError> {
    ensure_format(
        "remoteItem",
        entries,
        REMOTE_ITEM_KEYS,
        &["feed_guid"],
        &[("medium", MEDIUMS)],
    )
}

/// Parse an ISO 8601 date or datetime and render it the way the namespace
/// wants it: UTC with millisecond precision, e.g. `2023-08-28T00:00:00.000Z`
///
/// Timestamps without an offset are taken as UTC.
pub fn normalize_dtstart(value: &str) -> Result<String, TagError> {
    let invalid = || TagError::InvalidValue {
        tag: "updateFrequency",
        key: "dtstart".to_string(),
        value: value.to_string(),
    };

    let parsed = if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
    {
        naive.and_utc()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(invalid)?
            .and_utc()
    };

    Ok(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl PodcastChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<podcast:locked>`: keys `locked` (`yes`/`no`, required), `owner`
    pub fn set_locked(&mut self, locked: Fields) -> Result<(), TagError> {
        ensure_format(
            "locked",
            std::slice::from_ref(&locked),
            &["locked", "owner"],
            &["locked"],
            &[("locked", YES_NO)],
        )?;
        let node = fields_node("locked", &locked, Some("locked"));
        self.tags.put_one("locked", locked, node);
        Ok(())
    }

    pub fn locked(&self) -> Option<&Fields> {
        self.tags.entry("locked")
    }

    /// `<podcast:funding>`: keys `text` and `url`, both required
    pub fn set_funding(&mut self, fundings: Vec<Fields>, replace: bool) -> Result<(), TagError> {
        ensure_format("funding", &fundings, &["text", "url"], &["text", "url"], &[])?;
        let nodes = fundings
            .iter()
            .map(|f| fields_node("funding", f, Some("text")))
            .collect();
        self.tags.put("funding", fundings, nodes, replace);
        Ok(())
    }

    pub fn funding(&self) -> &[Fields] {
        self.tags.entries("funding")
    }

    /// `<podcast:trailer>`: `text`, `url` and `pubdate` (RFC 2822) are
    /// required; `length`, `type` and `season` are optional
    pub fn set_trailer(&mut self, trailers: Vec<Fields>, replace: bool) -> Result<(), TagError> {
        ensure_format(
            "trailer",
            &trailers,
            &["text", "url", "pubdate", "length", "type", "season"],
            &["text", "url", "pubdate"],
            &[],
        )?;
        for trailer in &trailers {
            let pubdate = &trailer["pubdate"];
            if DateTime::parse_from_rfc2822(pubdate).is_err() {
                return Err(TagError::InvalidValue {
                    tag: "trailer",
                    key: "pubdate".to_string(),
                    value: pubdate.clone(),
                });
            }
            integer_field("trailer", trailer, "length")?;
            integer_field("trailer", trailer, "season")?;
        }

        let nodes = trailers
            .iter()
            .map(|t| fields_node("trailer", t, Some("text")))
            .collect();
        self.tags.put("trailer", trailers, nodes, replace);
        Ok(())
    }

    pub fn trailer(&self) -> &[Fields] {
        self.tags.entries("trailer")
    }

    /// `<podcast:guid>`, either a caller supplied UUID or one derived from the feed URL
    pub fn set_guid(&mut self, source: GuidSource<'_>) -> Result<(), TagError> {
        let guid = match source {
            GuidSource::Uuid(value) => Uuid::parse_str(value)
                .map_err(|_| TagError::InvalidValue {
                    tag: "guid",
                    key: "guid".to_string(),
                    value: value.to_string(),
                })?
                .hyphenated()
                .to_string(),
            GuidSource::FeedUrl(url) => url_to_guid(url),
        };

        let mut node = element("guid");
        node.value = Some(guid.clone());
        self.tags
            .put_one("guid", Fields::from([("guid".to_string(), guid)]), node);
        Ok(())
    }

    pub fn guid(&self) -> Option<&str> {
        self.tags
            .entry("guid")
            .and_then(|f| f.get("guid"))
            .map(String::as_str)
    }

    /// `<podcast:medium>`: one of [`MEDIUMS`]
    pub fn set_medium(&mut self, medium: &str) -> Result<(), TagError> {
        let fields = Fields::from([("medium".to_string(), medium.to_string())]);
        ensure_format(
            "medium",
            std::slice::from_ref(&fields),
            &["medium"],
            &["medium"],
            &[("medium", MEDIUMS)],
        )?;
        let node = fields_node("medium", &fields, Some("medium"));
        self.tags.put_one("medium", fields, node);
        Ok(())
    }

    pub fn medium(&self) -> Option<&str> {
        self.tags
            .entry("medium")
            .and_then(|f| f.get("medium"))
            .map(String::as_str)
    }

    /// `<podcast:block>`: keys `block` (`yes`/`no`, required) and `id`
    ///
    /// `id` must be a known service slug unless `slug_override` is set.
    pub fn set_block(
        &mut self,
        blocks: Vec<Fields>,
        slug_override: bool,
        replace: bool,
    ) -> Result<(), TagError> {
        let mut allowed_values: Vec<(&str, &[&str])> = vec![("block", YES_NO)];
        if !slug_override {
            allowed_values.push(("id", SERVICE_SLUGS));
        }
        ensure_format("block", &blocks, &["block", "id"], &["block"], &allowed_values)?;

        let nodes = blocks
            .iter()
            .map(|b| fields_node("block", b, Some("block")))
            .collect();
        self.tags.put("block", blocks, nodes, replace);
        Ok(())
    }

    pub fn block(&self) -> &[Fields] {
        self.tags.entries("block")
    }

    /// `<podcast:updateFrequency>`: keys `text` (required), `dtstart`,
    /// `complete` (`true`/`false`) and `rrule`
    ///
    /// `dtstart` is stored normalized; an `rrule` using `COUNT` needs it.
    pub fn set_update_frequency(&mut self, mut frequency: Fields) -> Result<(), TagError> {
        ensure_format(
            "updateFrequency",
            std::slice::from_ref(&frequency),
            &["text", "dtstart", "complete", "rrule"],
            &["text"],
            &[("complete", TRUE_FALSE)],
        )?;

        if let Some(dtstart) = frequency.get("dtstart") {
            let normalized = normalize_dtstart(dtstart)?;
            frequency.insert("dtstart".to_string(), normalized);
        }

        if let Some(rrule) = frequency.get("rrule") {
            let rule = parse_rrule(rrule).map_err(|source| TagError::InvalidRrule {
                rule: rrule.to_string(),
                source,
            })?;
            if rule.count.is_some() && !frequency.contains_key("dtstart") {
                return Err(TagError::Invalid {
                    tag: "updateFrequency",
                    reason: "an rrule with COUNT requires dtstart".to_string(),
                });
            }
        }

        let node = fields_node("updateFrequency", &frequency, Some("text"));
        self.tags.put_one("updateFrequency", frequency, node);
        Ok(())
    }

    pub fn update_frequency(&self) -> Option<&Fields> {
        self.tags.entry("updateFrequency")
    }

    /// `<podcast:podping>`: key `uses_podping` (`true`/`false`, required)
    pub fn set_podping(&mut self, podping: Fields) -> Result<(), TagError> {
        ensure_format(
            "podping",
            std::slice::from_ref(&podping),
            &["uses_podping"],
            &["uses_podping"],
            &[("uses_podping", TRUE_FALSE)],
        )?;
        let node = fields_node("podping", &podping, None);
        self.tags.put_one("podping", podping, node);
        Ok(())
    }

    pub fn podping(&self) -> Option<&Fields> {
        self.tags.entry("podping")
    }

    pub fn clear_podping(&mut self) {
        self.tags.remove("podping");
    }

    /// `<podcast:podroll>` holding one `<podcast:remoteItem>` per entry
    pub fn set_podroll(&mut self, remote_items: Vec<Fields>) -> Result<(), TagError> {
        check_remote_items(&remote_items)?;
        if remote_items.is_empty() {
            return Err(TagError::Invalid {
                tag: "podroll",
                reason: "needs at least one remoteItem".to_string(),
            });
        }

        let mut node = element("podroll");
        for item in &remote_items {
            push_child(&mut node, fields_node("remoteItem", item, None));
        }
        self.tags.put("podroll", remote_items, vec![node], true);
        Ok(())
    }

    pub fn podroll(&self) -> &[Fields] {
        self.tags.entries("podroll")
    }

    /// `<podcast:remoteItem>` directly under the channel
    pub fn set_remote_item(&mut self, items: Vec<Fields>, replace: bool) -> Result<(), TagError> {
        check_remote_items(&items)?;
        let nodes = items
            .iter()
            .map(|i| fields_node("remoteItem", i, None))
            .collect();
        self.tags.put("remoteItem", items, nodes, replace);
        Ok(())
    }

    pub fn remote_item(&self) -> &[Fields] {
        self.tags.entries("remoteItem")
    }
}
