// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use rss::extension::Extension;

use crate::error::TagError;

use super::fields::{TRUE_FALSE, Fields, ensure_format, integer_field, to_lower_camel_case};
use super::namespace::PODCAST_PREFIX;

const TXT_MAX_CHARS: usize = 4000;
const TXT_PURPOSE_MAX_CHARS: usize = 128;
const LOCATION_RELS: &[&str] = &["subject", "creator"];

/// A `<podcast:value>` block with its `<podcast:valueRecipient>` children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBlock {
    /// `type`, `method` and optional `suggested`
    pub fields: Fields,
    pub recipients: Vec<Fields>,
}

impl ValueBlock {
    pub fn new(fields: Fields, recipients: Vec<Fields>) -> Self {
        Self { fields, recipients }
    }
}

/// Values handed to the setters and the XML nodes rendered from them
///
/// Both are keyed by the element's local name (`updateFrequency`).
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    entries: BTreeMap<&'static str, Vec<Fields>>,
    nodes: BTreeMap<&'static str, Vec<Extension>>,
    value_blocks: Vec<ValueBlock>,
}

impl TagSet {
    /// Store entries and nodes for `name`, appending unless `replace` is set
    pub(crate) fn put(
        &mut self,
        name: &'static str,
        entries: Vec<Fields>,
        nodes: Vec<Extension>,
        replace: bool,
    ) {
        if replace {
            self.entries.remove(name);
            self.nodes.remove(name);
        }
        if !entries.is_empty() {
            self.entries.entry(name).or_default().extend(entries);
        }
        if !nodes.is_empty() {
            self.nodes.entry(name).or_default().extend(nodes);
        }
    }

    /// Replace whatever `name` held with a single entry
    pub(crate) fn put_one(&mut self, name: &'static str, fields: Fields, node: Extension) {
        self.put(name, vec![fields], vec![node], true);
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.entries.remove(name);
        self.nodes.remove(name);
    }

    /// Everything set for `name`; empty when the tag was never set
    pub fn entries(&self, name: &str) -> &[Fields] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry(&self, name: &str) -> Option<&Fields> {
        self.entries(name).first()
    }

    /// Rendered nodes grouped by local element name
    pub fn nodes(&self) -> impl Iterator<Item = (&'static str, &[Extension])> {
        self.nodes.iter().map(|(name, nodes)| (*name, nodes.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// An empty `podcast:` element
pub(crate) fn element(local: &str) -> Extension {
    Extension {
        name: format!("{}:{}", PODCAST_PREFIX, local),
        value: None,
        attrs: BTreeMap::new(),
        children: BTreeMap::new(),
    }
}

/// Render `fields` as one element: `text_key` becomes the text content and
/// every other non-empty field a lowerCamelCase attribute
pub(crate) fn fields_node(local: &str, fields: &Fields, text_key: Option<&str>) -> Extension {
    let mut node = element(local);
    for (key, value) in fields {
        if Some(key.as_str()) == text_key {
            node.value = Some(value.clone());
        } else if !value.is_empty() {
            node.attrs.insert(to_lower_camel_case(key), value.clone());
        }
    }
    node
}

pub(crate) fn push_child(parent: &mut Extension, child: Extension) {
    parent
        .children
        .entry(child.name.clone())
        .or_default()
        .push(child);
}

fn check_location(location: &Fields) -> Result<(), TagError> {
    ensure_format(
        "location",
        std::slice::from_ref(location),
        &["location", "geo", "osm", "rel"],
        &["location"],
        &[("rel", LOCATION_RELS)],
    )?;

    if let Some(geo) = location.get("geo")
        && !geo.starts_with("geo:")
    {
        return Err(TagError::InvalidValue {
            tag: "location",
            key: "geo".to_string(),
            value: geo.clone(),
        });
    }

    if let Some(osm) = location.get("osm")
        && !is_osm_reference(osm)
    {
        return Err(TagError::InvalidValue {
            tag: "location",
            key: "osm".to_string(),
            value: osm.clone(),
        });
    }
    Ok(())
}

/// `[NWR]<id>` with an optional `#<revision>`
fn is_osm_reference(osm: &str) -> bool {
    let Some(rest) = osm.strip_prefix(['N', 'W', 'R']) else {
        return false;
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match rest.split_once('#') {
        Some((id, revision)) => all_digits(id) && all_digits(revision),
        None => all_digits(rest),
    }
}

fn check_txt(entries: &[Fields]) -> Result<(), TagError> {
    ensure_format("txt", entries, &["txt", "purpose"], &["txt"], &[])?;
    for entry in entries {
        if entry["txt"].chars().count() > TXT_MAX_CHARS {
            return Err(TagError::Invalid {
                tag: "txt",
                reason: format!("text exceeds {} characters", TXT_MAX_CHARS),
            });
        }
        if entry
            .get("purpose")
            .is_some_and(|p| p.chars().count() > TXT_PURPOSE_MAX_CHARS)
        {
            return Err(TagError::Invalid {
                tag: "txt",
                reason: format!("purpose exceeds {} characters", TXT_PURPOSE_MAX_CHARS),
            });
        }
    }
    Ok(())
}

fn check_value_block(block: &ValueBlock) -> Result<(), TagError> {
    ensure_format(
        "value",
        std::slice::from_ref(&block.fields),
        &["type", "method", "suggested"],
        &["type", "method"],
        &[],
    )?;

    if block.recipients.is_empty() {
        return Err(TagError::Invalid {
            tag: "value",
            reason: "needs at least one valueRecipient".to_string(),
        });
    }

    ensure_format(
        "valueRecipient",
        &block.recipients,
        &[
            "name",
            "custom_key",
            "custom_value",
            "type",
            "address",
            "split",
            "fee",
        ],
        &["type", "address", "split"],
        &[("fee", TRUE_FALSE)],
    )?;
    for recipient in &block.recipients {
        integer_field("valueRecipient", recipient, "split")?;
    }
    Ok(())
}

fn value_node(block: &ValueBlock) -> Extension {
    let mut node = fields_node("value", &block.fields, None);
    for recipient in &block.recipients {
        push_child(&mut node, fields_node("valueRecipient", recipient, None));
    }
    node
}

/// Tags that may appear on both `<channel>` and `<item>`
///
/// Setters validate the whole input before touching stored state; a
/// rejected call leaves the previous value in place.
pub trait PodcastTags {
    fn tag_set(&self) -> &TagSet;

    fn tag_set_mut(&mut self) -> &mut TagSet;

    /// `<podcast:person>`: keys `person` (required), `role`, `group`, `img`, `href`
    fn set_person(&mut self, people: Vec<Fields>, replace: bool) -> Result<(), TagError> {
        ensure_format(
            "person",
            &people,
            &["person", "role", "group", "img", "href"],
            &["person"],
            &[],
        )?;
        let nodes = people
            .iter()
            .map(|p| fields_node("person", p, Some("person")))
            .collect();
        self.tag_set_mut().put("person", people, nodes, replace);
        Ok(())
    }

    fn person(&self) -> &[Fields] {
        self.tag_set().entries("person")
    }

    /// `<podcast:location>`: keys `location` (required), `geo`, `osm`, `rel`
    fn set_location(&mut self, location: Fields) -> Result<(), TagError> {
        check_location(&location)?;
        let node = fields_node("location", &location, Some("location"));
        self.tag_set_mut().put_one("location", location, node);
        Ok(())
    }

    fn location(&self) -> Option<&Fields> {
        self.tag_set().entry("location")
    }

    /// `<podcast:license>`: keys `license` (required), `url`
    fn set_license(&mut self, license: Fields) -> Result<(), TagError> {
        ensure_format(
            "license",
            std::slice::from_ref(&license),
            &["license", "url"],
            &["license"],
            &[],
        )?;
        let node = fields_node("license", &license, Some("license"));
        self.tag_set_mut().put_one("license", license, node);
        Ok(())
    }

    fn license(&self) -> Option<&Fields> {
        self.tag_set().entry("license")
    }

    /// `<podcast:images>`: key `srcset` (required)
    fn set_images(&mut self, images: Fields) -> Result<(), TagError> {
        ensure_format(
            "images",
            std::slice::from_ref(&images),
            &["srcset"],
            &["srcset"],
            &[],
        )?;
        let node = fields_node("images", &images, None);
        self.tag_set_mut().put_one("images", images, node);
        Ok(())
    }

    fn images(&self) -> Option<&Fields> {
        self.tag_set().entry("images")
    }

    /// `<podcast:txt>`: keys `txt` (required), `purpose`
    fn set_txt(&mut self, entries: Vec<Fields>, replace: bool) -> Result<(), TagError> {
        check_txt(&entries)?;
        let nodes = entries
            .iter()
            .map(|t| fields_node("txt", t, Some("txt")))
            .collect();
        self.tag_set_mut().put("txt", entries, nodes, replace);
        Ok(())
    }

    fn txt(&self) -> &[Fields] {
        self.tag_set().entries("txt")
    }

    /// `<podcast:value>` blocks, each with at least one recipient
    fn set_value(&mut self, blocks: Vec<ValueBlock>, replace: bool) -> Result<(), TagError> {
        for block in &blocks {
            check_value_block(block)?;
        }

        let nodes = blocks.iter().map(value_node).collect();
        let tags = self.tag_set_mut();
        tags.put("value", Vec::new(), nodes, replace);
        if replace {
            tags.value_blocks.clear();
        }
        tags.value_blocks.extend(blocks);
        Ok(())
    }

    fn value(&self) -> &[ValueBlock] {
        &self.tag_set().value_blocks
    }
}
