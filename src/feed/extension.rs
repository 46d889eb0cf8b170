// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use rss::extension::{Extension, ExtensionMap};
use rss::{Channel, Item};

use super::channel::PodcastChannel;
use super::item::PodcastItem;
use super::namespace::{PODCAST_NS, PODCAST_PREFIX};
use super::tags::{PodcastTags, TagSet};

const ITUNES_PREFIX: &str = "itunes";
const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";

/// `{"podcast": {local name: [nodes]}}` for the rss writer
pub fn extension_map(tags: &TagSet) -> ExtensionMap {
    let inner: BTreeMap<String, Vec<Extension>> = tags
        .nodes()
        .map(|(name, nodes)| (name.to_string(), nodes.to_vec()))
        .collect();
    BTreeMap::from([(PODCAST_PREFIX.to_string(), inner)])
}

/// Declare the podcast and iTunes prefixes on `<rss>`
pub fn register_namespace(channel: &mut Channel) {
    let mut namespaces = channel.namespaces().clone();
    namespaces.insert(PODCAST_PREFIX.to_string(), PODCAST_NS.to_string());
    namespaces.insert(ITUNES_PREFIX.to_string(), ITUNES_NS.to_string());
    channel.set_namespaces(namespaces);
}

/// Replace the `podcast` entry of an existing extension map, keeping other prefixes
fn merged(existing: &ExtensionMap, tags: &TagSet) -> ExtensionMap {
    let mut map = existing.clone();
    map.remove(PODCAST_PREFIX);
    if !tags.is_empty() {
        map.extend(extension_map(tags));
    }
    map
}

impl PodcastChannel {
    /// Write the channel tags into `channel` and register the namespaces
    ///
    /// Calling this again replaces the previously written tags.
    pub fn extend_channel(&self, channel: &mut Channel) {
        let map = merged(channel.extensions(), self.tag_set());
        channel.set_extensions(map);
        register_namespace(channel);
    }
}

impl PodcastItem {
    /// Write the item tags into `item`; namespaces live on the channel
    pub fn extend_item(&self, item: &mut Item) {
        let map = merged(item.extensions(), self.tag_set());
        item.set_extensions(map);
    }
}
