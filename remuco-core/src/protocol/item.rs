//! Media items and item lists.
//!
//! # Wire Protocol
//!
//! ```text
//! Server ──[SYNC_ITEM]───────────► Client   Item      S id, AS meta (k, v ..), AY image
//! Client ──[REQ_ITEM]────────────► Server   S item id
//! Server ──[REQ_ITEM]────────────► Client   Item
//! Client ──[REQ_PLAYLIST|QUEUE]──► Server   (empty)
//! Client ──[REQ_MLIB|FILES]──────► Server   AS path
//! Server ──[REQ_PLAYLIST..FILES]─► Client   ItemList  AS path, AS nested, AS ids, AS names
//! Client ──[CTRL_TAG]────────────► Server   Tag       S item id, AS tags
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RemucoError;
use crate::protocol::player::{flatten_map, unflatten_map};
use crate::protocol::serial::{SerialReader, SerialWriter};

pub const META_TITLE: &str = "title";
pub const META_ARTIST: &str = "artist";
pub const META_ALBUM: &str = "album";
pub const META_GENRE: &str = "genre";
pub const META_YEAR: &str = "year";
pub const META_RATING: &str = "rating";
pub const META_TAGS: &str = "tags";

// ── Item ─────────────────────────────────────────────────────────

/// A media item with its metadata and an optional cover image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Item {
    /// Player specific id; empty when nothing is playing.
    pub id: String,
    pub meta: BTreeMap<String, String>,
    /// Encoded image bytes in the type requested by the client.
    #[serde(skip)]
    pub image: Vec<u8>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// `true` if the server announced "nothing playing".
    pub fn is_none(&self) -> bool {
        self.id.is_empty() && self.meta.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.get(META_TITLE).map(String::as_str)
    }

    pub fn artist(&self) -> Option<&str> {
        self.meta.get(META_ARTIST).map(String::as_str)
    }

    pub fn album(&self) -> Option<&str> {
        self.meta.get(META_ALBUM).map(String::as_str)
    }

    /// Rating as a number; malformed values read as unrated.
    pub fn rating(&self) -> i32 {
        self.meta
            .get(META_RATING)
            .and_then(|r| r.trim().parse().ok())
            .unwrap_or(0)
    }

    pub(crate) fn write(&self, w: &mut SerialWriter) {
        w.write_s(&self.id)
            .write_as(&flatten_map(&self.meta))
            .write_ay(&self.image);
    }

    pub(crate) fn read(r: &mut SerialReader<'_>) -> Result<Self, RemucoError> {
        Ok(Self {
            id: r.read_s()?,
            meta: unflatten_map(r.read_as()?, "item meta")?,
            image: r.read_ay()?,
        })
    }
}

// ── ItemList ─────────────────────────────────────────────────────

/// A browsable list (playlist, queue, library level, directory).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemList {
    /// Location of this list within its hierarchy.
    pub path: Vec<String>,
    /// Names of nested lists (sub folders).
    pub nested: Vec<String>,
    /// Item ids, parallel to `names`.
    pub ids: Vec<String>,
    pub names: Vec<String>,
}

impl ItemList {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.nested.is_empty()
    }

    /// `(id, name)` pairs of the items in this list.
    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids
            .iter()
            .zip(self.names.iter())
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub(crate) fn write(&self, w: &mut SerialWriter) {
        w.write_as(&self.path)
            .write_as(&self.nested)
            .write_as(&self.ids)
            .write_as(&self.names);
    }

    pub(crate) fn read(r: &mut SerialReader<'_>) -> Result<Self, RemucoError> {
        let list = Self {
            path: r.read_as()?,
            nested: r.read_as()?,
            ids: r.read_as()?,
            names: r.read_as()?,
        };
        if list.ids.len() != list.names.len() {
            return Err(RemucoError::decoding(format!(
                "item list has {} ids but {} names",
                list.ids.len(),
                list.names.len()
            )));
        }
        Ok(list)
    }
}

// ── Tag ──────────────────────────────────────────────────────────

/// Argument of `CTRL_TAG`: replaces the tags of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub item_id: String,
    pub tags: Vec<String>,
}

impl Tag {
    pub fn new(item_id: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            item_id: item_id.into(),
            tags,
        }
    }

    pub(crate) fn write(&self, w: &mut SerialWriter) {
        w.write_s(&self.item_id).write_as(&self.tags);
    }

    pub(crate) fn read(r: &mut SerialReader<'_>) -> Result<Self, RemucoError> {
        Ok(Self {
            item_id: r.read_s()?,
            tags: r.read_as()?,
        })
    }
}
