//! Player-level payloads: handshake records and synchronized state.
//!
//! # Wire Protocol
//!
//! ```text
//! Server ──[CONN_PINFO]──────► Client   PlayerInfo   S name, I features, Y max rating
//! Client ──[CONN_CINFO]──────► Server   ClientInfo   I image size, S image type,
//!                                                    I page size, AS device (k, v, k, v ..)
//! Server ──[SYNC_STATE]──────► Client   PlayerState  Y playback, Y volume, B repeat,
//!                                                    B shuffle, I position, B queue
//! Server ──[SYNC_PROGRESS]───► Client   Progress     I progress, I length (seconds)
//! ```

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::RemucoError;
use crate::protocol::control::Control;
use crate::protocol::serial::{SerialReader, SerialWriter};
use crate::util::format_time;

bitflags! {
    /// What a player (adapter) supports, announced in `CONN_PINFO`.
    ///
    /// Unknown bits sent by newer servers are kept as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Features: u32 {
        const KNOWN_VOLUME   = 1 << 0;
        const KNOWN_REPEAT   = 1 << 1;
        const KNOWN_SHUFFLE  = 1 << 2;
        const KNOWN_PLAYBACK = 1 << 3;
        const KNOWN_PROGRESS = 1 << 4;

        const CTRL_PLAYBACK   = 1 << 9;
        const CTRL_VOLUME     = 1 << 10;
        const CTRL_SEEK       = 1 << 11;
        const CTRL_TAG        = 1 << 12;
        const CTRL_CLEAR_PL   = 1 << 13;
        const CTRL_CLEAR_QU   = 1 << 14;
        const CTRL_RATE       = 1 << 15;
        const CTRL_REPEAT     = 1 << 16;
        const CTRL_SHUFFLE    = 1 << 17;
        const CTRL_NEXT       = 1 << 18;
        const CTRL_PREV       = 1 << 19;
        const CTRL_FULLSCREEN = 1 << 20;

        const REQ_ITEM  = 1 << 21;
        const REQ_PL    = 1 << 22;
        const REQ_QU    = 1 << 23;
        const REQ_MLIB  = 1 << 24;
        const REQ_FILES = 1 << 26;

        const SHUTDOWN = 1 << 25;
    }
}

// ── PlayerInfo ───────────────────────────────────────────────────

/// Identity and capabilities of the connected player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Display name, e.g. `"Banshee"`.
    pub name: String,
    pub features: Features,
    /// Highest rating the player accepts (0 = no rating support).
    pub max_rating: i8,
}

impl PlayerInfo {
    pub fn new(name: impl Into<String>, features: Features, max_rating: i8) -> Self {
        Self {
            name: name.into(),
            features,
            max_rating,
        }
    }

    /// Whether the player claims to support `control`.
    pub fn supports(&self, control: &Control) -> bool {
        self.features.contains(control.required_feature())
    }

    pub(crate) fn write(&self, w: &mut SerialWriter) {
        w.write_s(&self.name)
            .write_i(self.features.bits() as i32)
            .write_y(self.max_rating);
    }

    pub(crate) fn read(r: &mut SerialReader<'_>) -> Result<Self, RemucoError> {
        Ok(Self {
            name: r.read_s()?,
            features: Features::from_bits_retain(r.read_i()? as u32),
            max_rating: r.read_y()?,
        })
    }
}

// ── ClientInfo ───────────────────────────────────────────────────

/// What the client tells the server about itself after `CONN_PINFO`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Edge length of cover images in pixels (0 = no images).
    pub image_size: i32,
    /// Preferred image encoding, e.g. `"JPEG"`.
    pub image_type: String,
    /// Number of list entries per requested page.
    pub page_size: i32,
    /// Free-form device description.
    pub device: BTreeMap<String, String>,
}

impl Default for ClientInfo {
    fn default() -> Self {
        let mut device = BTreeMap::new();
        device.insert("name".to_string(), env!("CARGO_PKG_NAME").to_string());
        device.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
        Self {
            image_size: 0,
            image_type: "JPEG".into(),
            page_size: 50,
            device,
        }
    }
}

impl ClientInfo {
    pub(crate) fn write(&self, w: &mut SerialWriter) {
        w.write_i(self.image_size)
            .write_s(&self.image_type)
            .write_i(self.page_size)
            .write_as(&flatten_map(&self.device));
    }

    pub(crate) fn read(r: &mut SerialReader<'_>) -> Result<Self, RemucoError> {
        Ok(Self {
            image_size: r.read_i()?,
            image_type: r.read_s()?,
            page_size: r.read_i()?,
            device: unflatten_map(r.read_as()?, "device info")?,
        })
    }
}

// ── PlayerState ──────────────────────────────────────────────────

/// Playback status. Values a newer server may add are kept in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Playback {
    #[default]
    Stop,
    Pause,
    Play,
    Unknown(i8),
}

impl Playback {
    pub fn as_raw(self) -> i8 {
        match self {
            Playback::Stop => 0,
            Playback::Pause => 1,
            Playback::Play => 2,
            Playback::Unknown(v) => v,
        }
    }

    pub fn from_raw(value: i8) -> Self {
        match value {
            0 => Playback::Stop,
            1 => Playback::Pause,
            2 => Playback::Play,
            v => Playback::Unknown(v),
        }
    }
}

/// Synchronized control state of the player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerState {
    pub playback: Playback,
    /// Volume in percent (`0..=100`).
    pub volume: u8,
    pub repeat: bool,
    pub shuffle: bool,
    /// Position of the current item in the playlist or queue.
    pub position: i32,
    /// `true` if the current item plays from the queue.
    pub queue: bool,
}

impl PlayerState {
    pub(crate) fn write(&self, w: &mut SerialWriter) {
        w.write_y(self.playback.as_raw())
            .write_y(self.volume.min(100) as i8)
            .write_b(self.repeat)
            .write_b(self.shuffle)
            .write_i(self.position)
            .write_b(self.queue);
    }

    pub(crate) fn read(r: &mut SerialReader<'_>) -> Result<Self, RemucoError> {
        Ok(Self {
            playback: Playback::from_raw(r.read_y()?),
            volume: r.read_y()?.clamp(0, 100) as u8,
            repeat: r.read_b()?,
            shuffle: r.read_b()?,
            position: r.read_i()?,
            queue: r.read_b()?,
        })
    }
}

// ── Progress ─────────────────────────────────────────────────────

/// Playback position of the current item, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub progress: i32,
    /// Item length; negative or zero if unknown.
    pub length: i32,
}

impl Progress {
    pub fn new(progress: i32, length: i32) -> Self {
        Self { progress, length }
    }

    /// `"1:05 / 3:20"`, or only the elapsed time if the length is unknown.
    pub fn display(&self) -> String {
        let elapsed = format_time(self.progress);
        if self.length > 0 {
            format!("{elapsed} / {}", format_time(self.length))
        } else {
            elapsed
        }
    }

    pub(crate) fn write(&self, w: &mut SerialWriter) {
        w.write_i(self.progress).write_i(self.length);
    }

    pub(crate) fn read(r: &mut SerialReader<'_>) -> Result<Self, RemucoError> {
        Ok(Self {
            progress: r.read_i()?,
            length: r.read_i()?,
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Maps travel as a flat `AS`: key, value, key, value, ...
pub(crate) fn flatten_map(map: &BTreeMap<String, String>) -> Vec<&str> {
    map.iter()
        .flat_map(|(k, v)| [k.as_str(), v.as_str()])
        .collect()
}

pub(crate) fn unflatten_map(
    flat: Vec<String>,
    what: &str,
) -> Result<BTreeMap<String, String>, RemucoError> {
    if flat.len() % 2 != 0 {
        return Err(RemucoError::decoding(format!(
            "{what} has an odd number of entries ({})",
            flat.len()
        )));
    }
    let mut map = BTreeMap::new();
    let mut it = flat.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        map.insert(k, v);
    }
    Ok(map)
}
