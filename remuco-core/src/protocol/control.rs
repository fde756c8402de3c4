//! Typed client actions: player controls, view activations and requests.
//!
//! Each type knows its message id and payload, so callers never deal
//! with raw ids.

use serde::{Deserialize, Serialize};

use crate::error::RemucoError;
use crate::message::{ActId, CtrlId, Message, ReqId};
use crate::protocol::item::Tag;
use crate::protocol::player::Features;
use crate::protocol::Payload;

// ── Control ──────────────────────────────────────────────────────

/// A player control (`CTRL_*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Control {
    PlayPause,
    Next,
    Prev,
    /// Relative seek in seconds (negative = backwards).
    Seek(i32),
    /// Absolute volume level in percent.
    Volume(i32),
    Repeat(bool),
    Shuffle(bool),
    Fullscreen,
    /// Rating for the current item, `0..=max_rating`.
    Rate(i32),
    ClearPlaylist,
    ClearQueue,
    Tag(Tag),
    /// Ask the server to shut the player down.
    Shutdown,
}

impl Control {
    pub fn id(&self) -> CtrlId {
        match self {
            Control::PlayPause => CtrlId::PlayPause,
            Control::Next => CtrlId::Next,
            Control::Prev => CtrlId::Prev,
            Control::Seek(_) => CtrlId::Seek,
            Control::Volume(_) => CtrlId::Volume,
            Control::Repeat(_) => CtrlId::Repeat,
            Control::Shuffle(_) => CtrlId::Shuffle,
            Control::Fullscreen => CtrlId::Fullscreen,
            Control::Rate(_) => CtrlId::Rate,
            Control::ClearPlaylist => CtrlId::ClearPlaylist,
            Control::ClearQueue => CtrlId::ClearQueue,
            Control::Tag(_) => CtrlId::Tag,
            Control::Shutdown => CtrlId::Shutdown,
        }
    }

    pub fn payload(&self) -> Payload {
        match self {
            Control::Seek(v) | Control::Volume(v) | Control::Rate(v) => Payload::Int(*v),
            Control::Repeat(on) | Control::Shuffle(on) => Payload::Flag(*on),
            Control::Tag(tag) => Payload::Tag(tag.clone()),
            _ => Payload::Empty,
        }
    }

    pub fn to_message(&self) -> Result<Message, RemucoError> {
        Message::encode(self.id(), &self.payload())
    }

    /// Rebuilds a control from its id and decoded payload.
    pub fn from_parts(id: CtrlId, payload: Payload) -> Result<Self, RemucoError> {
        let control = match (id, payload) {
            (CtrlId::PlayPause, Payload::Empty) => Control::PlayPause,
            (CtrlId::Next, Payload::Empty) => Control::Next,
            (CtrlId::Prev, Payload::Empty) => Control::Prev,
            (CtrlId::Seek, Payload::Int(v)) => Control::Seek(v),
            (CtrlId::Volume, Payload::Int(v)) => Control::Volume(v),
            (CtrlId::Repeat, Payload::Flag(on)) => Control::Repeat(on),
            (CtrlId::Shuffle, Payload::Flag(on)) => Control::Shuffle(on),
            (CtrlId::Fullscreen, Payload::Empty) => Control::Fullscreen,
            (CtrlId::Rate, Payload::Int(v)) => Control::Rate(v),
            (CtrlId::ClearPlaylist, Payload::Empty) => Control::ClearPlaylist,
            (CtrlId::ClearQueue, Payload::Empty) => Control::ClearQueue,
            (CtrlId::Tag, Payload::Tag(tag)) => Control::Tag(tag),
            (CtrlId::Shutdown, Payload::Empty) => Control::Shutdown,
            (id, payload) => {
                return Err(RemucoError::decoding(format!(
                    "{id} cannot carry a {} payload",
                    payload.kind()
                )));
            }
        };
        Ok(control)
    }

    /// The feature flag a player must announce for this control.
    pub(crate) fn required_feature(&self) -> Features {
        match self {
            Control::PlayPause => Features::CTRL_PLAYBACK,
            Control::Next => Features::CTRL_NEXT,
            Control::Prev => Features::CTRL_PREV,
            Control::Seek(_) => Features::CTRL_SEEK,
            Control::Volume(_) => Features::CTRL_VOLUME,
            Control::Repeat(_) => Features::CTRL_REPEAT,
            Control::Shuffle(_) => Features::CTRL_SHUFFLE,
            Control::Fullscreen => Features::CTRL_FULLSCREEN,
            Control::Rate(_) => Features::CTRL_RATE,
            Control::ClearPlaylist => Features::CTRL_CLEAR_PL,
            Control::ClearQueue => Features::CTRL_CLEAR_QU,
            Control::Tag(_) => Features::CTRL_TAG,
            Control::Shutdown => Features::SHUTDOWN,
        }
    }
}

// ── Activation ───────────────────────────────────────────────────

/// Selects a browsing context on the server (`ACT_*`, no payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Playlist,
    Queue,
    MediaLib,
    Files,
}

impl Activation {
    pub fn id(self) -> ActId {
        match self {
            Activation::Playlist => ActId::Playlist,
            Activation::Queue => ActId::Queue,
            Activation::MediaLib => ActId::MediaLib,
            Activation::Files => ActId::Files,
        }
    }

    pub fn to_message(self) -> Message {
        Message::empty(self.id())
    }
}

impl From<ActId> for Activation {
    fn from(id: ActId) -> Self {
        match id {
            ActId::Playlist => Activation::Playlist,
            ActId::Queue => Activation::Queue,
            ActId::MediaLib => Activation::MediaLib,
            ActId::Files => Activation::Files,
        }
    }
}

// ── Request ──────────────────────────────────────────────────────

/// A data request (`REQ_*`). Each expects exactly one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Full metadata (and image) of one item.
    Item(String),
    Playlist,
    Queue,
    /// A level of the media library; the empty path is the root.
    MediaLib(Vec<String>),
    /// A directory of the server's file browser; the empty path lists roots.
    Files(Vec<String>),
}

impl Request {
    /// The request class, used to correlate the reply.
    pub fn class(&self) -> ReqId {
        match self {
            Request::Item(_) => ReqId::Item,
            Request::Playlist => ReqId::Playlist,
            Request::Queue => ReqId::Queue,
            Request::MediaLib(_) => ReqId::MediaLib,
            Request::Files(_) => ReqId::Files,
        }
    }

    pub fn payload(&self) -> Payload {
        match self {
            Request::Item(id) => Payload::ItemId(id.clone()),
            Request::Playlist | Request::Queue => Payload::Empty,
            Request::MediaLib(path) | Request::Files(path) => Payload::Path(path.clone()),
        }
    }

    pub fn to_message(&self) -> Result<Message, RemucoError> {
        Message::encode(self.class(), &self.payload())
    }

    /// The feature flag a player must announce to answer this request.
    pub fn required_feature(&self) -> Features {
        match self {
            Request::Item(_) => Features::REQ_ITEM,
            Request::Playlist => Features::REQ_PL,
            Request::Queue => Features::REQ_QU,
            Request::MediaLib(_) => Features::REQ_MLIB,
            Request::Files(_) => Features::REQ_FILES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageId;
    use crate::protocol::{Origin, decode_from};

    #[test]
    fn control_messages_carry_expected_payloads() {
        let msg = Control::Seek(-10).to_message().unwrap();
        assert_eq!(msg.id(), MessageId::Ctrl(CtrlId::Seek));
        let payload = decode_from(Origin::Client, msg.id(), msg.payload()).unwrap();
        assert_eq!(payload, Payload::Int(-10));

        let msg = Control::Next.to_message().unwrap();
        assert!(msg.payload().is_empty());
    }

    #[test]
    fn control_from_parts() {
        let tag = Tag::new("42", vec!["rock".into()]);
        let control = Control::from_parts(CtrlId::Tag, Payload::Tag(tag.clone())).unwrap();
        assert_eq!(control, Control::Tag(tag));

        assert!(Control::from_parts(CtrlId::Seek, Payload::Flag(true)).is_err());
    }

    #[test]
    fn every_control_roundtrips_through_parts() {
        let controls = [
            Control::PlayPause,
            Control::Next,
            Control::Prev,
            Control::Seek(5),
            Control::Volume(80),
            Control::Repeat(true),
            Control::Shuffle(false),
            Control::Fullscreen,
            Control::Rate(3),
            Control::ClearPlaylist,
            Control::ClearQueue,
            Control::Tag(Tag::new("i", vec![])),
            Control::Shutdown,
        ];
        for control in controls {
            let msg = control.to_message().unwrap();
            let payload = decode_from(Origin::Client, msg.id(), msg.payload()).unwrap();
            assert_eq!(Control::from_parts(control.id(), payload).unwrap(), control);
        }
    }

    #[test]
    fn activations_are_empty() {
        for act in [
            Activation::Playlist,
            Activation::Queue,
            Activation::MediaLib,
            Activation::Files,
        ] {
            let msg = act.to_message();
            assert!(msg.payload().is_empty());
            assert_eq!(Activation::from(act.id()), act);
        }
    }

    #[test]
    fn request_classes_and_scope() {
        let req = Request::Files(vec!["home".into(), "music".into()]);
        assert_eq!(req.class(), ReqId::Files);
        let msg = req.to_message().unwrap();
        assert!(msg.is_request());
        let payload = decode_from(Origin::Client, msg.id(), msg.payload()).unwrap();
        assert_eq!(payload, Payload::Path(vec!["home".into(), "music".into()]));

        assert!(Request::Playlist.to_message().unwrap().payload().is_empty());
    }
}
