//! Payload definitions and the id-driven payload codec.
//!
//! The message id alone selects the payload layout. Shapes differ by
//! direction for the request band: the client sends a scope parameter
//! under a `REQ_*` id and the server answers with data under the same id.
//!
//! Decoders are lenient about what they do not know (trailing bytes,
//! unknown enum values, unknown feature bits) and strict about what they
//! do (truncation and wrong element types are errors).

pub mod control;
pub mod item;
pub mod player;
pub mod serial;

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::error::RemucoError;
use crate::message::{ConnId, CtrlId, MessageId, ReqId, SyncId};

pub use control::{Activation, Control, Request};
pub use item::{Item, ItemList, Tag};
pub use player::{ClientInfo, Features, Playback, PlayerInfo, PlayerState, Progress};
pub use serial::{SerialReader, SerialWriter};

// ── Payload ──────────────────────────────────────────────────────

/// A decoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Empty,
    PlayerInfo(PlayerInfo),
    ClientInfo(ClientInfo),
    State(PlayerState),
    Progress(Progress),
    Item(Item),
    ItemList(ItemList),
    /// Scalar argument of `CTRL_SEEK`, `CTRL_VOLUME`, `CTRL_RATE`.
    Int(i32),
    /// Flag argument of `CTRL_REPEAT`, `CTRL_SHUFFLE`.
    Flag(bool),
    Tag(Tag),
    /// Scope of `REQ_ITEM`.
    ItemId(String),
    /// Scope of `REQ_MLIB` and `REQ_FILES`.
    Path(Vec<String>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Empty => PayloadKind::Empty,
            Payload::PlayerInfo(_) => PayloadKind::PlayerInfo,
            Payload::ClientInfo(_) => PayloadKind::ClientInfo,
            Payload::State(_) => PayloadKind::State,
            Payload::Progress(_) => PayloadKind::Progress,
            Payload::Item(_) => PayloadKind::Item,
            Payload::ItemList(_) => PayloadKind::ItemList,
            Payload::Int(_) => PayloadKind::Int,
            Payload::Flag(_) => PayloadKind::Flag,
            Payload::Tag(_) => PayloadKind::Tag,
            Payload::ItemId(_) => PayloadKind::ItemId,
            Payload::Path(_) => PayloadKind::Path,
        }
    }

    fn write(&self, w: &mut SerialWriter) {
        match self {
            Payload::Empty => {}
            Payload::PlayerInfo(info) => info.write(w),
            Payload::ClientInfo(info) => info.write(w),
            Payload::State(state) => state.write(w),
            Payload::Progress(progress) => progress.write(w),
            Payload::Item(item) => item.write(w),
            Payload::ItemList(list) => list.write(w),
            Payload::Int(v) => {
                w.write_i(*v);
            }
            Payload::Flag(on) => {
                w.write_b(*on);
            }
            Payload::Tag(tag) => tag.write(w),
            Payload::ItemId(id) => {
                w.write_s(id);
            }
            Payload::Path(path) => {
                w.write_as(path);
            }
        }
    }
}

/// The shape of a payload, independent of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Empty,
    PlayerInfo,
    ClientInfo,
    State,
    Progress,
    Item,
    ItemList,
    Int,
    Flag,
    Tag,
    ItemId,
    Path,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which peer produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Server,
    Client,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Server => write!(f, "server"),
            Origin::Client => write!(f, "client"),
        }
    }
}

/// The payload shape `origin` sends under `id`, or `None` if it never
/// sends that id.
pub fn expected_kind(origin: Origin, id: MessageId) -> Option<PayloadKind> {
    use Origin::{Client, Server};

    let kind = match (origin, id) {
        (_, MessageId::Ignore) => PayloadKind::Empty,
        (_, MessageId::Conn(ConnId::Bye)) => PayloadKind::Empty,
        (Server, MessageId::Conn(ConnId::PlayerInfo)) => PayloadKind::PlayerInfo,
        (Client, MessageId::Conn(ConnId::ClientInfo)) => PayloadKind::ClientInfo,

        (Server, MessageId::Sync(SyncId::State)) => PayloadKind::State,
        (Server, MessageId::Sync(SyncId::Progress)) => PayloadKind::Progress,
        (Server, MessageId::Sync(SyncId::Item)) => PayloadKind::Item,

        (Client, MessageId::Ctrl(CtrlId::Seek | CtrlId::Volume | CtrlId::Rate)) => {
            PayloadKind::Int
        }
        (Client, MessageId::Ctrl(CtrlId::Repeat | CtrlId::Shuffle)) => PayloadKind::Flag,
        (Client, MessageId::Ctrl(CtrlId::Tag)) => PayloadKind::Tag,
        (Client, MessageId::Ctrl(_)) => PayloadKind::Empty,
        (Client, MessageId::Act(_)) => PayloadKind::Empty,

        (Client, MessageId::Req(ReqId::Item)) => PayloadKind::ItemId,
        (Client, MessageId::Req(ReqId::Playlist | ReqId::Queue)) => PayloadKind::Empty,
        (Client, MessageId::Req(ReqId::MediaLib | ReqId::Files)) => PayloadKind::Path,
        (Server, MessageId::Req(ReqId::Item)) => PayloadKind::Item,
        (Server, MessageId::Req(_)) => PayloadKind::ItemList,

        _ => return None,
    };
    Some(kind)
}

// ── Codec entry points ───────────────────────────────────────────

/// Serializes `payload` for `id`.
///
/// Fails with [`RemucoError::Encoding`] if neither peer sends that shape
/// under `id` (e.g. a volume level for a `CONN_*` id).
pub fn encode(id: MessageId, payload: &Payload) -> Result<Bytes, RemucoError> {
    let kind = payload.kind();
    let fits = [Origin::Client, Origin::Server]
        .into_iter()
        .any(|origin| expected_kind(origin, id) == Some(kind));
    if !fits {
        return Err(RemucoError::encoding(format!(
            "{id} does not carry a {kind} payload"
        )));
    }
    let mut w = SerialWriter::new();
    payload.write(&mut w);
    Ok(w.finish())
}

/// Decodes a payload received from the server.
pub fn decode(id: MessageId, data: &[u8]) -> Result<Payload, RemucoError> {
    decode_from(Origin::Server, id, data)
}

/// Decodes a payload produced by `origin`.
pub fn decode_from(origin: Origin, id: MessageId, data: &[u8]) -> Result<Payload, RemucoError> {
    let kind = expected_kind(origin, id)
        .ok_or_else(|| RemucoError::decoding(format!("{id} is never sent by the {origin}")))?;

    let mut r = SerialReader::new(data);
    let payload = match kind {
        PayloadKind::Empty => Payload::Empty,
        PayloadKind::PlayerInfo => Payload::PlayerInfo(PlayerInfo::read(&mut r)?),
        PayloadKind::ClientInfo => Payload::ClientInfo(ClientInfo::read(&mut r)?),
        PayloadKind::State => Payload::State(PlayerState::read(&mut r)?),
        PayloadKind::Progress => Payload::Progress(Progress::read(&mut r)?),
        PayloadKind::Item => Payload::Item(Item::read(&mut r)?),
        PayloadKind::ItemList => Payload::ItemList(ItemList::read(&mut r)?),
        PayloadKind::Int => Payload::Int(r.read_i()?),
        PayloadKind::Flag => Payload::Flag(r.read_b()?),
        PayloadKind::Tag => Payload::Tag(Tag::read(&mut r)?),
        PayloadKind::ItemId => Payload::ItemId(r.read_s()?),
        PayloadKind::Path => Payload::Path(r.read_as()?),
    };

    if r.remaining() > 0 {
        tracing::trace!(%id, extra = r.remaining(), "ignoring trailing payload bytes");
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ActId;

    fn roundtrip(origin: Origin, id: impl Into<MessageId>, payload: Payload) {
        let id = id.into();
        let bytes = encode(id, &payload).unwrap();
        assert_eq!(decode_from(origin, id, &bytes).unwrap(), payload, "{id}");
    }

    #[test]
    fn roundtrip_per_band() {
        roundtrip(
            Origin::Server,
            ConnId::PlayerInfo,
            Payload::PlayerInfo(PlayerInfo::new("MPD", Features::all(), 5)),
        );
        roundtrip(
            Origin::Client,
            ConnId::ClientInfo,
            Payload::ClientInfo(ClientInfo::default()),
        );
        roundtrip(
            Origin::Server,
            SyncId::State,
            Payload::State(PlayerState {
                playback: Playback::Play,
                volume: 73,
                repeat: true,
                shuffle: false,
                position: 12,
                queue: true,
            }),
        );
        roundtrip(
            Origin::Server,
            SyncId::Progress,
            Payload::Progress(Progress::new(65, 240)),
        );
        roundtrip(
            Origin::Server,
            SyncId::Item,
            Payload::Item(Item {
                id: "42".into(),
                meta: [("title".to_string(), "Song".to_string())].into(),
                image: vec![0xFF, 0xD8],
            }),
        );
        roundtrip(Origin::Client, CtrlId::Volume, Payload::Int(55));
        roundtrip(Origin::Client, CtrlId::Shuffle, Payload::Flag(true));
        roundtrip(
            Origin::Client,
            CtrlId::Tag,
            Payload::Tag(Tag::new("42", vec!["a".into(), "b".into()])),
        );
        roundtrip(Origin::Client, ActId::MediaLib, Payload::Empty);
        roundtrip(Origin::Client, ReqId::Item, Payload::ItemId("42".into()));
        roundtrip(
            Origin::Client,
            ReqId::Files,
            Payload::Path(vec!["home".into()]),
        );
        roundtrip(
            Origin::Server,
            ReqId::Playlist,
            Payload::ItemList(ItemList {
                path: vec![],
                nested: vec![],
                ids: vec!["1".into()],
                names: vec!["One".into()],
            }),
        );
    }

    #[test]
    fn encode_rejects_wrong_shape() {
        let err = encode(ConnId::Bye.into(), &Payload::Int(50)).unwrap_err();
        assert!(matches!(err, RemucoError::Encoding(_)));
        assert!(encode(SyncId::State.into(), &Payload::Progress(Progress::default())).is_err());
        assert!(encode(ActId::Queue.into(), &Payload::Flag(true)).is_err());
    }

    #[test]
    fn truncated_player_info_fails() {
        let bytes = encode(
            ConnId::PlayerInfo.into(),
            &Payload::PlayerInfo(PlayerInfo::new("Rhythmbox", Features::empty(), 0)),
        )
        .unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            decode(ConnId::PlayerInfo.into(), cut),
            Err(RemucoError::Decoding(_))
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = encode(
            SyncId::Progress.into(),
            &Payload::Progress(Progress::new(1, 2)),
        )
        .unwrap()
        .to_vec();
        let mut extra = SerialWriter::new();
        extra.write_s("field from a newer server");
        bytes.extend_from_slice(&extra.finish());

        assert_eq!(
            decode(SyncId::Progress.into(), &bytes).unwrap(),
            Payload::Progress(Progress::new(1, 2))
        );
    }

    #[test]
    fn server_never_sends_controls() {
        assert!(expected_kind(Origin::Server, CtrlId::Seek.into()).is_none());
        assert!(decode(CtrlId::Seek.into(), &[]).is_err());
        assert!(decode(ConnId::ClientInfo.into(), &[]).is_err());
    }

    #[test]
    fn empty_payloads_tolerate_extra_bytes() {
        assert_eq!(
            decode(ConnId::Bye.into(), &[1, 2, 3]).unwrap(),
            Payload::Empty
        );
    }
}
