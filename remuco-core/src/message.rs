//! Message ids and the [`Message`] value carried over a Remuco connection.
//!
//! The wire uses a flat `i32` id space split into five disjoint bands of
//! width 100. Each band is a closed enum here; the numeric value only
//! appears at the serialization boundary (`as_raw` / `TryFrom<i32>`).
//!
//! ```text
//!   0          IGNORE (ping / no-op)
//!   100..199   CONN   connection control   (PINFO, CINFO, BYE)
//!   200..299   SYNC   state pushes         (STATE, PROGRESS, ITEM)
//!   300..399   CTRL   player control       (PLAYPAUSE .. SHUTDOWN)
//!   400..499   ACT    view activation      (PLAYLIST, QUEUE, MEDIALIB, FILES)
//!   500..599   REQ    request / reply      (ITEM, PLAYLIST, QUEUE, MLIB, FILES)
//! ```

use std::fmt;

use bytes::Bytes;

use crate::error::RemucoError;
use crate::packet::Frame;
use crate::protocol::{self, Payload};

/// The no-op id. Messages with this id are pings and get discarded.
pub const IGNORE: i32 = 0;

const CONN: i32 = 100;
const SYNC: i32 = 200;
const CTRL: i32 = 300;
const ACT: i32 = 400;
const REQ: i32 = 500;

/// Width of every id band.
pub const BAND_WIDTH: i32 = 100;

/// Returns `true` if the raw id lies in the request band `[500, 600)`.
///
/// Part of the stable wire contract; works on ids this crate does not
/// know about.
pub fn is_request(id: i32) -> bool {
    id >= REQ && id < REQ + BAND_WIDTH
}

// ── Band ─────────────────────────────────────────────────────────

/// The five id bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Conn,
    Sync,
    Ctrl,
    Act,
    Req,
}

impl Band {
    /// Classifies a raw id. `IGNORE` and out-of-range ids have no band.
    pub fn of(id: i32) -> Option<Band> {
        match id {
            _ if (CONN..CONN + BAND_WIDTH).contains(&id) => Some(Band::Conn),
            _ if (SYNC..SYNC + BAND_WIDTH).contains(&id) => Some(Band::Sync),
            _ if (CTRL..CTRL + BAND_WIDTH).contains(&id) => Some(Band::Ctrl),
            _ if (ACT..ACT + BAND_WIDTH).contains(&id) => Some(Band::Act),
            _ if is_request(id) => Some(Band::Req),
            _ => None,
        }
    }

    /// First id of the band.
    pub fn base(self) -> i32 {
        match self {
            Band::Conn => CONN,
            Band::Sync => SYNC,
            Band::Ctrl => CTRL,
            Band::Act => ACT,
            Band::Req => REQ,
        }
    }
}

// ── Per-band id enums ────────────────────────────────────────────

macro_rules! id_band {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[repr(i32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl $name {
            /// Every id of this band, in wire order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The wire value.
            pub fn as_raw(self) -> i32 {
                self as i32
            }

            /// The protocol name, e.g. `"CTRL_SEEK"`.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = RemucoError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $( v if v == $value => Ok($name::$variant), )+
                    _ => Err(RemucoError::UnknownVariant {
                        type_name: stringify!($name),
                        value: value as i64,
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

id_band! {
    /// Connection control (`100..199`).
    ConnId {
        /// Player info, sent by the server during the handshake.
        PlayerInfo = CONN + 10 => "CONN_PINFO",
        /// Client info, the client's answer to `CONN_PINFO`.
        ClientInfo = CONN + 20 => "CONN_CINFO",
        /// Graceful close announced by the server.
        Bye = CONN + 90 => "CONN_BYE",
    }
}

id_band! {
    /// Unsolicited state pushes from the server (`200..299`).
    SyncId {
        State = SYNC => "SYNC_STATE",
        Progress = SYNC + 1 => "SYNC_PROGRESS",
        Item = SYNC + 2 => "SYNC_ITEM",
    }
}

id_band! {
    /// Player control (`300..399`).
    CtrlId {
        PlayPause = CTRL => "CTRL_PLAYPAUSE",
        Next = CTRL + 1 => "CTRL_NEXT",
        Prev = CTRL + 2 => "CTRL_PREV",
        Seek = CTRL + 3 => "CTRL_SEEK",
        Volume = CTRL + 4 => "CTRL_VOLUME",
        Repeat = CTRL + 5 => "CTRL_REPEAT",
        Shuffle = CTRL + 6 => "CTRL_SHUFFLE",
        Fullscreen = CTRL + 7 => "CTRL_FULLSCREEN",
        Rate = CTRL + 8 => "CTRL_RATE",
        ClearPlaylist = CTRL + 20 => "CTRL_CLEAR_PL",
        ClearQueue = CTRL + 21 => "CTRL_CLEAR_QU",
        Tag = CTRL + 30 => "CTRL_TAG",
        Shutdown = CTRL + 90 => "CTRL_SHUTDOWN",
    }
}

id_band! {
    /// Browsing-context activation (`400..499`). Never carries a payload.
    ActId {
        Playlist = ACT => "ACT_PLAYLIST",
        Queue = ACT + 1 => "ACT_QUEUE",
        MediaLib = ACT + 2 => "ACT_MEDIALIB",
        Files = ACT + 3 => "ACT_FILES",
    }
}

id_band! {
    /// Request classes (`500..599`). The server answers with the same id.
    ReqId {
        Item = REQ => "REQ_ITEM",
        Playlist = REQ + 1 => "REQ_PLAYLIST",
        Queue = REQ + 2 => "REQ_QUEUE",
        MediaLib = REQ + 3 => "REQ_MLIB",
        Files = REQ + 4 => "REQ_FILES",
    }
}

// ── MessageId ────────────────────────────────────────────────────

/// A known message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageId {
    #[default]
    Ignore,
    Conn(ConnId),
    Sync(SyncId),
    Ctrl(CtrlId),
    Act(ActId),
    Req(ReqId),
}

impl MessageId {
    /// The wire value.
    pub fn as_raw(self) -> i32 {
        match self {
            MessageId::Ignore => IGNORE,
            MessageId::Conn(id) => id.as_raw(),
            MessageId::Sync(id) => id.as_raw(),
            MessageId::Ctrl(id) => id.as_raw(),
            MessageId::Act(id) => id.as_raw(),
            MessageId::Req(id) => id.as_raw(),
        }
    }

    /// The band this id belongs to (`None` for `IGNORE`).
    pub fn band(self) -> Option<Band> {
        Band::of(self.as_raw())
    }

    pub fn is_request(self) -> bool {
        is_request(self.as_raw())
    }

    /// Ids a server may legitimately send to the client.
    pub fn sent_by_server(self) -> bool {
        matches!(
            self,
            MessageId::Ignore
                | MessageId::Conn(ConnId::PlayerInfo | ConnId::Bye)
                | MessageId::Sync(_)
                | MessageId::Req(_)
        )
    }

    /// Ids the client may send to the server.
    pub fn sent_by_client(self) -> bool {
        matches!(
            self,
            MessageId::Ignore
                | MessageId::Conn(ConnId::ClientInfo | ConnId::Bye)
                | MessageId::Ctrl(_)
                | MessageId::Act(_)
                | MessageId::Req(_)
        )
    }
}

impl TryFrom<i32> for MessageId {
    type Error = RemucoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match Band::of(value) {
            _ if value == IGNORE => Ok(MessageId::Ignore),
            Some(Band::Conn) => ConnId::try_from(value).map(MessageId::Conn),
            Some(Band::Sync) => SyncId::try_from(value).map(MessageId::Sync),
            Some(Band::Ctrl) => CtrlId::try_from(value).map(MessageId::Ctrl),
            Some(Band::Act) => ActId::try_from(value).map(MessageId::Act),
            Some(Band::Req) => ReqId::try_from(value).map(MessageId::Req),
            None => Err(RemucoError::UnknownVariant {
                type_name: "MessageId",
                value: value as i64,
            }),
        }
    }
}

impl From<ConnId> for MessageId {
    fn from(id: ConnId) -> Self {
        MessageId::Conn(id)
    }
}

impl From<SyncId> for MessageId {
    fn from(id: SyncId) -> Self {
        MessageId::Sync(id)
    }
}

impl From<CtrlId> for MessageId {
    fn from(id: CtrlId) -> Self {
        MessageId::Ctrl(id)
    }
}

impl From<ActId> for MessageId {
    fn from(id: ActId) -> Self {
        MessageId::Act(id)
    }
}

impl From<ReqId> for MessageId {
    fn from(id: ReqId) -> Self {
        MessageId::Req(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Ignore => f.write_str("IGNORE"),
            MessageId::Conn(id) => id.fmt(f),
            MessageId::Sync(id) => id.fmt(f),
            MessageId::Ctrl(id) => id.fmt(f),
            MessageId::Act(id) => id.fmt(f),
            MessageId::Req(id) => id.fmt(f),
        }
    }
}

// ── Message ──────────────────────────────────────────────────────

/// A message received from or to be sent to the server.
///
/// The payload is opaque here; its layout is selected by `id` in
/// [`crate::protocol::serial`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    payload: Bytes,
}

impl Message {
    pub fn new(id: impl Into<MessageId>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }

    /// A message without payload (ACT triggers, most CTRL ids, BYE).
    pub fn empty(id: impl Into<MessageId>) -> Self {
        Self::new(id, Bytes::new())
    }

    /// Serializes `payload` for `id` and wraps it in a message.
    pub fn encode(id: impl Into<MessageId>, payload: &Payload) -> Result<Self, RemucoError> {
        let id = id.into();
        let bytes = protocol::encode(id, payload)?;
        Ok(Self::new(id, bytes))
    }

    /// Decodes the payload as sent by the server.
    pub fn decode(&self) -> Result<Payload, RemucoError> {
        protocol::decode(self.id, &self.payload)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn is_request(&self) -> bool {
        self.id.is_request()
    }

    /// Logs the message header and its raw bytes at trace level.
    pub fn dump(&self) {
        tracing::trace!(message = %self, bytes = ?&self.payload[..], "message dump");
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(id: {}, data: {})", self.id.as_raw(), self.payload.len())
    }
}

impl TryFrom<Frame> for Message {
    type Error = RemucoError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let id = MessageId::try_from(frame.id())?;
        Ok(Self::new(id, frame.into_data()))
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        Frame::new(message.id.as_raw(), message.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_band_is_exactly_500_to_599() {
        for id in -1_000..2_000 {
            assert_eq!(is_request(id), (500..600).contains(&id), "id {id}");
        }
        assert!(!is_request(i32::MIN));
        assert!(!is_request(i32::MAX));
    }

    #[test]
    fn wire_values_are_stable() {
        assert_eq!(ConnId::PlayerInfo.as_raw(), 110);
        assert_eq!(ConnId::ClientInfo.as_raw(), 120);
        assert_eq!(ConnId::Bye.as_raw(), 190);
        assert_eq!(SyncId::Item.as_raw(), 202);
        assert_eq!(CtrlId::Rate.as_raw(), 308);
        assert_eq!(CtrlId::ClearQueue.as_raw(), 321);
        assert_eq!(CtrlId::Tag.as_raw(), 330);
        assert_eq!(CtrlId::Shutdown.as_raw(), 390);
        assert_eq!(ActId::Files.as_raw(), 403);
        assert_eq!(ReqId::Files.as_raw(), 504);
    }

    #[test]
    fn every_known_id_roundtrips() {
        let ids = std::iter::once(MessageId::Ignore)
            .chain(ConnId::ALL.iter().map(|&id| id.into()))
            .chain(SyncId::ALL.iter().map(|&id| id.into()))
            .chain(CtrlId::ALL.iter().map(|&id| id.into()))
            .chain(ActId::ALL.iter().map(|&id| id.into()))
            .chain(ReqId::ALL.iter().map(|&id| id.into()));
        for id in ids {
            assert_eq!(MessageId::try_from(id.as_raw()).unwrap(), id);
            assert_eq!(id.is_request(), is_request(id.as_raw()));
        }
    }

    #[test]
    fn unknown_ids_are_rejected() {
        assert!(MessageId::try_from(999).is_err());
        assert!(MessageId::try_from(150).is_err());
        assert!(MessageId::try_from(-1).is_err());
        assert!(CtrlId::try_from(200).is_err());
    }

    #[test]
    fn bands() {
        assert_eq!(Band::of(0), None);
        assert_eq!(Band::of(110), Some(Band::Conn));
        assert_eq!(Band::of(299), Some(Band::Sync));
        assert_eq!(Band::of(390), Some(Band::Ctrl));
        assert_eq!(Band::of(403), Some(Band::Act));
        assert_eq!(Band::of(599), Some(Band::Req));
        assert_eq!(Band::of(600), None);
        assert_eq!(MessageId::Ignore.band(), None);
        assert_eq!(Band::Req.base(), 500);
    }

    #[test]
    fn direction() {
        assert!(MessageId::from(SyncId::State).sent_by_server());
        assert!(!MessageId::from(SyncId::State).sent_by_client());
        assert!(MessageId::from(CtrlId::Seek).sent_by_client());
        assert!(!MessageId::from(CtrlId::Seek).sent_by_server());
        assert!(!MessageId::from(ConnId::ClientInfo).sent_by_server());
        assert!(MessageId::from(ReqId::Queue).sent_by_server());
    }

    #[test]
    fn default_message_is_empty_ignore() {
        let msg = Message::default();
        assert_eq!(msg.id(), MessageId::Ignore);
        assert!(msg.payload().is_empty());
        assert_eq!(msg.to_string(), "(id: 0, data: 0)");
    }

    #[test]
    fn display_and_names() {
        let msg = Message::new(ReqId::Playlist, vec![1, 2, 3]);
        assert_eq!(msg.to_string(), "(id: 501, data: 3)");
        assert!(msg.is_request());
        assert_eq!(MessageId::from(CtrlId::ClearPlaylist).to_string(), "CTRL_CLEAR_PL");
    }

    #[test]
    fn frame_conversion() {
        let frame = Frame::new(201, Bytes::from_static(&[0xAA]));
        let msg = Message::try_from(frame).unwrap();
        assert_eq!(msg.id(), MessageId::Sync(SyncId::Progress));

        let back: Frame = msg.into();
        assert_eq!(back.id(), 201);

        assert!(Message::try_from(Frame::new(999, Bytes::new())).is_err());
    }
}
