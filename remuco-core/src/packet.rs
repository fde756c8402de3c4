//! Wire frames: the byte layout every message travels in.
//!
//! ```text
//! hello (server → client, once, right after connect):
//!   FF FF FF <version>
//!
//! frame:
//!   prefix   FF FE FD        (3)
//!   id       i32 big-endian  (4)
//!   length   i32 big-endian  (4)
//!   payload  [u8; length]
//!   suffix   FD FE FF        (3)
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::RemucoError;

/// Protocol version this client speaks.
pub const PROTOCOL_VERSION: u8 = 0x0A;

/// Hello marker preceding the version byte.
pub const HELLO_MARKER: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Length of the server hello.
pub const HELLO_SIZE: usize = HELLO_MARKER.len() + 1;

pub const PREFIX: [u8; 3] = [0xFF, 0xFE, 0xFD];
pub const SUFFIX: [u8; 3] = [0xFD, 0xFE, 0xFF];

/// Prefix + id + length.
pub const HEADER_SIZE: usize = PREFIX.len() + 4 + 4;

/// Largest payload accepted in either direction (item images included).
pub const MAX_PAYLOAD_SIZE: usize = 4 * 1024 * 1024;

/// Largest complete frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + SUFFIX.len();

/// The hello a server sends for `version`.
pub fn hello(version: u8) -> [u8; HELLO_SIZE] {
    [HELLO_MARKER[0], HELLO_MARKER[1], HELLO_MARKER[2], version]
}

/// A raw frame: an id that may or may not be known, plus payload bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    id: i32,
    data: Bytes,
}

impl Frame {
    pub fn new(id: i32, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Total size on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.data.len() + SUFFIX.len()
    }

    /// Appends the framed bytes to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) -> Result<(), RemucoError> {
        if self.data.len() > MAX_PAYLOAD_SIZE {
            return Err(RemucoError::FrameTooLarge {
                size: self.data.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        dst.reserve(self.wire_len());
        dst.put_slice(&PREFIX);
        dst.put_i32(self.id);
        dst.put_i32(self.data.len() as i32);
        dst.put_slice(&self.data);
        dst.put_slice(&SUFFIX);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Bytes, RemucoError> {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.write_to(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Parses exactly one complete frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RemucoError> {
        let (id, len) = match parse_header(bytes)? {
            Some(header) => header,
            None => return Err(RemucoError::Framing("frame shorter than its header")),
        };
        let total = HEADER_SIZE + len + SUFFIX.len();
        if bytes.len() != total {
            return Err(RemucoError::Framing("frame length does not match its header"));
        }
        if bytes[HEADER_SIZE + len..] != SUFFIX {
            return Err(RemucoError::Framing("invalid frame suffix"));
        }
        Ok(Self::new(
            id,
            Bytes::copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + len]),
        ))
    }
}

/// Reads `(id, payload length)` from the start of `bytes`.
///
/// Returns `Ok(None)` while fewer than [`HEADER_SIZE`] bytes are available.
pub(crate) fn parse_header(bytes: &[u8]) -> Result<Option<(i32, usize)>, RemucoError> {
    if bytes.len() < HEADER_SIZE {
        return Ok(None);
    }
    if bytes[..PREFIX.len()] != PREFIX {
        return Err(RemucoError::Framing("invalid frame prefix"));
    }
    let mut header = &bytes[PREFIX.len()..HEADER_SIZE];
    let id = header.get_i32();
    let len = header.get_i32();
    if len < 0 {
        return Err(RemucoError::Framing("negative payload length"));
    }
    let len = len as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(RemucoError::FrameTooLarge {
            size: len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(Some((id, len)))
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}
