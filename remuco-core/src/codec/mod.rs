//! `tokio_util` codec turning the byte stream into [`Frame`]s.
//!
//! Incomplete input stays in the read buffer until the rest arrives;
//! nothing is ever dropped between reads.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::RemucoError;
use crate::packet::{
    self, Frame, HEADER_SIZE, HELLO_MARKER, HELLO_SIZE, PROTOCOL_VERSION, SUFFIX,
};

/// Framing codec for one side of a Remuco stream.
#[derive(Debug, Clone)]
pub struct RemucoCodec {
    /// `true` until the server hello has been consumed.
    awaiting_hello: bool,
}

impl RemucoCodec {
    /// Client-side codec: expects the server hello before the first frame.
    pub fn new() -> Self {
        Self {
            awaiting_hello: true,
        }
    }

    /// Codec for a stream whose hello was already exchanged (or that
    /// never carries one, such as the server side of a test harness).
    pub fn without_hello() -> Self {
        Self {
            awaiting_hello: false,
        }
    }

    pub fn is_awaiting_hello(&self) -> bool {
        self.awaiting_hello
    }

    fn decode_hello(&mut self, src: &mut BytesMut) -> Result<bool, RemucoError> {
        if src.len() < HELLO_SIZE {
            return Ok(false);
        }
        if src[..HELLO_MARKER.len()] != HELLO_MARKER {
            return Err(RemucoError::Handshake("server did not send a hello".into()));
        }
        let version = src[HELLO_MARKER.len()];
        if version != PROTOCOL_VERSION {
            return Err(RemucoError::UnsupportedVersion(version));
        }
        src.advance(HELLO_SIZE);
        self.awaiting_hello = false;
        tracing::debug!(version, "received server hello");
        Ok(true)
    }
}

impl Default for RemucoCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RemucoCodec {
    type Item = Frame;
    type Error = RemucoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.awaiting_hello && !self.decode_hello(src)? {
            return Ok(None);
        }

        let (id, len) = match packet::parse_header(src)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let total = HEADER_SIZE + len + SUFFIX.len();
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }
        if src[HEADER_SIZE + len..total] != SUFFIX {
            return Err(RemucoError::Framing("invalid frame suffix"));
        }

        let mut frame = src.split_to(total);
        frame.advance(HEADER_SIZE);
        frame.truncate(len);
        Ok(Some(Frame::new(id, frame.freeze())))
    }
}

impl Encoder<Frame> for RemucoCodec {
    type Error = RemucoError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::hello;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    fn framed(frame: &Frame) -> Vec<u8> {
        frame.to_bytes().unwrap().to_vec()
    }

    #[test]
    fn waits_for_hello_then_frames() {
        let mut codec = RemucoCodec::new();
        let mut buf = BytesMut::from(&[0xFF, 0xFF][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(codec.is_awaiting_hello());

        buf.extend_from_slice(&[0xFF, PROTOCOL_VERSION]);
        buf.extend_from_slice(&framed(&Frame::new(110, vec![7])));
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.id(), 110);
        assert_eq!(&frame.data()[..], &[7]);
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_wrong_version() {
        let mut codec = RemucoCodec::new();
        let mut buf = BytesMut::from(&hello(0x09)[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(RemucoError::UnsupportedVersion(0x09))
        ));
    }

    #[test]
    fn partial_frame_is_buffered() {
        let mut codec = RemucoCodec::without_hello();
        let bytes = framed(&Frame::new(201, vec![1, 2, 3, 4, 5, 6, 7, 8]));
        let (head, tail) = bytes.split_at(9);

        let mut buf = BytesMut::from(head);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 9);

        buf.extend_from_slice(tail);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.id(), 201);
        assert_eq!(frame.data().len(), 8);
    }

    #[test]
    fn two_frames_in_one_read() {
        let mut codec = RemucoCodec::without_hello();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&framed(&Frame::new(200, vec![1])));
        buf.extend_from_slice(&framed(&Frame::new(201, vec![2])));
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().id(), 200);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().id(), 201);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn corrupt_suffix_is_fatal() {
        let mut codec = RemucoCodec::without_hello();
        let mut bytes = framed(&Frame::new(200, vec![1]));
        let last = bytes.len() - 1;
        bytes[last] = 0;
        let mut buf = BytesMut::from(&bytes[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(RemucoError::Framing(_))
        ));
    }

    #[test]
    fn encode_matches_frame_layout() {
        let mut codec = RemucoCodec::without_hello();
        let frame = Frame::new(500, vec![9, 9]);
        let mut dst = BytesMut::new();
        codec.encode(frame.clone(), &mut dst).unwrap();
        assert_eq!(&dst[..], &framed(&frame)[..]);
    }

    #[tokio::test]
    async fn frames_split_across_reads() {
        let bytes = framed(&Frame::new(202, vec![0xAB; 32]));
        let mock = tokio_test::io::Builder::new()
            .read(&hello(PROTOCOL_VERSION)[..2])
            .read(&hello(PROTOCOL_VERSION)[2..])
            .read(&bytes[..5])
            .read(&bytes[5..20])
            .read(&bytes[20..])
            .build();

        let mut reader = FramedRead::new(mock, RemucoCodec::new());
        let frame = reader.next().await.unwrap().unwrap();
        assert_eq!(frame.id(), 202);
        assert_eq!(frame.data().len(), 32);
        assert!(reader.next().await.is_none());
    }
}
