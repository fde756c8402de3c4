//! Tagged-element binary serialization used inside message payloads.
//!
//! A payload is a sequence of elements. Every element starts with a one
//! byte type tag followed by its value; integers are big-endian and of
//! fixed width, there is no floating point.
//!
//! ```text
//! Y   i8                      N   i16
//! B   u8 (0 / 1)              I   i32
//! L   i64                     S   i32 length + UTF-8 bytes
//! AY  i32 length + bytes      AI  i32 count + i32 * count
//! AS  i32 count + (i32 length + UTF-8 bytes) * count
//! ```
//!
//! Readers consume exactly the elements they know about and ignore
//! whatever follows, so newer servers can append fields.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::RemucoError;

pub const TYPE_Y: u8 = 1;
pub const TYPE_I: u8 = 2;
pub const TYPE_B: u8 = 3;
pub const TYPE_S: u8 = 4;
pub const TYPE_AY: u8 = 5;
pub const TYPE_AI: u8 = 6;
pub const TYPE_AS: u8 = 7;
pub const TYPE_L: u8 = 8;
pub const TYPE_N: u8 = 9;

fn type_name(tag: u8) -> &'static str {
    match tag {
        TYPE_Y => "Y",
        TYPE_I => "I",
        TYPE_B => "B",
        TYPE_S => "S",
        TYPE_AY => "AY",
        TYPE_AI => "AI",
        TYPE_AS => "AS",
        TYPE_L => "L",
        TYPE_N => "N",
        _ => "?",
    }
}

// ── Writer ───────────────────────────────────────────────────────

/// Builds a payload element by element.
#[derive(Debug, Default)]
pub struct SerialWriter {
    buf: BytesMut,
}

impl SerialWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_y(&mut self, value: i8) -> &mut Self {
        self.buf.put_u8(TYPE_Y);
        self.buf.put_i8(value);
        self
    }

    pub fn write_b(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(TYPE_B);
        self.buf.put_u8(value as u8);
        self
    }

    pub fn write_n(&mut self, value: i16) -> &mut Self {
        self.buf.put_u8(TYPE_N);
        self.buf.put_i16(value);
        self
    }

    pub fn write_i(&mut self, value: i32) -> &mut Self {
        self.buf.put_u8(TYPE_I);
        self.buf.put_i32(value);
        self
    }

    pub fn write_l(&mut self, value: i64) -> &mut Self {
        self.buf.put_u8(TYPE_L);
        self.buf.put_i64(value);
        self
    }

    pub fn write_s(&mut self, value: &str) -> &mut Self {
        self.buf.put_u8(TYPE_S);
        self.put_str(value);
        self
    }

    pub fn write_ay(&mut self, value: &[u8]) -> &mut Self {
        self.buf.put_u8(TYPE_AY);
        self.buf.put_i32(value.len() as i32);
        self.buf.put_slice(value);
        self
    }

    pub fn write_ai(&mut self, value: &[i32]) -> &mut Self {
        self.buf.put_u8(TYPE_AI);
        self.buf.put_i32(value.len() as i32);
        for v in value {
            self.buf.put_i32(*v);
        }
        self
    }

    pub fn write_as<S: AsRef<str>>(&mut self, value: &[S]) -> &mut Self {
        self.buf.put_u8(TYPE_AS);
        self.buf.put_i32(value.len() as i32);
        for s in value {
            self.put_str(s.as_ref());
        }
        self
    }

    fn put_str(&mut self, value: &str) {
        self.buf.put_i32(value.len() as i32);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

// ── Reader ───────────────────────────────────────────────────────

/// Reads elements back in the order they were written.
#[derive(Debug)]
pub struct SerialReader<'a> {
    buf: &'a [u8],
}

impl<'a> SerialReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not consumed yet (ignored by payload decoders).
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn expect_tag(&mut self, expected: u8) -> Result<(), RemucoError> {
        self.need(1, type_name(expected))?;
        let found = self.buf.get_u8();
        if found != expected {
            return Err(RemucoError::decoding(format!(
                "expected element {}, found tag {} ({})",
                type_name(expected),
                found,
                type_name(found)
            )));
        }
        Ok(())
    }

    fn need(&self, n: usize, what: &str) -> Result<(), RemucoError> {
        if self.buf.len() < n {
            return Err(RemucoError::decoding(format!(
                "truncated {what}: need {n} bytes, have {}",
                self.buf.len()
            )));
        }
        Ok(())
    }

    fn get_len(&mut self, what: &str) -> Result<usize, RemucoError> {
        self.need(4, what)?;
        let len = self.buf.get_i32();
        if len < 0 {
            return Err(RemucoError::decoding(format!("negative {what} length {len}")));
        }
        Ok(len as usize)
    }

    fn get_str(&mut self) -> Result<String, RemucoError> {
        let len = self.get_len("string")?;
        self.need(len, "string")?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        String::from_utf8(head.to_vec())
            .map_err(|e| RemucoError::decoding(format!("invalid utf-8 string: {e}")))
    }

    pub fn read_y(&mut self) -> Result<i8, RemucoError> {
        self.expect_tag(TYPE_Y)?;
        self.need(1, "Y")?;
        Ok(self.buf.get_i8())
    }

    /// Any non-zero byte reads as `true`.
    pub fn read_b(&mut self) -> Result<bool, RemucoError> {
        self.expect_tag(TYPE_B)?;
        self.need(1, "B")?;
        Ok(self.buf.get_u8() != 0)
    }

    pub fn read_n(&mut self) -> Result<i16, RemucoError> {
        self.expect_tag(TYPE_N)?;
        self.need(2, "N")?;
        Ok(self.buf.get_i16())
    }

    pub fn read_i(&mut self) -> Result<i32, RemucoError> {
        self.expect_tag(TYPE_I)?;
        self.need(4, "I")?;
        Ok(self.buf.get_i32())
    }

    pub fn read_l(&mut self) -> Result<i64, RemucoError> {
        self.expect_tag(TYPE_L)?;
        self.need(8, "L")?;
        Ok(self.buf.get_i64())
    }

    pub fn read_s(&mut self) -> Result<String, RemucoError> {
        self.expect_tag(TYPE_S)?;
        self.get_str()
    }

    pub fn read_ay(&mut self) -> Result<Vec<u8>, RemucoError> {
        self.expect_tag(TYPE_AY)?;
        let len = self.get_len("AY")?;
        self.need(len, "AY")?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head.to_vec())
    }

    pub fn read_ai(&mut self) -> Result<Vec<i32>, RemucoError> {
        self.expect_tag(TYPE_AI)?;
        let count = self.get_len("AI")?;
        self.need(count.saturating_mul(4), "AI")?;
        Ok((0..count).map(|_| self.buf.get_i32()).collect())
    }

    pub fn read_as(&mut self) -> Result<Vec<String>, RemucoError> {
        self.expect_tag(TYPE_AS)?;
        let count = self.get_len("AS")?;
        // every string needs at least its length prefix
        self.need(count.saturating_mul(4), "AS")?;
        (0..count).map(|_| self.get_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_element_types() {
        let mut w = SerialWriter::new();
        w.write_y(-3)
            .write_b(true)
            .write_n(-300)
            .write_i(65_000)
            .write_l(-1 << 40)
            .write_s("Ünïcode")
            .write_ay(&[1, 2, 3])
            .write_ai(&[-1, 0, 1])
            .write_as(&["a", "", "ccc"]);
        let bytes = w.finish();

        let mut r = SerialReader::new(&bytes);
        assert_eq!(r.read_y().unwrap(), -3);
        assert!(r.read_b().unwrap());
        assert_eq!(r.read_n().unwrap(), -300);
        assert_eq!(r.read_i().unwrap(), 65_000);
        assert_eq!(r.read_l().unwrap(), -1 << 40);
        assert_eq!(r.read_s().unwrap(), "Ünïcode");
        assert_eq!(r.read_ay().unwrap(), vec![1, 2, 3]);
        assert_eq!(r.read_ai().unwrap(), vec![-1, 0, 1]);
        assert_eq!(r.read_as().unwrap(), vec!["a", "", "ccc"]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn int_layout_is_big_endian() {
        let mut w = SerialWriter::new();
        w.write_i(0x0102_0304);
        assert_eq!(&w.finish()[..], &[TYPE_I, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn tag_mismatch() {
        let mut w = SerialWriter::new();
        w.write_s("x");
        let bytes = w.finish();
        let err = SerialReader::new(&bytes).read_i().unwrap_err();
        assert!(err.to_string().contains("expected element I"));
    }

    #[test]
    fn truncated_values() {
        let mut w = SerialWriter::new();
        w.write_s("hello");
        let bytes = w.finish();
        let cut = &bytes[..bytes.len() - 2];
        assert!(matches!(
            SerialReader::new(cut).read_s(),
            Err(RemucoError::Decoding(_))
        ));

        assert!(SerialReader::new(&[]).read_y().is_err());
        assert!(SerialReader::new(&[TYPE_I, 0, 0]).read_i().is_err());
    }

    #[test]
    fn huge_array_count_does_not_allocate() {
        let bytes = [TYPE_AS, 0x7F, 0xFF, 0xFF, 0xFF];
        assert!(SerialReader::new(&bytes).read_as().is_err());
        let bytes = [TYPE_AI, 0x7F, 0xFF, 0xFF, 0xFF];
        assert!(SerialReader::new(&bytes).read_ai().is_err());
    }

    #[test]
    fn negative_length() {
        let bytes = [TYPE_AY, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(SerialReader::new(&bytes).read_ay().is_err());
    }

    #[test]
    fn invalid_utf8() {
        let bytes = [TYPE_S, 0, 0, 0, 2, 0xC3, 0x28];
        assert!(SerialReader::new(&bytes).read_s().is_err());
    }
}
