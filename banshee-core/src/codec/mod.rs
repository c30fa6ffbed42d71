//! Little-endian field primitives shared by every protocol module.
//!
//! The remote listener speaks raw byte layouts, no framing: integers are
//! little-endian and unsigned, strings are a `u16` byte length followed by
//! UTF-8 bytes. All reads are bounds-checked and report
//! [`BansheeError::MalformedResponse`] instead of reading past the end.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::BansheeError;

/// Size of the length prefix in front of every string.
pub const STRING_PREFIX: usize = 2;

// ── Reader ───────────────────────────────────────────────────────

/// Sequential, bounds-checked reader over a response buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Reader<'a> {
    /// `what` names the buffer in error messages ("song info", ...).
    pub fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, pos: 0, what }
    }

    /// Start reading at `offset` instead of 0.
    pub fn at(buf: &'a [u8], offset: usize, what: &'static str) -> Self {
        Self {
            buf,
            pos: offset,
            what,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BansheeError> {
        let end = self.pos + n;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| BansheeError::truncated(self.what, end, self.buf.len()))?;
        self.pos = end;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, BansheeError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, BansheeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn i16(&mut self) -> Result<i16, BansheeError> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, BansheeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Length-prefixed UTF-8 string. A zero length yields `""` and
    /// advances by exactly [`STRING_PREFIX`] bytes.
    pub fn string(&mut self) -> Result<String, BansheeError> {
        let len = self.u16()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let raw = self.take(len)?;
        Ok(std::str::from_utf8(raw)?.to_owned())
    }
}

// ── Free-standing helpers ────────────────────────────────────────

/// Decode the string at `offset`, returning it with the number of bytes
/// it occupies (prefix included).
pub fn decode_string(buf: &[u8], offset: usize) -> Result<(String, usize), BansheeError> {
    let mut reader = Reader::at(buf, offset, "string");
    let s = reader.string()?;
    Ok((s, reader.position() - offset))
}

pub fn read_u16(buf: &[u8], offset: usize, what: &'static str) -> Result<u16, BansheeError> {
    Reader::at(buf, offset, what).u16()
}

pub fn read_u32(buf: &[u8], offset: usize, what: &'static str) -> Result<u32, BansheeError> {
    Reader::at(buf, offset, what).u32()
}

/// Append a length-prefixed string.
pub fn put_string(dst: &mut BytesMut, s: &str) -> Result<(), BansheeError> {
    let len = u16::try_from(s.len())
        .map_err(|_| BansheeError::InvalidParams("string longer than 65535 bytes"))?;
    dst.reserve(STRING_PREFIX + s.len());
    dst.put_u16_le(len);
    dst.put_slice(s.as_bytes());
    Ok(())
}

/// Encode a standalone length-prefixed string.
pub fn encode_string(s: &str) -> Result<Bytes, BansheeError> {
    let mut buf = BytesMut::new();
    put_string(&mut buf, s)?;
    Ok(buf.freeze())
}

/// Hex preview of at most `limit` bytes, for log lines.
pub fn hex_preview(buf: &[u8], limit: usize) -> String {
    let mut out = String::with_capacity(limit.min(buf.len()) * 3 + 4);
    for (i, b) in buf.iter().take(limit).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    if buf.len() > limit {
        out.push_str(" ...");
    }
    out
}
