// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-cursor reading and writing over in-memory buffers.
//!
//! Metadata operations in this engine never need to stream a file: a `fmt `/`bext`/`iXML`/`cue `
//! chunk payload is at most a few kilobytes, and even the top-level RIFF walk only touches chunk
//! headers (the `data` payload is located, never copied, until the rewriter streams it). So unlike
//! the teacher's `MediaSourceStream`, which wraps a seekable reader for full audio decode, these
//! traits work directly against `&[u8]` slices and `Vec<u8>` buffers.

use crate::error::{Error, Result};

/// `ReadBytes` is implemented by anything that can be read from sequentially, little-endian by
/// default, with an explicit big-endian counterpart for fields (like RF64's `ds64` table) that
/// need it.
pub trait ReadBytes {
    fn read_byte(&mut self) -> Result<u8>;

    fn read_double_bytes(&mut self) -> Result<[u8; 2]>;

    fn read_quad_bytes(&mut self) -> Result<[u8; 4]>;

    fn read_octuple_bytes(&mut self) -> Result<[u8; 8]>;

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    fn ignore_bytes(&mut self, count: u64) -> Result<()>;

    fn pos(&self) -> u64;

    fn bytes_remaining(&self) -> u64;

    fn read_u8(&mut self) -> Result<u8> {
        self.read_byte()
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_double_bytes()?))
    }

    fn read_be_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_double_bytes()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_quad_bytes()?))
    }

    fn read_be_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_quad_bytes()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_octuple_bytes()?))
    }

    fn read_be_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_octuple_bytes()?))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_quad_bytes()?))
    }

    fn read_boxed_slice_exact(&mut self, len: usize) -> Result<Box<[u8]>> {
        let mut buf = vec![0u8; len];
        self.read_buf_exact(&mut buf)?;
        Ok(buf.into_boxed_slice())
    }
}

/// `ByteReader` is a `ReadBytes` implementation over a borrowed byte slice, used for chunk-payload
/// and whole-file parsing.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    /// The slice from the current position to the end of the buffer.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Seek to an absolute offset within the buffer.
    pub fn seek_to(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(Error::Truncated("seek beyond end of buffer"));
        }
        self.pos = pos;
        Ok(())
    }
}

impl ReadBytes for ByteReader<'_> {
    fn read_byte(&mut self) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or(Error::Truncated("unexpected end of buffer"))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_double_bytes(&mut self) -> Result<[u8; 2]> {
        let mut out = [0u8; 2];
        self.read_buf_exact(&mut out)?;
        Ok(out)
    }

    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let mut out = [0u8; 4];
        self.read_buf_exact(&mut out)?;
        Ok(out)
    }

    fn read_octuple_bytes(&mut self) -> Result<[u8; 8]> {
        let mut out = [0u8; 8];
        self.read_buf_exact(&mut out)?;
        Ok(out)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.pos.checked_add(buf.len()).ok_or(Error::Truncated("offset overflow"))?;
        let src = self.buf.get(self.pos..end).ok_or(Error::Truncated("unexpected end of buffer"))?;
        buf.copy_from_slice(src);
        self.pos = end;
        Ok(())
    }

    fn ignore_bytes(&mut self, count: u64) -> Result<()> {
        let end = self.pos.checked_add(count as usize).ok_or(Error::Truncated("offset overflow"))?;
        if end > self.buf.len() {
            return Err(Error::Truncated("skip beyond end of buffer"));
        }
        self.pos = end;
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.pos as u64
    }

    fn bytes_remaining(&self) -> u64 {
        (self.buf.len() - self.pos) as u64
    }
}

/// `WriteBytes` mirrors `ReadBytes` for chunk assembly, little-endian by default.
pub trait WriteBytes {
    fn write_buf(&mut self, buf: &[u8]) -> Result<()>;

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_buf(&[value])
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_buf(&value.to_le_bytes())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_buf(&value.to_le_bytes())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_buf(&value.to_le_bytes())
    }

    fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_buf(&value.to_le_bytes())
    }

    fn write_tag(&mut self, tag: &[u8; 4]) -> Result<()> {
        self.write_buf(tag)
    }
}

impl WriteBytes for Vec<u8> {
    fn write_buf(&mut self, buf: &[u8]) -> Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_and_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u32().unwrap(), 0x0403_0201);

        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_be_u32().unwrap(), 0x0102_0304);
    }

    #[test]
    fn truncated_read_is_an_error() {
        let data = [0x00u8; 2];
        let mut r = ByteReader::new(&data);
        assert!(r.read_u32().is_err());
    }

    #[test]
    fn ignore_and_seek() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let mut r = ByteReader::new(&data);
        r.ignore_bytes(3).unwrap();
        assert_eq!(r.read_u8().unwrap(), 3);
        r.seek_to(0).unwrap();
        assert_eq!(r.read_u8().unwrap(), 0);
        assert!(r.seek_to(100).is_err());
    }
}
