//! Bounds-checked little-endian reader over a borrowed byte slice.

use crate::fourcc::FourCC;
use crate::DxbcError;

/// A cursor over `bytes`. Every read checks bounds and advances the cursor
/// only on success.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Returns a new reader over the same bytes positioned at `offset`.
    pub fn fork(&self, offset: usize) -> Result<Self, DxbcError> {
        if offset > self.bytes.len() {
            return Err(DxbcError::out_of_bounds(format!(
                "offset {offset} is outside buffer length {}",
                self.bytes.len()
            )));
        }
        Ok(Self {
            bytes: self.bytes,
            pos: offset,
        })
    }

    /// Current byte position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// The whole underlying buffer.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DxbcError> {
        let end = self.pos.checked_add(len).ok_or_else(|| {
            DxbcError::out_of_bounds(format!("read of {len} bytes at {} overflows", self.pos))
        })?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            DxbcError::out_of_bounds(format!(
                "need {len} bytes at {}..{end}, but buffer length is {}",
                self.pos,
                self.bytes.len()
            ))
        })?;
        self.pos = end;
        Ok(slice)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, DxbcError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16, DxbcError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32, DxbcError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a four-character code.
    pub fn read_fourcc(&mut self) -> Result<FourCC, DxbcError> {
        let b = self.read_bytes(4)?;
        Ok(FourCC([b[0], b[1], b[2], b[3]]))
    }

    /// Reads 16 raw bytes (the header checksum).
    pub fn read_array_16(&mut self) -> Result<[u8; 16], DxbcError> {
        let b = self.read_bytes(16)?;
        let mut out = [0u8; 16];
        out.copy_from_slice(b);
        Ok(out)
    }

    /// Reads a NUL-terminated UTF-8 string at absolute `offset` without
    /// moving the cursor.
    pub fn read_cstring_at(&self, offset: usize) -> Result<&'a str, DxbcError> {
        let tail = self.bytes.get(offset..).ok_or_else(|| {
            DxbcError::out_of_bounds(format!(
                "string offset {offset} is outside buffer length {}",
                self.bytes.len()
            ))
        })?;
        let nul = tail.iter().position(|&b| b == 0).ok_or_else(|| {
            DxbcError::out_of_bounds(format!(
                "string at offset {offset} is missing a null terminator"
            ))
        })?;
        core::str::from_utf8(&tail[..nul]).map_err(|_| {
            DxbcError::invalid_chunk(format!("string at offset {offset} is not valid UTF-8"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_and_advances() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u32_le().unwrap(), 0x0403_0201);
        assert_eq!(r.read_u16_le().unwrap(), 0x0605);
        assert_eq!(r.read_u8().unwrap(), 0x07);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn failed_read_does_not_advance() {
        let bytes = [0u8; 3];
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.read_u32_le(), Err(DxbcError::OutOfBounds(_))));
        assert_eq!(r.pos(), 0);
        assert_eq!(r.read_u16_le().unwrap(), 0);
    }

    #[test]
    fn cstrings_are_bounds_checked() {
        let bytes = b"xxPOSITION\0TAIL";
        let r = ByteReader::new(bytes);
        assert_eq!(r.read_cstring_at(2).unwrap(), "POSITION");
        assert!(r.read_cstring_at(11).is_err(), "TAIL has no terminator");
        assert!(r.read_cstring_at(100).is_err());
    }

    #[test]
    fn fork_rejects_offsets_past_the_end() {
        let bytes = [0u8; 8];
        let r = ByteReader::new(&bytes);
        assert_eq!(r.fork(8).unwrap().remaining(), 0);
        assert!(r.fork(9).is_err());
    }
}
