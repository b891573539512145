use super::decode::{Sm4DecodeError, Sm4DecodeErrorKind};

/// Bounds-checked cursor over a DWORD token stream.
///
/// Positions are absolute within the slice the reader was created over, so
/// errors can report the offending DWORD.
#[derive(Debug, Clone)]
pub struct TokenReader<'a> {
    toks: &'a [u32],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    pub fn new(toks: &'a [u32]) -> Self {
        Self { toks, pos: 0 }
    }

    /// Starts reading at `pos` (clamped to the end of the stream).
    pub fn at(toks: &'a [u32], pos: usize) -> Self {
        Self {
            toks,
            pos: pos.min(toks.len()),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.toks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toks.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.toks.len() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.toks.len()
    }

    pub fn peek_u32(&self) -> Option<u32> {
        self.toks.get(self.pos).copied()
    }

    pub fn read_u32(&mut self) -> Result<u32, Sm4DecodeError> {
        let v = self.peek_u32().ok_or_else(|| self.eof(1))?;
        self.pos += 1;
        Ok(v)
    }

    /// Reads two DWORDs, low half first.
    pub fn read_u64(&mut self) -> Result<u64, Sm4DecodeError> {
        if self.remaining() < 2 {
            return Err(self.eof(2));
        }
        let lo = self.read_u32()?;
        let hi = self.read_u32()?;
        Ok(u64::from(lo) | (u64::from(hi) << 32))
    }

    fn eof(&self, wanted: usize) -> Sm4DecodeError {
        Sm4DecodeError {
            at_dword: self.pos,
            kind: Sm4DecodeErrorKind::UnexpectedEof {
                wanted,
                remaining: self.remaining(),
            },
        }
    }
}
