use core::fmt;

/// A four-character code identifying a container or chunk (`DXBC`, `SHEX`, ...).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Container magic.
    pub const DXBC: FourCC = FourCC(*b"DXBC");
    /// Resource definitions.
    pub const RDEF: FourCC = FourCC(*b"RDEF");
    /// Input signature.
    pub const ISGN: FourCC = FourCC(*b"ISGN");
    /// Input signature, 32-byte entry layout.
    pub const ISG1: FourCC = FourCC(*b"ISG1");
    /// Output signature.
    pub const OSGN: FourCC = FourCC(*b"OSGN");
    /// Output signature, 32-byte entry layout.
    pub const OSG1: FourCC = FourCC(*b"OSG1");
    /// Shader model 5 instruction stream.
    pub const SHEX: FourCC = FourCC(*b"SHEX");
    /// Shader model 4 instruction stream.
    pub const SHDR: FourCC = FourCC(*b"SHDR");
    /// Compiler statistics (not parsed).
    pub const STAT: FourCC = FourCC(*b"STAT");

    /// Reads a FourCC from the first four bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..4)?;
        Some(FourCC([head[0], head[1], head[2], head[3]]))
    }

    /// Returns the raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<&str> for FourCC {
    /// Builds a FourCC from a string, padding with spaces or truncating to 4 bytes.
    fn from(s: &str) -> Self {
        let mut out = [b' '; 4];
        for (dst, src) in out.iter_mut().zip(s.bytes()) {
            *dst = src;
        }
        FourCC(out)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC(\"{self}\")")
    }
}
