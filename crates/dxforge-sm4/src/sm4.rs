//! SM4/SM5 token streams: program framing, decoding and encoding.

use dxforge_dxbc::{DxbcError, DxbcFile, ErrorClass};
use thiserror::Error;

use crate::bits::BitRange;

pub mod builder;
pub mod decode;
pub mod encode;
pub mod opcode;
pub mod operand;
pub mod reader;

pub use decode::{Sm4DecodeError, Sm4DecodeErrorKind};
pub use encode::EmitError;

pub(crate) const VERSION_MINOR: BitRange = BitRange::new(0, 3);
pub(crate) const VERSION_MAJOR: BitRange = BitRange::new(4, 7);
pub(crate) const VERSION_PROGRAM_TYPE: BitRange = BitRange::new(16, 31);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
    Compute,
    Unknown(u16),
}

impl ShaderStage {
    /// `D3D10_SB_TOKENIZED_PROGRAM_TYPE` value.
    pub fn program_type(self) -> u16 {
        match self {
            ShaderStage::Pixel => 0,
            ShaderStage::Vertex => 1,
            ShaderStage::Geometry => 2,
            ShaderStage::Hull => 3,
            ShaderStage::Domain => 4,
            ShaderStage::Compute => 5,
            ShaderStage::Unknown(other) => other,
        }
    }

    /// Assembler prefix (`vs`, `ps`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs",
            ShaderStage::Pixel => "ps",
            ShaderStage::Geometry => "gs",
            ShaderStage::Hull => "hs",
            ShaderStage::Domain => "ds",
            ShaderStage::Compute => "cs",
            ShaderStage::Unknown(_) => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}

/// A raw program token stream, split from its container.
#[derive(Debug, Clone)]
pub struct Sm4Program {
    pub stage: ShaderStage,
    pub model: ShaderModel,
    /// Full token stream (DWORDs), including version + length.
    pub tokens: Vec<u32>,
}

impl Sm4Program {
    pub fn parse_from_dxbc_bytes(bytes: &[u8]) -> Result<Self, Sm4Error> {
        let file = DxbcFile::parse(bytes)?;
        Self::parse_from_dxbc(&file)
    }

    pub fn parse_from_dxbc(dxbc: &DxbcFile<'_>) -> Result<Self, Sm4Error> {
        let chunk = dxbc
            .find_shader_chunk()
            .ok_or(Sm4Error::MissingShaderChunk)?;
        Self::parse_program_tokens(chunk.data)
    }

    /// Splits a `SHEX`/`SHDR` payload into tokens and reads the version
    /// header.
    pub fn parse_program_tokens(bytes: &[u8]) -> Result<Self, Sm4Error> {
        if bytes.len() % 4 != 0 {
            return Err(Sm4Error::MisalignedTokens { len: bytes.len() });
        }
        let tokens: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if tokens.len() < 2 {
            return Err(Sm4Error::TooShort {
                dwords: tokens.len(),
            });
        }

        let declared_len = tokens[1] as usize;
        if declared_len < 2 || declared_len > tokens.len() {
            return Err(Sm4Error::DeclaredLengthOutOfBounds {
                declared: declared_len,
                available: tokens.len(),
            });
        }

        let (stage, model) = decode_version_token(tokens[0]);
        Ok(Self {
            stage,
            model,
            tokens,
        })
    }

    /// Tokens covered by the declared length.
    pub fn declared_tokens(&self) -> &[u32] {
        let len = self
            .tokens
            .get(1)
            .map_or(0, |&len| len as usize)
            .min(self.tokens.len());
        &self.tokens[..len]
    }
}

pub fn decode_version_token(version: u32) -> (ShaderStage, ShaderModel) {
    let minor = VERSION_MINOR.get(version) as u8;
    let major = VERSION_MAJOR.get(version) as u8;

    let stage = match VERSION_PROGRAM_TYPE.get(version) as u16 {
        0 => ShaderStage::Pixel,
        1 => ShaderStage::Vertex,
        2 => ShaderStage::Geometry,
        3 => ShaderStage::Hull,
        4 => ShaderStage::Domain,
        5 => ShaderStage::Compute,
        other => ShaderStage::Unknown(other),
    };

    (stage, ShaderModel { major, minor })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Sm4Error {
    #[error(transparent)]
    Dxbc(#[from] DxbcError),
    #[error(transparent)]
    Decode(#[from] Sm4DecodeError),
    #[error("DXBC is missing SHDR/SHEX shader chunk")]
    MissingShaderChunk,
    #[error("shader bytecode length {len} is not a multiple of 4")]
    MisalignedTokens { len: usize },
    #[error("shader bytecode too short ({dwords} dwords)")]
    TooShort { dwords: usize },
    #[error("shader bytecode declares {declared} dwords but only {available} provided")]
    DeclaredLengthOutOfBounds { declared: usize, available: usize },
}

impl Sm4Error {
    /// Integrity errors come only from the container layer; everything else
    /// is a format error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Sm4Error::Dxbc(err) => err.class(),
            _ => ErrorClass::Format,
        }
    }
}
