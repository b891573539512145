use std::borrow::Cow;

use thiserror::Error;

use crate::fourcc::FourCC;

/// Broad category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The blob is corrupt or is not a `DXBC` container at all (checksum,
    /// magic or declared size disagree with the bytes).
    Integrity,
    /// The blob claims to be a container but its structure is invalid or uses
    /// an encoding this crate does not support.
    Format,
}

/// Errors returned while parsing or validating a `DXBC` container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DxbcError {
    /// The checksum stored in the header does not match the container bytes.
    #[error("checksum mismatch: header stores {stored:02x?}, computed {computed:02x?}")]
    ChecksumMismatch {
        /// Digest stored at bytes `4..20`.
        stored: [u8; 16],
        /// Digest computed over bytes `20..`.
        computed: [u8; 16],
    },
    /// The first four bytes are not `DXBC`.
    #[error("bad magic {found}, expected DXBC")]
    BadMagic {
        /// The tag found at offset 0.
        found: FourCC,
    },
    /// The header's declared file size differs from the buffer length.
    #[error("declared file size {declared} does not match buffer length {actual}")]
    SizeMismatch {
        /// `FileSizeInBytes` from the header.
        declared: u32,
        /// Length of the buffer handed to the parser.
        actual: usize,
    },
    /// The fixed-size header is truncated or contains invalid values.
    #[error("malformed DXBC header: {0}")]
    MalformedHeader(String),
    /// The chunk offset table is invalid.
    #[error("malformed DXBC chunk offsets: {0}")]
    MalformedOffsets(String),
    /// A declared range lies outside the buffer.
    #[error("DXBC range out of bounds: {0}")]
    OutOfBounds(String),
    /// A chunk payload could not be parsed.
    #[error("invalid DXBC chunk: {0}")]
    InvalidChunk(String),
}

impl DxbcError {
    pub(crate) fn malformed_header(context: impl Into<String>) -> Self {
        Self::MalformedHeader(context.into())
    }

    pub(crate) fn malformed_offsets(context: impl Into<String>) -> Self {
        Self::MalformedOffsets(context.into())
    }

    pub(crate) fn out_of_bounds(context: impl Into<String>) -> Self {
        Self::OutOfBounds(context.into())
    }

    pub(crate) fn invalid_chunk(context: impl Into<String>) -> Self {
        Self::InvalidChunk(context.into())
    }

    /// Returns the error category (integrity vs. structural format).
    pub fn class(&self) -> ErrorClass {
        match self {
            DxbcError::ChecksumMismatch { .. }
            | DxbcError::BadMagic { .. }
            | DxbcError::SizeMismatch { .. } => ErrorClass::Integrity,
            DxbcError::MalformedHeader(_)
            | DxbcError::MalformedOffsets(_)
            | DxbcError::OutOfBounds(_)
            | DxbcError::InvalidChunk(_) => ErrorClass::Format,
        }
    }

    /// Returns the error detail without the category prefix, for wrapping in
    /// an outer error message.
    pub fn context(&self) -> Cow<'_, str> {
        match self {
            DxbcError::MalformedHeader(ctx)
            | DxbcError::MalformedOffsets(ctx)
            | DxbcError::OutOfBounds(ctx)
            | DxbcError::InvalidChunk(ctx) => Cow::Borrowed(ctx),
            other => Cow::Owned(other.to_string()),
        }
    }
}
