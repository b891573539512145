use core::fmt;

use tracing::debug;

use crate::byte_reader::ByteReader;
use crate::checksum::{container_checksum, CHECKSUM_INPUT_OFFSET};
use crate::error::DxbcError;
use crate::fourcc::FourCC;
use crate::rdef::{parse_rdef_chunk, RdefChunk};
use crate::signature::{parse_signature_chunk_for_fourcc, SignatureChunk};

/// Size of the fixed container header: magic + checksum + reserved + total_size + chunk_count.
pub const DXBC_HEADER_LEN: usize = 4 + 16 + 4 + 4 + 4;

/// Default cap on the number of chunks in one container.
///
/// Real containers carry a handful of chunks. The cap keeps hostile inputs from
/// forcing huge offset tables and validation loops.
pub const DEFAULT_MAX_CHUNK_COUNT: u32 = 4096;

const CHUNK_HEADER_LEN: usize = 8;

/// Knobs for [`DxbcFile::parse_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject containers whose stored checksum does not match their bytes.
    pub verify_checksum: bool,
    /// Upper bound on the declared chunk count.
    pub max_chunk_count: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            max_chunk_count: DEFAULT_MAX_CHUNK_COUNT,
        }
    }
}

/// The fixed header of a `DXBC` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxbcHeader {
    /// Always [`FourCC::DXBC`] once parsed.
    pub magic: FourCC,
    /// The checksum stored in the header.
    pub checksum: [u8; 16],
    /// The reserved field (compilers write `1`).
    pub reserved: u32,
    /// Declared total size, in bytes.
    pub total_size: u32,
    /// Number of chunk offsets following the header.
    pub chunk_count: u32,
}

/// A single chunk within a `DXBC` container.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DxbcChunk<'a> {
    /// The chunk tag (e.g. `SHEX`, `RDEF`).
    pub fourcc: FourCC,
    /// Absolute offset of the chunk header within the container.
    pub offset: u32,
    /// Chunk payload bytes (after the tag and length fields).
    pub data: &'a [u8],
}

impl fmt::Debug for DxbcChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxbcChunk")
            .field("fourcc", &self.fourcc)
            .field("offset", &self.offset)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// A validated `DXBC` container borrowed from a caller-owned buffer.
#[derive(Debug, Clone)]
pub struct DxbcFile<'a> {
    bytes: &'a [u8],
    header: DxbcHeader,
    chunk_offsets: Vec<u32>,
}

impl<'a> DxbcFile<'a> {
    /// Parses and fully validates a container, including its checksum.
    pub fn parse(bytes: &'a [u8]) -> Result<DxbcFile<'a>, DxbcError> {
        Self::parse_with_options(bytes, ParseOptions::default())
    }

    /// Parses the header and chunk table without checking the checksum.
    ///
    /// Use [`DxbcFile::checksum_matches`] to verify it later.
    pub fn parse_unverified(bytes: &'a [u8]) -> Result<DxbcFile<'a>, DxbcError> {
        Self::parse_with_options(
            bytes,
            ParseOptions {
                verify_checksum: false,
                ..ParseOptions::default()
            },
        )
    }

    /// Parses a container with explicit options.
    ///
    /// Checks run in this order: header length, checksum, magic, declared
    /// size, chunk table. The input is treated as untrusted and every offset
    /// is validated.
    pub fn parse_with_options(
        bytes: &'a [u8],
        options: ParseOptions,
    ) -> Result<DxbcFile<'a>, DxbcError> {
        if bytes.len() < DXBC_HEADER_LEN {
            return Err(DxbcError::malformed_header(format!(
                "need at least {DXBC_HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = ByteReader::new(bytes);
        let magic = r.read_fourcc()?;
        let checksum = r.read_array_16()?;
        let reserved = r.read_u32_le()?;
        let total_size = r.read_u32_le()?;
        let chunk_count = r.read_u32_le()?;

        if options.verify_checksum {
            let computed = container_checksum(bytes).ok_or_else(|| {
                DxbcError::malformed_header(format!(
                    "buffer shorter than checksum input offset {CHECKSUM_INPUT_OFFSET}"
                ))
            })?;
            if computed != checksum {
                return Err(DxbcError::ChecksumMismatch {
                    stored: checksum,
                    computed,
                });
            }
        }

        if magic != FourCC::DXBC {
            return Err(DxbcError::BadMagic { found: magic });
        }

        if total_size as usize != bytes.len() {
            return Err(DxbcError::SizeMismatch {
                declared: total_size,
                actual: bytes.len(),
            });
        }

        if chunk_count > options.max_chunk_count {
            return Err(DxbcError::malformed_offsets(format!(
                "chunk_count {chunk_count} exceeds maximum {}",
                options.max_chunk_count
            )));
        }

        let offset_table_end = (chunk_count as usize)
            .checked_mul(4)
            .and_then(|len| DXBC_HEADER_LEN.checked_add(len))
            .ok_or_else(|| DxbcError::malformed_offsets("chunk offset table size overflows"))?;
        if offset_table_end > bytes.len() {
            return Err(DxbcError::malformed_offsets(format!(
                "chunk offset table ends at {offset_table_end}, but total_size is {}",
                bytes.len()
            )));
        }

        let mut chunk_offsets = Vec::with_capacity(chunk_count as usize);
        for i in 0..chunk_count {
            let chunk_offset = r.read_u32_le()?;
            validate_chunk_range(bytes, i, chunk_offset as usize, offset_table_end)?;
            chunk_offsets.push(chunk_offset);
        }

        let header = DxbcHeader {
            magic,
            checksum,
            reserved,
            total_size,
            chunk_count,
        };

        Ok(DxbcFile {
            bytes,
            header,
            chunk_offsets,
        })
    }

    /// Returns the parsed header.
    pub fn header(&self) -> &DxbcHeader {
        &self.header
    }

    /// Returns the raw container bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Iterates over all chunks in offset-table order.
    pub fn chunks(&self) -> impl Iterator<Item = DxbcChunk<'a>> + '_ {
        let bytes = self.bytes;
        self.chunk_offsets
            .iter()
            .filter_map(move |&offset| chunk_at(bytes, offset))
    }

    /// Returns the first chunk matching `fourcc`, if any.
    pub fn get_chunk(&self, fourcc: FourCC) -> Option<DxbcChunk<'a>> {
        self.chunks().find(|chunk| chunk.fourcc == fourcc)
    }

    /// Iterates over all chunks matching `fourcc`, in table order.
    pub fn get_chunks(&self, fourcc: FourCC) -> impl Iterator<Item = DxbcChunk<'a>> + '_ {
        self.chunks().filter(move |chunk| chunk.fourcc == fourcc)
    }

    /// Parses the first `RDEF` chunk, if present.
    pub fn get_rdef(&self) -> Option<Result<RdefChunk, DxbcError>> {
        self.get_chunk(FourCC::RDEF).map(|chunk| {
            parse_rdef_chunk(chunk.data).map_err(|e| {
                DxbcError::invalid_chunk(format!("{} chunk: {}", chunk.fourcc, e.context()))
            })
        })
    }

    /// Parses the first signature chunk of `kind`, falling back to the
    /// 32-byte-entry spelling (`ISGN` <-> `ISG1`, `OSGN` <-> `OSG1`).
    pub fn get_signature(&self, kind: FourCC) -> Option<Result<SignatureChunk, DxbcError>> {
        let fallback = match &kind.0 {
            b"ISGN" => Some(FourCC::ISG1),
            b"OSGN" => Some(FourCC::OSG1),
            b"ISG1" => Some(FourCC::ISGN),
            b"OSG1" => Some(FourCC::OSGN),
            _ => None,
        };
        let chunk = self
            .get_chunk(kind)
            .or_else(|| fallback.and_then(|f| self.get_chunk(f)))?;
        Some(
            parse_signature_chunk_for_fourcc(chunk.fourcc, chunk.data).map_err(|e| {
                DxbcError::invalid_chunk(format!(
                    "{} signature chunk: {}",
                    chunk.fourcc,
                    e.context()
                ))
            }),
        )
    }

    /// Returns the first shader instruction chunk, preferring `SHEX` over `SHDR`.
    pub fn find_shader_chunk(&self) -> Option<DxbcChunk<'a>> {
        self.get_chunk(FourCC::SHEX)
            .or_else(|| self.get_chunk(FourCC::SHDR))
    }

    /// Recomputes the checksum and compares it with the header.
    pub fn checksum_matches(&self) -> bool {
        container_checksum(self.bytes) == Some(self.header.checksum)
    }

    /// Returns a human-readable summary of the container and its chunks.
    pub fn debug_summary(&self) -> String {
        use core::fmt::Write as _;

        let mut out = String::new();
        let _ = write!(
            &mut out,
            "{} total_size={} chunk_count={}",
            self.header.magic, self.header.total_size, self.header.chunk_count
        );
        for (idx, chunk) in self.chunks().enumerate() {
            let _ = write!(
                &mut out,
                "\n  [{idx:02}] {} @{} {} bytes",
                chunk.fourcc,
                chunk.offset,
                chunk.data.len()
            );
        }
        out
    }
}

fn validate_chunk_range(
    bytes: &[u8],
    index: u32,
    chunk_offset: usize,
    offset_table_end: usize,
) -> Result<(), DxbcError> {
    if chunk_offset < offset_table_end {
        return Err(DxbcError::malformed_offsets(format!(
            "chunk {index} offset {chunk_offset} points into the header or offset table (need >= {offset_table_end})"
        )));
    }

    let header_end = chunk_offset.checked_add(CHUNK_HEADER_LEN).ok_or_else(|| {
        DxbcError::malformed_offsets(format!("chunk {index} offset {chunk_offset} overflows"))
    })?;
    if header_end > bytes.len() {
        return Err(DxbcError::out_of_bounds(format!(
            "chunk {index} header at {chunk_offset}..{header_end} is outside total_size {}",
            bytes.len()
        )));
    }

    let mut r = ByteReader::new(bytes).fork(chunk_offset)?;
    let fourcc = r.read_fourcc()?;
    let chunk_size = r.read_u32_le()? as usize;
    let data_end = header_end.checked_add(chunk_size).ok_or_else(|| {
        DxbcError::malformed_offsets(format!(
            "chunk {index} size {chunk_size} overflows when computing data range"
        ))
    })?;
    if data_end > bytes.len() {
        return Err(DxbcError::out_of_bounds(format!(
            "chunk {index} ({fourcc}) data at {header_end}..{data_end} is outside total_size {}",
            bytes.len()
        )));
    }

    debug!(%fourcc, offset = chunk_offset, size = chunk_size, "validated DXBC chunk");
    Ok(())
}

fn chunk_at(bytes: &[u8], offset: u32) -> Option<DxbcChunk<'_>> {
    let start = offset as usize;
    let header = bytes.get(start..start.checked_add(CHUNK_HEADER_LEN)?)?;
    let fourcc = FourCC::from_slice(header)?;
    let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    let data_start = start + CHUNK_HEADER_LEN;
    let data = bytes.get(data_start..data_start.checked_add(size)?)?;
    Some(DxbcChunk {
        fourcc,
        offset,
        data,
    })
}
