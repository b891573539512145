//! Input/output signature chunks (`ISGN`, `OSGN`, and the `*SG1` variants).
//!
//! A signature maps semantic names to registers. The chunk payload starts with
//! `{ element_count, element_offset }`, followed by a table of fixed-size
//! element descriptors and a string pool. Name offsets are relative to the
//! start of the chunk payload.

use crate::byte_reader::ByteReader;
use crate::fourcc::FourCC;
use crate::DxbcError;

const SIGNATURE_HEADER_LEN: usize = 8;
/// Element size used by `ISGN`/`OSGN`.
pub const SIGNATURE_ENTRY_LEN_V0: usize = 24;
/// Element size used by `ISG1`/`OSG1`.
pub const SIGNATURE_ENTRY_LEN_V1: usize = 32;

/// A parsed signature chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureChunk {
    /// Elements in declaration order.
    pub entries: Vec<SignatureEntry>,
}

/// One element of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Semantic name (e.g. `POSITION`, `SV_Position`).
    pub semantic_name: String,
    /// Semantic index (e.g. `1` for `TEXCOORD1`).
    pub semantic_index: u32,
    /// System-value type (`D3D_NAME`) as a raw value.
    pub system_value_type: u32,
    /// Register component type (`D3D_REGISTER_COMPONENT_TYPE`) as a raw value.
    pub component_type: u32,
    /// Register assigned by the compiler.
    pub register: u32,
    /// Components present in the register.
    pub mask: u8,
    /// Components read (inputs) or never written (outputs).
    pub read_write_mask: u8,
    /// Geometry shader output stream.
    pub stream: u32,
    /// Minimum precision hint.
    pub min_precision: u32,
}

impl SignatureEntry {
    /// A float32 element with no system value, stream 0.
    pub fn new(semantic_name: impl Into<String>, semantic_index: u32, register: u32, mask: u8) -> Self {
        Self {
            semantic_name: semantic_name.into(),
            semantic_index,
            system_value_type: 0,
            component_type: 3,
            register,
            mask,
            read_write_mask: mask,
            stream: 0,
            min_precision: 0,
        }
    }
}

/// Parses a signature chunk payload using the 24-byte element layout,
/// falling back to the 32-byte layout.
pub fn parse_signature_chunk(bytes: &[u8]) -> Result<SignatureChunk, DxbcError> {
    parse_with_preference(bytes, false)
}

/// Parses a signature chunk payload, preferring the layout implied by `fourcc`
/// (`*SG1` -> 32-byte elements).
pub fn parse_signature_chunk_with_fourcc(
    fourcc: FourCC,
    bytes: &[u8],
) -> Result<SignatureChunk, DxbcError> {
    parse_signature_chunk_for_fourcc(fourcc, bytes)
}

pub(crate) fn parse_signature_chunk_for_fourcc(
    fourcc: FourCC,
    bytes: &[u8],
) -> Result<SignatureChunk, DxbcError> {
    parse_with_preference(bytes, fourcc.0[3] == b'1')
}

fn parse_with_preference(bytes: &[u8], prefer_v1: bool) -> Result<SignatureChunk, DxbcError> {
    let (first, second) = if prefer_v1 {
        (SIGNATURE_ENTRY_LEN_V1, SIGNATURE_ENTRY_LEN_V0)
    } else {
        (SIGNATURE_ENTRY_LEN_V0, SIGNATURE_ENTRY_LEN_V1)
    };

    match parse_with_entry_size(bytes, first) {
        Ok(chunk) => Ok(chunk),
        Err(err_first) => parse_with_entry_size(bytes, second).map_err(|err_second| {
            DxbcError::invalid_chunk(format!(
                "failed to parse signature ({first}-byte entries: {}; {second}-byte entries: {})",
                err_first.context(),
                err_second.context()
            ))
        }),
    }
}

fn parse_with_entry_size(bytes: &[u8], entry_size: usize) -> Result<SignatureChunk, DxbcError> {
    let mut r = ByteReader::new(bytes);
    let count = r.read_u32_le()? as usize;
    let table_offset = r.read_u32_le()? as usize;

    if count == 0 {
        return Ok(SignatureChunk::default());
    }
    if table_offset < SIGNATURE_HEADER_LEN || table_offset % 4 != 0 {
        return Err(DxbcError::invalid_chunk(format!(
            "element table offset {table_offset} is misplaced"
        )));
    }
    let table_end = count
        .checked_mul(entry_size)
        .and_then(|len| table_offset.checked_add(len))
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            DxbcError::invalid_chunk(format!(
                "{count} elements of {entry_size} bytes at {table_offset} exceed chunk length {}",
                bytes.len()
            ))
        })?;

    let mut entries = Vec::new();
    entries.try_reserve_exact(count).map_err(|_| {
        DxbcError::invalid_chunk(format!("element count {count} is too large to allocate"))
    })?;

    for index in 0..count {
        let mut er = r.fork(table_offset + index * entry_size)?;
        let name_offset = er.read_u32_le()? as usize;
        if name_offset < SIGNATURE_HEADER_LEN || (table_offset..table_end).contains(&name_offset)
        {
            return Err(DxbcError::invalid_chunk(format!(
                "element {index} name offset {name_offset} points into the header or element table"
            )));
        }
        let semantic_index = er.read_u32_le()?;
        let system_value_type = er.read_u32_le()?;
        let component_type = er.read_u32_le()?;
        let register = er.read_u32_le()?;
        let mask = er.read_u8()?;
        let read_write_mask = er.read_u8()?;
        let (stream, min_precision) = if entry_size == SIGNATURE_ENTRY_LEN_V1 {
            er.read_u16_le()?;
            (er.read_u32_le()?, er.read_u32_le()?)
        } else {
            (u32::from(er.read_u8()?), u32::from(er.read_u8()?))
        };

        let semantic_name = r
            .read_cstring_at(name_offset)
            .map_err(|e| {
                DxbcError::invalid_chunk(format!("element {index} name: {}", e.context()))
            })?
            .to_owned();

        entries.push(SignatureEntry {
            semantic_name,
            semantic_index,
            system_value_type,
            component_type,
            register,
            mask,
            read_write_mask,
            stream,
            min_precision,
        });
    }

    Ok(SignatureChunk { entries })
}

impl SignatureChunk {
    /// Serializes the chunk payload using the 24-byte element layout.
    ///
    /// Names are pooled after the element table, NUL-terminated and padded to
    /// a 4-byte boundary.
    pub fn to_bytes(&self) -> Vec<u8> {
        let table_len = SIGNATURE_ENTRY_LEN_V0 * self.entries.len();
        let mut names = Vec::new();
        let mut name_offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            name_offsets.push((SIGNATURE_HEADER_LEN + table_len + names.len()) as u32);
            names.extend_from_slice(entry.semantic_name.as_bytes());
            names.push(0);
        }
        while names.len() % 4 != 0 {
            names.push(0xAB);
        }

        let mut out = Vec::with_capacity(SIGNATURE_HEADER_LEN + table_len + names.len());
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&(SIGNATURE_HEADER_LEN as u32).to_le_bytes());
        for (entry, name_offset) in self.entries.iter().zip(name_offsets) {
            out.extend_from_slice(&name_offset.to_le_bytes());
            out.extend_from_slice(&entry.semantic_index.to_le_bytes());
            out.extend_from_slice(&entry.system_value_type.to_le_bytes());
            out.extend_from_slice(&entry.component_type.to_le_bytes());
            out.extend_from_slice(&entry.register.to_le_bytes());
            out.push(entry.mask);
            out.push(entry.read_write_mask);
            out.push(entry.stream as u8);
            out.push(entry.min_precision as u8);
        }
        out.extend_from_slice(&names);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_entries() -> SignatureChunk {
        SignatureChunk {
            entries: vec![
                SignatureEntry::new("POSITION", 0, 0, 0xF),
                SignatureEntry::new("TEXCOORD", 1, 1, 0x3),
            ],
        }
    }

    #[test]
    fn written_chunk_parses_back() {
        let chunk = two_entries();
        let parsed = parse_signature_chunk(&chunk.to_bytes()).unwrap();
        assert_eq!(parsed, chunk);
    }

    #[test]
    fn string_pool_is_padded() {
        let bytes = two_entries().to_bytes();
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn v1_layout_is_detected_by_fourcc() {
        // One 32-byte element followed by its name.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&40u32.to_le_bytes()); // name offset
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes()); // SV_Position
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes()); // register
        bytes.extend_from_slice(&[0xF, 0x0, 0, 0]);
        bytes.extend_from_slice(&1u32.to_le_bytes()); // stream
        bytes.extend_from_slice(&0u32.to_le_bytes()); // min precision
        bytes.extend_from_slice(b"SV_Position\0");

        let sig = parse_signature_chunk_with_fourcc(FourCC::OSG1, &bytes).unwrap();
        assert_eq!(sig.entries.len(), 1);
        let e = &sig.entries[0];
        assert_eq!(e.semantic_name, "SV_Position");
        assert_eq!(e.system_value_type, 1);
        assert_eq!(e.register, 2);
        assert_eq!(e.stream, 1);
    }

    #[test]
    fn name_offset_outside_chunk_is_rejected() {
        let mut bytes = two_entries().to_bytes();
        // First element's name offset.
        bytes[8..12].copy_from_slice(&0xFFFFu32.to_le_bytes());
        let err = parse_signature_chunk(&bytes).unwrap_err();
        assert!(matches!(err, DxbcError::InvalidChunk(_)), "{err:?}");
    }

    #[test]
    fn table_past_end_is_rejected() {
        let mut bytes = two_entries().to_bytes();
        bytes[0..4].copy_from_slice(&100u32.to_le_bytes());
        assert!(parse_signature_chunk(&bytes).is_err());
    }

    #[test]
    fn empty_signature() {
        let bytes = SignatureChunk::default().to_bytes();
        assert_eq!(bytes.len(), 8);
        assert!(parse_signature_chunk(&bytes).unwrap().entries.is_empty());
    }
}
