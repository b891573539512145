//! Container serialization.

use crate::checksum::container_checksum;
use crate::dxbc::DXBC_HEADER_LEN;
use crate::fourcc::FourCC;
use crate::DxbcError;

/// Value compilers store in the reserved header field.
const RESERVED_ONE: u32 = 1;

/// Lays out a complete container: header, chunk offset table, then each chunk
/// (`fourcc`, `u32` length, payload), and fills in the checksum.
///
/// Payloads whose length is not a multiple of 4 are followed by zero padding
/// so every chunk starts 4-byte aligned; the recorded chunk length excludes
/// the padding.
pub fn write_container(chunks: &[(FourCC, &[u8])]) -> Result<Vec<u8>, DxbcError> {
    let too_large = || DxbcError::out_of_bounds("container does not fit in 32-bit offsets");

    let table_len = 4 * chunks.len();
    let body_len: usize = chunks
        .iter()
        .map(|(_, data)| 8 + data.len().next_multiple_of(4))
        .sum();

    let mut out = Vec::with_capacity(DXBC_HEADER_LEN + table_len + body_len);
    out.extend_from_slice(&FourCC::DXBC.0);
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&RESERVED_ONE.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // total_size, patched below
    let chunk_count = u32::try_from(chunks.len()).map_err(|_| too_large())?;
    out.extend_from_slice(&chunk_count.to_le_bytes());

    let table_pos = out.len();
    out.resize(table_pos + table_len, 0);

    for (i, (fourcc, data)) in chunks.iter().enumerate() {
        let offset = u32::try_from(out.len()).map_err(|_| too_large())?;
        let pos = table_pos + 4 * i;
        out[pos..pos + 4].copy_from_slice(&offset.to_le_bytes());

        let size = u32::try_from(data.len()).map_err(|_| too_large())?;
        out.extend_from_slice(&fourcc.0);
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(data);
        out.resize(out.len().next_multiple_of(4), 0);
    }

    let total_size = u32::try_from(out.len()).map_err(|_| too_large())?;
    out[24..28].copy_from_slice(&total_size.to_le_bytes());

    let checksum = container_checksum(&out).ok_or_else(too_large)?;
    out[4..20].copy_from_slice(&checksum);
    Ok(out)
}
