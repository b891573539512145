//! Resource definition chunks (`RDEF`).
//!
//! `RDEF` describes the constant buffers a shader reads (with their variables
//! and type trees) and the resources bound to it (textures, samplers,
//! constant buffers). Every name and descriptor offset inside the chunk is
//! relative to the start of the chunk payload, not the container.

use crate::byte_reader::ByteReader;
use crate::DxbcError;

const RDEF_HEADER_LEN: usize = 28;
const CBUFFER_DESC_LEN: usize = 24;
const VARIABLE_DESC_LEN_SM4: usize = 24;
const VARIABLE_DESC_LEN_SM5: usize = 40;
const MEMBER_DESC_LEN: usize = 12;
const BINDING_DESC_LEN: usize = 32;
/// Struct types nest at most this deep; deeper trees are rejected.
const MAX_TYPE_DEPTH: usize = 8;
/// Chunk bytes per resolved type node allowed. Members may share a type
/// offset, so a small chunk can describe an exponentially large tree; the
/// walk stops once it has resolved `len / 4` nodes.
const BYTES_PER_TYPE_NODE: usize = 4;

/// A parsed `RDEF` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefChunk {
    /// Target shader model, major part.
    pub major: u8,
    /// Target shader model, minor part.
    pub minor: u8,
    /// Program type word (`0xFFFE` vertex, `0xFFFF` pixel, ...).
    pub program_type: u16,
    /// Compile flags.
    pub flags: u32,
    /// Compiler identification string.
    pub creator: String,
    /// Constant buffers in declaration order.
    pub constant_buffers: Vec<RdefConstantBuffer>,
    /// Bound resources in declaration order.
    pub bindings: Vec<RdefResourceBinding>,
}

/// A constant buffer declared in `RDEF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefConstantBuffer {
    /// Buffer name.
    pub name: String,
    /// Buffer size in bytes.
    pub size: u32,
    /// `D3D_SHADER_CBUFFER_FLAGS`.
    pub flags: u32,
    /// `D3D_CBUFFER_TYPE` (cbuffer, tbuffer, ...).
    pub cb_type: u32,
    /// Variables in declaration order.
    pub variables: Vec<RdefVariable>,
}

/// A variable inside a constant buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefVariable {
    /// Variable name.
    pub name: String,
    /// Byte offset within the buffer.
    pub offset: u32,
    /// Size in bytes.
    pub size: u32,
    /// `D3D_SHADER_VARIABLE_FLAGS`.
    pub flags: u32,
    /// Type tree.
    pub ty: RdefType,
}

/// A variable type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefType {
    /// `D3D_SHADER_VARIABLE_CLASS` (scalar, vector, matrix, struct, ...).
    pub class: u16,
    /// `D3D_SHADER_VARIABLE_TYPE` (float, int, ...).
    pub ty: u16,
    /// Row count.
    pub rows: u16,
    /// Column count.
    pub columns: u16,
    /// Array element count (0 when not an array).
    pub elements: u16,
    /// Declared member count.
    pub member_count: u16,
    /// Offset of the member table within the chunk (0 without members).
    pub member_offset: u32,
    /// Resolved struct members.
    pub members: Vec<RdefStructMember>,
}

/// A member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefStructMember {
    /// Member name.
    pub name: String,
    /// Byte offset within the parent struct.
    pub offset: u32,
    /// Member type.
    pub ty: RdefType,
}

/// A resource binding declared in `RDEF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefResourceBinding {
    /// Resource name.
    pub name: String,
    /// `D3D_SHADER_INPUT_TYPE` (cbuffer, texture, sampler, ...).
    pub input_type: u32,
    /// `D3D_RESOURCE_RETURN_TYPE`.
    pub return_type: u32,
    /// `D3D_SRV_DIMENSION`.
    pub dimension: u32,
    /// Sample count for multisampled textures.
    pub sample_count: u32,
    /// First register.
    pub bind_point: u32,
    /// Number of registers.
    pub bind_count: u32,
    /// `D3D_SHADER_INPUT_FLAGS`.
    pub flags: u32,
}

/// Parses an `RDEF` chunk payload.
pub fn parse_rdef_chunk(bytes: &[u8]) -> Result<RdefChunk, DxbcError> {
    if bytes.len() < RDEF_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "RDEF header needs {RDEF_HEADER_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let mut r = ByteReader::new(bytes);
    let cb_count = r.read_u32_le()? as usize;
    let cb_offset = r.read_u32_le()? as usize;
    let binding_count = r.read_u32_le()? as usize;
    let binding_offset = r.read_u32_le()? as usize;
    let minor = r.read_u8()?;
    let major = r.read_u8()?;
    let program_type = r.read_u16_le()?;
    let flags = r.read_u32_le()?;
    let creator_offset = r.read_u32_le()? as usize;

    let creator = read_name(&r, creator_offset, "creator")?;
    let mut type_budget = bytes.len() / BYTES_PER_TYPE_NODE;
    let variable_desc_len = if major >= 5 {
        VARIABLE_DESC_LEN_SM5
    } else {
        VARIABLE_DESC_LEN_SM4
    };

    check_table(bytes, "constant buffer", cb_offset, cb_count, CBUFFER_DESC_LEN)?;
    let mut constant_buffers = Vec::with_capacity(cb_count);
    for i in 0..cb_count {
        let mut cr = r.fork(cb_offset + i * CBUFFER_DESC_LEN)?;
        let name_offset = cr.read_u32_le()? as usize;
        let var_count = cr.read_u32_le()? as usize;
        let var_offset = cr.read_u32_le()? as usize;
        let size = cr.read_u32_le()?;
        let cb_flags = cr.read_u32_le()?;
        let cb_type = cr.read_u32_le()?;

        check_table(bytes, "variable", var_offset, var_count, variable_desc_len)?;
        let mut variables = Vec::with_capacity(var_count);
        for v in 0..var_count {
            let mut vr = r.fork(var_offset + v * variable_desc_len)?;
            let var_name_offset = vr.read_u32_le()? as usize;
            let offset = vr.read_u32_le()?;
            let var_size = vr.read_u32_le()?;
            let var_flags = vr.read_u32_le()?;
            let type_offset = vr.read_u32_le()? as usize;
            let _default_value_offset = vr.read_u32_le()?;

            variables.push(RdefVariable {
                name: read_name(&r, var_name_offset, "variable name")?,
                offset,
                size: var_size,
                flags: var_flags,
                ty: parse_type(&r, type_offset, 0, &mut type_budget)?,
            });
        }

        constant_buffers.push(RdefConstantBuffer {
            name: read_name(&r, name_offset, "constant buffer name")?,
            size,
            flags: cb_flags,
            cb_type,
            variables,
        });
    }

    check_table(bytes, "resource binding", binding_offset, binding_count, BINDING_DESC_LEN)?;
    let mut bindings = Vec::with_capacity(binding_count);
    for i in 0..binding_count {
        let mut br = r.fork(binding_offset + i * BINDING_DESC_LEN)?;
        let name_offset = br.read_u32_le()? as usize;
        bindings.push(RdefResourceBinding {
            input_type: br.read_u32_le()?,
            return_type: br.read_u32_le()?,
            dimension: br.read_u32_le()?,
            sample_count: br.read_u32_le()?,
            bind_point: br.read_u32_le()?,
            bind_count: br.read_u32_le()?,
            flags: br.read_u32_le()?,
            name: read_name(&r, name_offset, "resource name")?,
        });
    }

    Ok(RdefChunk {
        major,
        minor,
        program_type,
        flags,
        creator,
        constant_buffers,
        bindings,
    })
}

/// Resolves the type tree at `offset`, charging one node of `budget` per
/// descriptor visited.
fn parse_type(
    r: &ByteReader<'_>,
    offset: usize,
    depth: usize,
    budget: &mut usize,
) -> Result<RdefType, DxbcError> {
    if depth >= MAX_TYPE_DEPTH {
        return Err(DxbcError::invalid_chunk(format!(
            "type at {offset} nests deeper than {MAX_TYPE_DEPTH} levels"
        )));
    }
    if *budget == 0 {
        return Err(DxbcError::invalid_chunk(format!(
            "type graph expands past {} nodes for a {}-byte chunk",
            r.bytes().len() / BYTES_PER_TYPE_NODE,
            r.bytes().len()
        )));
    }
    *budget -= 1;
    if offset < RDEF_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "type offset {offset} points into the RDEF header"
        )));
    }

    let mut tr = r.fork(offset)?;
    let class = tr.read_u16_le()?;
    let ty = tr.read_u16_le()?;
    let rows = tr.read_u16_le()?;
    let columns = tr.read_u16_le()?;
    let elements = tr.read_u16_le()?;
    let member_count = tr.read_u16_le()?;
    let member_offset = tr.read_u32_le()?;

    let mut members = Vec::new();
    if member_count > 0 {
        let table = member_offset as usize;
        check_table(r.bytes(), "struct member", table, member_count as usize, MEMBER_DESC_LEN)?;
        for m in 0..member_count as usize {
            let mut mr = r.fork(table + m * MEMBER_DESC_LEN)?;
            let name_offset = mr.read_u32_le()? as usize;
            let member_type_offset = mr.read_u32_le()? as usize;
            let member_byte_offset = mr.read_u32_le()?;
            members.push(RdefStructMember {
                name: read_name(r, name_offset, "member name")?,
                offset: member_byte_offset,
                ty: parse_type(r, member_type_offset, depth + 1, budget)?,
            });
        }
    }

    Ok(RdefType {
        class,
        ty,
        rows,
        columns,
        elements,
        member_count,
        member_offset,
        members,
    })
}

fn check_table(
    bytes: &[u8],
    what: &str,
    offset: usize,
    count: usize,
    entry_len: usize,
) -> Result<(), DxbcError> {
    if count == 0 {
        return Ok(());
    }
    let end = count
        .checked_mul(entry_len)
        .and_then(|len| offset.checked_add(len));
    match end {
        Some(end) if end <= bytes.len() => Ok(()),
        _ => Err(DxbcError::invalid_chunk(format!(
            "{count} {what} descriptors at {offset} exceed chunk length {}",
            bytes.len()
        ))),
    }
}

fn read_name(r: &ByteReader<'_>, offset: usize, what: &str) -> Result<String, DxbcError> {
    r.read_cstring_at(offset)
        .map(str::to_owned)
        .map_err(|e| DxbcError::invalid_chunk(format!("{what}: {}", e.context())))
}
