//! Builders for synthetic chunks used by tests.

use crate::fourcc::FourCC;
use crate::writer::write_container;

/// Builds a container with a valid checksum, panicking on oversized input.
pub fn build_container(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    write_container(chunks).expect("test container fits in 32-bit offsets")
}

/// Builds a container whose checksum field is left zeroed.
pub fn build_container_unchecked(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let mut bytes = build_container(chunks);
    bytes[4..20].fill(0);
    bytes
}

/// Type descriptor input for [`build_rdef_chunk`].
#[derive(Debug, Clone, Copy)]
pub struct RdefTypeDesc<'a> {
    pub class: u16,
    pub ty: u16,
    pub rows: u16,
    pub columns: u16,
    pub elements: u16,
    pub members: &'a [RdefMemberDesc<'a>],
}

/// Struct member input for [`build_rdef_chunk`].
#[derive(Debug, Clone, Copy)]
pub struct RdefMemberDesc<'a> {
    pub name: &'a str,
    pub offset: u32,
    pub ty: RdefTypeDesc<'a>,
}

/// Variable input for [`build_rdef_chunk`].
#[derive(Debug, Clone, Copy)]
pub struct RdefVariableDesc<'a> {
    pub name: &'a str,
    pub offset: u32,
    pub size: u32,
    pub flags: u32,
    pub ty: RdefTypeDesc<'a>,
}

/// Constant buffer input for [`build_rdef_chunk`].
#[derive(Debug, Clone, Copy)]
pub struct RdefCbufferDesc<'a> {
    pub name: &'a str,
    pub size: u32,
    pub flags: u32,
    pub variables: &'a [RdefVariableDesc<'a>],
}

/// Resource binding input for [`build_rdef_chunk`].
#[derive(Debug, Clone, Copy)]
pub struct RdefBindingDesc<'a> {
    pub name: &'a str,
    pub input_type: u32,
    pub return_type: u32,
    pub dimension: u32,
    pub sample_count: u32,
    pub bind_point: u32,
    pub bind_count: u32,
    pub flags: u32,
}

/// Builds a shader model 4.0 vertex shader `RDEF` payload.
///
/// Layout: header, constant buffer table, all variable descriptors, binding
/// table, then a pool holding strings, type descriptors and member tables.
pub fn build_rdef_chunk(
    creator: &str,
    cbuffers: &[RdefCbufferDesc<'_>],
    bindings: &[RdefBindingDesc<'_>],
) -> Vec<u8> {
    const HEADER: usize = 28;
    let var_total: usize = cbuffers.iter().map(|cb| cb.variables.len()).sum();
    let cb_table = HEADER;
    let var_table = cb_table + 24 * cbuffers.len();
    let binding_table = var_table + 24 * var_total;
    let pool_base = binding_table + 32 * bindings.len();

    let mut pool = Pool {
        base: pool_base,
        bytes: Vec::new(),
    };

    let mut out = Vec::new();
    push_u32(&mut out, cbuffers.len() as u32);
    push_u32(&mut out, if cbuffers.is_empty() { 0 } else { cb_table as u32 });
    push_u32(&mut out, bindings.len() as u32);
    push_u32(&mut out, if bindings.is_empty() { 0 } else { binding_table as u32 });
    out.extend_from_slice(&[0x00, 0x04]); // vs_4_0
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    push_u32(&mut out, 0x100); // flags
    let creator_offset = pool.string(creator);
    push_u32(&mut out, creator_offset);

    let mut next_var = var_table;
    let mut var_descs = Vec::new();
    for cb in cbuffers {
        let name = pool.string(cb.name);
        push_u32(&mut out, name);
        push_u32(&mut out, cb.variables.len() as u32);
        push_u32(&mut out, next_var as u32);
        push_u32(&mut out, cb.size);
        push_u32(&mut out, cb.flags);
        push_u32(&mut out, 0); // D3D_CT_CBUFFER
        next_var += 24 * cb.variables.len();

        for var in cb.variables {
            let name = pool.string(var.name);
            let ty = pool.type_desc(&var.ty);
            push_u32(&mut var_descs, name);
            push_u32(&mut var_descs, var.offset);
            push_u32(&mut var_descs, var.size);
            push_u32(&mut var_descs, var.flags);
            push_u32(&mut var_descs, ty);
            push_u32(&mut var_descs, 0);
        }
    }
    out.extend_from_slice(&var_descs);

    for b in bindings {
        let name = pool.string(b.name);
        for v in [
            name,
            b.input_type,
            b.return_type,
            b.dimension,
            b.sample_count,
            b.bind_point,
            b.bind_count,
            b.flags,
        ] {
            push_u32(&mut out, v);
        }
    }

    assert_eq!(out.len(), pool_base);
    out.extend_from_slice(&pool.bytes);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

struct Pool {
    base: usize,
    bytes: Vec<u8>,
}

impl Pool {
    fn offset(&self) -> u32 {
        (self.base + self.bytes.len()) as u32
    }

    fn string(&mut self, s: &str) -> u32 {
        let at = self.offset();
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        at
    }

    fn align(&mut self) {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
    }

    fn type_desc(&mut self, ty: &RdefTypeDesc<'_>) -> u32 {
        let mut members = Vec::with_capacity(ty.members.len());
        for m in ty.members {
            let name = self.string(m.name);
            let member_ty = self.type_desc(&m.ty);
            members.push((name, member_ty, m.offset));
        }

        self.align();
        let member_table = if members.is_empty() { 0 } else { self.offset() };
        for (name, member_ty, offset) in members {
            push_u32(&mut self.bytes, name);
            push_u32(&mut self.bytes, member_ty);
            push_u32(&mut self.bytes, offset);
        }

        let at = self.offset();
        for v in [ty.class, ty.ty, ty.rows, ty.columns, ty.elements, ty.members.len() as u16] {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        push_u32(&mut self.bytes, member_table);
        at
    }
}
