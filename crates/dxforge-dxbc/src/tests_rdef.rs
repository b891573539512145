use pretty_assertions::assert_eq;

use crate::test_utils::{
    build_container, build_rdef_chunk, RdefBindingDesc, RdefCbufferDesc, RdefMemberDesc,
    RdefTypeDesc, RdefVariableDesc,
};
use crate::{parse_rdef_chunk, DxbcError, DxbcFile, FourCC};

const FLOAT4X4: RdefTypeDesc<'static> = RdefTypeDesc {
    class: 3, // D3D_SVC_MATRIX_COLUMNS
    ty: 3,    // D3D_SVT_FLOAT
    rows: 4,
    columns: 4,
    elements: 0,
    members: &[],
};

const FLOAT4: RdefTypeDesc<'static> = RdefTypeDesc {
    class: 1, // D3D_SVC_VECTOR
    ty: 3,
    rows: 1,
    columns: 4,
    elements: 0,
    members: &[],
};

fn sample_rdef() -> Vec<u8> {
    const LIGHT_MEMBERS: &[RdefMemberDesc<'static>] = &[
        RdefMemberDesc {
            name: "color",
            offset: 0,
            ty: FLOAT4,
        },
        RdefMemberDesc {
            name: "direction",
            offset: 16,
            ty: FLOAT4,
        },
    ];
    let light = RdefTypeDesc {
        class: 5, // D3D_SVC_STRUCT
        ty: 0,
        rows: 1,
        columns: 8,
        elements: 2,
        members: LIGHT_MEMBERS,
    };
    let vars = [
        RdefVariableDesc {
            name: "world_view_proj",
            offset: 0,
            size: 64,
            flags: 2,
            ty: FLOAT4X4,
        },
        RdefVariableDesc {
            name: "lights",
            offset: 64,
            size: 64,
            flags: 2,
            ty: light,
        },
    ];
    build_rdef_chunk(
        "dxforge test compiler",
        &[RdefCbufferDesc {
            name: "PerFrame",
            size: 128,
            flags: 0,
            variables: &vars,
        }],
        &[
            RdefBindingDesc {
                name: "linear_sampler",
                input_type: 3, // D3D_SIT_SAMPLER
                return_type: 0,
                dimension: 0,
                sample_count: 0,
                bind_point: 0,
                bind_count: 1,
                flags: 0,
            },
            RdefBindingDesc {
                name: "albedo",
                input_type: 2, // D3D_SIT_TEXTURE
                return_type: 5,
                dimension: 4,
                sample_count: 0xFFFF_FFFF,
                bind_point: 3,
                bind_count: 1,
                flags: 0x0C,
            },
            RdefBindingDesc {
                name: "PerFrame",
                input_type: 0, // D3D_SIT_CBUFFER
                return_type: 0,
                dimension: 0,
                sample_count: 0,
                bind_point: 1,
                bind_count: 1,
                flags: 0,
            },
        ],
    )
}

#[test]
fn parses_constant_buffers_variables_and_bindings() {
    let rdef = parse_rdef_chunk(&sample_rdef()).unwrap();
    assert_eq!((rdef.major, rdef.minor, rdef.program_type), (4, 0, 0xFFFE));
    assert_eq!(rdef.creator, "dxforge test compiler");

    assert_eq!(rdef.constant_buffers.len(), 1);
    let cb = &rdef.constant_buffers[0];
    assert_eq!(cb.name, "PerFrame");
    assert_eq!(cb.size, 128);
    assert_eq!(cb.variables.len(), 2);

    let wvp = &cb.variables[0];
    assert_eq!(wvp.name, "world_view_proj");
    assert_eq!((wvp.offset, wvp.size, wvp.flags), (0, 64, 2));
    assert_eq!((wvp.ty.class, wvp.ty.ty, wvp.ty.rows, wvp.ty.columns), (3, 3, 4, 4));
    assert!(wvp.ty.members.is_empty());

    let names: Vec<&str> = rdef.bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["linear_sampler", "albedo", "PerFrame"]);
    let albedo = &rdef.bindings[1];
    assert_eq!(albedo.bind_point, 3);
    assert_eq!(albedo.return_type, 5);
    assert_eq!(albedo.dimension, 4);
    assert_eq!(albedo.sample_count, u32::MAX);
    assert_eq!(albedo.flags, 0x0C);
}

#[test]
fn resolves_struct_members() {
    let rdef = parse_rdef_chunk(&sample_rdef()).unwrap();
    let lights = &rdef.constant_buffers[0].variables[1];
    assert_eq!(lights.ty.class, 5);
    assert_eq!(lights.ty.elements, 2);
    assert_eq!(lights.ty.member_count, 2);
    let members: Vec<(&str, u32, u16)> = lights
        .ty
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.offset, m.ty.columns))
        .collect();
    assert_eq!(members, [("color", 0, 4), ("direction", 16, 4)]);
}

#[test]
fn empty_rdef() {
    let rdef = parse_rdef_chunk(&build_rdef_chunk("fxc", &[], &[])).unwrap();
    assert!(rdef.constant_buffers.is_empty());
    assert!(rdef.bindings.is_empty());
    assert_eq!(rdef.creator, "fxc");
}

#[test]
fn name_offset_past_chunk_end_is_rejected() {
    let mut bytes = sample_rdef();
    // Creator offset lives at byte 24 of the header.
    let past_end = bytes.len() as u32 + 8;
    bytes[24..28].copy_from_slice(&past_end.to_le_bytes());
    let err = parse_rdef_chunk(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk(_)), "{err:?}");
}

#[test]
fn binding_table_past_chunk_end_is_rejected() {
    let mut bytes = sample_rdef();
    bytes[8..12].copy_from_slice(&1000u32.to_le_bytes());
    assert!(parse_rdef_chunk(&bytes).is_err());
}

#[test]
fn self_referencing_struct_is_cut_off() {
    let mut bytes = sample_rdef();
    let rdef = parse_rdef_chunk(&bytes).unwrap();
    let member_table = rdef.constant_buffers[0].variables[1].ty.member_offset as usize;
    // Point the first member's type back at the struct type itself.
    let var_desc = 28 + 24 + 24; // second variable descriptor
    let struct_type = u32::from_le_bytes(bytes[var_desc + 16..var_desc + 20].try_into().unwrap());
    bytes[member_table + 4..member_table + 8].copy_from_slice(&struct_type.to_le_bytes());
    let err = parse_rdef_chunk(&bytes).unwrap_err();
    assert!(err.to_string().contains("nests deeper"), "{err}");
}

/// One cbuffer with one variable whose type is the top of `levels` struct
/// levels; every member of level `k` points at the single type of level
/// `k - 1`, so the resolved tree has `fanout^(levels - 1)` leaves.
fn shared_member_rdef(levels: usize, fanout: u16) -> Vec<u8> {
    fn push_u32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_le_bytes());
    }
    fn push_type(out: &mut Vec<u8>, class: u16, columns: u16, members: u16, table: u32) {
        for v in [class, 3, 1, columns, 0, members] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        push_u32(out, table);
    }

    const NAME: u32 = 76;
    let mut out = Vec::new();
    for v in [1, 28, 0, 0] {
        push_u32(&mut out, v);
    }
    out.extend_from_slice(&[0x00, 0x04]);
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    push_u32(&mut out, 0);
    push_u32(&mut out, NAME);
    // cbuffer descriptor, then its variable descriptor at 52.
    for v in [NAME, 1, 52, 16, 0, 0] {
        push_u32(&mut out, v);
    }
    let var_type_field = out.len() + 16;
    for v in [NAME, 0, 16, 0, 0, 0] {
        push_u32(&mut out, v);
    }
    assert_eq!(out.len(), NAME as usize);
    out.extend_from_slice(b"x\0\0\0");

    let mut below = out.len() as u32;
    push_type(&mut out, 0, 1, 0, 0); // D3D_SVC_SCALAR
    for _ in 1..levels {
        let table = out.len() as u32;
        for i in 0..u32::from(fanout) {
            for v in [NAME, below, i * 4] {
                push_u32(&mut out, v);
            }
        }
        below = out.len() as u32;
        push_type(&mut out, 5, fanout, fanout, table); // D3D_SVC_STRUCT
    }
    out[var_type_field..var_type_field + 4].copy_from_slice(&below.to_le_bytes());
    out
}

#[test]
fn shared_member_types_resolve_within_budget() {
    let rdef = parse_rdef_chunk(&shared_member_rdef(4, 2)).unwrap();
    let ty = &rdef.constant_buffers[0].variables[0].ty;
    assert_eq!(ty.members.len(), 2);
    assert_eq!(ty.members[1].ty.members[0].ty.members.len(), 2);
    assert!(ty.members[0].ty.members[0].ty.members[0].ty.members.is_empty());
}

#[test]
fn wide_shared_type_graph_is_rejected_quickly() {
    let bytes = shared_member_rdef(8, 16);
    assert!(bytes.len() < 2048, "{}", bytes.len());

    let start = std::time::Instant::now();
    let err = parse_rdef_chunk(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk(_)), "{err:?}");
    assert!(err.to_string().contains("type graph expands past"), "{err}");
    assert!(start.elapsed() < std::time::Duration::from_secs(1));
}

#[test]
fn container_level_lookup() {
    let rdef = sample_rdef();
    let bytes = build_container(&[(FourCC::RDEF, &rdef)]);
    let file = DxbcFile::parse(&bytes).unwrap();
    let parsed = file.get_rdef().unwrap().unwrap();
    assert_eq!(parsed, parse_rdef_chunk(&rdef).unwrap());
}

#[test]
fn truncated_header() {
    assert!(matches!(
        parse_rdef_chunk(&[0u8; 20]),
        Err(DxbcError::InvalidChunk(_))
    ));
}
