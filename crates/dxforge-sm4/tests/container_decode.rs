use dxforge_dxbc::test_utils::build_container;
use dxforge_dxbc::{ErrorClass, FourCC, SignatureChunk, SignatureEntry};
use dxforge_sm4::sm4::encode::tokens_to_bytes;
use dxforge_sm4::sm4::opcode::*;
use dxforge_sm4::sm4_ir::{Swizzle, WriteMask};
use dxforge_sm4::{
    minimal_vertex_passthrough_tokens, parse_container, Operand, ShaderBuilder, ShaderModel,
    ShaderStage, Sm4DecodeErrorKind, Sm4Error, Sm4Inst,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn passthrough_shex() -> Vec<u8> {
    tokens_to_bytes(&minimal_vertex_passthrough_tokens().unwrap())
}

fn position_signature() -> Vec<u8> {
    SignatureChunk {
        entries: vec![SignatureEntry::new("POSITION", 0, 0, 0xF)],
    }
    .to_bytes()
}

fn program_bytes(body: &[u32]) -> Vec<u8> {
    let mut tokens = vec![0x0001_0050, 2 + body.len() as u32];
    tokens.extend_from_slice(body);
    tokens_to_bytes(&tokens)
}

fn decode_kind(body: &[u32]) -> (usize, Sm4DecodeErrorKind) {
    init_tracing();
    let bytes = build_container(&[(FourCC::SHEX, &program_bytes(body))]);
    match parse_container(&bytes) {
        Err(Sm4Error::Decode(err)) => (err.at_dword, err.kind),
        other => panic!("expected a decode error, got {other:?}"),
    }
}

#[test]
fn unknown_chunk_between_known_chunks_is_skipped() {
    init_tracing();
    let isgn = position_signature();
    let shex = passthrough_shex();
    let plain = build_container(&[(FourCC::ISGN, &isgn), (FourCC::SHEX, &shex)]);
    let with_extra = build_container(&[
        (FourCC::ISGN, &isgn),
        (FourCC(*b"ZZZZ"), &[0xA5; 12]),
        (FourCC::SHEX, &shex),
    ]);

    let plain = parse_container(&plain).unwrap();
    let with_extra = parse_container(&with_extra).unwrap();
    assert_eq!(with_extra.chunk_tags.len(), 3);
    assert_eq!(with_extra.input_signature, plain.input_signature);
    assert_eq!(with_extra.program, plain.program);
    assert_eq!(with_extra.rdef, plain.rdef);
}

#[test]
fn unsupported_opcode_stops_the_decode() {
    // dcl_globalFlags, then `dp3 r0.x, v0.xyzw, v0.xyzw`, then ret.
    let (at, kind) = decode_kind(&[
        0x0100_086A,
        0x0700_0010,
        0x0010_0012,
        0,
        0x0010_1E46,
        0,
        0x0010_1E46,
        0,
        0x0100_003E,
    ]);
    assert_eq!(at, 3);
    assert_eq!(kind, Sm4DecodeErrorKind::UnsupportedOpcode { opcode: 16 });
}

#[test]
fn lying_length_is_a_format_error() {
    let mut tokens = minimal_vertex_passthrough_tokens().unwrap();
    // mov o0.xyzw, v0.xyzw is the tenth token; claim 6 dwords instead of 5.
    assert_eq!(tokens[10], 0x0500_0036);
    tokens[10] = OPCODE_LENGTH.set(tokens[10], 6);
    let bytes = build_container(&[(FourCC::SHEX, &tokens_to_bytes(&tokens))]);

    let err = parse_container(&bytes).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Format);
    match err {
        Sm4Error::Decode(err) => {
            assert_eq!(err.at_dword, 10);
            assert_eq!(
                err.kind,
                Sm4DecodeErrorKind::InstructionLengthMismatch {
                    opcode: OpcodeType::Mov,
                    declared: 6,
                    consumed: 5
                }
            );
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn relative_indexing_is_rejected() {
    // mov r0.xyzw, cb0[r1.x + 0] uses a relative index representation.
    let (at, kind) = decode_kind(&[
        0x0500_0036,
        0x0010_00F2,
        0,
        OPERAND_INDEX_REPRESENTATION[1].set(0x0020_8E46, OPERAND_INDEX_RELATIVE),
        0,
        0,
    ]);
    assert_eq!(at, 5);
    assert_eq!(
        kind,
        Sm4DecodeErrorKind::UnsupportedIndexRepresentation {
            rep: OPERAND_INDEX_RELATIVE
        }
    );
}

#[test]
fn truncated_instruction_reports_eof() {
    let (_, kind) = decode_kind(&[0x0500_0036, 0x0010_00F2, 0]);
    assert!(matches!(kind, Sm4DecodeErrorKind::UnexpectedEof { .. }), "{kind:?}");
}

#[test]
fn builder_shapes_survive_a_container_round_trip() {
    init_tracing();
    let mut b = ShaderBuilder::new(ShaderStage::Pixel, ShaderModel { major: 5, minor: 0 });
    b.dcl_global_flags(GlobalFlags::REFACTORING_ALLOWED)
        .dcl_constant_buffer(0, 2, CbAccess::ImmediateIndexed)
        .dcl_sampler(0, SamplerMode::Default)
        .dcl_resource(0, ResourceDimension::Texture2D, ReturnType::Float)
        .dcl_input(0, WriteMask::XY)
        .dcl_output(0, WriteMask::XYZW);

    let t0 = b.alloc_temp().unwrap();
    let t1 = b.alloc_temp().unwrap();
    let r = |i| Operand::dst(OperandType::Temp, i, WriteMask::XYZW);
    let rs = |i| Operand::src(OperandType::Temp, i, Swizzle::XYZW);
    let cb = |row| Operand {
        indices: vec![
            dxforge_sm4::sm4_ir::OperandIndex::Imm32(0),
            dxforge_sm4::sm4_ir::OperandIndex::Imm32(row),
        ],
        ..Operand::src(OperandType::ConstantBuffer, 0, Swizzle::XYZW)
    };

    b.sample_l(
        r(t0),
        Operand::src(OperandType::Input, 0, Swizzle([0, 1, 0, 0])),
        0,
        0,
        Operand::imm_f32(0.0),
    )
    .unwrap()
    .mul(r(t1), rs(t0), cb(0))
    .unwrap()
    .add(r(t1), rs(t1), Operand::imm_f32x4([0.5, 0.5, 0.5, 0.0]))
    .unwrap()
    .mad(
        Operand::dst(OperandType::Output, 0, WriteMask::XYZW),
        rs(t1),
        cb(1),
        Operand::src_select(OperandType::Temp, t0, 3),
    )
    .unwrap()
    .ret();

    let expected = b.clone().into_module();
    let tokens = b.finish().unwrap();
    let bytes = build_container(&[(FourCC::SHEX, &tokens_to_bytes(&tokens))]);
    let parsed = parse_container(&bytes).unwrap();

    let program = parsed.program.unwrap();
    assert_eq!(program, expected);
    assert_eq!(program.instructions[6], Sm4Inst::DclTemps { count: 2 });
    assert_eq!(program.stage, ShaderStage::Pixel);
}

#[test]
fn rdef_is_exposed() {
    use dxforge_dxbc::test_utils::{build_rdef_chunk, RdefBindingDesc};
    let rdef = build_rdef_chunk(
        "dxforge",
        &[],
        &[RdefBindingDesc {
            name: "tex",
            input_type: 2,
            return_type: 5,
            dimension: 4,
            sample_count: u32::MAX,
            bind_point: 0,
            bind_count: 1,
            flags: 0,
        }],
    );
    let bytes = build_container(&[(FourCC::RDEF, &rdef), (FourCC::SHEX, &passthrough_shex())]);
    let parsed = parse_container(&bytes).unwrap();
    let rdef = parsed.rdef.unwrap();
    assert_eq!(rdef.creator, "dxforge");
    assert_eq!(rdef.bindings[0].name, "tex");
}

proptest! {
    #[test]
    fn container_parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = parse_container(&bytes);
    }

    #[test]
    fn shex_payload_never_panics(body in proptest::collection::vec(any::<u32>(), 0..64)) {
        let bytes = build_container(&[(FourCC::SHEX, &program_bytes(&body))]);
        match parse_container(&bytes) {
            Ok(parsed) => prop_assert!(parsed.program.is_some()),
            Err(err) => prop_assert_eq!(err.class(), ErrorClass::Format),
        }
    }
}
