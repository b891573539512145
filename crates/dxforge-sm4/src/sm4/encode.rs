//! Instruction encoder, the inverse of [`super::decode`].

use dxforge_dxbc::DxbcError;
use thiserror::Error;

use crate::bits::BitRange;
use crate::sm4_ir::{ComponentSelection, FourComponent, Operand, OperandIndex, Sm4Inst, Swizzle};

use super::opcode::*;
use super::operand::encode_operand;
use super::{ShaderModel, ShaderStage, VERSION_MAJOR, VERSION_MINOR, VERSION_PROGRAM_TYPE};

/// Misuse of the encoder or builder.
///
/// These are programming errors on the caller's side; well-formed input never
/// produces them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("invalid operand: {0}")]
    InvalidOperand(&'static str),
    #[error("{} needs {dwords} dwords, more than an opcode token can declare", .opcode.name())]
    InstructionTooLong { opcode: OpcodeType, dwords: usize },
    #[error("temp register r{index} is outside the 32 tracked registers")]
    TempRegisterOutOfRange { index: u32 },
    #[error("{ty:?} cannot be written by an instruction")]
    InvalidDestination { ty: OperandType },
    #[error("expected {expected:?} operand, found {found:?}")]
    UnexpectedOperandType {
        expected: OperandType,
        found: OperandType,
    },
    #[error("resource sample count {count} (must be 0 or 1)")]
    InvalidSampleCount { count: u32 },
    #[error("t{slot} is sampled before its dcl_resource")]
    UndeclaredResource { slot: u32 },
    #[error("shader model {major}.{minor} does not fit the version token")]
    InvalidShaderModel { major: u8, minor: u8 },
    #[error(transparent)]
    Container(#[from] DxbcError),
}

/// Packs stage and model into a version token.
pub fn encode_version_token(stage: ShaderStage, model: ShaderModel) -> Result<u32, EmitError> {
    let (major, minor) = (u32::from(model.major), u32::from(model.minor));
    if !VERSION_MAJOR.fits(major) || !VERSION_MINOR.fits(minor) {
        return Err(EmitError::InvalidShaderModel {
            major: model.major,
            minor: model.minor,
        });
    }
    let token = VERSION_MINOR.place(minor) | VERSION_MAJOR.place(major);
    Ok(VERSION_PROGRAM_TYPE.set(token, u32::from(stage.program_type())))
}

/// Encodes a full program: version token, length token, then `insts`.
pub fn encode_program(
    stage: ShaderStage,
    model: ShaderModel,
    insts: &[Sm4Inst],
) -> Result<Vec<u32>, EmitError> {
    let mut tokens = vec![encode_version_token(stage, model)?, 0];
    for inst in insts {
        encode_instruction(inst, &mut tokens)?;
    }
    tokens[1] = tokens.len() as u32;
    Ok(tokens)
}

/// Appends one instruction to `out`, computing its length field.
///
/// On error `out` is left unchanged.
pub fn encode_instruction(inst: &Sm4Inst, out: &mut Vec<u32>) -> Result<(), EmitError> {
    let opcode = inst.opcode();
    let mut token = opcode.raw();
    let mut body = Vec::new();

    match inst {
        Sm4Inst::DclGlobalFlags { flags } => {
            token |= (*flags & GlobalFlags::all()).bits();
        }
        Sm4Inst::DclInput { operand } | Sm4Inst::DclOutput { operand } => {
            encode_operand(operand, &mut body)?;
        }
        Sm4Inst::DclOutputSiv { operand, name } => {
            encode_operand(operand, &mut body)?;
            body.push(SYSTEM_VALUE_NAME.place(name.raw()));
        }
        Sm4Inst::DclTemps { count } => body.push(*count),
        Sm4Inst::DclConstantBuffer { slot, size, access } => {
            let dynamic = matches!(access, CbAccess::DynamicIndexed);
            token = CB_ACCESS_PATTERN.set(token, u32::from(dynamic));
            let operand = Operand {
                ty: OperandType::ConstantBuffer,
                components: ComponentSelection::Four(FourComponent::Swizzle(Swizzle::XYZW)),
                indices: vec![OperandIndex::Imm32(*slot), OperandIndex::Imm32(*size)],
                immediate: None,
            };
            encode_operand(&operand, &mut body)?;
        }
        Sm4Inst::DclSampler { slot, mode } => {
            token = SAMPLER_MODE.set(token, mode.raw());
            encode_operand(&Operand::sampler(*slot), &mut body)?;
        }
        Sm4Inst::DclResource {
            slot,
            dimension,
            sample_count,
            return_types,
        } => {
            if *sample_count > 1 {
                return Err(EmitError::InvalidSampleCount {
                    count: *sample_count,
                });
            }
            token = RESOURCE_DIMENSION.set(token, dimension.raw());
            token = RESOURCE_SAMPLE_COUNT.set(token, *sample_count);
            encode_operand(&Operand::resource(*slot), &mut body)?;
            body.push(pack_return_types(0, return_types, &RETURN_TYPE_COMPONENTS));
        }
        Sm4Inst::Mov { dst, src } => {
            encode_dst(dst, &mut body)?;
            encode_operand(src, &mut body)?;
        }
        Sm4Inst::Add { dst, a, b } | Sm4Inst::Mul { dst, a, b } => {
            encode_dst(dst, &mut body)?;
            encode_operand(a, &mut body)?;
            encode_operand(b, &mut body)?;
        }
        Sm4Inst::Mad { dst, a, b, c } => {
            encode_dst(dst, &mut body)?;
            encode_operand(a, &mut body)?;
            encode_operand(b, &mut body)?;
            encode_operand(c, &mut body)?;
        }
        Sm4Inst::SampleL {
            resource_dimension,
            return_types,
            dst,
            coord,
            texture,
            sampler,
            lod,
        } => {
            expect_type(texture, OperandType::Resource)?;
            expect_type(sampler, OperandType::Sampler)?;
            token = OPCODE_EXTENDED.set(token, 1);

            let dim = EXTENDED_OPCODE_TYPE.place(EXTENDED_OPCODE_RESOURCE_DIM);
            let dim = EXTENDED_RESOURCE_DIMENSION.set(dim, resource_dimension.raw());
            body.push(EXTENDED_OPCODE_CONTINUES.set(dim, 1));
            let ret = EXTENDED_OPCODE_TYPE.place(EXTENDED_OPCODE_RESOURCE_RETURN_TYPE);
            body.push(pack_return_types(ret, return_types, &EXTENDED_RETURN_TYPES));

            encode_dst(dst, &mut body)?;
            encode_operand(coord, &mut body)?;
            encode_operand(texture, &mut body)?;
            encode_operand(sampler, &mut body)?;
            encode_operand(lod, &mut body)?;
        }
        Sm4Inst::Ret => {}
    }

    let dwords = 1 + body.len();
    if dwords > MAX_INSTRUCTION_DWORDS {
        return Err(EmitError::InstructionTooLong { opcode, dwords });
    }
    out.push(OPCODE_LENGTH.set(token, dwords as u32));
    out.extend_from_slice(&body);
    Ok(())
}

/// Flattens a token stream into little-endian bytes for a `SHEX` chunk.
pub fn tokens_to_bytes(tokens: &[u32]) -> Vec<u8> {
    tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
}

fn encode_dst(dst: &Operand, out: &mut Vec<u32>) -> Result<(), EmitError> {
    if dst.is_immediate() {
        return Err(EmitError::InvalidDestination { ty: dst.ty });
    }
    encode_operand(dst, out)
}

fn expect_type(op: &Operand, expected: OperandType) -> Result<(), EmitError> {
    if op.ty != expected {
        return Err(EmitError::UnexpectedOperandType {
            expected,
            found: op.ty,
        });
    }
    Ok(())
}

fn pack_return_types(token: u32, types: &[ReturnType; 4], fields: &[BitRange; 4]) -> u32 {
    fields
        .iter()
        .zip(types)
        .fold(token, |t, (field, ty)| field.set(t, ty.raw()))
}
