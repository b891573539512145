use thiserror::Error;
use tracing::trace;

use crate::bits::BitRange;
use crate::sm4_ir::{Operand, Sm4Inst, Sm4Module};

use super::opcode::*;
use super::operand::decode_operand;
use super::reader::TokenReader;
use super::Sm4Program;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SM4/5 decode error at dword {at_dword}: {kind}")]
pub struct Sm4DecodeError {
    pub at_dword: usize,
    pub kind: Sm4DecodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Sm4DecodeErrorKind {
    #[error("unexpected end of token stream (wanted {wanted} dwords, {remaining} remaining)")]
    UnexpectedEof { wanted: usize, remaining: usize },
    #[error("declared program length {declared} is out of bounds (available {available})")]
    InvalidDeclaredLength { declared: usize, available: usize },
    #[error("instruction length is zero")]
    InstructionLengthZero,
    #[error("{} declares {declared} dwords but its payload used {consumed}", .opcode.name())]
    InstructionLengthMismatch {
        opcode: OpcodeType,
        declared: usize,
        consumed: usize,
    },
    #[error("unsupported opcode {} ({opcode})", opcode_label(.opcode))]
    UnsupportedOpcode { opcode: u32 },
    #[error("extended opcode token: {0}")]
    InvalidExtendedOpcode(&'static str),
    #[error("unsupported operand component count {raw}")]
    UnsupportedComponentCount { raw: u32 },
    #[error("unsupported component selection mode {mode}")]
    UnsupportedSelectionMode { mode: u32 },
    #[error("unsupported operand type {ty}")]
    UnsupportedOperandType { ty: u32 },
    #[error("unsupported operand index representation {rep}")]
    UnsupportedIndexRepresentation { rep: u32 },
    #[error("extended operand tokens are not supported")]
    UnsupportedExtendedOperand,
    #[error("expected {expected:?} operand, found {found:?}")]
    UnexpectedOperandType {
        expected: OperandType,
        found: OperandType,
    },
    #[error("expected {expected}D operand index, found {found}D")]
    UnexpectedIndexDimension { expected: usize, found: usize },
    #[error("destination operand cannot be an immediate")]
    ImmediateDestination,
    #[error("resource sample count {count} (must be 0 or 1)")]
    InvalidSampleCount { count: u32 },
    #[error("unknown {what} value {value}")]
    UnknownEnumValue { what: &'static str, value: u32 },
}

fn opcode_label(raw: &u32) -> &'static str {
    OpcodeType::from_raw(*raw).map_or("unknown", OpcodeType::name)
}

/// Decodes every instruction of `program`.
///
/// Decoding stops at the first error; there is no skip-ahead for opcodes the
/// decoder does not model.
pub fn decode_program(program: &Sm4Program) -> Result<Sm4Module, Sm4DecodeError> {
    let declared_len = program.tokens.get(1).copied().unwrap_or(0) as usize;
    if declared_len < 2 || declared_len > program.tokens.len() {
        return Err(Sm4DecodeError {
            at_dword: 1,
            kind: Sm4DecodeErrorKind::InvalidDeclaredLength {
                declared: declared_len,
                available: program.tokens.len(),
            },
        });
    }

    let toks = &program.tokens[..declared_len];
    let mut r = TokenReader::at(toks, 2);
    let mut instructions = Vec::new();
    while !r.is_eof() {
        let at = r.pos();
        let inst = decode_instruction(&mut r)?;
        trace!(at, opcode = inst.opcode().name(), "decoded SM4 instruction");
        instructions.push(inst);
    }

    Ok(Sm4Module {
        stage: program.stage,
        model: program.model,
        instructions,
    })
}

/// Decodes one instruction starting at the reader's position.
///
/// After the payload is read, the DWORDs consumed must equal the length
/// declared in the opcode token.
pub fn decode_instruction(r: &mut TokenReader<'_>) -> Result<Sm4Inst, Sm4DecodeError> {
    let start = r.pos();
    let token = r.read_u32()?;
    let at_start = |kind| Sm4DecodeError {
        at_dword: start,
        kind,
    };

    let raw = OPCODE_TYPE.get(token);
    let declared = OPCODE_LENGTH.get(token) as usize;
    if declared == 0 {
        return Err(at_start(Sm4DecodeErrorKind::InstructionLengthZero));
    }
    let opcode = OpcodeType::from_raw(raw)
        .ok_or_else(|| at_start(Sm4DecodeErrorKind::UnsupportedOpcode { opcode: raw }))?;
    if OPCODE_EXTENDED.get(token) != 0 && opcode != OpcodeType::SampleL {
        return Err(at_start(Sm4DecodeErrorKind::InvalidExtendedOpcode(
            "only sample_l carries extended opcode tokens",
        )));
    }

    let inst = match opcode {
        OpcodeType::DclGlobalFlags => Sm4Inst::DclGlobalFlags {
            flags: GlobalFlags::from_bits_truncate(token),
        },
        OpcodeType::DclInput => Sm4Inst::DclInput {
            operand: decode_operand(r)?,
        },
        OpcodeType::DclOutput => Sm4Inst::DclOutput {
            operand: decode_operand(r)?,
        },
        OpcodeType::DclOutputSiv => {
            let operand = decode_operand(r)?;
            let at = r.pos();
            let value = SYSTEM_VALUE_NAME.get(r.read_u32()?);
            let name = SystemValueName::from_raw(value).ok_or(Sm4DecodeError {
                at_dword: at,
                kind: Sm4DecodeErrorKind::UnknownEnumValue {
                    what: "system value name",
                    value,
                },
            })?;
            Sm4Inst::DclOutputSiv { operand, name }
        }
        OpcodeType::DclTemps => Sm4Inst::DclTemps {
            count: r.read_u32()?,
        },
        OpcodeType::DclConstantBuffer => {
            let access = if CB_ACCESS_PATTERN.get(token) != 0 {
                CbAccess::DynamicIndexed
            } else {
                CbAccess::ImmediateIndexed
            };
            let at = r.pos();
            let operand = decode_operand(r)?;
            let [slot, size] = register_indices(&operand, OperandType::ConstantBuffer, at)?;
            Sm4Inst::DclConstantBuffer { slot, size, access }
        }
        OpcodeType::DclSampler => {
            let value = SAMPLER_MODE.get(token);
            let mode = SamplerMode::from_raw(value).ok_or_else(|| {
                at_start(Sm4DecodeErrorKind::UnknownEnumValue {
                    what: "sampler mode",
                    value,
                })
            })?;
            let at = r.pos();
            let operand = decode_operand(r)?;
            let [slot] = register_indices(&operand, OperandType::Sampler, at)?;
            Sm4Inst::DclSampler { slot, mode }
        }
        OpcodeType::DclResource => {
            let value = RESOURCE_DIMENSION.get(token);
            let dimension = ResourceDimension::from_raw(value).ok_or_else(|| {
                at_start(Sm4DecodeErrorKind::UnknownEnumValue {
                    what: "resource dimension",
                    value,
                })
            })?;
            let sample_count = RESOURCE_SAMPLE_COUNT.get(token);
            if sample_count > 1 {
                return Err(at_start(Sm4DecodeErrorKind::InvalidSampleCount {
                    count: sample_count,
                }));
            }
            let at = r.pos();
            let operand = decode_operand(r)?;
            let [slot] = register_indices(&operand, OperandType::Resource, at)?;
            let at = r.pos();
            let return_types = decode_return_types(r.read_u32()?, &RETURN_TYPE_COMPONENTS, at)?;
            Sm4Inst::DclResource {
                slot,
                dimension,
                sample_count,
                return_types,
            }
        }
        OpcodeType::Mov => Sm4Inst::Mov {
            dst: decode_dst(r)?,
            src: decode_operand(r)?,
        },
        OpcodeType::Add => Sm4Inst::Add {
            dst: decode_dst(r)?,
            a: decode_operand(r)?,
            b: decode_operand(r)?,
        },
        OpcodeType::Mul => Sm4Inst::Mul {
            dst: decode_dst(r)?,
            a: decode_operand(r)?,
            b: decode_operand(r)?,
        },
        OpcodeType::Mad => Sm4Inst::Mad {
            dst: decode_dst(r)?,
            a: decode_operand(r)?,
            b: decode_operand(r)?,
            c: decode_operand(r)?,
        },
        OpcodeType::SampleL => decode_sample_l(token, r)?,
        OpcodeType::Ret => Sm4Inst::Ret,
        _ => return Err(at_start(Sm4DecodeErrorKind::UnsupportedOpcode { opcode: raw })),
    };

    let consumed = r.pos() - start;
    if consumed != declared {
        return Err(at_start(Sm4DecodeErrorKind::InstructionLengthMismatch {
            opcode,
            declared,
            consumed,
        }));
    }
    Ok(inst)
}

/// `sample_l` carries a resource-dimension and a return-type extension, in
/// that order, before its five operands.
fn decode_sample_l(token: u32, r: &mut TokenReader<'_>) -> Result<Sm4Inst, Sm4DecodeError> {
    let invalid = |at_dword, msg| Sm4DecodeError {
        at_dword,
        kind: Sm4DecodeErrorKind::InvalidExtendedOpcode(msg),
    };

    if OPCODE_EXTENDED.get(token) == 0 {
        return Err(invalid(
            r.pos() - 1,
            "sample_l requires resource dimension and return type extensions",
        ));
    }

    let at = r.pos();
    let dim_token = r.read_u32()?;
    if EXTENDED_OPCODE_TYPE.get(dim_token) != EXTENDED_OPCODE_RESOURCE_DIM {
        return Err(invalid(at, "expected resource dimension extension first"));
    }
    if EXTENDED_OPCODE_CONTINUES.get(dim_token) == 0 {
        return Err(invalid(at, "missing return type extension"));
    }
    let value = EXTENDED_RESOURCE_DIMENSION.get(dim_token);
    let resource_dimension = ResourceDimension::from_raw(value).ok_or(Sm4DecodeError {
        at_dword: at,
        kind: Sm4DecodeErrorKind::UnknownEnumValue {
            what: "resource dimension",
            value,
        },
    })?;

    let at = r.pos();
    let ret_token = r.read_u32()?;
    if EXTENDED_OPCODE_TYPE.get(ret_token) != EXTENDED_OPCODE_RESOURCE_RETURN_TYPE {
        return Err(invalid(at, "expected return type extension second"));
    }
    if EXTENDED_OPCODE_CONTINUES.get(ret_token) != 0 {
        return Err(invalid(at, "unexpected third extension"));
    }
    let return_types = decode_return_types(ret_token, &EXTENDED_RETURN_TYPES, at)?;

    let dst = decode_dst(r)?;
    let coord = decode_operand(r)?;
    let at = r.pos();
    let texture = expect_type(decode_operand(r)?, OperandType::Resource, at)?;
    let at = r.pos();
    let sampler = expect_type(decode_operand(r)?, OperandType::Sampler, at)?;
    let lod = decode_operand(r)?;

    Ok(Sm4Inst::SampleL {
        resource_dimension,
        return_types,
        dst,
        coord,
        texture,
        sampler,
        lod,
    })
}

fn decode_dst(r: &mut TokenReader<'_>) -> Result<Operand, Sm4DecodeError> {
    let at = r.pos();
    let op = decode_operand(r)?;
    if op.is_immediate() {
        return Err(Sm4DecodeError {
            at_dword: at,
            kind: Sm4DecodeErrorKind::ImmediateDestination,
        });
    }
    Ok(op)
}

fn expect_type(op: Operand, expected: OperandType, at: usize) -> Result<Operand, Sm4DecodeError> {
    if op.ty != expected {
        return Err(Sm4DecodeError {
            at_dword: at,
            kind: Sm4DecodeErrorKind::UnexpectedOperandType {
                expected,
                found: op.ty,
            },
        });
    }
    Ok(op)
}

/// Checks a declaration operand and returns its `N` 32-bit indices.
fn register_indices<const N: usize>(
    op: &Operand,
    expected: OperandType,
    at: usize,
) -> Result<[u32; N], Sm4DecodeError> {
    let err = |kind| Sm4DecodeError { at_dword: at, kind };
    if op.ty != expected {
        return Err(err(Sm4DecodeErrorKind::UnexpectedOperandType {
            expected,
            found: op.ty,
        }));
    }
    if op.indices.len() != N {
        return Err(err(Sm4DecodeErrorKind::UnexpectedIndexDimension {
            expected: N,
            found: op.indices.len(),
        }));
    }
    let mut out = [0u32; N];
    for (slot, index) in out.iter_mut().zip(&op.indices) {
        *slot = index.as_u32().ok_or(err(
            Sm4DecodeErrorKind::UnsupportedIndexRepresentation {
                rep: OPERAND_INDEX_IMMEDIATE64,
            },
        ))?;
    }
    Ok(out)
}

fn decode_return_types(
    token: u32,
    fields: &[BitRange; 4],
    at: usize,
) -> Result<[ReturnType; 4], Sm4DecodeError> {
    let mut out = [ReturnType::Float; 4];
    for (ty, field) in out.iter_mut().zip(fields) {
        let value = field.get(token);
        *ty = ReturnType::from_raw(value).ok_or(Sm4DecodeError {
            at_dword: at,
            kind: Sm4DecodeErrorKind::UnknownEnumValue {
                what: "resource return type",
                value,
            },
        })?;
    }
    Ok(out)
}
