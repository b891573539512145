//! Programmatic construction of SM4/SM5 programs.
//!
//! [`ShaderBuilder`] collects [`Sm4Inst`] values, tracks which temp registers
//! the program touches, and serializes the result through
//! [`super::encode`].

use dxforge_dxbc::{write_container, FourCC, SignatureChunk, SignatureEntry};
use tracing::debug;

use crate::sm4_ir::{Operand, Sm4Inst, Sm4Module, Swizzle, WriteMask};

use super::encode::{encode_program, tokens_to_bytes, EmitError};
use super::opcode::*;
use super::{ShaderModel, ShaderStage};

/// Temp registers tracked by the clobber mask.
pub const MAX_TEMPS: u32 = 32;

/// Builds one shader program.
#[derive(Debug, Clone)]
pub struct ShaderBuilder {
    stage: ShaderStage,
    model: ShaderModel,
    instructions: Vec<Sm4Inst>,
    next_temp: u32,
    /// Bit `n` set once `r#n` appears in an instruction.
    temp_clobber: u32,
}

impl ShaderBuilder {
    pub fn new(stage: ShaderStage, model: ShaderModel) -> Self {
        Self {
            stage,
            model,
            instructions: Vec::new(),
            next_temp: 0,
            temp_clobber: 0,
        }
    }

    /// Reserves the next unused temp register and returns its index.
    pub fn alloc_temp(&mut self) -> Result<u32, EmitError> {
        let index = self.next_temp;
        if index >= MAX_TEMPS {
            return Err(EmitError::TempRegisterOutOfRange { index });
        }
        self.next_temp += 1;
        Ok(index)
    }

    /// Instructions recorded so far, without the implicit `dcl_temps`.
    pub fn instructions(&self) -> &[Sm4Inst] {
        &self.instructions
    }

    /// Number of temps `finish` will declare.
    pub fn temp_count(&self) -> u32 {
        self.next_temp
            .max(MAX_TEMPS - self.temp_clobber.leading_zeros())
    }

    pub fn dcl_global_flags(&mut self, flags: GlobalFlags) -> &mut Self {
        self.instructions.push(Sm4Inst::DclGlobalFlags { flags });
        self
    }

    pub fn dcl_input(&mut self, register: u32, mask: WriteMask) -> &mut Self {
        self.instructions.push(Sm4Inst::DclInput {
            operand: Operand::dst(OperandType::Input, register, mask),
        });
        self
    }

    pub fn dcl_output(&mut self, register: u32, mask: WriteMask) -> &mut Self {
        self.instructions.push(Sm4Inst::DclOutput {
            operand: Operand::dst(OperandType::Output, register, mask),
        });
        self
    }

    pub fn dcl_output_siv(
        &mut self,
        register: u32,
        mask: WriteMask,
        name: SystemValueName,
    ) -> &mut Self {
        self.instructions.push(Sm4Inst::DclOutputSiv {
            operand: Operand::dst(OperandType::Output, register, mask),
            name,
        });
        self
    }

    /// Guarantees at least `count` temps are declared.
    ///
    /// The declaration itself is emitted once, by [`ShaderBuilder::finish`].
    pub fn dcl_temps(&mut self, count: u32) -> Result<&mut Self, EmitError> {
        if count > MAX_TEMPS {
            return Err(EmitError::TempRegisterOutOfRange { index: count - 1 });
        }
        self.next_temp = self.next_temp.max(count);
        Ok(self)
    }

    /// `size` is stored as encoded, in 16-byte vectors.
    pub fn dcl_constant_buffer(&mut self, slot: u32, size: u32, access: CbAccess) -> &mut Self {
        self.instructions
            .push(Sm4Inst::DclConstantBuffer { slot, size, access });
        self
    }

    pub fn dcl_sampler(&mut self, slot: u32, mode: SamplerMode) -> &mut Self {
        self.instructions.push(Sm4Inst::DclSampler { slot, mode });
        self
    }

    /// Declares a single-sampled resource returning `return_type` on every
    /// component.
    pub fn dcl_resource(
        &mut self,
        slot: u32,
        dimension: ResourceDimension,
        return_type: ReturnType,
    ) -> &mut Self {
        self.instructions.push(Sm4Inst::DclResource {
            slot,
            dimension,
            sample_count: 0,
            return_types: [return_type; 4],
        });
        self
    }

    pub fn mov(&mut self, dst: Operand, src: Operand) -> Result<&mut Self, EmitError> {
        self.check_dst(&dst)?;
        self.track_temps(&src)?;
        self.instructions.push(Sm4Inst::Mov { dst, src });
        Ok(self)
    }

    pub fn add(&mut self, dst: Operand, a: Operand, b: Operand) -> Result<&mut Self, EmitError> {
        self.check_dst(&dst)?;
        self.track_temps(&a)?;
        self.track_temps(&b)?;
        self.instructions.push(Sm4Inst::Add { dst, a, b });
        Ok(self)
    }

    pub fn mul(&mut self, dst: Operand, a: Operand, b: Operand) -> Result<&mut Self, EmitError> {
        self.check_dst(&dst)?;
        self.track_temps(&a)?;
        self.track_temps(&b)?;
        self.instructions.push(Sm4Inst::Mul { dst, a, b });
        Ok(self)
    }

    /// `dst = a * b + c`
    pub fn mad(
        &mut self,
        dst: Operand,
        a: Operand,
        b: Operand,
        c: Operand,
    ) -> Result<&mut Self, EmitError> {
        self.check_dst(&dst)?;
        for src in [&a, &b, &c] {
            self.track_temps(src)?;
        }
        self.instructions.push(Sm4Inst::Mad { dst, a, b, c });
        Ok(self)
    }

    /// Samples `t#texture` with `s#sampler` at an explicit LOD.
    ///
    /// The extended opcode tokens copy dimension and return types from the
    /// resource's `dcl_resource`, which must already be recorded.
    pub fn sample_l(
        &mut self,
        dst: Operand,
        coord: Operand,
        texture: u32,
        sampler: u32,
        lod: Operand,
    ) -> Result<&mut Self, EmitError> {
        let (resource_dimension, return_types) = self
            .instructions
            .iter()
            .find_map(|inst| match inst {
                Sm4Inst::DclResource {
                    slot,
                    dimension,
                    return_types,
                    ..
                } if *slot == texture => Some((*dimension, *return_types)),
                _ => None,
            })
            .ok_or(EmitError::UndeclaredResource { slot: texture })?;

        self.check_dst(&dst)?;
        self.track_temps(&coord)?;
        self.track_temps(&lod)?;
        self.instructions.push(Sm4Inst::SampleL {
            resource_dimension,
            return_types,
            dst,
            coord,
            texture: Operand::src(OperandType::Resource, texture, Swizzle::XYZW),
            sampler: Operand::sampler(sampler),
            lod,
        });
        Ok(self)
    }

    pub fn ret(&mut self) -> &mut Self {
        self.instructions.push(Sm4Inst::Ret);
        self
    }

    /// Returns the program, with `dcl_temps` inserted ahead of the first
    /// non-declaration instruction when any temp was used.
    pub fn into_module(self) -> Sm4Module {
        let temps = self.temp_count();
        let mut instructions = self.instructions;
        if temps > 0 {
            let at = instructions
                .iter()
                .position(|inst| !inst.is_declaration())
                .unwrap_or(instructions.len());
            instructions.insert(at, Sm4Inst::DclTemps { count: temps });
        }
        Sm4Module {
            stage: self.stage,
            model: self.model,
            instructions,
        }
    }

    /// Serializes the program into its token stream.
    pub fn finish(self) -> Result<Vec<u32>, EmitError> {
        let module = self.into_module();
        let tokens = encode_program(module.stage, module.model, &module.instructions)?;
        debug!(
            instructions = module.instructions.len(),
            dwords = tokens.len(),
            "encoded SM4 program"
        );
        Ok(tokens)
    }

    fn check_dst(&mut self, dst: &Operand) -> Result<(), EmitError> {
        match dst.ty {
            OperandType::Temp | OperandType::Output => self.track_temps(dst),
            ty => Err(EmitError::InvalidDestination { ty }),
        }
    }

    fn track_temps(&mut self, op: &Operand) -> Result<(), EmitError> {
        if op.ty != OperandType::Temp {
            return Ok(());
        }
        let index = op
            .register_index()
            .ok_or(EmitError::InvalidOperand("temp register without a 32-bit index"))?;
        if index >= MAX_TEMPS {
            return Err(EmitError::TempRegisterOutOfRange { index });
        }
        self.temp_clobber |= 1 << index;
        Ok(())
    }
}

/// The vs_5_0 passthrough program: `o0 = v0` with `o0` as `SV_Position`.
pub fn minimal_vertex_passthrough_tokens() -> Result<Vec<u32>, EmitError> {
    let mut b = ShaderBuilder::new(ShaderStage::Vertex, ShaderModel { major: 5, minor: 0 });
    b.dcl_global_flags(GlobalFlags::REFACTORING_ALLOWED)
        .dcl_input(0, WriteMask::XYZW)
        .dcl_output_siv(0, WriteMask::XYZW, SystemValueName::Position);
    b.mov(
        Operand::dst(OperandType::Output, 0, WriteMask::XYZW),
        Operand::src(OperandType::Input, 0, Swizzle::XYZW),
    )?
    .ret();
    b.finish()
}

/// Builds a complete container for [`minimal_vertex_passthrough_tokens`],
/// with `ISGN`, `OSGN` and `SHEX` chunks and a valid checksum.
pub fn emit_minimal_vertex_passthrough_shader() -> Result<Vec<u8>, EmitError> {
    let shex = tokens_to_bytes(&minimal_vertex_passthrough_tokens()?);

    let isgn = SignatureChunk {
        entries: vec![SignatureEntry::new("POSITION", 0, 0, 0xF)],
    };
    let mut position = SignatureEntry::new("SV_Position", 0, 0, 0xF);
    position.system_value_type = SystemValueName::Position.raw();
    position.read_write_mask = 0;
    let osgn = SignatureChunk {
        entries: vec![position],
    };

    let bytes = write_container(&[
        (FourCC::ISGN, &isgn.to_bytes()),
        (FourCC::OSGN, &osgn.to_bytes()),
        (FourCC::SHEX, &shex),
    ])?;
    Ok(bytes)
}
