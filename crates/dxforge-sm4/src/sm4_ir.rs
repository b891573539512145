//! Decoded SM4/SM5 instructions.
//!
//! [`Sm4Inst`] has one variant per instruction shape the decoder and encoder
//! understand; each carries its operands as [`Operand`] values.

use core::fmt;

use crate::sm4::opcode::{
    CbAccess, GlobalFlags, OpcodeType, OperandType, ResourceDimension, ReturnType, SamplerMode,
    SystemValueName,
};
use crate::sm4::{ShaderModel, ShaderStage};

/// A decoded shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sm4Module {
    /// Shader stage declared by the version token.
    pub stage: ShaderStage,
    pub model: ShaderModel,
    /// Declarations and instructions in stream order.
    pub instructions: Vec<Sm4Inst>,
}

/// A single SM4/SM5 instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sm4Inst {
    DclGlobalFlags {
        flags: GlobalFlags,
    },
    DclInput {
        operand: Operand,
    },
    DclOutput {
        operand: Operand,
    },
    /// `dcl_output_siv o#, name`
    DclOutputSiv {
        operand: Operand,
        name: SystemValueName,
    },
    DclTemps {
        count: u32,
    },
    /// `dcl_constantbuffer cb#[size], access`
    ///
    /// `size` is the second index exactly as encoded (a count of 16-byte
    /// vectors when produced by fxc).
    DclConstantBuffer {
        slot: u32,
        size: u32,
        access: CbAccess,
    },
    DclSampler {
        slot: u32,
        mode: SamplerMode,
    },
    /// `dcl_resource_texture* (ret, ret, ret, ret) t#`
    DclResource {
        slot: u32,
        dimension: ResourceDimension,
        sample_count: u32,
        return_types: [ReturnType; 4],
    },
    Mov {
        dst: Operand,
        src: Operand,
    },
    Add {
        dst: Operand,
        a: Operand,
        b: Operand,
    },
    Mul {
        dst: Operand,
        a: Operand,
        b: Operand,
    },
    Mad {
        dst: Operand,
        a: Operand,
        b: Operand,
        c: Operand,
    },
    /// `sample_l dest, coord, t#, s#, lod`
    ///
    /// The resource dimension and return types come from the instruction's
    /// extended opcode tokens.
    SampleL {
        resource_dimension: ResourceDimension,
        return_types: [ReturnType; 4],
        dst: Operand,
        coord: Operand,
        texture: Operand,
        sampler: Operand,
        lod: Operand,
    },
    Ret,
}

impl Sm4Inst {
    pub fn opcode(&self) -> OpcodeType {
        match self {
            Sm4Inst::DclGlobalFlags { .. } => OpcodeType::DclGlobalFlags,
            Sm4Inst::DclInput { .. } => OpcodeType::DclInput,
            Sm4Inst::DclOutput { .. } => OpcodeType::DclOutput,
            Sm4Inst::DclOutputSiv { .. } => OpcodeType::DclOutputSiv,
            Sm4Inst::DclTemps { .. } => OpcodeType::DclTemps,
            Sm4Inst::DclConstantBuffer { .. } => OpcodeType::DclConstantBuffer,
            Sm4Inst::DclSampler { .. } => OpcodeType::DclSampler,
            Sm4Inst::DclResource { .. } => OpcodeType::DclResource,
            Sm4Inst::Mov { .. } => OpcodeType::Mov,
            Sm4Inst::Add { .. } => OpcodeType::Add,
            Sm4Inst::Mul { .. } => OpcodeType::Mul,
            Sm4Inst::Mad { .. } => OpcodeType::Mad,
            Sm4Inst::SampleL { .. } => OpcodeType::SampleL,
            Sm4Inst::Ret => OpcodeType::Ret,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.opcode().is_declaration()
    }
}

/// Component write mask, bit 0 = `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteMask(pub u8);

impl WriteMask {
    pub const XYZW: Self = Self(0b1111);
    pub const X: Self = Self(0b0001);
    pub const Y: Self = Self(0b0010);
    pub const Z: Self = Self(0b0100);
    pub const W: Self = Self(0b1000);
    pub const XY: Self = Self(0b0011);

    pub fn contains(self, component: u8) -> bool {
        (self.0 & component) != 0
    }
}

/// 4-component swizzle.
///
/// Each lane is 0..=3 for x/y/z/w.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    pub const XYZW: Self = Self([0, 1, 2, 3]);
    pub const XXXX: Self = Self([0, 0, 0, 0]);
    pub const YYYY: Self = Self([1, 1, 1, 1]);
    pub const ZZZZ: Self = Self([2, 2, 2, 2]);
    pub const WWWW: Self = Self([3, 3, 3, 3]);

    pub fn is_identity(self) -> bool {
        self == Self::XYZW
    }
}

/// How a 4-component operand picks its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FourComponent {
    Mask(WriteMask),
    Swizzle(Swizzle),
    /// Broadcast of one component (0..=3).
    Select(u8),
}

/// `D3D10_SB_OPERAND_NUM_COMPONENTS` with its selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentSelection {
    Zero,
    One,
    Four(FourComponent),
}

impl ComponentSelection {
    /// Values carried by an immediate operand with this selection.
    pub fn immediate_count(self) -> usize {
        match self {
            ComponentSelection::Zero => 0,
            ComponentSelection::One => 1,
            ComponentSelection::Four(_) => 4,
        }
    }
}

/// One register index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandIndex {
    Imm32(u32),
    Imm64(u64),
}

impl OperandIndex {
    pub fn as_u32(self) -> Option<u32> {
        match self {
            OperandIndex::Imm32(v) => Some(v),
            OperandIndex::Imm64(_) => None,
        }
    }
}

/// Values embedded in an immediate operand, kept as raw bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Immediate {
    /// `l(...)` with 32-bit lanes.
    U32(Vec<u32>),
    /// `d(...)` with 64-bit lanes.
    U64(Vec<u64>),
}

impl Immediate {
    pub fn len(&self) -> usize {
        match self {
            Immediate::U32(v) => v.len(),
            Immediate::U64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lanes reinterpreted as `f32`; `None` for 64-bit immediates.
    pub fn as_f32(&self) -> Option<Vec<f32>> {
        match self {
            Immediate::U32(v) => Some(v.iter().map(|&b| f32::from_bits(b)).collect()),
            Immediate::U64(_) => None,
        }
    }

    /// Lanes reinterpreted as `f64`; `None` for 32-bit immediates.
    pub fn as_f64(&self) -> Option<Vec<f64>> {
        match self {
            Immediate::U64(v) => Some(v.iter().map(|&b| f64::from_bits(b)).collect()),
            Immediate::U32(_) => None,
        }
    }
}

/// A register or immediate reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    pub ty: OperandType,
    pub components: ComponentSelection,
    /// One entry per index dimension (at most three).
    pub indices: Vec<OperandIndex>,
    /// Present exactly when `ty` is an immediate type.
    pub immediate: Option<Immediate>,
}

impl Operand {
    /// A register with a single 32-bit immediate index.
    pub fn register(ty: OperandType, index: u32, components: ComponentSelection) -> Self {
        Self {
            ty,
            components,
            indices: vec![OperandIndex::Imm32(index)],
            immediate: None,
        }
    }

    /// Destination form: `ty#.mask`.
    pub fn dst(ty: OperandType, index: u32, mask: WriteMask) -> Self {
        Self::register(ty, index, ComponentSelection::Four(FourComponent::Mask(mask)))
    }

    /// Source form: `ty#.swizzle`.
    pub fn src(ty: OperandType, index: u32, swizzle: Swizzle) -> Self {
        Self::register(
            ty,
            index,
            ComponentSelection::Four(FourComponent::Swizzle(swizzle)),
        )
    }

    /// Source form with a broadcast component: `ty#.x`.
    pub fn src_select(ty: OperandType, index: u32, component: u8) -> Self {
        Self::register(
            ty,
            index,
            ComponentSelection::Four(FourComponent::Select(component)),
        )
    }

    /// `t#`
    pub fn resource(slot: u32) -> Self {
        Self::register(OperandType::Resource, slot, ComponentSelection::Zero)
    }

    /// `s#`
    pub fn sampler(slot: u32) -> Self {
        Self::register(OperandType::Sampler, slot, ComponentSelection::Zero)
    }

    /// `l(x, y, z, w)`
    pub fn imm_f32x4(values: [f32; 4]) -> Self {
        Self {
            ty: OperandType::Immediate32,
            components: ComponentSelection::Four(FourComponent::Swizzle(Swizzle::XYZW)),
            indices: Vec::new(),
            immediate: Some(Immediate::U32(values.iter().map(|v| v.to_bits()).collect())),
        }
    }

    /// `l(x)`
    pub fn imm_f32(value: f32) -> Self {
        Self {
            ty: OperandType::Immediate32,
            components: ComponentSelection::One,
            indices: Vec::new(),
            immediate: Some(Immediate::U32(vec![value.to_bits()])),
        }
    }

    /// The first index, if it is a 32-bit immediate.
    pub fn register_index(&self) -> Option<u32> {
        self.indices.first().and_then(|i| i.as_u32())
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.ty, OperandType::Immediate32 | OperandType::Immediate64)
    }
}

const COMPONENT_NAMES: [char; 4] = ['x', 'y', 'z', 'w'];

impl fmt::Display for WriteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, name) in COMPONENT_NAMES.iter().enumerate() {
            if self.contains(1 << bit) {
                write!(f, "{name}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lane in self.0 {
            match COMPONENT_NAMES.get(lane as usize) {
                Some(name) => write!(f, "{name}")?,
                None => write!(f, "?")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.immediate {
            Some(Immediate::U32(values)) => {
                write!(f, "l(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", f32::from_bits(*v))?;
                }
                return write!(f, ")");
            }
            Some(Immediate::U64(values)) => {
                write!(f, "d(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", f64::from_bits(*v))?;
                }
                return write!(f, ")");
            }
            None => {}
        }

        write!(f, "{}", self.ty.prefix())?;
        for (dim, index) in self.indices.iter().enumerate() {
            let value = match index {
                OperandIndex::Imm32(v) => u64::from(*v),
                OperandIndex::Imm64(v) => *v,
            };
            if dim == 0 {
                write!(f, "{value}")?;
            } else {
                write!(f, "[{value}]")?;
            }
        }
        match self.components {
            ComponentSelection::Four(FourComponent::Mask(mask)) => write!(f, ".{mask}"),
            ComponentSelection::Four(FourComponent::Swizzle(swizzle)) => write!(f, ".{swizzle}"),
            ComponentSelection::Four(FourComponent::Select(c)) => {
                let name = COMPONENT_NAMES.get(c as usize).copied().unwrap_or('?');
                write!(f, ".{name}")
            }
            ComponentSelection::Zero | ComponentSelection::One => Ok(()),
        }
    }
}

impl fmt::Display for Sm4Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.opcode().name();
        match self {
            Sm4Inst::DclGlobalFlags { flags } => {
                let mut parts = Vec::new();
                if flags.contains(GlobalFlags::REFACTORING_ALLOWED) {
                    parts.push("refactoringAllowed");
                }
                if flags.contains(GlobalFlags::ENABLE_DOUBLE_PRECISION) {
                    parts.push("enableDoublePrecisionFloatOps");
                }
                write!(f, "{name} {}", parts.join(" | "))
            }
            Sm4Inst::DclInput { operand } | Sm4Inst::DclOutput { operand } => {
                write!(f, "{name} {operand}")
            }
            Sm4Inst::DclOutputSiv { operand, name: siv } => {
                write!(f, "{name} {operand}, {siv:?}")
            }
            Sm4Inst::DclTemps { count } => write!(f, "{name} {count}"),
            Sm4Inst::DclConstantBuffer { slot, size, access } => {
                let access = match access {
                    CbAccess::ImmediateIndexed => "immediateIndexed",
                    CbAccess::DynamicIndexed => "dynamicIndexed",
                };
                write!(f, "{name} cb{slot}[{size}], {access}")
            }
            Sm4Inst::DclSampler { slot, mode } => write!(f, "{name} s{slot}, mode_{mode:?}"),
            Sm4Inst::DclResource {
                slot,
                dimension,
                sample_count,
                return_types,
            } => {
                write!(
                    f,
                    "{name}_{dimension:?} ({:?},{:?},{:?},{:?}) t{slot}",
                    return_types[0], return_types[1], return_types[2], return_types[3]
                )?;
                if *sample_count > 0 {
                    write!(f, ", samples={sample_count}")?;
                }
                Ok(())
            }
            Sm4Inst::Mov { dst, src } => write!(f, "{name} {dst}, {src}"),
            Sm4Inst::Add { dst, a, b } | Sm4Inst::Mul { dst, a, b } => {
                write!(f, "{name} {dst}, {a}, {b}")
            }
            Sm4Inst::Mad { dst, a, b, c } => write!(f, "{name} {dst}, {a}, {b}, {c}"),
            Sm4Inst::SampleL {
                resource_dimension,
                dst,
                coord,
                texture,
                sampler,
                lod,
                ..
            } => write!(
                f,
                "{name}_indexable({resource_dimension:?}) {dst}, {coord}, {texture}, {sampler}, {lod}"
            ),
            Sm4Inst::Ret => write!(f, "{name}"),
        }
    }
}
