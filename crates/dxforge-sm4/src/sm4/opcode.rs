//! SM4/SM5 opcode and operand numeric constants.
//!
//! Field positions follow `d3d10tokenizedprogramformat.h`. Each field is a
//! [`BitRange`] so encoder and decoder read the same table.

use bitflags::bitflags;

use crate::bits::BitRange;

// ---- Opcode token ----

/// `D3D10_SB_OPCODE_TYPE`.
pub const OPCODE_TYPE: BitRange = BitRange::new(0, 10);
/// Instruction length in DWORDs, including the opcode token.
pub const OPCODE_LENGTH: BitRange = BitRange::new(24, 30);
/// Set when one or more extended opcode tokens follow.
pub const OPCODE_EXTENDED: BitRange = BitRange::bit(31);

/// Largest length [`OPCODE_LENGTH`] can declare.
pub const MAX_INSTRUCTION_DWORDS: usize = 127;

/// `dcl_constantbuffer`: set for `dynamicIndexed`.
pub const CB_ACCESS_PATTERN: BitRange = BitRange::bit(11);
/// `dcl_sampler`: `D3D10_SB_SAMPLER_MODE`.
pub const SAMPLER_MODE: BitRange = BitRange::new(11, 14);
/// `dcl_resource`: `D3D10_SB_RESOURCE_DIMENSION`.
pub const RESOURCE_DIMENSION: BitRange = BitRange::new(11, 15);
/// `dcl_resource`: sample count for multisampled textures.
pub const RESOURCE_SAMPLE_COUNT: BitRange = BitRange::new(16, 22);

/// `dcl_resource` return-type token: one 4-bit `D3D10_SB_RESOURCE_RETURN_TYPE`
/// per component.
pub const RETURN_TYPE_COMPONENTS: [BitRange; 4] = [
    BitRange::new(0, 3),
    BitRange::new(4, 7),
    BitRange::new(8, 11),
    BitRange::new(12, 15),
];

/// `dcl_output_siv` name token: `D3D10_SB_NAME`.
pub const SYSTEM_VALUE_NAME: BitRange = BitRange::new(0, 15);

// ---- Extended opcode tokens ----

/// `D3D10_SB_EXTENDED_OPCODE_TYPE`.
pub const EXTENDED_OPCODE_TYPE: BitRange = BitRange::new(0, 5);
/// Set when another extended opcode token follows.
pub const EXTENDED_OPCODE_CONTINUES: BitRange = BitRange::bit(31);

pub const EXTENDED_OPCODE_SAMPLE_CONTROLS: u32 = 1;
pub const EXTENDED_OPCODE_RESOURCE_DIM: u32 = 2;
pub const EXTENDED_OPCODE_RESOURCE_RETURN_TYPE: u32 = 3;

/// Resource-dimension extension: the resource dimension.
pub const EXTENDED_RESOURCE_DIMENSION: BitRange = BitRange::new(6, 10);
/// Return-type extension: one 4-bit return type per component.
pub const EXTENDED_RETURN_TYPES: [BitRange; 4] = [
    BitRange::new(6, 9),
    BitRange::new(10, 13),
    BitRange::new(14, 17),
    BitRange::new(18, 21),
];

// ---- Operand token ----

/// `D3D10_SB_OPERAND_NUM_COMPONENTS`.
pub const OPERAND_NUM_COMPONENTS: BitRange = BitRange::new(0, 1);
/// `D3D10_SB_OPERAND_4_COMPONENT_SELECTION_MODE`.
pub const OPERAND_SELECTION_MODE: BitRange = BitRange::new(2, 3);
/// Write mask (mask mode).
pub const OPERAND_COMPONENT_MASK: BitRange = BitRange::new(4, 7);
/// Per-lane source component (swizzle mode).
pub const OPERAND_SWIZZLE: [BitRange; 4] = [
    BitRange::new(4, 5),
    BitRange::new(6, 7),
    BitRange::new(8, 9),
    BitRange::new(10, 11),
];
/// Broadcast component (select-1 mode).
pub const OPERAND_SELECT_1: BitRange = BitRange::new(4, 5);
/// `D3D10_SB_OPERAND_TYPE`.
pub const OPERAND_TYPE: BitRange = BitRange::new(12, 19);
/// `D3D10_SB_OPERAND_INDEX_DIMENSION`.
pub const OPERAND_INDEX_DIMENSION: BitRange = BitRange::new(20, 21);
/// `D3D10_SB_OPERAND_INDEX_REPRESENTATION` for each index dimension.
pub const OPERAND_INDEX_REPRESENTATION: [BitRange; 3] = [
    BitRange::new(22, 24),
    BitRange::new(25, 27),
    BitRange::new(28, 30),
];
/// Set when an extended operand token follows.
pub const OPERAND_EXTENDED: BitRange = BitRange::bit(31);

pub const OPERAND_0_COMPONENT: u32 = 0;
pub const OPERAND_1_COMPONENT: u32 = 1;
pub const OPERAND_4_COMPONENT: u32 = 2;
/// `D3D10_SB_OPERAND_N_COMPONENT`; not produced by any shader compiler.
pub const OPERAND_N_COMPONENT: u32 = 3;

pub const OPERAND_SEL_MASK: u32 = 0;
pub const OPERAND_SEL_SWIZZLE: u32 = 1;
pub const OPERAND_SEL_SELECT_1: u32 = 2;

pub const OPERAND_INDEX_IMMEDIATE32: u32 = 0;
pub const OPERAND_INDEX_IMMEDIATE64: u32 = 1;
pub const OPERAND_INDEX_RELATIVE: u32 = 2;
pub const OPERAND_INDEX_IMMEDIATE32_PLUS_RELATIVE: u32 = 3;
pub const OPERAND_INDEX_IMMEDIATE64_PLUS_RELATIVE: u32 = 4;

// ---- Enumerations ----

macro_rules! opcode_types {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// `D3D10_SB_OPCODE_TYPE`.
        ///
        /// Every shader model 4.0 opcode is listed so diagnostics can name an
        /// instruction even when the decoder does not support it.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum OpcodeType {
            $($variant = $value,)*
        }

        impl OpcodeType {
            pub fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Assembler mnemonic.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

opcode_types! {
    Add = 0 => "add",
    And = 1 => "and",
    Break = 2 => "break",
    Breakc = 3 => "breakc",
    Call = 4 => "call",
    Callc = 5 => "callc",
    Case = 6 => "case",
    Continue = 7 => "continue",
    Continuec = 8 => "continuec",
    Cut = 9 => "cut",
    Default = 10 => "default",
    DerivRtx = 11 => "deriv_rtx",
    DerivRty = 12 => "deriv_rty",
    Discard = 13 => "discard",
    Div = 14 => "div",
    Dp2 = 15 => "dp2",
    Dp3 = 16 => "dp3",
    Dp4 = 17 => "dp4",
    Else = 18 => "else",
    Emit = 19 => "emit",
    EmitThenCut = 20 => "emit_then_cut",
    EndIf = 21 => "endif",
    EndLoop = 22 => "endloop",
    EndSwitch = 23 => "endswitch",
    Eq = 24 => "eq",
    Exp = 25 => "exp",
    Frc = 26 => "frc",
    Ftoi = 27 => "ftoi",
    Ftou = 28 => "ftou",
    Ge = 29 => "ge",
    Iadd = 30 => "iadd",
    If = 31 => "if",
    Ieq = 32 => "ieq",
    Ige = 33 => "ige",
    Ilt = 34 => "ilt",
    Imad = 35 => "imad",
    Imax = 36 => "imax",
    Imin = 37 => "imin",
    Imul = 38 => "imul",
    Ine = 39 => "ine",
    Ineg = 40 => "ineg",
    Ishl = 41 => "ishl",
    Ishr = 42 => "ishr",
    Itof = 43 => "itof",
    Label = 44 => "label",
    Ld = 45 => "ld",
    LdMs = 46 => "ld_ms",
    Log = 47 => "log",
    Loop = 48 => "loop",
    Lt = 49 => "lt",
    Mad = 50 => "mad",
    Min = 51 => "min",
    Max = 52 => "max",
    CustomData = 53 => "customdata",
    Mov = 54 => "mov",
    Movc = 55 => "movc",
    Mul = 56 => "mul",
    Ne = 57 => "ne",
    Nop = 58 => "nop",
    Not = 59 => "not",
    Or = 60 => "or",
    ResInfo = 61 => "resinfo",
    Ret = 62 => "ret",
    Retc = 63 => "retc",
    RoundNe = 64 => "round_ne",
    RoundNi = 65 => "round_ni",
    RoundPi = 66 => "round_pi",
    RoundZ = 67 => "round_z",
    Rsq = 68 => "rsq",
    Sample = 69 => "sample",
    SampleC = 70 => "sample_c",
    SampleCLz = 71 => "sample_c_lz",
    SampleL = 72 => "sample_l",
    SampleD = 73 => "sample_d",
    SampleB = 74 => "sample_b",
    Sqrt = 75 => "sqrt",
    Switch = 76 => "switch",
    Sincos = 77 => "sincos",
    Udiv = 78 => "udiv",
    Ult = 79 => "ult",
    Uge = 80 => "uge",
    Umul = 81 => "umul",
    Umad = 82 => "umad",
    Umax = 83 => "umax",
    Umin = 84 => "umin",
    Ushr = 85 => "ushr",
    Utof = 86 => "utof",
    Xor = 87 => "xor",
    DclResource = 88 => "dcl_resource",
    DclConstantBuffer = 89 => "dcl_constantbuffer",
    DclSampler = 90 => "dcl_sampler",
    DclIndexRange = 91 => "dcl_indexrange",
    DclGsOutputPrimitiveTopology = 92 => "dcl_outputtopology",
    DclGsInputPrimitive = 93 => "dcl_inputprimitive",
    DclMaxOutputVertexCount = 94 => "dcl_maxout",
    DclInput = 95 => "dcl_input",
    DclInputSgv = 96 => "dcl_input_sgv",
    DclInputSiv = 97 => "dcl_input_siv",
    DclInputPs = 98 => "dcl_input_ps",
    DclInputPsSgv = 99 => "dcl_input_ps_sgv",
    DclInputPsSiv = 100 => "dcl_input_ps_siv",
    DclOutput = 101 => "dcl_output",
    DclOutputSgv = 102 => "dcl_output_sgv",
    DclOutputSiv = 103 => "dcl_output_siv",
    DclTemps = 104 => "dcl_temps",
    DclIndexableTemp = 105 => "dcl_indexableTemp",
    DclGlobalFlags = 106 => "dcl_globalFlags",
}

impl OpcodeType {
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Declarations occupy the 88..=106 block.
    pub fn is_declaration(self) -> bool {
        (Self::DclResource.raw()..=Self::DclGlobalFlags.raw()).contains(&self.raw())
    }
}

bitflags! {
    /// `dcl_globalFlags` bits, in opcode-token position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GlobalFlags: u32 {
        const REFACTORING_ALLOWED = 1 << 11;
        const ENABLE_DOUBLE_PRECISION = 1 << 12;
    }
}

/// Declares a `#[repr(u32)]` enum with a fallible `from_raw`.
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident = $value:literal,)* }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl $name {
            pub fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn raw(self) -> u32 {
                self as u32
            }
        }
    };
}

raw_enum! {
    /// `D3D10_SB_NAME` values accepted by `dcl_output_siv`.
    pub enum SystemValueName {
        Undefined = 0,
        Position = 1,
        ClipDistance = 2,
        CullDistance = 3,
        RenderTargetArrayIndex = 4,
        ViewportArrayIndex = 5,
        VertexId = 6,
        PrimitiveId = 7,
        InstanceId = 8,
        IsFrontFace = 9,
        SampleIndex = 10,
    }
}

raw_enum! {
    /// `D3D10_SB_SAMPLER_MODE`.
    pub enum SamplerMode {
        Default = 0,
        Comparison = 1,
        Mono = 2,
    }
}

raw_enum! {
    /// `D3D10_SB_RESOURCE_DIMENSION`.
    pub enum ResourceDimension {
        Unknown = 0,
        Buffer = 1,
        Texture1D = 2,
        Texture2D = 3,
        Texture2DMs = 4,
        Texture3D = 5,
        TextureCube = 6,
        Texture1DArray = 7,
        Texture2DArray = 8,
        Texture2DMsArray = 9,
        TextureCubeArray = 10,
        RawBuffer = 11,
        StructuredBuffer = 12,
    }
}

raw_enum! {
    /// `D3D10_SB_RESOURCE_RETURN_TYPE`.
    pub enum ReturnType {
        Unorm = 1,
        Snorm = 2,
        Sint = 3,
        Uint = 4,
        Float = 5,
        Mixed = 6,
        Double = 7,
        Continued = 8,
        Unused = 9,
    }
}

raw_enum! {
    /// `D3D10_SB_OPERAND_TYPE`, shader model 4.0 subset plus `u#`.
    pub enum OperandType {
        Temp = 0,
        Input = 1,
        Output = 2,
        IndexableTemp = 3,
        Immediate32 = 4,
        Immediate64 = 5,
        Sampler = 6,
        Resource = 7,
        ConstantBuffer = 8,
        ImmediateConstantBuffer = 9,
        Label = 10,
        InputPrimitiveId = 11,
        OutputDepth = 12,
        Null = 13,
        Rasterizer = 14,
        OutputCoverageMask = 15,
        Stream = 16,
        UnorderedAccessView = 30,
    }
}

impl OperandType {
    /// Register-file prefix used in disassembly (`r`, `v`, `o`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Temp => "r",
            Self::Input => "v",
            Self::Output => "o",
            Self::IndexableTemp => "x",
            Self::Immediate32 | Self::Immediate64 => "l",
            Self::Sampler => "s",
            Self::Resource => "t",
            Self::ConstantBuffer => "cb",
            Self::ImmediateConstantBuffer => "icb",
            Self::Label => "label",
            Self::InputPrimitiveId => "vPrim",
            Self::OutputDepth => "oDepth",
            Self::Null => "null",
            Self::Rasterizer => "rasterizer",
            Self::OutputCoverageMask => "oMask",
            Self::Stream => "m",
            Self::UnorderedAccessView => "u",
        }
    }
}

/// `dcl_constantbuffer` access pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CbAccess {
    ImmediateIndexed,
    DynamicIndexed,
}
