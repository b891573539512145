//! Shader model 4/5 token streams inside `DXBC` containers.
//!
//! - [`bits`]: inclusive bit-range extraction and insertion.
//! - [`sm4`]: program framing, operand and instruction codecs, and
//!   [`ShaderBuilder`] for emitting programs.
//! - [`parse_container`]: one-call validation of a whole container, down to
//!   every instruction.
//!
//! The decoder is strict: opcodes outside the modeled set are rejected rather
//! than skipped, and every instruction's declared length must match the
//! DWORDs its payload occupies.

#![forbid(unsafe_code)]

pub mod bits;
mod container;
pub mod sm4;
pub mod sm4_ir;

pub use container::{parse_container, parse_container_with_options, ShaderContainer};
pub use dxforge_dxbc::{dxbc_checksum as compute_digest, ErrorClass, ParseOptions};
pub use sm4::builder::{
    emit_minimal_vertex_passthrough_shader, minimal_vertex_passthrough_tokens, ShaderBuilder,
};
pub use sm4::decode::{decode_instruction, decode_program};
pub use sm4::encode::{encode_instruction, encode_program, EmitError};
pub use sm4::opcode::OpcodeType;
pub use sm4::{
    decode_version_token, ShaderModel, ShaderStage, Sm4DecodeError, Sm4DecodeErrorKind, Sm4Error,
    Sm4Program,
};
pub use sm4_ir::{Operand, Sm4Inst, Sm4Module};
