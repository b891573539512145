//! DXBC shader containers and the SM4/SM5 programs inside them.
//!
//! This crate re-exports the two layers:
//!
//! - [`dxbc`]: container header, chunk table, checksum, `RDEF` and signature
//!   chunks, and the container writer.
//! - [`sm4`]: token-level decode/encode, [`ShaderBuilder`], and
//!   [`parse_container`] for validating a container down to its instructions.

#![forbid(unsafe_code)]

pub use dxforge_dxbc as dxbc;
pub use dxforge_sm4 as sm4;

pub use dxforge_dxbc::{dxbc_checksum as compute_digest, DxbcError, ErrorClass, FourCC};
pub use dxforge_sm4::{
    emit_minimal_vertex_passthrough_shader, parse_container, parse_container_with_options,
    ParseOptions, ShaderBuilder, ShaderContainer, Sm4Error,
};
