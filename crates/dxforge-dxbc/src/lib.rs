//! A safe parser and writer for DirectX shader bytecode containers (`DXBC`).
//!
//! Inputs are treated as **untrusted**: every offset and length is bounds
//! checked and parsing never panics. On top of the container walk this crate
//! provides:
//!
//! - the container checksum (an MD5-compression variant with its own final
//!   block layout),
//! - parsers for `RDEF` resource definitions and `ISGN`/`OSGN` signatures,
//! - a container writer that fills in the checksum.
//!
//! Instruction streams (`SHEX`/`SHDR`) are decoded by `dxforge-sm4`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod byte_reader;
mod checksum;
mod dxbc;
mod error;
mod fourcc;
/// Parser for resource definition chunks (`RDEF`).
pub mod rdef;
/// Parsers and writer for signature chunks (`ISGN`, `OSGN`, ...).
pub mod signature;
mod writer;

/// Helpers for building synthetic chunks and containers in tests.
///
/// Available to this crate's tests and, through the `test-utils` feature, to
/// dependents' tests. Not part of the stable API.
#[cfg(any(test, feature = "test-utils"))]
#[allow(missing_docs)]
pub mod test_utils;

#[cfg(test)]
mod tests_container;
#[cfg(test)]
mod tests_rdef;

pub use crate::byte_reader::ByteReader;
pub use crate::checksum::{container_checksum, dxbc_checksum, CHECKSUM_INPUT_OFFSET};
pub use crate::dxbc::{
    DxbcChunk, DxbcFile, DxbcHeader, ParseOptions, DEFAULT_MAX_CHUNK_COUNT, DXBC_HEADER_LEN,
};
pub use crate::error::{DxbcError, ErrorClass};
pub use crate::fourcc::FourCC;
pub use crate::rdef::{
    parse_rdef_chunk, RdefChunk, RdefConstantBuffer, RdefResourceBinding, RdefStructMember,
    RdefType, RdefVariable,
};
pub use crate::signature::{
    parse_signature_chunk, parse_signature_chunk_with_fourcc, SignatureChunk, SignatureEntry,
};
pub use crate::writer::write_container;
