//! Whole-container parse: chunk table, reflection chunks and the decoded
//! instruction stream in one pass.

use dxforge_dxbc::{
    parse_rdef_chunk, parse_signature_chunk_with_fourcc, DxbcChunk, DxbcFile, DxbcHeader, FourCC,
    ParseOptions, RdefChunk, SignatureChunk,
};
use tracing::debug;

use crate::sm4::decode::decode_program;
use crate::sm4::{Sm4Error, Sm4Program};
use crate::sm4_ir::{Sm4Inst, Sm4Module};

/// Everything [`parse_container`] understands about a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderContainer {
    pub header: DxbcHeader,
    /// Tags of every chunk, recognized or not, in table order.
    pub chunk_tags: Vec<FourCC>,
    pub rdef: Option<RdefChunk>,
    /// `ISGN` or `ISG1`.
    pub input_signature: Option<SignatureChunk>,
    /// `OSGN` or `OSG1`.
    pub output_signature: Option<SignatureChunk>,
    /// Decoded `SHEX`, or `SHDR` when no `SHEX` is present.
    pub program: Option<Sm4Module>,
}

impl ShaderContainer {
    /// Decoded instructions, empty without a shader chunk.
    pub fn instructions(&self) -> &[Sm4Inst] {
        self.program
            .as_ref()
            .map(|p| p.instructions.as_slice())
            .unwrap_or(&[])
    }
}

/// Parses and validates a container with default [`ParseOptions`].
pub fn parse_container(bytes: &[u8]) -> Result<ShaderContainer, Sm4Error> {
    parse_container_with_options(bytes, ParseOptions::default())
}

/// Parses and validates a container.
///
/// Integrity checks run first (see [`DxbcFile::parse_with_options`]); then
/// `RDEF`, signature and shader chunks are parsed and the shader is fully
/// decoded. Unrecognized chunks are skipped.
pub fn parse_container_with_options(
    bytes: &[u8],
    options: ParseOptions,
) -> Result<ShaderContainer, Sm4Error> {
    let file = DxbcFile::parse_with_options(bytes, options)?;

    let mut container = ShaderContainer {
        header: file.header().clone(),
        chunk_tags: Vec::with_capacity(file.header().chunk_count as usize),
        rdef: None,
        input_signature: None,
        output_signature: None,
        program: None,
    };
    let mut shader: Option<DxbcChunk<'_>> = None;

    for chunk in file.chunks() {
        container.chunk_tags.push(chunk.fourcc);
        match chunk.fourcc {
            FourCC::RDEF => container.rdef = Some(parse_rdef_chunk(chunk.data)?),
            FourCC::ISGN | FourCC::ISG1 => {
                container.input_signature =
                    Some(parse_signature_chunk_with_fourcc(chunk.fourcc, chunk.data)?);
            }
            FourCC::OSGN | FourCC::OSG1 => {
                container.output_signature =
                    Some(parse_signature_chunk_with_fourcc(chunk.fourcc, chunk.data)?);
            }
            FourCC::SHEX => shader = Some(chunk),
            FourCC::SHDR => {
                if shader.is_none() {
                    shader = Some(chunk);
                }
            }
            other => debug!(fourcc = %other, len = chunk.data.len(), "skipping DXBC chunk"),
        }
    }

    if let Some(chunk) = shader {
        let program = Sm4Program::parse_program_tokens(chunk.data)?;
        container.program = Some(decode_program(&program)?);
    }

    debug!(
        chunks = container.chunk_tags.len(),
        instructions = container.instructions().len(),
        "parsed DXBC container"
    );
    Ok(container)
}
