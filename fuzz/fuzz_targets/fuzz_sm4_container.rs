#![no_main]

use arbitrary::Arbitrary;
use dxforge_dxbc::{write_container, FourCC, ParseOptions};
use dxforge_sm4::parse_container_with_options;
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_SIZE_BYTES: usize = 1024 * 1024; // 1 MiB
const MAX_DXBC_CHUNKS: u32 = 1024;

/// Limit the synthesized shader chunk so iterations stay fast.
const MAX_PATCHED_SHADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    /// Program type in the version token (0 = pixel, 1 = vertex, ...).
    program_type: u8,
    use_shdr: bool,
    body: &'a [u8],
    raw: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    if input.raw.len() > MAX_INPUT_SIZE_BYTES {
        return;
    }
    let options = ParseOptions {
        verify_checksum: false,
        max_chunk_count: MAX_DXBC_CHUNKS,
    };
    let _ = parse_container_with_options(input.raw, options);

    // Wrap the body in a well-formed container with a correct version/length
    // header so the instruction decoder sees it.
    let body_len = input.body.len().min(MAX_PATCHED_SHADER_BYTES) & !3;
    let body = &input.body[..body_len];
    let dwords = 2 + body.len() / 4;
    let version = (u32::from(input.program_type % 6) << 16) | 0x50;

    let mut shader = Vec::with_capacity(dwords * 4);
    shader.extend_from_slice(&version.to_le_bytes());
    shader.extend_from_slice(&(dwords as u32).to_le_bytes());
    shader.extend_from_slice(body);

    let tag = if input.use_shdr { FourCC::SHDR } else { FourCC::SHEX };
    let Ok(container) = write_container(&[(tag, &shader)]) else {
        return;
    };
    let _ = parse_container_with_options(&container, ParseOptions::default());
});
