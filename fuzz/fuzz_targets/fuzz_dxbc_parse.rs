#![no_main]

use dxforge_dxbc::{DxbcFile, FourCC, ParseOptions};
use libfuzzer_sys::fuzz_target;

/// Max fuzz input size to avoid pathological allocations and long runtimes on
/// malformed container blobs.
const MAX_INPUT_SIZE_BYTES: usize = 1024 * 1024; // 1 MiB

/// Cap `chunk_count` for deterministic iteration cost on otherwise-valid
/// headers.
const MAX_DXBC_CHUNKS: u32 = 1024;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_SIZE_BYTES {
        return;
    }

    // The checksum almost never matches random input; parse without it so the
    // chunk parsers are reachable, and once more with it for the integrity path.
    let _ = DxbcFile::parse(data);
    let options = ParseOptions {
        verify_checksum: false,
        max_chunk_count: MAX_DXBC_CHUNKS,
    };
    let Ok(dxbc) = DxbcFile::parse_with_options(data, options) else {
        return;
    };

    let _ = dxbc.checksum_matches();
    let _ = dxbc.find_shader_chunk();
    for chunk in dxbc.chunks() {
        let _ = (chunk.fourcc, chunk.data.len());
    }
    let _ = dxbc.debug_summary();

    let _ = dxbc.get_rdef();
    for kind in [FourCC::ISGN, FourCC::OSGN, FourCC::ISG1, FourCC::OSG1] {
        let _ = dxbc.get_signature(kind);
    }
});
