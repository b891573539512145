//! The `DXBC` container checksum.
//!
//! The digest runs the MD5 compression function over the input, but finishes
//! with a container-specific final block: the bit length goes in word 0 and
//! `size * 2 + 1` goes in word 15, instead of MD5's trailing 64-bit length.
//! A container's checksum covers every byte after the checksum field
//! (`bytes[20..]`).

const BLOCK_LEN: usize = 64;
/// Remaining-byte threshold at which the `0x80` marker no longer fits beside
/// the length words, forcing an extra block.
const TWO_BLOCK_THRESHOLD: usize = 56;

/// Byte offset where the digest input begins within a container.
pub const CHECKSUM_INPUT_OFFSET: usize = 20;

const INITIAL_STATE: [u32; 4] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476];

#[rustfmt::skip]
const ROUND_CONSTANTS: [u32; 64] = [
    0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee,
    0xf57c0faf, 0x4787c62a, 0xa8304613, 0xfd469501,
    0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be,
    0x6b901122, 0xfd987193, 0xa679438e, 0x49b40821,
    0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa,
    0xd62f105d, 0x02441453, 0xd8a1e681, 0xe7d3fbc8,
    0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed,
    0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a,
    0xfffa3942, 0x8771f681, 0x6d9d6122, 0xfde5380c,
    0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70,
    0x289b7ec6, 0xeaa127fa, 0xd4ef3085, 0x04881d05,
    0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665,
    0xf4292244, 0x432aff97, 0xab9423a7, 0xfc93a039,
    0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
    0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1,
    0xf7537e82, 0xbd3af235, 0x2ad7d2bb, 0xeb86d391,
];

/// Left-rotate amounts, four per pass. A right-rotate by `32 - s` is the same
/// operation as a left-rotate by `s`.
const ROTATIONS: [[u32; 4]; 4] = [[7, 12, 17, 22], [5, 9, 14, 20], [4, 11, 16, 23], [6, 10, 15, 21]];

#[inline]
fn mix_f(b: u32, c: u32, d: u32) -> u32 {
    (b & (c ^ d)) ^ d
}

#[inline]
fn mix_g(b: u32, c: u32, d: u32) -> u32 {
    mix_f(d, b, c)
}

#[inline]
fn mix_h(b: u32, c: u32, d: u32) -> u32 {
    b ^ c ^ d
}

#[inline]
fn mix_i(b: u32, c: u32, d: u32) -> u32 {
    c ^ (b | !d)
}

/// Applies one 64-byte block to `state`.
pub(crate) fn compress(state: &mut [u32; 4], block: &[u8; BLOCK_LEN]) {
    let mut words = [0u32; 16];
    for (word, bytes) in words.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    let [mut a, mut b, mut c, mut d] = *state;
    for round in 0..64 {
        let pass = round / 16;
        let (mixed, word) = match pass {
            0 => (mix_f(b, c, d), round),
            1 => (mix_g(b, c, d), (5 * round + 1) % 16),
            2 => (mix_h(b, c, d), (3 * round + 5) % 16),
            _ => (mix_i(b, c, d), (7 * round) % 16),
        };
        let sum = a
            .wrapping_add(mixed)
            .wrapping_add(ROUND_CONSTANTS[round])
            .wrapping_add(words[word]);
        a = d;
        d = c;
        c = b;
        b = b.wrapping_add(sum.rotate_left(ROTATIONS[pass][round % 4]));
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}

fn put_word(block: &mut [u8; BLOCK_LEN], index: usize, value: u32) {
    block[index * 4..index * 4 + 4].copy_from_slice(&value.to_le_bytes());
}

/// Computes the container digest of `data`.
///
/// This is a pure function of `data`. To checksum a container, pass the bytes
/// starting at [`CHECKSUM_INPUT_OFFSET`] (see [`container_checksum`]).
pub fn dxbc_checksum(data: &[u8]) -> [u8; 16] {
    let mut state = INITIAL_STATE;

    let mut blocks = data.chunks_exact(BLOCK_LEN);
    for chunk in &mut blocks {
        let mut block = [0u8; BLOCK_LEN];
        block.copy_from_slice(chunk);
        compress(&mut state, &block);
    }
    let tail = blocks.remainder();

    // Both length words are 32-bit; larger inputs wrap.
    let size = data.len() as u64;
    let bit_len = size.wrapping_mul(8) as u32;
    let length_tag = size.wrapping_mul(2).wrapping_add(1) as u32;

    let mut block = [0u8; BLOCK_LEN];
    if tail.len() >= TWO_BLOCK_THRESHOLD {
        block[..tail.len()].copy_from_slice(tail);
        block[tail.len()] = 0x80;
        compress(&mut state, &block);

        block = [0u8; BLOCK_LEN];
        put_word(&mut block, 0, bit_len);
        put_word(&mut block, 15, length_tag);
        compress(&mut state, &block);
    } else {
        put_word(&mut block, 0, bit_len);
        block[4..4 + tail.len()].copy_from_slice(tail);
        block[4 + tail.len()] = 0x80;
        put_word(&mut block, 15, length_tag);
        compress(&mut state, &block);
    }

    let mut out = [0u8; 16];
    for (dst, word) in out.chunks_exact_mut(4).zip(state) {
        dst.copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// Computes the checksum a container header should store, or `None` if the
/// buffer is shorter than the checksum field.
pub fn container_checksum(container: &[u8]) -> Option<[u8; 16]> {
    container.get(CHECKSUM_INPUT_OFFSET..).map(dxbc_checksum)
}
