use crate::test_utils::build_container;
use crate::{container_checksum, DxbcError, DxbcFile, ErrorClass, FourCC, ParseOptions};

fn sample_container() -> Vec<u8> {
    build_container(&[
        (FourCC::RDEF, &[0u8; 28]),
        (FourCC::SHEX, &[0x50, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00]),
    ])
}

fn reseal(bytes: &mut [u8]) {
    let checksum = container_checksum(bytes).unwrap();
    bytes[4..20].copy_from_slice(&checksum);
}

#[test]
fn parses_header_and_chunks() {
    let bytes = sample_container();
    let file = DxbcFile::parse(&bytes).unwrap();
    let header = file.header();
    assert_eq!(header.chunk_count, 2);
    assert_eq!(header.total_size as usize, bytes.len());

    let tags: Vec<FourCC> = file.chunks().map(|c| c.fourcc).collect();
    assert_eq!(tags, vec![FourCC::RDEF, FourCC::SHEX]);
    assert_eq!(file.find_shader_chunk().unwrap().fourcc, FourCC::SHEX);
    assert!(file.debug_summary().contains("SHEX"));
}

#[test]
fn any_flipped_payload_bit_is_an_integrity_error() {
    let bytes = sample_container();
    for pos in 20..bytes.len() {
        for bit in 0..8 {
            let mut tampered = bytes.clone();
            tampered[pos] ^= 1 << bit;
            let err = DxbcFile::parse(&tampered).unwrap_err();
            assert!(
                matches!(err, DxbcError::ChecksumMismatch { .. }),
                "byte {pos} bit {bit}: {err:?}"
            );
            assert_eq!(err.class(), ErrorClass::Integrity);
        }
    }
}

#[test]
fn flipped_checksum_bit_is_detected() {
    let mut bytes = sample_container();
    bytes[7] ^= 0x10;
    assert!(matches!(
        DxbcFile::parse(&bytes),
        Err(DxbcError::ChecksumMismatch { .. })
    ));
}

#[test]
fn bad_magic_with_valid_checksum() {
    let mut bytes = sample_container();
    bytes[0..4].copy_from_slice(b"DXBX");
    reseal(&mut bytes);
    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert_eq!(
        err,
        DxbcError::BadMagic {
            found: FourCC(*b"DXBX")
        }
    );
}

#[test]
fn declared_size_must_equal_buffer_length() {
    let mut bytes = sample_container();
    bytes.extend_from_slice(&[0u8; 4]);
    reseal(&mut bytes);
    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(
        matches!(err, DxbcError::SizeMismatch { actual, .. } if actual == bytes.len()),
        "{err:?}"
    );
    assert_eq!(err.class(), ErrorClass::Integrity);
}

#[test]
fn truncated_header_is_a_format_error() {
    let err = DxbcFile::parse(&[0u8; 31]).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader(_)));
    assert_eq!(err.class(), ErrorClass::Format);
}

#[test]
fn chunk_offset_outside_buffer() {
    let mut bytes = sample_container();
    let len = bytes.len() as u32;
    bytes[32..36].copy_from_slice(&(len - 4).to_le_bytes());
    reseal(&mut bytes);
    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds(_)), "{err:?}");
}

#[test]
fn chunk_offset_into_offset_table() {
    let mut bytes = sample_container();
    bytes[32..36].copy_from_slice(&32u32.to_le_bytes());
    reseal(&mut bytes);
    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets(_)), "{err:?}");
}

#[test]
fn chunk_size_past_end() {
    let mut bytes = sample_container();
    let shex_offset = u32::from_le_bytes(bytes[36..40].try_into().unwrap()) as usize;
    bytes[shex_offset + 4..shex_offset + 8].copy_from_slice(&0x1000u32.to_le_bytes());
    reseal(&mut bytes);
    assert!(matches!(
        DxbcFile::parse(&bytes),
        Err(DxbcError::OutOfBounds(_))
    ));
}

#[test]
fn chunk_count_cap_is_configurable() {
    let bytes = sample_container();
    let options = ParseOptions {
        max_chunk_count: 1,
        ..ParseOptions::default()
    };
    assert!(matches!(
        DxbcFile::parse_with_options(&bytes, options),
        Err(DxbcError::MalformedOffsets(_))
    ));
}

#[test]
fn unverified_parse_ignores_checksum_but_not_structure() {
    let mut bytes = sample_container();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let file = DxbcFile::parse_unverified(&bytes).unwrap();
    assert!(!file.checksum_matches());

    bytes[0] = b'X';
    assert!(matches!(
        DxbcFile::parse_unverified(&bytes),
        Err(DxbcError::BadMagic { .. })
    ));
}

#[test]
fn signature_lookup_falls_back_to_v1_tag() {
    let sig = crate::SignatureChunk {
        entries: vec![crate::SignatureEntry::new("COLOR", 0, 0, 0xF)],
    };
    let payload = sig.to_bytes();
    let bytes = build_container(&[(FourCC::ISG1, &payload)]);
    let file = DxbcFile::parse(&bytes).unwrap();
    let parsed = file.get_signature(FourCC::ISGN).unwrap().unwrap();
    assert_eq!(parsed, sig);
    assert!(file.get_signature(FourCC::OSGN).is_none());
}

proptest::proptest! {
    #[test]
    fn parser_never_panics(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512)) {
        let _ = DxbcFile::parse(&data);
        let _ = DxbcFile::parse_unverified(&data);
    }
}
