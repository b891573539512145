//! Operand token codec.
//!
//! An operand is one token describing component selection, register file and
//! index layout, followed by its index values and, for immediates, the
//! embedded constants.

use super::decode::{Sm4DecodeError, Sm4DecodeErrorKind};
use super::encode::EmitError;
use super::opcode::*;
use super::reader::TokenReader;
use crate::sm4_ir::{
    ComponentSelection, FourComponent, Immediate, Operand, OperandIndex, Swizzle, WriteMask,
};

/// Decodes one operand, advancing `r` past its index and immediate DWORDs.
pub fn decode_operand(r: &mut TokenReader<'_>) -> Result<Operand, Sm4DecodeError> {
    let at = r.pos();
    let token = r.read_u32()?;
    let err = |kind| Sm4DecodeError { at_dword: at, kind };

    if OPERAND_EXTENDED.get(token) != 0 {
        return Err(err(Sm4DecodeErrorKind::UnsupportedExtendedOperand));
    }

    let components = match OPERAND_NUM_COMPONENTS.get(token) {
        OPERAND_0_COMPONENT => ComponentSelection::Zero,
        OPERAND_1_COMPONENT => ComponentSelection::One,
        OPERAND_4_COMPONENT => ComponentSelection::Four(match OPERAND_SELECTION_MODE.get(token) {
            OPERAND_SEL_MASK => {
                FourComponent::Mask(WriteMask(OPERAND_COMPONENT_MASK.get(token) as u8))
            }
            OPERAND_SEL_SWIZZLE => {
                FourComponent::Swizzle(Swizzle(OPERAND_SWIZZLE.map(|f| f.get(token) as u8)))
            }
            OPERAND_SEL_SELECT_1 => FourComponent::Select(OPERAND_SELECT_1.get(token) as u8),
            mode => return Err(err(Sm4DecodeErrorKind::UnsupportedSelectionMode { mode })),
        }),
        raw => return Err(err(Sm4DecodeErrorKind::UnsupportedComponentCount { raw })),
    };

    let raw_ty = OPERAND_TYPE.get(token);
    let ty = OperandType::from_raw(raw_ty)
        .ok_or_else(|| err(Sm4DecodeErrorKind::UnsupportedOperandType { ty: raw_ty }))?;

    let dimension = OPERAND_INDEX_DIMENSION.get(token) as usize;
    let mut indices = Vec::with_capacity(dimension);
    for rep in &OPERAND_INDEX_REPRESENTATION[..dimension] {
        match rep.get(token) {
            OPERAND_INDEX_IMMEDIATE32 => indices.push(OperandIndex::Imm32(r.read_u32()?)),
            OPERAND_INDEX_IMMEDIATE64 => indices.push(OperandIndex::Imm64(r.read_u64()?)),
            rep => return Err(err(Sm4DecodeErrorKind::UnsupportedIndexRepresentation { rep })),
        }
    }

    let count = components.immediate_count();
    let immediate = match ty {
        OperandType::Immediate32 => Some(Immediate::U32(
            (0..count).map(|_| r.read_u32()).collect::<Result<_, _>>()?,
        )),
        OperandType::Immediate64 => Some(Immediate::U64(
            (0..count).map(|_| r.read_u64()).collect::<Result<_, _>>()?,
        )),
        _ => None,
    };

    Ok(Operand {
        ty,
        components,
        indices,
        immediate,
    })
}

/// Appends the tokens for `op` to `out`.
///
/// Accepts every form [`decode_operand`] produces. Nothing is written when the
/// operand is inconsistent.
pub fn encode_operand(op: &Operand, out: &mut Vec<u32>) -> Result<(), EmitError> {
    let mut token = 0u32;
    match op.components {
        ComponentSelection::Zero => {
            token = OPERAND_NUM_COMPONENTS.set(token, OPERAND_0_COMPONENT);
        }
        ComponentSelection::One => {
            token = OPERAND_NUM_COMPONENTS.set(token, OPERAND_1_COMPONENT);
        }
        ComponentSelection::Four(selection) => {
            token = OPERAND_NUM_COMPONENTS.set(token, OPERAND_4_COMPONENT);
            match selection {
                FourComponent::Mask(mask) => {
                    if !OPERAND_COMPONENT_MASK.fits(u32::from(mask.0)) {
                        return Err(EmitError::InvalidOperand("write mask wider than 4 bits"));
                    }
                    token = OPERAND_SELECTION_MODE.set(token, OPERAND_SEL_MASK);
                    token = OPERAND_COMPONENT_MASK.set(token, u32::from(mask.0));
                }
                FourComponent::Swizzle(swizzle) => {
                    token = OPERAND_SELECTION_MODE.set(token, OPERAND_SEL_SWIZZLE);
                    for (field, lane) in OPERAND_SWIZZLE.iter().zip(swizzle.0) {
                        if lane > 3 {
                            return Err(EmitError::InvalidOperand("swizzle lane above 3"));
                        }
                        token = field.set(token, u32::from(lane));
                    }
                }
                FourComponent::Select(component) => {
                    if component > 3 {
                        return Err(EmitError::InvalidOperand("selected component above 3"));
                    }
                    token = OPERAND_SELECTION_MODE.set(token, OPERAND_SEL_SELECT_1);
                    token = OPERAND_SELECT_1.set(token, u32::from(component));
                }
            }
        }
    }

    token = OPERAND_TYPE.set(token, op.ty.raw());

    if op.indices.len() > OPERAND_INDEX_REPRESENTATION.len() {
        return Err(EmitError::InvalidOperand("more than three index dimensions"));
    }
    token = OPERAND_INDEX_DIMENSION.set(token, op.indices.len() as u32);
    for (field, index) in OPERAND_INDEX_REPRESENTATION.iter().zip(&op.indices) {
        let rep = match index {
            OperandIndex::Imm32(_) => OPERAND_INDEX_IMMEDIATE32,
            OperandIndex::Imm64(_) => OPERAND_INDEX_IMMEDIATE64,
        };
        token = field.set(token, rep);
    }

    let count = op.components.immediate_count();
    match (op.ty, &op.immediate) {
        (OperandType::Immediate32, Some(Immediate::U32(v))) if v.len() == count => {}
        (OperandType::Immediate64, Some(Immediate::U64(v))) if v.len() == count => {}
        (OperandType::Immediate32 | OperandType::Immediate64, _) => {
            return Err(EmitError::InvalidOperand(
                "immediate payload does not match operand type and component count",
            ))
        }
        (_, Some(_)) => {
            return Err(EmitError::InvalidOperand(
                "immediate payload on a register operand",
            ))
        }
        (_, None) => {}
    }

    out.push(token);
    for index in &op.indices {
        match *index {
            OperandIndex::Imm32(v) => out.push(v),
            OperandIndex::Imm64(v) => push_u64(out, v),
        }
    }
    match &op.immediate {
        Some(Immediate::U32(values)) => out.extend_from_slice(values),
        Some(Immediate::U64(values)) => values.iter().for_each(|&v| push_u64(out, v)),
        None => {}
    }
    Ok(())
}

/// Number of DWORDs [`encode_operand`] writes for `op`.
pub fn encoded_len(op: &Operand) -> usize {
    let index_words: usize = op
        .indices
        .iter()
        .map(|i| match i {
            OperandIndex::Imm32(_) => 1,
            OperandIndex::Imm64(_) => 2,
        })
        .sum();
    let immediate_words = match &op.immediate {
        Some(Immediate::U32(v)) => v.len(),
        Some(Immediate::U64(v)) => 2 * v.len(),
        None => 0,
    };
    1 + index_words + immediate_words
}

fn push_u64(out: &mut Vec<u32>, v: u64) {
    out.push(v as u32);
    out.push((v >> 32) as u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_all(toks: &[u32]) -> Result<(Operand, usize), Sm4DecodeError> {
        let mut r = TokenReader::new(toks);
        let op = decode_operand(&mut r)?;
        Ok((op, r.pos()))
    }

    #[test]
    fn decodes_output_write_mask() {
        // o0.xyzw from the passthrough shader.
        let (op, used) = decode_all(&[0x0010_20F2, 0]).unwrap();
        assert_eq!(used, 2);
        assert_eq!(op, Operand::dst(OperandType::Output, 0, WriteMask::XYZW));
    }

    #[test]
    fn decodes_input_swizzle() {
        // v3.yxwz
        let token = 0x0010_1006 | (0b10_11_00_01 << 4);
        let (op, _) = decode_all(&[token, 3]).unwrap();
        assert_eq!(op, Operand::src(OperandType::Input, 3, Swizzle([1, 0, 3, 2])));
    }

    #[test]
    fn decodes_select_1() {
        // r2.z
        let token = 0x0010_000A | (2 << 4);
        let (op, _) = decode_all(&[token, 2]).unwrap();
        assert_eq!(op, Operand::src_select(OperandType::Temp, 2, 2));
    }

    #[test]
    fn decodes_immediates() {
        // l(1.0, 2.0, 3.0, 4.0)
        let toks = [
            0x0000_4002 | (OPERAND_SEL_SWIZZLE << 2) | (0xE4 << 4),
            1.0f32.to_bits(),
            2.0f32.to_bits(),
            3.0f32.to_bits(),
            4.0f32.to_bits(),
        ];
        let (op, used) = decode_all(&toks).unwrap();
        assert_eq!(used, 5);
        assert_eq!(op, Operand::imm_f32x4([1.0, 2.0, 3.0, 4.0]));

        // d(0.5) as a one-component immediate64.
        let bits = 0.5f64.to_bits();
        let toks = [0x0000_5001, bits as u32, (bits >> 32) as u32];
        let (op, used) = decode_all(&toks).unwrap();
        assert_eq!(used, 3);
        assert_eq!(op.immediate.unwrap().as_f64(), Some(vec![0.5]));
    }

    #[test]
    fn decodes_two_dimensional_index() {
        // cb1[7].xyzw
        let toks = [0x0020_8E46, 1, 7];
        let (op, used) = decode_all(&toks).unwrap();
        assert_eq!(used, 3);
        assert_eq!(op.ty, OperandType::ConstantBuffer);
        assert_eq!(
            op.indices,
            vec![OperandIndex::Imm32(1), OperandIndex::Imm32(7)]
        );
    }

    #[test]
    fn relative_indices_are_rejected() {
        // r[r0.x] style: index 0 uses the relative representation.
        let token = OPERAND_INDEX_REPRESENTATION[0].set(0x0010_000A, OPERAND_INDEX_RELATIVE);
        let err = decode_all(&[token, 0, 0]).unwrap_err();
        assert_eq!(err.at_dword, 0);
        assert_eq!(
            err.kind,
            Sm4DecodeErrorKind::UnsupportedIndexRepresentation {
                rep: OPERAND_INDEX_RELATIVE
            }
        );

        for rep in [
            OPERAND_INDEX_IMMEDIATE32_PLUS_RELATIVE,
            OPERAND_INDEX_IMMEDIATE64_PLUS_RELATIVE,
        ] {
            let token = OPERAND_INDEX_REPRESENTATION[0].set(0x0010_000A, rep);
            assert!(decode_all(&[token, 0, 0]).is_err());
        }
    }

    #[test]
    fn extended_operands_are_rejected() {
        let token = OPERAND_EXTENDED.set(0x0010_000A, 1);
        assert_eq!(
            decode_all(&[token, 0, 0]).unwrap_err().kind,
            Sm4DecodeErrorKind::UnsupportedExtendedOperand
        );
    }

    #[test]
    fn unknown_component_layouts_are_rejected() {
        assert_eq!(
            decode_all(&[0x0010_0003, 0]).unwrap_err().kind,
            Sm4DecodeErrorKind::UnsupportedComponentCount { raw: 3 }
        );
        assert_eq!(
            decode_all(&[0x0010_000E, 0]).unwrap_err().kind,
            Sm4DecodeErrorKind::UnsupportedSelectionMode { mode: 3 }
        );
        assert_eq!(
            decode_all(&[0x0011_1000, 0]).unwrap_err().kind,
            Sm4DecodeErrorKind::UnsupportedOperandType { ty: 0x11 }
        );
    }

    #[test]
    fn truncated_operand_is_eof() {
        let err = decode_all(&[0x0010_20F2]).unwrap_err();
        assert!(matches!(err.kind, Sm4DecodeErrorKind::UnexpectedEof { .. }));
    }

    #[test]
    fn encoder_rejects_inconsistent_operands() {
        let mut out = Vec::new();
        let mut op = Operand::imm_f32x4([0.0; 4]);
        op.components = ComponentSelection::One;
        assert!(encode_operand(&op, &mut out).is_err());

        let mut op = Operand::src(OperandType::Temp, 0, Swizzle([0, 1, 2, 4]));
        assert!(encode_operand(&op, &mut out).is_err());
        op.indices = vec![OperandIndex::Imm32(0); 4];
        assert!(encode_operand(&op, &mut out).is_err());

        let op = Operand::dst(OperandType::Temp, 0, WriteMask(0x1F));
        assert!(encode_operand(&op, &mut out).is_err());
        assert!(out.is_empty());
    }

    fn write_mask() -> impl Strategy<Value = WriteMask> {
        (0u8..16).prop_map(WriteMask)
    }

    fn swizzle() -> impl Strategy<Value = Swizzle> {
        [0u8..4, 0u8..4, 0u8..4, 0u8..4].prop_map(Swizzle)
    }

    fn components() -> impl Strategy<Value = ComponentSelection> {
        prop_oneof![
            Just(ComponentSelection::Zero),
            Just(ComponentSelection::One),
            write_mask().prop_map(|m| ComponentSelection::Four(FourComponent::Mask(m))),
            swizzle().prop_map(|s| ComponentSelection::Four(FourComponent::Swizzle(s))),
            (0u8..4).prop_map(|c| ComponentSelection::Four(FourComponent::Select(c))),
        ]
    }

    fn index() -> impl Strategy<Value = OperandIndex> {
        prop_oneof![
            any::<u32>().prop_map(OperandIndex::Imm32),
            any::<u64>().prop_map(OperandIndex::Imm64),
        ]
    }

    fn register_type() -> impl Strategy<Value = OperandType> {
        prop_oneof![
            Just(OperandType::Temp),
            Just(OperandType::Input),
            Just(OperandType::Output),
            Just(OperandType::IndexableTemp),
            Just(OperandType::Sampler),
            Just(OperandType::Resource),
            Just(OperandType::ConstantBuffer),
            Just(OperandType::ImmediateConstantBuffer),
            Just(OperandType::OutputDepth),
            Just(OperandType::Null),
            Just(OperandType::UnorderedAccessView),
        ]
    }

    fn register_operand() -> impl Strategy<Value = Operand> {
        (
            register_type(),
            components(),
            proptest::collection::vec(index(), 0..=3),
        )
            .prop_map(|(ty, components, indices)| Operand {
                ty,
                components,
                indices,
                immediate: None,
            })
    }

    fn immediate_operand() -> impl Strategy<Value = Operand> {
        (components(), any::<bool>(), any::<[u64; 4]>()).prop_map(|(components, wide, raw)| {
            let n = components.immediate_count();
            let (ty, immediate) = if wide {
                (OperandType::Immediate64, Immediate::U64(raw[..n].to_vec()))
            } else {
                (
                    OperandType::Immediate32,
                    Immediate::U32(raw[..n].iter().map(|&v| v as u32).collect()),
                )
            };
            Operand {
                ty,
                components,
                indices: Vec::new(),
                immediate: Some(immediate),
            }
        })
    }

    /// The register forms the shader builder produces.
    fn builder_operand() -> impl Strategy<Value = Operand> {
        let ty = prop_oneof![
            Just(OperandType::Temp),
            Just(OperandType::Input),
            Just(OperandType::Output),
            Just(OperandType::Sampler),
            Just(OperandType::Resource),
            Just(OperandType::ConstantBuffer),
        ];
        (ty, any::<u32>(), write_mask()).prop_map(|(ty, index, mask)| Operand::dst(ty, index, mask))
    }

    proptest! {
        #[test]
        fn builder_subset_round_trips(op in builder_operand()) {
            let mut toks = Vec::new();
            encode_operand(&op, &mut toks).unwrap();
            prop_assert_eq!(toks.len(), 2);
            let (decoded, used) = decode_all(&toks).unwrap();
            prop_assert_eq!(used, 2);
            prop_assert_eq!(decoded, op);
        }

        #[test]
        fn every_decodable_form_round_trips(
            op in prop_oneof![register_operand(), immediate_operand()]
        ) {
            let mut toks = Vec::new();
            encode_operand(&op, &mut toks).unwrap();
            prop_assert_eq!(toks.len(), encoded_len(&op));
            let (decoded, used) = decode_all(&toks).unwrap();
            prop_assert_eq!(used, toks.len());
            prop_assert_eq!(decoded, op);
        }

        #[test]
        fn decoder_never_panics(toks in proptest::collection::vec(any::<u32>(), 0..12)) {
            let mut r = TokenReader::new(&toks);
            if decode_operand(&mut r).is_ok() {
                prop_assert!(r.pos() <= toks.len());
            }
        }
    }
}
