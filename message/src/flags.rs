use std::fmt::{
    Display,
    Formatter,
};

bitflags::bitflags! {
    /// Transport header flag word. Bits without a named constant are preserved.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        const MESSAGE_COUNTER  = 1 << 0;
        const TIMESTAMP        = 1 << 1;
        const SKIP_PAYLOAD_CRC = 1 << 2;
        const SOURCE_CLIENT_ID = 1 << 3;
        const TARGET_CLIENT_ID = 1 << 4;
        const DATA_IDENTIFIER  = 1 << 5;
        const SEGMENTATION     = 1 << 6;

        const _ = !0;
    }
}

/// Optional transport header fields, each present only when its flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    MessageCounter,
    Timestamp,
    SourceClientId,
    TargetClientId,
    DataIdentifier,
    Segmentation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub flag:  Flags,
    pub width: usize,
}

/// Wire order of the optional fields following the flag word.
pub const OPTIONAL_FIELDS: [FieldSpec; 6] = [
    FieldSpec {
        field: Field::MessageCounter,
        flag:  Flags::MESSAGE_COUNTER,
        width: 2,
    },
    FieldSpec {
        field: Field::Timestamp,
        flag:  Flags::TIMESTAMP,
        width: 8,
    },
    FieldSpec {
        field: Field::SourceClientId,
        flag:  Flags::SOURCE_CLIENT_ID,
        width: 4,
    },
    FieldSpec {
        field: Field::TargetClientId,
        flag:  Flags::TARGET_CLIENT_ID,
        width: 4,
    },
    FieldSpec {
        field: Field::DataIdentifier,
        flag:  Flags::DATA_IDENTIFIER,
        width: 2,
    },
    FieldSpec {
        field: Field::Segmentation,
        flag:  Flags::SEGMENTATION,
        width: 2,
    },
];

impl Flags {
    /// Total size of the optional fields these flags enable.
    #[inline]
    pub fn optional_len(self) -> usize {
        OPTIONAL_FIELDS
            .iter()
            .filter(|spec| self.contains(spec.flag))
            .map(|spec| spec.width)
            .sum()
    }

    /// Offset of `field` from the end of the flag word, if present.
    pub fn offset_of(self, field: Field) -> Option<usize> {
        let mut offset = 0;

        for spec in OPTIONAL_FIELDS.iter().filter(|spec| self.contains(spec.flag)) {
            if spec.field == field {
                return Some(offset);
            }

            offset += spec.width;
        }

        None
    }

    #[inline]
    pub fn is_segmented(self) -> bool {
        self.contains(Flags::SEGMENTATION)
    }

    #[inline]
    pub fn skips_payload_crc(self) -> bool {
        self.contains(Flags::SKIP_PAYLOAD_CRC)
    }
}

impl Field {
    #[inline]
    pub fn spec(self) -> &'static FieldSpec {
        &OPTIONAL_FIELDS[self as usize]
    }
}

impl Display for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn offsets_follow_wire_order() {
        let all = Flags::all();

        assert_eq!(all.offset_of(Field::MessageCounter), Some(0));
        assert_eq!(all.offset_of(Field::Timestamp), Some(2));
        assert_eq!(all.offset_of(Field::SourceClientId), Some(10));
        assert_eq!(all.offset_of(Field::TargetClientId), Some(14));
        assert_eq!(all.offset_of(Field::DataIdentifier), Some(18));
        assert_eq!(all.offset_of(Field::Segmentation), Some(20));
        assert_eq!(all.optional_len(), 22);
    }

    #[test]
    fn skipped_fields_shift_offsets() {
        let flags = Flags::DATA_IDENTIFIER | Flags::SEGMENTATION | Flags::SKIP_PAYLOAD_CRC;

        assert_eq!(flags.offset_of(Field::MessageCounter), None);
        assert_eq!(flags.offset_of(Field::DataIdentifier), Some(0));
        assert_eq!(flags.offset_of(Field::Segmentation), Some(2));
        assert_eq!(flags.optional_len(), 4);
    }

    #[test]
    fn spec_table_is_indexed_by_field() {
        for spec in OPTIONAL_FIELDS.iter() {
            assert_eq!(spec.field.spec(), spec);
        }
    }

    proptest! {
        #[test]
        fn unknown_bits_are_retained(bits in any::<u32>()) {
            prop_assert_eq!(Flags::from_bits_retain(bits).bits(), bits);
        }
    }
}
