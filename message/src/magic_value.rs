use packed_struct::{
    prelude::*,
    PackedStructInfo,
    PackingResult,
};

/// A single byte that must always hold `C` on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct MagicValue<const C: u8>;

impl<const C: u8> MagicValue<C> {
    pub const INSTANCE: Self = Self;
    pub const VALUE: u8 = C;

    #[inline]
    pub const fn matches(byte: u8) -> bool {
        byte == C
    }
}

impl<const C: u8> PackedStruct for MagicValue<C> {
    type ByteArray = [u8; 1];

    #[inline]
    fn pack(&self) -> PackingResult<Self::ByteArray> {
        Ok([C])
    }

    #[inline]
    fn unpack(src: &Self::ByteArray) -> PackingResult<Self> {
        if Self::matches(src[0]) {
            Ok(Self)
        } else {
            Err(PackingError::InvalidValue)
        }
    }
}

impl<const C: u8> PackedStructInfo for MagicValue<C> {
    #[inline]
    fn packed_bits() -> usize {
        8
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn check<const C: u8>(byte: u8) {
        assert_eq!(MagicValue::<C>::INSTANCE.pack().unwrap(), [C]);

        let unpacked = MagicValue::<C>::unpack(&[byte]);

        if byte == C {
            assert_eq!(unpacked, Ok(MagicValue));
        } else {
            assert_eq!(unpacked, Err(PackingError::InvalidValue));
            assert!(!MagicValue::<C>::matches(byte));
        }
    }

    proptest! {
        #[test]
        fn start_pattern(byte in any::<u8>()) {
            check::<0x7e>(byte)
        }

        #[test]
        fn extremes(byte in any::<u8>()) {
            check::<0>(byte);
            check::<255>(byte);
        }
    }
}
