pub trait Checksum {
    type Output: Copy + Eq + std::fmt::Debug;

    fn checksum(vals: &[u8]) -> Self::Output;
}

#[macro_export]
macro_rules! impl_checksum {
    ($vis:vis $name:ident, $ty:ty, $algo:expr) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::checksum::Checksum for $name {
            type Output = $ty;

            #[inline]
            fn checksum(vals: &[u8]) -> Self::Output {
                const INSTANCE: ::crc::Crc<$ty> = ::crc::Crc::<$ty>::new(&$algo);

                INSTANCE.checksum(vals)
            }
        }
    };
}

// CCITT-FALSE: poly 0x1021, init 0xffff, no reflection, no final xor.
impl_checksum!(pub HeaderCrc, u16, ::crc::CRC_16_IBM_3740);

impl_checksum!(pub SignatureCrc, u32, ::crc::CRC_32_ISO_HDLC);
