use bytes::{
    Buf,
    BufMut,
};

/// Declares a byte-backed enum whose unknown discriminants survive a decode/encode cycle.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $repr:ty {
            $( $variant:ident = $val:expr => $display:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant, )+
            Unknown($repr),
        }

        impl From<$repr> for $name {
            #[inline]
            fn from(val: $repr) -> Self {
                match val {
                    $( x if x == $val => $name::$variant, )+
                    other => $name::Unknown(other),
                }
            }
        }

        impl From<$name> for $repr {
            #[inline]
            fn from(val: $name) -> Self {
                match val {
                    $( $name::$variant => $val, )+
                    $name::Unknown(other) => other,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( $name::$variant => f.write_str($display), )+
                    $name::Unknown(other) => write!(f, "unknown ({other})"),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    pub enum ProtocolType: u8 {
        SmartMicroCanV1 = 0 => "smartmicro can v1",
        AtxMega = 1 => "atx mega",
        Stg = 2 => "stg",
        Unused = 3 => "unused",
        SmartMicroCanV2 = 4 => "smartmicro can v2",
        DebugData = 5 => "debug data",
        LogMessageData = 6 => "log message data",
        AliveProtocol = 7 => "alive protocol",
        SmartMicroPort = 8 => "smartmicro port",
        SmartMicroIap = 9 => "smartmicro iap",
    }
}

wire_enum! {
    pub enum PortIdentifier: u32 {
        EventTrigger = 24 => "event trigger",
        Statistics = 25 => "statistics",
        Pvr = 29 => "pvr",
        Instruction = 46 => "instruction",
        Diagnostics = 86 => "diagnostics",
        ObjectList = 88 => "object list",
        Wgs84 = 137 => "wgs84",
        Uncertainty = 157 => "uncertainty",
    }
}

wire_enum! {
    /// Byte order of everything following the port header.
    pub enum BodyOrder: u8 {
        BigEndian = 1 => "big endian",
        LittleEndian = 2 => "little endian",
    }
}

impl PortIdentifier {
    pub const KNOWN: [PortIdentifier; 8] = [
        PortIdentifier::EventTrigger,
        PortIdentifier::Statistics,
        PortIdentifier::Pvr,
        PortIdentifier::Instruction,
        PortIdentifier::Diagnostics,
        PortIdentifier::ObjectList,
        PortIdentifier::Wgs84,
        PortIdentifier::Uncertainty,
    ];

    /// Position in [`Self::KNOWN`], or `None` for unknown identifiers.
    #[inline]
    pub fn known_index(self) -> Option<usize> {
        Self::KNOWN.iter().position(|&id| id == self)
    }
}

impl Default for BodyOrder {
    fn default() -> Self {
        BodyOrder::LittleEndian
    }
}

// Anything other than little endian reads as big endian.
impl BodyOrder {
    #[inline]
    fn is_little(self) -> bool {
        self == BodyOrder::LittleEndian
    }

    #[inline]
    pub fn get_u16(self, buf: &mut impl Buf) -> u16 {
        if self.is_little() { buf.get_u16_le() } else { buf.get_u16() }
    }

    #[inline]
    pub fn get_u32(self, buf: &mut impl Buf) -> u32 {
        if self.is_little() { buf.get_u32_le() } else { buf.get_u32() }
    }

    #[inline]
    pub fn get_u64(self, buf: &mut impl Buf) -> u64 {
        if self.is_little() { buf.get_u64_le() } else { buf.get_u64() }
    }

    #[inline]
    pub fn put_u16(self, buf: &mut impl BufMut, val: u16) {
        if self.is_little() { buf.put_u16_le(val) } else { buf.put_u16(val) }
    }

    #[inline]
    pub fn put_u32(self, buf: &mut impl BufMut, val: u32) {
        if self.is_little() { buf.put_u32_le(val) } else { buf.put_u32(val) }
    }

    #[inline]
    pub fn put_u64(self, buf: &mut impl BufMut, val: u64) {
        if self.is_little() { buf.put_u64_le(val) } else { buf.put_u64(val) }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn protocol_type_preserves_byte(x in any::<u8>()) {
            prop_assert_eq!(u8::from(ProtocolType::from(x)), x);
        }

        #[test]
        fn port_identifier_preserves_value(x in any::<u32>()) {
            prop_assert_eq!(u32::from(PortIdentifier::from(x)), x);
        }

        #[test]
        fn body_order_round_trips_u32(x in any::<u32>(), little in any::<bool>()) {
            let order = if little { BodyOrder::LittleEndian } else { BodyOrder::BigEndian };

            let mut buf = vec![];
            order.put_u32(&mut buf, x);
            prop_assert_eq!(order.get_u32(&mut &buf[..]), x);
        }
    }

    #[test]
    fn known_identifiers() {
        assert_eq!(PortIdentifier::from(46), PortIdentifier::Instruction);
        assert_eq!(PortIdentifier::from(88), PortIdentifier::ObjectList);
        assert_eq!(PortIdentifier::from(1000), PortIdentifier::Unknown(1000));
        assert_eq!(PortIdentifier::Instruction.known_index(), Some(3));
        assert_eq!(PortIdentifier::Unknown(1).known_index(), None);
    }

    #[test]
    fn unknown_body_order_reads_big_endian() {
        let order = BodyOrder::from(7);
        assert_eq!(order, BodyOrder::Unknown(7));
        assert_eq!(order.get_u16(&mut &[0x12, 0x34][..]), 0x1234);
        assert_eq!(BodyOrder::LittleEndian.get_u16(&mut &[0x12, 0x34][..]), 0x3412);
    }
}
