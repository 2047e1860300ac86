use bytes::{
    BufMut,
    BytesMut,
};
use packed_struct::{
    prelude::*,
    PackedStructSlice,
};

use crate::{
    checksum::{
        Checksum,
        HeaderCrc,
    },
    error::{
        Error,
        FormatError,
        Result,
    },
    flags::{
        Field,
        Flags,
    },
    MagicValue,
    ProtocolType,
};

pub type StartPattern = MagicValue<0x7e>;

pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed fields before the optional ones.
pub const PREAMBLE_LEN: usize = 10;
pub const CRC_LEN: usize = 2;
pub const MIN_HEADER_LEN: usize = PREAMBLE_LEN + CRC_LEN;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "10", endian = "msb")]
struct Preamble {
    #[packed_field(size_bytes = "1")]
    start:            StartPattern,
    protocol_version: u8,
    header_length:    u8,
    payload_length:   u16,
    protocol_type:    u8,
    flags:            u32,
}

/// Owned transport header. Fields whose flag is clear are carried as zero and never written.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransportHeader {
    pub protocol_version: u8,
    pub payload_length:   u16,
    pub protocol_type:    ProtocolType,
    pub flags:            Flags,
    pub message_counter:  u16,
    pub timestamp:        u64,
    pub source_client_id: u32,
    pub target_client_id: u32,
    pub data_identifier:  u16,
    pub segmentation:     u16,
}

impl Default for TransportHeader {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            payload_length:   0,
            protocol_type:    ProtocolType::SmartMicroPort,
            flags:            Flags::empty(),
            message_counter:  0,
            timestamp:        0,
            source_client_id: 0,
            target_client_id: 0,
            data_identifier:  0,
            segmentation:     0,
        }
    }
}

impl TransportHeader {
    /// Length on the wire, including the trailing crc.
    #[inline]
    pub fn header_length(&self) -> usize {
        MIN_HEADER_LEN + self.flags.optional_len()
    }

    #[inline]
    pub fn is_segmented(&self) -> bool {
        self.flags.is_segmented()
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();

        let preamble = Preamble {
            start:            StartPattern::INSTANCE,
            protocol_version: self.protocol_version,
            header_length:    self.header_length() as u8,
            payload_length:   self.payload_length,
            protocol_type:    self.protocol_type.into(),
            flags:            self.flags.bits(),
        };

        dst.reserve(self.header_length());
        dst.put_slice(&preamble.pack()?);

        for spec in crate::flags::OPTIONAL_FIELDS.iter() {
            if !self.flags.contains(spec.flag) {
                continue;
            }

            match spec.field {
                Field::MessageCounter => dst.put_u16(self.message_counter),
                Field::Timestamp => dst.put_u64(self.timestamp),
                Field::SourceClientId => dst.put_u32(self.source_client_id),
                Field::TargetClientId => dst.put_u32(self.target_client_id),
                Field::DataIdentifier => dst.put_u16(self.data_identifier),
                Field::Segmentation => dst.put_u16(self.segmentation),
            }
        }

        let crc = HeaderCrc::checksum(&dst[start..]);
        dst.put_u16(crc);

        Ok(())
    }
}

/// Zero-copy view over a validated transport header.
#[derive(Copy, Clone, Debug)]
pub struct TransportHeaderView<'a> {
    buf:      &'a [u8],
    preamble: Preamble,
}

impl<'a> TransportHeaderView<'a> {
    /// Validates length, start pattern and header crc. `buf` may extend past the header.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < MIN_HEADER_LEN {
            return Err(FormatError::TransportHeaderTooShort {
                len:    buf.len(),
                needed: MIN_HEADER_LEN,
            }
            .into());
        }

        let declared = buf[2] as usize;
        if declared < MIN_HEADER_LEN {
            return Err(FormatError::HeaderLength {
                declared,
                required: MIN_HEADER_LEN,
            }
            .into());
        }

        if buf.len() < declared {
            return Err(FormatError::TransportHeaderTooShort {
                len:    buf.len(),
                needed: declared,
            }
            .into());
        }

        if !StartPattern::matches(buf[0]) {
            return Err(FormatError::StartPattern(buf[0]).into());
        }

        let computed = HeaderCrc::checksum(&buf[..declared - CRC_LEN]);
        let received = u16::from_be_bytes([buf[declared - 2], buf[declared - 1]]);

        if computed != received {
            return Err(Error::HeaderCrc { received, computed });
        }

        let preamble = Preamble::unpack_from_slice(&buf[..PREAMBLE_LEN])
            .map_err(|_| FormatError::StartPattern(buf[0]))?;

        let required = MIN_HEADER_LEN + Flags::from_bits_retain(preamble.flags).optional_len();
        if declared < required {
            return Err(FormatError::HeaderLength { declared, required }.into());
        }

        Ok(Self {
            buf: &buf[..declared],
            preamble,
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn protocol_version(&self) -> u8 {
        self.preamble.protocol_version
    }

    #[inline]
    pub fn header_length(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn payload_length(&self) -> u16 {
        self.preamble.payload_length
    }

    #[inline]
    pub fn protocol_type(&self) -> ProtocolType {
        self.preamble.protocol_type.into()
    }

    #[inline]
    pub fn flags(&self) -> Flags {
        Flags::from_bits_retain(self.preamble.flags)
    }

    #[inline]
    pub fn is_segmented(&self) -> bool {
        self.flags().is_segmented()
    }

    #[inline]
    pub fn crc16(&self) -> u16 {
        let len = self.buf.len();
        u16::from_be_bytes([self.buf[len - 2], self.buf[len - 1]])
    }

    fn field(&self, field: Field) -> Option<&'a [u8]> {
        let offset = PREAMBLE_LEN + self.flags().offset_of(field)?;
        self.buf.get(offset..offset + field.spec().width)
    }

    fn field_u16(&self, field: Field) -> Option<u16> {
        self.field(field).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn field_u32(&self, field: Field) -> Option<u32> {
        self.field(field).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    #[inline]
    pub fn message_counter(&self) -> Option<u16> {
        self.field_u16(Field::MessageCounter)
    }

    pub fn timestamp(&self) -> Option<u64> {
        let b = self.field(Field::Timestamp)?;
        Some(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    #[inline]
    pub fn source_client_id(&self) -> Option<u32> {
        self.field_u32(Field::SourceClientId)
    }

    #[inline]
    pub fn target_client_id(&self) -> Option<u32> {
        self.field_u32(Field::TargetClientId)
    }

    #[inline]
    pub fn data_identifier(&self) -> Option<u16> {
        self.field_u16(Field::DataIdentifier)
    }

    #[inline]
    pub fn segmentation(&self) -> Option<u16> {
        self.field_u16(Field::Segmentation)
    }

    pub fn to_owned(&self) -> TransportHeader {
        TransportHeader {
            protocol_version: self.protocol_version(),
            payload_length:   self.payload_length(),
            protocol_type:    self.protocol_type(),
            flags:            self.flags(),
            message_counter:  self.message_counter().unwrap_or_default(),
            timestamp:        self.timestamp().unwrap_or_default(),
            source_client_id: self.source_client_id().unwrap_or_default(),
            target_client_id: self.target_client_id().unwrap_or_default(),
            data_identifier:  self.data_identifier().unwrap_or_default(),
            segmentation:     self.segmentation().unwrap_or_default(),
        }
    }
}

/// Decodes the transport header at the front of `buf`, returning it with the bytes it spans.
#[inline]
pub fn decode_transport_header(buf: &[u8]) -> Result<(TransportHeader, usize)> {
    let view = TransportHeaderView::parse(buf)?;
    Ok((view.to_owned(), view.header_length()))
}

#[inline]
pub fn encode_transport_header(header: &TransportHeader) -> Result<BytesMut> {
    let mut dst = BytesMut::with_capacity(header.header_length());
    header.encode(&mut dst)?;

    Ok(dst)
}
