use bytes::{
    Buf,
    BufMut,
    Bytes,
    BytesMut,
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
    port_header::PORT_HEADER_LEN,
    transport_header::CRC_LEN,
    PortHeader,
    PortIdentifier,
    PortMessage,
    ProtocolType,
    TransportHeader,
};

mod detail;
mod signature;

pub use detail::{
    DataType,
    Detail,
    RequestType,
    ResponseType,
    Value,
    DETAIL_LEN,
};
pub use signature::{
    array_signature,
    scalar_signature,
    signature_crc,
    Dimension,
};

pub const INSTRUCTION_HEADER_LEN: usize = 8;
pub const MAX_DETAILS: usize = u8::MAX as usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstructionHeader {
    pub no_instructions: u8,
    pub sequence_no:     u32,
}

/// A parameter request or response on the instruction port.
///
/// `transport.payload_length`, `port.port_size` and the instruction count are derived from
/// `details` on encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub transport:   TransportHeader,
    pub port:        PortHeader,
    pub sequence_no: u32,
    pub details:     Vec<Detail>,
}

impl Default for Instruction {
    fn default() -> Self {
        Self::new()
    }
}

impl Instruction {
    pub fn new() -> Self {
        let mut result = Self {
            transport:   TransportHeader::default(),
            port:        PortHeader::new(PortIdentifier::Instruction),
            sequence_no: 0,
            details:     Vec::with_capacity(1),
        };

        result.sync_lengths();
        result
    }

    pub fn with_details(details: impl IntoIterator<Item = Detail>) -> Self {
        let mut result = Self::new();
        result.details.extend(details);
        result.sync_lengths();

        result
    }

    pub fn add_detail(&mut self, detail: Detail) -> &mut Detail {
        self.details.push(detail);
        self.sync_lengths();

        let last = self.details.len() - 1;
        &mut self.details[last]
    }

    #[inline]
    pub fn header(&self) -> InstructionHeader {
        InstructionHeader {
            no_instructions: self.details.len().min(MAX_DETAILS) as u8,
            sequence_no:     self.sequence_no,
        }
    }

    /// Port header, instruction header and details. Excludes the payload crc.
    #[inline]
    pub fn payload_len(&self) -> usize {
        PORT_HEADER_LEN + INSTRUCTION_HEADER_LEN + DETAIL_LEN * self.details.len()
    }

    pub fn encoded_len(&self) -> usize {
        let crc_len = if self.transport.flags.skips_payload_crc() { 0 } else { CRC_LEN };

        self.transport.header_length() + self.payload_len() + crc_len
    }

    fn sync_lengths(&mut self) {
        let len = self.payload_len();

        self.transport.payload_length = len as u16;
        self.port.port_size = len as u32;
    }

    pub fn encode(&self) -> Result<Bytes> {
        if self.details.len() > MAX_DETAILS {
            return Err(FormatError::TooManyDetails(self.details.len()).into());
        }

        let mut transport = self.transport.clone();
        let mut port = self.port;
        transport.payload_length = self.payload_len() as u16;
        port.port_size = self.payload_len() as u32;

        let mut dst = BytesMut::with_capacity(self.encoded_len());
        transport.encode(&mut dst)?;

        let payload_start = dst.len();
        port.encode(&mut dst)?;

        let order = port.body_order;
        let header = self.header();

        dst.put_u8(header.no_instructions);
        dst.put_bytes(0, 3);
        order.put_u32(&mut dst, header.sequence_no);

        for detail in self.details.iter() {
            detail.write(&mut dst, order);
        }

        if !transport.flags.skips_payload_crc() {
            let crc = HeaderCrc::checksum(&dst[payload_start..]);
            dst.put_u16(crc);
        }

        Ok(dst.freeze())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let message = PortMessage::parse(bytes)?;

        let protocol_type = message.transport().protocol_type();
        if protocol_type != ProtocolType::SmartMicroPort {
            return Err(Error::UnsupportedProtocol(protocol_type.into()));
        }

        if message.identifier() != PortIdentifier::Instruction {
            return Err(Error::UnexpectedPort(message.identifier().into()));
        }

        let order = message.body_order();
        let mut body = message.body();

        if body.len() < INSTRUCTION_HEADER_LEN {
            return Err(FormatError::PayloadTooShort {
                len:    body.len(),
                needed: INSTRUCTION_HEADER_LEN,
            }
            .into());
        }

        let no_instructions = body.get_u8() as usize;
        body.advance(3);
        let sequence_no = order.get_u32(&mut body);

        let skip_crc = message.transport().flags().skips_payload_crc();
        let details_len = DETAIL_LEN * no_instructions;
        let needed = details_len + if skip_crc { 0 } else { CRC_LEN };

        if body.len() < needed {
            return Err(FormatError::PayloadTooShort {
                len: body.len(),
                needed,
            }
            .into());
        }

        let details = (0..no_instructions)
            .map(|_| Detail::read(&mut body, order))
            .collect::<Vec<_>>();

        if !skip_crc {
            let start = message.port_offset();
            let end = message.body_offset() + INSTRUCTION_HEADER_LEN + details_len;

            let computed = HeaderCrc::checksum(&bytes[start..end]);
            let received = body.get_u16();

            if computed != received {
                return Err(Error::PayloadCrc { received, computed });
            }
        }

        Ok(Self {
            transport: message.transport().to_owned(),
            port: *message.port_header(),
            sequence_no,
            details,
        })
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::{
        detail::test::detail as detail_strategy,
        *,
    };
    use crate::{
        transport_header::test::transport_header as transport_header_strategy,
        BodyOrder,
        Flags,
    };

    prop_compose! {
        fn instruction()(
            transport in transport_header_strategy(),
            little in any::<bool>(),
            timestamp in any::<i64>(),
            sequence_no in any::<u32>(),
            details in prop::collection::vec(detail_strategy(), 0..8),
        ) -> Instruction {
            let mut result = Instruction::with_details(details);
            result.transport.flags = transport.flags;
            result.transport.message_counter = transport.message_counter;
            result.transport.timestamp = transport.timestamp;
            result.transport.source_client_id = transport.source_client_id;
            result.transport.target_client_id = transport.target_client_id;
            result.transport.data_identifier = transport.data_identifier;
            result.transport.segmentation = transport.segmentation;
            result.port.timestamp = timestamp;
            result.port.body_order = if little { BodyOrder::LittleEndian } else { BodyOrder::BigEndian };
            result.sequence_no = sequence_no;

            result
        }
    }

    proptest! {
        #[test]
        fn round_trip(instruction in instruction()) {
            let encoded = instruction.encode().unwrap();
            prop_assert_eq!(encoded.len(), instruction.encoded_len());
            prop_assert_eq!(Instruction::decode(&encoded).unwrap(), instruction);
        }

        #[test]
        fn payload_corruption_is_caught(
            instruction in instruction(),
            pos in any::<prop::sample::Index>(),
            bit in 0..8u8,
        ) {
            prop_assume!(!instruction.transport.flags.skips_payload_crc());

            let mut encoded = instruction.encode().unwrap().to_vec();
            // past the detail count, everything up to the trailer is checksummed
            let start = instruction.transport.header_length() + PORT_HEADER_LEN + 1;
            let pos = start + pos.index(encoded.len() - start);
            encoded[pos] ^= 1 << bit;

            let decoded = Instruction::decode(&encoded);
            prop_assert!(matches!(decoded, Err(Error::PayloadCrc { .. })), "{:?}", decoded);
        }

        #[test]
        fn skipped_payload_crc_tolerates_corruption(
            mut instruction in instruction(),
            pos in any::<prop::sample::Index>(),
            bit in 0..8u8,
        ) {
            instruction.transport.flags |= Flags::SKIP_PAYLOAD_CRC;

            let mut encoded = instruction.encode().unwrap().to_vec();
            let start = instruction.transport.header_length() + PORT_HEADER_LEN + 1;
            let pos = start + pos.index(encoded.len() - start);
            encoded[pos] ^= 1 << bit;

            let decoded = Instruction::decode(&encoded);
            prop_assert!(decoded.is_ok(), "{:?}", decoded);
        }
    }

    #[test]
    fn single_detail_layout() {
        let mut instruction = Instruction::new();
        instruction.sequence_no = 0x0102_0304;
        instruction.add_detail(Detail::new(RequestType::GetParameter, 1, 2));

        let encoded = instruction.encode().unwrap();
        assert_eq!(encoded.len(), 12 + 24 + 8 + 24 + 2);
        assert_eq!(u16::from_be_bytes([encoded[3], encoded[4]]), 56);

        let body = &encoded[36..];
        assert_eq!(body[0], 1);
        assert_eq!(&body[1..4], &[0, 0, 0]);
        assert_eq!(&body[4..8], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn skip_payload_crc_omits_trailer() {
        let mut instruction = Instruction::with_details([Detail::default()]);
        instruction.transport.flags = Flags::SKIP_PAYLOAD_CRC;

        let encoded = instruction.encode().unwrap();
        assert_eq!(encoded.len(), 12 + 24 + 8 + 24);
        assert_eq!(Instruction::decode(&encoded).unwrap(), instruction);
    }

    #[test]
    fn bad_payload_crc() {
        let instruction = Instruction::with_details([Detail::default()]);
        let mut encoded = instruction.encode().unwrap().to_vec();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xff;

        let err = Instruction::decode(&encoded).unwrap_err();
        assert!(matches!(err, Error::PayloadCrc { .. }));
    }

    #[test]
    fn truncated_details() {
        let instruction = Instruction::with_details([Detail::default(), Detail::default()]);
        let encoded = instruction.encode().unwrap();

        let err = Instruction::decode(&encoded[..encoded.len() - 10]).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::PayloadTooShort { .. })));
    }

    #[test]
    fn rejects_other_ports() {
        let mut instruction = Instruction::new();
        instruction.port.identifier = PortIdentifier::ObjectList;

        let encoded = instruction.encode().unwrap();
        assert_eq!(Instruction::decode(&encoded).unwrap_err(), Error::UnexpectedPort(88));
    }

    #[test]
    fn too_many_details() {
        let instruction = Instruction::with_details(vec![Detail::default(); MAX_DETAILS + 1]);

        assert_eq!(
            instruction.encode().unwrap_err(),
            Error::Format(FormatError::TooManyDetails(MAX_DETAILS + 1))
        );
    }
}
