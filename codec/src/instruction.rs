use bytes::BytesMut;
use message::Instruction;
use tokio_util::codec::{
    Decoder,
    Encoder,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Message(#[from] message::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Encodes and decodes one [`Instruction`] per datagram.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub struct InstructionCodec;

impl Encoder<Instruction> for InstructionCodec {
    type Error = Error;

    fn encode(&mut self, item: Instruction, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&Instruction>>::encode(self, &item, dst)
    }
}

impl Encoder<&Instruction> for InstructionCodec {
    type Error = Error;

    fn encode(&mut self, item: &Instruction, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let encoded = item.encode()?;
        dst.extend_from_slice(&encoded);

        Ok(())
    }
}

impl Decoder for InstructionCodec {
    type Error = Error;
    type Item = Instruction;

    #[tracing::instrument(skip_all, fields(len = src.len()), level = "trace")]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split();
        let result = Instruction::decode(&datagram)?;

        Ok(Some(result))
    }
}

#[cfg(test)]
mod test {
    use message::instruction::{
        Detail,
        RequestType,
    };

    use super::*;

    #[test]
    fn through_codec() {
        let mut instruction = Instruction::with_details([Detail::new(RequestType::ReadStatus, 3, 9)]);
        instruction.sequence_no = 17;

        let mut buf = BytesMut::new();
        InstructionCodec.encode(&instruction, &mut buf).unwrap();

        let decoded = InstructionCodec.decode(&mut buf).unwrap();
        assert_eq!(decoded, Some(instruction));
        assert!(buf.is_empty());
    }

    #[test]
    fn garbage_consumes_datagram() {
        let mut buf = BytesMut::from(&[0u8; 40][..]);

        assert!(matches!(InstructionCodec.decode(&mut buf), Err(Error::Message(_))));
        assert!(buf.is_empty());
    }
}
