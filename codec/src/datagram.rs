use bytes::{
    Bytes,
    BytesMut,
};
use tokio_util::codec::{
    Decoder,
    Encoder,
};

/// Passes whole datagrams through unchanged. Framing is the socket's job.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub struct DatagramCodec;

impl<T> Encoder<T> for DatagramCodec
where
    T: AsRef<[u8]>,
{
    type Error = std::io::Error;

    #[inline]
    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_ref());

        Ok(())
    }
}

impl Decoder for DatagramCodec {
    type Error = std::io::Error;
    type Item = Bytes;

    #[inline]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        Ok(Some(src.split().freeze()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn takes_everything() {
        let mut src = BytesMut::from(&[1u8, 2, 3][..]);

        let frame = DatagramCodec.decode(&mut src).unwrap();
        assert_eq!(frame.as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(src.is_empty());
        assert_eq!(DatagramCodec.decode(&mut src).unwrap(), None);
    }
}
