use std::net::{
    Ipv4Addr,
    SocketAddrV4,
};

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
    transport_header::CRC_LEN,
    ProtocolType,
    TransportHeader,
    TransportHeaderView,
};

pub const KEEP_ALIVE_BODY_LEN: usize = 16;

/// Announces this client to sensors, asking them to stream to `target`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientKeepAlive {
    pub major_version: u8,
    pub minor_version: u8,
    pub client_id:     u32,
    pub target:        SocketAddrV4,
}

impl ClientKeepAlive {
    pub fn new(client_id: u32, target: SocketAddrV4) -> Self {
        Self {
            major_version: 3,
            minor_version: 0,
            client_id,
            target,
        }
    }

    fn transport() -> TransportHeader {
        TransportHeader {
            payload_length: KEEP_ALIVE_BODY_LEN as u16,
            protocol_type: ProtocolType::AliveProtocol,
            ..Default::default()
        }
    }

    pub fn encode(&self) -> Result<Bytes> {
        let transport = Self::transport();

        let mut dst = BytesMut::with_capacity(transport.header_length() + KEEP_ALIVE_BODY_LEN + CRC_LEN);
        transport.encode(&mut dst)?;

        let body_start = dst.len();
        dst.put_u8(self.major_version);
        dst.put_u8(self.minor_version);
        dst.put_u16(0);
        dst.put_u32(self.client_id);
        dst.put_u32(u32::from(*self.target.ip()));
        dst.put_u16(self.target.port());
        dst.put_u16(0);

        let crc = HeaderCrc::checksum(&dst[body_start..]);
        dst.put_u16(crc);

        Ok(dst.freeze())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = TransportHeaderView::parse(bytes)?;

        if header.protocol_type() != ProtocolType::AliveProtocol {
            return Err(Error::UnsupportedProtocol(header.protocol_type().into()));
        }

        let body_start = header.header_length();
        let needed = body_start + KEEP_ALIVE_BODY_LEN + CRC_LEN;
        if bytes.len() < needed {
            return Err(FormatError::PayloadTooShort {
                len: bytes.len(),
                needed,
            }
            .into());
        }

        let body = &bytes[body_start..body_start + KEEP_ALIVE_BODY_LEN];
        let computed = HeaderCrc::checksum(body);
        let received = u16::from_be_bytes([bytes[needed - 2], bytes[needed - 1]]);
        if computed != received {
            return Err(Error::PayloadCrc { received, computed });
        }

        let mut body = body;
        let major_version = body.get_u8();
        let minor_version = body.get_u8();
        body.advance(2);
        let client_id = body.get_u32();
        let ip = Ipv4Addr::from(body.get_u32());
        let port = body.get_u16();

        Ok(Self {
            major_version,
            minor_version,
            client_id,
            target: SocketAddrV4::new(ip, port),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout() {
        let alive = ClientKeepAlive::new(0x0100_0001, "192.168.1.20:55555".parse().unwrap());
        let encoded = alive.encode().unwrap();

        assert_eq!(encoded.len(), 12 + 16 + 2);
        assert_eq!(encoded[2], 0x0c);
        assert_eq!(&encoded[3..5], &[0x00, 0x10]);
        assert_eq!(encoded[5], 7);
        assert_eq!(&encoded[12..14], &[3, 0]);
        assert_eq!(&encoded[16..20], &[0x01, 0x00, 0x00, 0x01]);
        assert_eq!(&encoded[20..24], &[192, 168, 1, 20]);
        assert_eq!(&encoded[24..26], &55555u16.to_be_bytes());

        assert_eq!(ClientKeepAlive::decode(&encoded).unwrap(), alive);
    }

    #[test]
    fn corrupted_body() {
        let alive = ClientKeepAlive::new(1, "10.0.0.1:60000".parse().unwrap());
        let mut encoded = alive.encode().unwrap().to_vec();
        encoded[17] ^= 0x10;

        assert!(matches!(ClientKeepAlive::decode(&encoded), Err(Error::PayloadCrc { .. })));
    }
}
