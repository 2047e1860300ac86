use crate::{
    decode_port_header,
    error::Result,
    port_header::PORT_HEADER_LEN,
    BodyOrder,
    PortHeader,
    PortIdentifier,
    TransportHeaderView,
};

/// A complete, validated message: transport header, port header and body.
#[derive(Copy, Clone, Debug)]
pub struct PortMessage<'a> {
    bytes:     &'a [u8],
    transport: TransportHeaderView<'a>,
    port:      PortHeader,
}

impl<'a> PortMessage<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let transport = TransportHeaderView::parse(bytes)?;
        let port = decode_port_header(bytes, transport.header_length())?;

        Ok(Self {
            bytes,
            transport,
            port,
        })
    }

    #[inline]
    pub fn transport(&self) -> &TransportHeaderView<'a> {
        &self.transport
    }

    #[inline]
    pub fn port_header(&self) -> &PortHeader {
        &self.port
    }

    #[inline]
    pub fn identifier(&self) -> PortIdentifier {
        self.port.identifier
    }

    #[inline]
    pub fn body_order(&self) -> BodyOrder {
        self.port.body_order
    }

    /// Offset of the port header, which is also where the payload crc starts.
    #[inline]
    pub fn port_offset(&self) -> usize {
        self.transport.header_length()
    }

    #[inline]
    pub fn body_offset(&self) -> usize {
        self.port_offset() + PORT_HEADER_LEN
    }

    /// Everything after the port header, including any trailing payload crc.
    #[inline]
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[self.body_offset()..]
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
