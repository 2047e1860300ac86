use bytes::{
    BufMut,
    BytesMut,
};
use packed_struct::{
    prelude::*,
    PackedStructSlice,
};

use crate::{
    error::{
        FormatError,
        Result,
    },
    BodyOrder,
    PortIdentifier,
};

pub const PORT_HEADER_LEN: usize = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "24", endian = "msb")]
struct RawPortHeader {
    identifier:           u32,
    port_major_version:   u16,
    port_minor_version:   u16,
    timestamp:            i64,
    port_size:            u32,
    body_order:           u8,
    port_index:           u8,
    header_major_version: u8,
    header_minor_version: u8,
}

/// Header at the start of every port payload. Always big endian, whatever the body order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortHeader {
    pub identifier:           PortIdentifier,
    pub port_major_version:   u16,
    pub port_minor_version:   u16,
    pub timestamp:            i64,
    pub port_size:            u32,
    pub body_order:           BodyOrder,
    pub port_index:           u8,
    pub header_major_version: u8,
    pub header_minor_version: u8,
}

impl PortHeader {
    pub fn new(identifier: PortIdentifier) -> Self {
        Self {
            identifier,
            port_major_version: 2,
            port_minor_version: 2,
            timestamp: 0,
            port_size: 0,
            body_order: BodyOrder::LittleEndian,
            port_index: 0,
            header_major_version: 2,
            header_minor_version: 0,
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let raw = RawPortHeader::from(*self);
        dst.put_slice(&raw.pack()?);

        Ok(())
    }
}

impl From<RawPortHeader> for PortHeader {
    fn from(raw: RawPortHeader) -> Self {
        Self {
            identifier:           raw.identifier.into(),
            port_major_version:   raw.port_major_version,
            port_minor_version:   raw.port_minor_version,
            timestamp:            raw.timestamp,
            port_size:            raw.port_size,
            body_order:           raw.body_order.into(),
            port_index:           raw.port_index,
            header_major_version: raw.header_major_version,
            header_minor_version: raw.header_minor_version,
        }
    }
}

impl From<PortHeader> for RawPortHeader {
    fn from(header: PortHeader) -> Self {
        Self {
            identifier:           header.identifier.into(),
            port_major_version:   header.port_major_version,
            port_minor_version:   header.port_minor_version,
            timestamp:            header.timestamp,
            port_size:            header.port_size,
            body_order:           header.body_order.into(),
            port_index:           header.port_index,
            header_major_version: header.header_major_version,
            header_minor_version: header.header_minor_version,
        }
    }
}

/// Decodes the port header starting at `offset`, normally the transport header's length.
pub fn decode_port_header(buf: &[u8], offset: usize) -> Result<PortHeader> {
    let end = offset.saturating_add(PORT_HEADER_LEN);

    let bytes = buf.get(offset..end).ok_or(FormatError::PortHeaderTooShort {
        len: buf.len(),
        offset,
    })?;

    let raw = RawPortHeader::unpack_from_slice(bytes)?;
    Ok(raw.into())
}
