//! Wire formats for the radar UDP port protocol: transport and port headers, instructions and
//! client keep-alives.

mod error;
mod flags;
mod magic_value;
mod port_header;
mod port_message;
mod transport_header;
mod wire_enum;

pub mod checksum;
pub mod instruction;
pub mod keep_alive;

pub use checksum::Checksum;
pub use error::{
    Error,
    ErrorKind,
    FormatError,
    Result,
};
pub use flags::{
    Field,
    FieldSpec,
    Flags,
    OPTIONAL_FIELDS,
};
pub use instruction::Instruction;
pub use keep_alive::ClientKeepAlive;
pub use magic_value::MagicValue;
pub use port_header::{
    decode_port_header,
    PortHeader,
    PORT_HEADER_LEN,
};
pub use port_message::PortMessage;
pub use transport_header::{
    decode_transport_header,
    encode_transport_header,
    StartPattern,
    TransportHeader,
    TransportHeaderView,
    MIN_HEADER_LEN,
    PROTOCOL_VERSION,
};
pub use wire_enum::{
    BodyOrder,
    PortIdentifier,
    ProtocolType,
};
