use std::fmt::{
    Display,
    Formatter,
};

/// Structural problems with a datagram: too short, wrong start byte, or a declared length that
/// contradicts the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("{len} bytes is too short for a transport header (need {needed})")]
    TransportHeaderTooShort { len: usize, needed: usize },

    #[error("invalid start pattern 0x{0:02x}")]
    StartPattern(u8),

    #[error("declared header length {declared} is shorter than the {required} bytes its flags require")]
    HeaderLength { declared: usize, required: usize },

    #[error("{len} bytes is too short for a port header at offset {offset}")]
    PortHeaderTooShort { len: usize, offset: usize },

    #[error("payload truncated: need {needed} bytes, have {len}")]
    PayloadTooShort { len: usize, needed: usize },

    #[error("{0} instruction details do not fit in a single request")]
    TooManyDetails(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("transport header crc mismatch (received 0x{received:04x}, computed 0x{computed:04x})")]
    HeaderCrc { received: u16, computed: u16 },

    #[error("payload crc mismatch (received 0x{received:04x}, computed 0x{computed:04x})")]
    PayloadCrc { received: u16, computed: u16 },

    #[error("unsupported protocol type {0}")]
    UnsupportedProtocol(u8),

    #[error("unexpected port identifier {0}")]
    UnexpectedPort(u32),

    #[error(transparent)]
    Packing(#[from] packed_struct::PackingError),
}

/// Coarse classification used for counters and log throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    Crc,
    UnsupportedProtocol,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::HeaderCrc { .. } | Error::PayloadCrc { .. } => ErrorKind::Crc,
            Error::UnsupportedProtocol(_) => ErrorKind::UnsupportedProtocol,
            Error::Format(_) | Error::UnexpectedPort(_) | Error::Packing(_) => ErrorKind::Format,
        }
    }
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Format => "format",
            ErrorKind::Crc => "crc",
            ErrorKind::UnsupportedProtocol => "unsupported_protocol",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
