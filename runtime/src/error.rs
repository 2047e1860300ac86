use std::{
    io,
    net::SocketAddr,
    time::Duration,
};

#[derive(Debug, thiserror::Error)]
pub enum StopError {
    #[error("task did not stop within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

/// Why an in-progress reassembly was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SegmentationError {
    #[error("segment for data identifier {received} while reassembling {expected}")]
    OutOfSequence { expected: u16, received: u16 },

    #[error("reassembly of {needed} bytes exceeds buffer capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },

    #[error("unsegmented datagram interrupted reassembly of data identifier {0}")]
    Interrupted(u16),
}

impl SegmentationError {
    pub const fn kind(&self) -> &'static str {
        match self {
            SegmentationError::OutOfSequence { .. } => "segment_out_of_sequence",
            SegmentationError::Overflow { .. } => "segment_overflow",
            SegmentationError::Interrupted(_) => "segment_interrupted",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("binding {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source:  io::Error,
    },

    #[error("keep-alive needs an ipv4 callback address, listening on {0}")]
    KeepAliveAddress(SocketAddr),

    #[error(transparent)]
    Message(#[from] message::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
