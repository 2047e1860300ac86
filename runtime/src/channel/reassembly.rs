use std::{
    mem,
    sync::Arc,
};

use bytes::BytesMut;
use message::{
    decode_port_header,
    Error,
    ErrorKind,
    PortIdentifier,
    ProtocolType,
    TransportHeaderView,
};
use tokio::time::Instant;
use util::LogThrottle;

use crate::{
    config::ChannelConfig,
    error::SegmentationError,
    metrics::ChannelMetrics,
    workflow::WorkflowDispatch,
    SensorId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
enum SegmentState {
    #[display(fmt = "idle")]
    Idle,
    #[display(fmt = "accumulating {} ({}/{})", id, counter, total)]
    Accumulating {
        id:         u16,
        counter:    u16,
        total:      u16,
        /// Transport header length of the first segment, which heads the reassembled message.
        header_len: usize,
    },
}

/// What became of one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A complete message was handed to the workflow for this port.
    Dispatched(PortIdentifier),
    /// Stored as a segment of an incomplete message.
    Pending,
    Discarded,
}

/// Turns one sensor's datagrams into complete port messages.
///
/// Owned by a single task. Every failure is counted in [`ChannelMetrics`] and logged through a
/// [`LogThrottle`]; none of them stop the channel.
pub struct ReassemblyChannel {
    sensor:   SensorId,
    state:    SegmentState,
    buffer:   BytesMut,
    capacity: usize,
    metrics:  Arc<ChannelMetrics>,
    throttle: LogThrottle,
    dispatch: WorkflowDispatch,
}

impl ReassemblyChannel {
    pub fn new(dispatch: WorkflowDispatch, config: &ChannelConfig) -> Self {
        Self {
            sensor: dispatch.sensor(),
            state: SegmentState::Idle,
            buffer: BytesMut::with_capacity(config.reassembly_capacity),
            capacity: config.reassembly_capacity,
            metrics: Arc::default(),
            throttle: LogThrottle::new(config.log_repeat()),
            dispatch,
        }
    }

    #[inline]
    pub fn sensor(&self) -> SensorId {
        self.sensor
    }

    #[inline]
    pub fn metrics(&self) -> &Arc<ChannelMetrics> {
        &self.metrics
    }

    #[inline]
    pub fn dispatch(&self) -> &WorkflowDispatch {
        &self.dispatch
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == SegmentState::Idle
    }

    pub fn on_datagram(&mut self, now: Instant, datagram: &[u8]) -> Outcome {
        self.metrics.received.inc();
        self.metrics.received_bytes.add(datagram.len() as u64);

        let header = match validate(datagram) {
            Ok(header) => header,
            Err(e) => {
                self.reject(now, &e);
                return Outcome::Discarded;
            },
        };

        if header.is_segmented() {
            return self.on_segment(now, &header, datagram);
        }

        if let SegmentState::Accumulating { id, .. } = self.state {
            self.abandon(now, SegmentationError::Interrupted(id));
        }

        self.dispatch_message(now, header.header_length(), datagram)
    }

    fn on_segment(&mut self, now: Instant, header: &TransportHeaderView<'_>, datagram: &[u8]) -> Outcome {
        let received = header.data_identifier().unwrap_or(0);

        match self.state {
            SegmentState::Idle => {
                if datagram.len() > self.capacity {
                    self.overflow(now, datagram.len());
                    return Outcome::Discarded;
                }

                self.buffer.clear();
                self.buffer.extend_from_slice(datagram);

                let total = header.segmentation().unwrap_or(0);
                self.state = SegmentState::Accumulating {
                    id: received,
                    counter: 1,
                    total,
                    header_len: header.header_length(),
                };

                tracing::trace!(sensor = %self.sensor, id = received, total, "reassembly started");

                if total <= 1 {
                    return self.complete(now);
                }

                Outcome::Pending
            },
            SegmentState::Accumulating { id, .. } if id != received => {
                self.abandon(now, SegmentationError::OutOfSequence {
                    expected: id,
                    received,
                });

                Outcome::Discarded
            },
            SegmentState::Accumulating {
                id,
                counter,
                total,
                header_len,
            } => {
                let payload = &datagram[header.header_length()..];
                let needed = self.buffer.len() + payload.len();

                if needed > self.capacity {
                    self.overflow(now, needed);
                    return Outcome::Discarded;
                }

                self.buffer.extend_from_slice(payload);

                let counter = counter.saturating_add(1);
                self.state = SegmentState::Accumulating {
                    id,
                    counter,
                    total,
                    header_len,
                };

                if counter >= total {
                    return self.complete(now);
                }

                Outcome::Pending
            },
        }
    }

    fn complete(&mut self, now: Instant) -> Outcome {
        let SegmentState::Accumulating { header_len, .. } = self.state else {
            return Outcome::Discarded;
        };

        tracing::trace!(sensor = %self.sensor, state = %self.state, "reassembly complete");
        self.state = SegmentState::Idle;

        let message = mem::take(&mut self.buffer);
        let outcome = self.dispatch_message(now, header_len, &message);

        self.buffer = message;
        self.buffer.clear();

        outcome
    }

    fn dispatch_message(&mut self, now: Instant, header_len: usize, message: &[u8]) -> Outcome {
        match decode_port_header(message, header_len) {
            Ok(port) => {
                self.metrics.dispatched.inc();
                self.dispatch.process(port.identifier, now, message);

                Outcome::Dispatched(port.identifier)
            },
            Err(e) => {
                self.metrics.port_header_errors.inc();
                self.throttle.warn(now.into_std(), "port_header", &e);

                Outcome::Discarded
            },
        }
    }

    fn reject(&mut self, now: Instant, error: &Error) {
        let kind = error.kind();

        match kind {
            ErrorKind::Format => self.metrics.format_errors.inc(),
            ErrorKind::Crc => self.metrics.crc_errors.inc(),
            ErrorKind::UnsupportedProtocol => self.metrics.unsupported_protocol.inc(),
        }

        self.throttle.warn(now.into_std(), kind.as_str(), error);
    }

    fn overflow(&mut self, now: Instant, needed: usize) {
        let error = SegmentationError::Overflow {
            needed,
            capacity: self.capacity,
        };

        self.metrics.segment_overflows.inc();
        self.reset();
        self.throttle.warn(now.into_std(), error.kind(), &error);
    }

    fn abandon(&mut self, now: Instant, error: SegmentationError) {
        self.metrics.segments_discarded.inc();
        self.reset();
        self.throttle.warn(now.into_std(), error.kind(), &error);
    }

    #[inline]
    fn reset(&mut self) {
        self.state = SegmentState::Idle;
        self.buffer.clear();
    }
}

/// Parses the transport header and checks that the payload is routable.
fn validate(datagram: &[u8]) -> Result<TransportHeaderView<'_>, Error> {
    let header = TransportHeaderView::parse(datagram)?;

    match header.protocol_type() {
        ProtocolType::SmartMicroPort => Ok(header),
        other => Err(Error::UnsupportedProtocol(other.into())),
    }
}
