//! Per-sensor inbound path: a bounded queue feeding a [`ReassemblyChannel`] on its own task.

use std::{
    sync::Arc,
    time::Duration,
};

use message::{
    decode_port_header,
    TransportHeaderView,
};
use tokio::{
    sync::mpsc::{
        self,
        error::TrySendError,
    },
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ChannelConfig,
    error::StopError,
    metrics::ChannelMetrics,
    workflow::WorkflowDispatch,
    SensorId,
};

mod pool;
mod reassembly;

pub use pool::{
    DatagramPool,
    PooledDatagram,
};
pub use reassembly::{
    Outcome,
    ReassemblyChannel,
};

#[cfg(test)]
pub(crate) use reassembly::test as fixtures;

pub struct ChannelHandle {
    sensor:       SensorId,
    tx:           mpsc::Sender<PooledDatagram>,
    pool:         DatagramPool,
    metrics:      Arc<ChannelMetrics>,
    cancel:       CancellationToken,
    join:         JoinHandle<()>,
    stop_timeout: Duration,
}

impl ChannelHandle {
    pub fn spawn(dispatch: WorkflowDispatch, config: &ChannelConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let channel = ReassemblyChannel::new(dispatch, config);
        let sensor = channel.sensor();
        let metrics = channel.metrics().clone();

        let cancel = CancellationToken::new();
        let join = tokio::spawn(run(channel, rx, cancel.clone()));

        Self {
            sensor,
            tx,
            // One extra slot for the datagram being processed.
            pool: DatagramPool::new(capacity + 1),
            metrics,
            cancel,
            join,
            stop_timeout: config.stop_timeout(),
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

    /// Queues `datagram` for reassembly. Never waits: if the queue is full the datagram is
    /// dropped and false is returned.
    pub fn on_datagram(&self, datagram: &[u8]) -> bool {
        match self.tx.try_reserve() {
            Ok(permit) => {
                permit.send(self.pool.fill(datagram));
                true
            },
            Err(TrySendError::Full(())) => {
                self.count_drop(datagram);
                false
            },
            Err(TrySendError::Closed(())) => {
                tracing::debug!(sensor = %self.sensor, "channel closed, dropping datagram");
                self.count_drop(datagram);
                false
            },
        }
    }

    fn count_drop(&self, datagram: &[u8]) {
        self.metrics.dropped.inc();

        let Ok(header) = TransportHeaderView::parse(datagram) else {
            return;
        };

        if header.is_segmented() {
            self.metrics.dropped_segments.inc();
        }

        if let Ok(port) = decode_port_header(datagram, header.header_length()) {
            self.metrics.dropped_by_port.inc(port.identifier);
        }
    }

    /// Signals the consumer and waits for it to finish the datagram in hand.
    pub async fn stop(self) -> Result<(), StopError> {
        self.cancel.cancel();

        let abort = self.join.abort_handle();

        match tokio::time::timeout(self.stop_timeout, self.join).await {
            Ok(result) => Ok(result?),
            Err(_elapsed) => {
                abort.abort();
                Err(StopError::Timeout(self.stop_timeout))
            },
        }
    }
}

#[tracing::instrument(skip_all, fields(sensor = %channel.sensor()))]
async fn run(
    mut channel: ReassemblyChannel,
    mut rx: mpsc::Receiver<PooledDatagram>,
    cancel: CancellationToken,
) {
    tracing::debug!("channel started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            datagram = rx.recv() => match datagram {
                Some(datagram) => {
                    channel.on_datagram(Instant::now(), &datagram);
                },
                None => break,
            },
        }
    }

    let snapshot = channel.metrics().snapshot();
    tracing::debug!(
        received = snapshot.received,
        dispatched = snapshot.dispatched,
        dropped = snapshot.dropped,
        "channel stopped"
    );
}
